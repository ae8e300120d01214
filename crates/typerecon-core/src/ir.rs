//! Arena-based SSA intermediate representation consumed by the reconstructor
//!
//! Operands, operations and declarations live in flat vectors owned by a
//! [`Script`] and refer to each other through index newtypes. The CFG and
//! SSA construction that fills a script happen upstream; the builder
//! methods here only record what the host hands over.

use crate::lattice::Type;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

index_type!(
    /// Index of an operand in [`Script::operands`]
    OperandId
);
index_type!(
    /// Index of an operation in [`Script::ops`]
    OpId
);
index_type!(
    /// Index of a class-like declaration in [`Script::classes`]
    ClassId
);
index_type!(
    /// Index of a function or method in [`Script::functions`]
    FunctionId
);

/// A concrete runtime value carried by a literal operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
}

impl Literal {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
            Literal::String(_) => "string",
            Literal::Null => "null",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

/// Scope of a non-local binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundScope {
    Global,
    Local,
    /// Object receiver such as `$this`
    Object,
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperandKind {
    /// SSA variable; temporaries have no name
    Variable { name: Option<String> },
    Literal(Literal),
    Bound {
        name: String,
        scope: BoundScope,
        /// Declared type of an object-scope binding, as declaration text
        owner: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    /// Operations producing this operand; more than one acts as a merge point
    pub ops: SmallVec<[OpId; 2]>,
    /// Written back by the reconstructor
    pub ty: Type,
}

impl Operand {
    fn new(kind: OperandKind) -> Self {
        Self {
            kind,
            ops: SmallVec::new(),
            ty: Type::Unknown,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            OperandKind::Literal(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Greater,
    GreaterOrEqual,
    Smaller,
    SmallerOrEqual,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    Div,
    Plus,
    Minus,
    Mul,
    Concat,
    Mod,
    ShiftLeft,
    ShiftRight,
    Pow,
    Coalesce,
    Spaceship,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Equal => "Equal",
            BinaryOp::NotEqual => "NotEqual",
            BinaryOp::Identical => "Identical",
            BinaryOp::NotIdentical => "NotIdentical",
            BinaryOp::Greater => "Greater",
            BinaryOp::GreaterOrEqual => "GreaterOrEqual",
            BinaryOp::Smaller => "Smaller",
            BinaryOp::SmallerOrEqual => "SmallerOrEqual",
            BinaryOp::LogicalAnd => "LogicalAnd",
            BinaryOp::LogicalOr => "LogicalOr",
            BinaryOp::LogicalXor => "LogicalXor",
            BinaryOp::BitwiseAnd => "BitwiseAnd",
            BinaryOp::BitwiseOr => "BitwiseOr",
            BinaryOp::BitwiseXor => "BitwiseXor",
            BinaryOp::Div => "Div",
            BinaryOp::Plus => "Plus",
            BinaryOp::Minus => "Minus",
            BinaryOp::Mul => "Mul",
            BinaryOp::Concat => "Concat",
            BinaryOp::Mod => "Mod",
            BinaryOp::ShiftLeft => "ShiftLeft",
            BinaryOp::ShiftRight => "ShiftRight",
            BinaryOp::Pow => "Pow",
            BinaryOp::Coalesce => "Coalesce",
            BinaryOp::Spaceship => "Spaceship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    BooleanNot,
    BitwiseNot,
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    Bool,
    Int,
    Double,
    String,
    Array,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IteratorOp {
    Reset,
    Valid,
    Value,
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssertionMode {
    Union,
    Intersection,
}

/// A positive type guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeAssertion {
    /// A literal holds declaration text; any other operand contributes its type
    Operand(OperandId),
    Composite {
        mode: AssertionMode,
        members: Vec<TypeAssertion>,
    },
}

/// A narrowing fact attached to a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assertion {
    Type(TypeAssertion),
    Negated(Box<Assertion>),
}

impl Assertion {
    pub fn negate(self) -> Self {
        Assertion::Negated(Box::new(self))
    }
}

/// An expression operation producing one or more operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Binary {
        op: BinaryOp,
        left: OperandId,
        right: OperandId,
    },
    Unary {
        op: UnaryOp,
        expr: OperandId,
    },
    Cast {
        kind: CastKind,
        expr: OperandId,
    },
    InstanceOf {
        expr: OperandId,
        class: OperandId,
    },
    Empty {
        expr: OperandId,
    },
    Isset {
        vars: Vec<OperandId>,
    },
    ConcatList {
        list: Vec<OperandId>,
    },
    Print {
        expr: OperandId,
    },
    Exit {
        expr: Option<OperandId>,
    },
    Eval {
        expr: OperandId,
    },
    Include {
        expr: OperandId,
    },
    Yield {
        value: Option<OperandId>,
        key: Option<OperandId>,
    },
    Iterator {
        kind: IteratorOp,
        var: OperandId,
    },
    Array {
        keys: Vec<Option<OperandId>>,
        values: Vec<OperandId>,
    },
    ArrayDimFetch {
        var: OperandId,
        dim: Option<OperandId>,
    },
    Assign {
        var: OperandId,
        expr: OperandId,
    },
    AssignRef {
        var: OperandId,
        expr: OperandId,
    },
    Clone {
        expr: OperandId,
    },
    Closure {
        function: FunctionId,
    },
    FuncCall {
        name: OperandId,
        args: Vec<OperandId>,
    },
    New {
        class: OperandId,
        args: Vec<OperandId>,
    },
    Param {
        name: String,
        /// Declared type as written in the signature
        declared_type: Option<String>,
        /// Operand holding the default value, if any
        default: Option<OperandId>,
        function: Option<FunctionId>,
    },
    StaticCall {
        class: OperandId,
        name: OperandId,
        args: Vec<OperandId>,
    },
    MethodCall {
        var: OperandId,
        name: OperandId,
        args: Vec<OperandId>,
    },
    PropertyFetch {
        var: OperandId,
        name: OperandId,
    },
    StaticPropertyFetch {
        class: OperandId,
        name: OperandId,
    },
    Assertion {
        expr: OperandId,
        assertion: Assertion,
    },
    ConstFetch {
        name: OperandId,
    },
    ClassConstFetch {
        class: OperandId,
        name: OperandId,
    },
    Phi {
        vars: Vec<OperandId>,
    },
}

impl Op {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Op::Binary { op, .. } => op.name(),
            Op::Unary { .. } => "Unary",
            Op::Cast { .. } => "Cast",
            Op::InstanceOf { .. } => "InstanceOf",
            Op::Empty { .. } => "Empty",
            Op::Isset { .. } => "Isset",
            Op::ConcatList { .. } => "ConcatList",
            Op::Print { .. } => "Print",
            Op::Exit { .. } => "Exit",
            Op::Eval { .. } => "Eval",
            Op::Include { .. } => "Include",
            Op::Yield { .. } => "Yield",
            Op::Iterator { .. } => "Iterator",
            Op::Array { .. } => "Array",
            Op::ArrayDimFetch { .. } => "ArrayDimFetch",
            Op::Assign { .. } => "Assign",
            Op::AssignRef { .. } => "AssignRef",
            Op::Clone { .. } => "Clone",
            Op::Closure { .. } => "Closure",
            Op::FuncCall { .. } => "FuncCall",
            Op::New { .. } => "New",
            Op::Param { .. } => "Param",
            Op::StaticCall { .. } => "StaticCall",
            Op::MethodCall { .. } => "MethodCall",
            Op::PropertyFetch { .. } => "PropertyFetch",
            Op::StaticPropertyFetch { .. } => "StaticPropertyFetch",
            Op::Assertion { .. } => "Assertion",
            Op::ConstFetch { .. } => "ConstFetch",
            Op::ClassConstFetch { .. } => "ClassConstFetch",
            Op::Phi { .. } => "Phi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub declared_type: Option<String>,
    pub doc_comment: Option<String>,
    /// Seeded by the reconstructor before inference starts
    pub ty: Type,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            doc_comment: None,
            ty: Type::Unknown,
        }
    }

    pub fn with_type(mut self, decl: impl Into<String>) -> Self {
        self.declared_type = Some(decl.into());
        self
    }

    pub fn with_doc(mut self, comment: impl Into<String>) -> Self {
        self.doc_comment = Some(comment.into());
        self
    }
}

/// A class, interface or trait declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub kind: ClassKind,
    /// Parent class, or the extended interfaces of an interface
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub methods: Vec<FunctionId>,
    pub properties: Vec<PropertyDecl>,
}

impl ClassDecl {
    fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            extends: Vec::new(),
            implements: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Interface)
    }

    pub fn trait_decl(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Trait)
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    pub fn property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A function, method or closure declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: Option<String>,
    pub doc_comment: Option<String>,
    /// Owning class for methods
    pub class: Option<ClassId>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            doc_comment: None,
            class: None,
        }
    }

    pub fn returns(mut self, decl: impl Into<String>) -> Self {
        self.return_type = Some(decl.into());
        self
    }

    pub fn with_doc(mut self, comment: impl Into<String>) -> Self {
        self.doc_comment = Some(comment.into());
        self
    }
}

/// A global constant or a class constant bound to a value operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDecl {
    pub name: String,
    pub class: Option<ClassId>,
    pub value: OperandId,
}

/// A whole program: every operand, operation and declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub operands: Vec<Operand>,
    pub ops: Vec<Op>,
    pub classes: Vec<ClassDecl>,
    pub functions: Vec<FunctionDecl>,
    pub constants: Vec<ConstantDecl>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_operand(&mut self, kind: OperandKind) -> OperandId {
        let id = OperandId(self.operands.len());
        self.operands.push(Operand::new(kind));
        id
    }

    /// A named SSA variable.
    pub fn var(&mut self, name: impl Into<String>) -> OperandId {
        self.push_operand(OperandKind::Variable {
            name: Some(name.into()),
        })
    }

    /// An unnamed temporary.
    pub fn temp(&mut self) -> OperandId {
        self.push_operand(OperandKind::Variable { name: None })
    }

    pub fn literal(&mut self, value: impl Into<Literal>) -> OperandId {
        self.push_operand(OperandKind::Literal(value.into()))
    }

    pub fn bound(
        &mut self,
        name: impl Into<String>,
        scope: BoundScope,
        owner: Option<&str>,
    ) -> OperandId {
        self.push_operand(OperandKind::Bound {
            name: name.into(),
            scope,
            owner: owner.map(str::to_string),
        })
    }

    /// Record `op` as a producer of `result`.
    pub fn emit(&mut self, op: Op, result: OperandId) -> OpId {
        let id = OpId(self.ops.len());
        self.ops.push(op);
        self.add_producer(result, id);
        id
    }

    /// Link an additional producer, e.g. the variable written by an assignment.
    pub fn add_producer(&mut self, result: OperandId, op: OpId) {
        self.operands[result.0].ops.push(op);
    }

    /// Emit `var = expr`, linking both the assigned variable and `result`.
    pub fn assign(&mut self, var: OperandId, expr: OperandId, result: OperandId) -> OpId {
        let id = self.emit(Op::Assign { var, expr }, result);
        if var != result {
            self.add_producer(var, id);
        }
        id
    }

    pub fn declare_class(&mut self, decl: ClassDecl) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(decl);
        id
    }

    pub fn declare_function(&mut self, decl: FunctionDecl) -> FunctionId {
        let id = FunctionId(self.functions.len());
        self.functions.push(decl);
        id
    }

    pub fn declare_method(&mut self, class: ClassId, mut decl: FunctionDecl) -> FunctionId {
        decl.class = Some(class);
        let id = self.declare_function(decl);
        self.classes[class.0].methods.push(id);
        id
    }

    pub fn declare_constant(&mut self, name: impl Into<String>, value: OperandId) {
        self.constants.push(ConstantDecl {
            name: name.into(),
            class: None,
            value,
        });
    }

    pub fn declare_class_constant(
        &mut self,
        class: ClassId,
        name: impl Into<String>,
        value: OperandId,
    ) {
        self.constants.push(ConstantDecl {
            name: name.into(),
            class: Some(class),
            value,
        });
    }

    pub fn operand(&self, id: OperandId) -> &Operand {
        &self.operands[id.0]
    }

    pub fn op(&self, id: OpId) -> &Op {
        &self.ops[id.0]
    }

    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.0]
    }

    /// Type currently recorded on an operand.
    pub fn type_of(&self, id: OperandId) -> &Type {
        &self.operands[id.0].ty
    }

    pub fn property(&self, class: ClassId, name: &str) -> Option<&PropertyDecl> {
        self.classes[class.0].find_property(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_links_producer() {
        let mut script = Script::new();
        let one = script.literal(1);
        let x = script.var("x");
        let op = script.emit(Op::Clone { expr: one }, x);
        assert_eq!(script.operand(x).ops.as_slice(), &[op]);
        assert!(script.operand(one).ops.is_empty());
    }

    #[test]
    fn test_assign_links_variable_and_result() {
        let mut script = Script::new();
        let one = script.literal(1);
        let x = script.var("x");
        let tmp = script.temp();
        let op = script.assign(x, one, tmp);
        assert_eq!(script.operand(x).ops.as_slice(), &[op]);
        assert_eq!(script.operand(tmp).ops.as_slice(), &[op]);
    }

    #[test]
    fn test_declare_method_sets_owner() {
        let mut script = Script::new();
        let class = script.declare_class(ClassDecl::class("A"));
        let method = script.declare_method(class, FunctionDecl::new("run"));
        assert_eq!(script.function(method).class, Some(class));
        assert_eq!(script.class(class).methods, vec![method]);
    }

    #[test]
    fn test_literal_accessors() {
        assert_eq!(Literal::from("Foo").as_str(), Some("Foo"));
        assert_eq!(Literal::from(3).as_str(), None);
        assert_eq!(Literal::Null.kind_name(), "null");
    }

    #[test]
    fn test_script_serializes_to_json() {
        let mut script = Script::new();
        let one = script.literal(1);
        let x = script.var("x");
        script.assign(x, one, x);
        let json = serde_json::to_string(&script).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back.operands.len(), 2);
        assert_eq!(back.op(OpId(0)), &Op::Assign { var: x, expr: one });
    }
}
