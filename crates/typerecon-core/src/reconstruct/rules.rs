//! Per-operation inference rules
//!
//! Each rule returns `Ok(None)` while a dependency is still unresolved.

use super::{Candidates, Resolver};
use crate::error::{ReconstructError, Result};
use crate::ir::{
    BinaryOp, BoundScope, CastKind, FunctionId, IteratorOp, Literal, Op, OpId, OperandId,
    OperandKind, UnaryOp,
};
use crate::lattice::{merge_types, DocTag, Type};
use smallvec::smallvec;
use tracing::trace;

fn one(ty: Type) -> Option<Candidates> {
    Some(smallvec![ty])
}

impl<'a> Resolver<'a> {
    /// Candidate types `op` contributes to `var`.
    pub(super) fn resolve_op(&mut self, var: OperandId, op_id: OpId) -> Result<Option<Candidates>> {
        let script = self.script;
        let candidates = match script.op(op_id) {
            Op::Binary { op, left, right } => self.binary(op_id, *op, *left, *right)?,
            Op::Unary { op, expr } => self.unary(*op, *expr),
            Op::Cast { kind, expr } => self.cast(*kind, *expr),
            Op::InstanceOf { .. } | Op::Empty { .. } | Op::Isset { .. } => one(Type::Boolean),
            Op::ConcatList { .. } => one(Type::String),
            Op::Print { .. } => one(Type::Long),
            Op::Exit { .. } => one(Type::Null),
            Op::Eval { .. } | Op::Include { .. } | Op::Yield { .. } => None,
            Op::Iterator { kind, var } => self.iterator(*kind, *var),
            Op::Array { values, .. } => self.array_literal(values),
            Op::ArrayDimFetch { var, .. } => self.array_dim_fetch(*var),
            Op::Assign { expr, .. } | Op::AssignRef { expr, .. } | Op::Clone { expr } => {
                self.known(*expr).cloned().and_then(one)
            }
            Op::Closure { .. } => one(Type::named("Closure")),
            Op::FuncCall { name, .. } => self.function_call(*name)?,
            Op::New { class, .. } => one(self.class_type(*class)?.unwrap_or_else(Type::object)),
            Op::Param {
                name,
                declared_type,
                default,
                function,
            } => one(self.param(name, declared_type.as_deref(), *default, *function)?),
            Op::StaticCall { class, name, .. } => self.method_call(*class, *name, true)?,
            Op::MethodCall { var, name, .. } => self.method_call(*var, *name, false)?,
            Op::PropertyFetch { var, name } => self.property_fetch(*var, *name)?,
            Op::StaticPropertyFetch { class, name } => self.property_fetch(*class, *name)?,
            Op::Assertion { expr, assertion } => self.assertion(*expr, assertion)?.and_then(one),
            Op::ConstFetch { name } => self.const_fetch(*name)?,
            Op::ClassConstFetch { class, name } => self.class_const_fetch(*class, *name)?,
            Op::Phi { vars } => self.phi(var, vars),
        };
        Ok(candidates)
    }

    fn binary(
        &self,
        op_id: OpId,
        op: BinaryOp,
        left: OperandId,
        right: OperandId,
    ) -> Result<Option<Candidates>> {
        let ty = match op {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Identical
            | BinaryOp::NotIdentical
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEqual
            | BinaryOp::Smaller
            | BinaryOp::SmallerOrEqual
            | BinaryOp::LogicalAnd
            | BinaryOp::LogicalOr
            | BinaryOp::LogicalXor => Type::Boolean,
            BinaryOp::Concat => Type::String,
            BinaryOp::Mod | BinaryOp::ShiftLeft | BinaryOp::ShiftRight => Type::Long,
            BinaryOp::BitwiseAnd | BinaryOp::BitwiseOr | BinaryOp::BitwiseXor => {
                let (Some(l), Some(r)) = (self.known(left), self.known(right)) else {
                    return Ok(None);
                };
                match (l, r) {
                    (Type::String, Type::String) => Type::String,
                    _ => Type::Long,
                }
            }
            BinaryOp::Div | BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Mul => {
                let (Some(l), Some(r)) = (self.known(left), self.known(right)) else {
                    return Ok(None);
                };
                arithmetic(l, r)
            }
            BinaryOp::Pow | BinaryOp::Coalesce | BinaryOp::Spaceship => {
                return Err(ReconstructError::UnmodeledOperation {
                    op: op_id,
                    kind: self.op_kind(op_id),
                });
            }
        };
        Ok(one(ty))
    }

    fn unary(&self, op: UnaryOp, expr: OperandId) -> Option<Candidates> {
        if op == UnaryOp::BooleanNot {
            return one(Type::Boolean);
        }
        let ty = self.known(expr)?;
        let result = match (op, ty) {
            (UnaryOp::BitwiseNot, Type::String) => Type::String,
            (UnaryOp::BitwiseNot, _) => Type::Long,
            (_, Type::Long | Type::Double) => ty.clone(),
            _ => Type::numeric(),
        };
        one(result)
    }

    fn cast(&self, kind: CastKind, expr: OperandId) -> Option<Candidates> {
        let ty = match kind {
            CastKind::Bool => Type::Boolean,
            CastKind::Int => Type::Long,
            CastKind::Double => Type::Double,
            CastKind::String => Type::String,
            CastKind::Array => {
                self.known(expr)?;
                Type::array()
            }
            CastKind::Object => {
                let ty = self.known(expr)?;
                if ty.is_subset_of(&Type::object()) {
                    ty.clone()
                } else {
                    Type::named("stdClass")
                }
            }
        };
        one(ty)
    }

    fn iterator(&self, kind: IteratorOp, var: OperandId) -> Option<Candidates> {
        match kind {
            IteratorOp::Reset => one(Type::Null),
            IteratorOp::Valid => one(Type::Boolean),
            IteratorOp::Value => one(self.known(var)?.element_type()?.clone()),
            IteratorOp::Key => None,
        }
    }

    fn array_literal(&self, values: &[OperandId]) -> Option<Candidates> {
        let types = values
            .iter()
            .map(|value| self.known(*value).cloned())
            .collect::<Option<Vec<_>>>()?;
        match merge_types(&types) {
            Some(element) => one(Type::array_of(element)),
            None => one(Type::array()),
        }
    }

    fn array_dim_fetch(&self, base: OperandId) -> Option<Candidates> {
        let ty = self.known(base)?;
        if let Some(element) = ty.element_type() {
            return one(element.clone());
        }
        match ty {
            Type::String => one(Type::String),
            _ => one(Type::mixed()),
        }
    }

    /// Declared parameter type, widened with null for a `null` default.
    fn param(
        &self,
        name: &str,
        declared_type: Option<&str>,
        default: Option<OperandId>,
        function: Option<FunctionId>,
    ) -> Result<Type> {
        let ty = match (declared_type, function) {
            (Some(decl), _) => Type::from_decl(decl)?,
            (None, Some(function)) => {
                let comment = self.script.function(function).doc_comment.as_deref();
                self.doc_type(DocTag::Param(name.trim_start_matches('$')), comment)?
            }
            (None, None) => Type::mixed(),
        };
        match default {
            Some(default) if self.is_null_constant(default) => {
                Ok(Type::Union(vec![ty, Type::Null]).simplify())
            }
            _ => Ok(ty),
        }
    }

    fn is_null_constant(&self, operand: OperandId) -> bool {
        let Some(&first) = self.script.operand(operand).ops.first() else {
            return false;
        };
        match self.script.op(first) {
            Op::ConstFetch { name } => self
                .script
                .operand(*name)
                .as_literal()
                .and_then(Literal::as_str)
                .is_some_and(|name| name.eq_ignore_ascii_case("null")),
            _ => false,
        }
    }

    /// Class named by a literal, a typed receiver, or an object-typed operand.
    pub(super) fn class_type(&self, operand: OperandId) -> Result<Option<Type>> {
        match &self.script.operand(operand).kind {
            OperandKind::Literal(Literal::String(name)) => return Ok(Some(Type::named(name.as_str()))),
            OperandKind::Literal(other) => {
                return Err(ReconstructError::NonStringLiteral {
                    role: "class name",
                    kind: other.kind_name(),
                });
            }
            OperandKind::Bound {
                scope: BoundScope::Object,
                owner: Some(owner),
                ..
            } => return Ok(Some(Type::from_decl(owner)?)),
            _ => {}
        }
        match self.known(operand) {
            Some(ty @ Type::Object(_)) => Ok(Some(ty.clone())),
            _ => Ok(None),
        }
    }

    /// Merge whatever incoming values are known, publishing a partial merge early.
    fn phi(&mut self, var: OperandId, vars: &[OperandId]) -> Option<Candidates> {
        let mut types = Vec::with_capacity(vars.len());
        let mut complete = true;
        for incoming in vars {
            match self.known(*incoming) {
                Some(ty) => types.push(ty.clone()),
                None => complete = false,
            }
        }
        let merged = merge_types(&types)?;
        if complete {
            return one(merged);
        }
        trace!(var = var.index(), ty = %merged, "Speculative phi merge");
        self.resolved.insert(var, merged);
        None
    }
}

fn arithmetic(left: &Type, right: &Type) -> Type {
    match (left, right) {
        (Type::Long, Type::Long) => Type::Long,
        (Type::Double, Type::Long | Type::Double) | (Type::Long, Type::Double) => Type::Double,
        (Type::Array(_), Type::Array(_)) => {
            let elements: Vec<Type> = left
                .element_type()
                .into_iter()
                .chain(right.element_type())
                .cloned()
                .collect();
            match merge_types(&elements) {
                Some(element) => Type::array_of(element),
                None => Type::array(),
            }
        }
        _ => Type::mixed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_numeric() {
        assert_eq!(arithmetic(&Type::Long, &Type::Long), Type::Long);
        assert_eq!(arithmetic(&Type::Long, &Type::Double), Type::Double);
        assert_eq!(arithmetic(&Type::Double, &Type::Long), Type::Double);
        assert_eq!(arithmetic(&Type::Double, &Type::Double), Type::Double);
        assert_eq!(arithmetic(&Type::String, &Type::Long), Type::mixed());
    }

    #[test]
    fn test_arithmetic_arrays_merge_elements() {
        let merged = arithmetic(&Type::array_of(Type::Long), &Type::array_of(Type::String));
        assert_eq!(
            merged.element_type(),
            Some(&Type::Union(vec![Type::Long, Type::String]))
        );

        let same = arithmetic(&Type::array_of(Type::Long), &Type::array_of(Type::Long));
        assert_eq!(same.element_type(), Some(&Type::Long));

        let bare = arithmetic(&Type::array(), &Type::array());
        assert_eq!(bare.element_type(), None);
    }

    #[test]
    fn test_arithmetic_array_with_unknown_element() {
        let ty = arithmetic(&Type::array_of(Type::Unknown), &Type::array_of(Type::Long));
        assert_eq!(ty.element_type(), None);
    }
}
