//! Per-run analysis context built from a [`Script`]

use crate::builtins::BuiltinSignatures;
use crate::hierarchy::ClassHierarchyIndex;
use crate::ir::{FunctionId, Op, OpId, OperandId, Script};
use indexmap::IndexMap;

/// Lookup tables shared by every inference rule of one run.
///
/// Exposed after a run so later passes can reuse the hierarchy and the
/// function lookup without rebuilding them.
#[derive(Debug, Clone)]
pub struct State {
    hierarchy: ClassHierarchyIndex,
    builtins: BuiltinSignatures,
    /// Lowercased function name to every free function declared with it
    functions: IndexMap<String, Vec<FunctionId>>,
    /// Global names as written; class constants keyed `class::NAME`
    constants: IndexMap<String, Vec<OperandId>>,
    new_calls: Vec<OpId>,
    method_calls: Vec<OpId>,
}

impl State {
    pub fn new(script: &Script, builtins: BuiltinSignatures) -> Self {
        let hierarchy = ClassHierarchyIndex::build(&script.classes);

        let mut functions: IndexMap<String, Vec<FunctionId>> = IndexMap::new();
        for (i, func) in script.functions.iter().enumerate() {
            if func.class.is_none() {
                functions
                    .entry(func.name.to_ascii_lowercase())
                    .or_default()
                    .push(FunctionId(i));
            }
        }

        let mut constants: IndexMap<String, Vec<OperandId>> = IndexMap::new();
        for constant in &script.constants {
            let key = match constant.class {
                Some(class) => class_constant_key(&script.class(class).name, &constant.name),
                None => constant.name.clone(),
            };
            constants.entry(key).or_default().push(constant.value);
        }

        let mut new_calls = Vec::new();
        let mut method_calls = Vec::new();
        for (i, op) in script.ops.iter().enumerate() {
            match op {
                Op::New { .. } => new_calls.push(OpId(i)),
                Op::MethodCall { .. } => method_calls.push(OpId(i)),
                _ => {}
            }
        }

        Self {
            hierarchy,
            builtins,
            functions,
            constants,
            new_calls,
            method_calls,
        }
    }

    pub fn hierarchy(&self) -> &ClassHierarchyIndex {
        &self.hierarchy
    }

    pub fn builtins(&self) -> &BuiltinSignatures {
        &self.builtins
    }

    /// Free functions declared under `name`, compared case-insensitively.
    pub fn functions(&self, name: &str) -> Option<&[FunctionId]> {
        self.functions
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn function_lookup(&self) -> &IndexMap<String, Vec<FunctionId>> {
        &self.functions
    }

    /// Value operands bound to a constant key.
    pub fn constant(&self, key: &str) -> Option<&[OperandId]> {
        self.constants.get(key).map(Vec::as_slice)
    }

    /// Every `new` expression in the script.
    pub fn new_calls(&self) -> &[OpId] {
        &self.new_calls
    }

    /// Every instance method call in the script.
    pub fn method_calls(&self) -> &[OpId] {
        &self.method_calls
    }
}

/// Lookup key of a class constant.
pub fn class_constant_key(class: &str, name: &str) -> String {
    format!("{}::{}", class.to_ascii_lowercase(), name)
}
