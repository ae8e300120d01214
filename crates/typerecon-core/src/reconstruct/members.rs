//! Call, member and constant resolution
//!
//! Lookups across inheritance iterate the precomputed ancestor set of the
//! owning class in its stored order; there is no recursive walk.

use super::{Candidates, Resolver};
use crate::error::{ReconstructError, Result};
use crate::ir::{ClassId, FunctionDecl, FunctionId, Literal, OperandId};
use crate::lattice::{DocTag, Type};
use crate::state::class_constant_key;
use smallvec::smallvec;
use tracing::debug;

fn non_empty(candidates: Candidates) -> Option<Candidates> {
    (!candidates.is_empty()).then_some(candidates)
}

impl<'a> Resolver<'a> {
    /// String value of a literal operand; `None` for non-literals.
    fn literal_name(&self, operand: OperandId, role: &'static str) -> Result<Option<&'a str>> {
        match self.script.operand(operand).as_literal() {
            None => Ok(None),
            Some(Literal::String(name)) => Ok(Some(name)),
            Some(other) => Err(ReconstructError::NonStringLiteral {
                role,
                kind: other.kind_name(),
            }),
        }
    }

    /// Types of every value operand, if all are resolved.
    fn all_known(&self, values: &[OperandId]) -> Option<Candidates> {
        values.iter().map(|value| self.known(*value).cloned()).collect()
    }

    pub(super) fn function_call(&self, name: OperandId) -> Result<Option<Candidates>> {
        let Some(name) = self.literal_name(name, "function name")? else {
            return Ok(None);
        };
        if let Some(functions) = self.state.functions(name) {
            let mut candidates = Candidates::new();
            for &function in functions {
                candidates.push(self.function_return(self.script.function(function))?);
            }
            return Ok(Some(candidates));
        }
        match self.state.builtins().function_return(name.trim_start_matches('\\')) {
            Some(decl) => Ok(Some(smallvec![Type::from_decl(decl)?])),
            None => Ok(None),
        }
    }

    /// Declared return type, else the `@return` tag.
    fn function_return(&self, function: &FunctionDecl) -> Result<Type> {
        match &function.return_type {
            Some(decl) => Ok(Type::from_decl(decl)?),
            None => self.doc_type(DocTag::Return, function.doc_comment.as_deref()),
        }
    }

    /// Return type of a method. The `@return` tag wins only when it narrows
    /// the declared type.
    fn method_return(&self, method: &FunctionDecl) -> Result<Type> {
        let doc = self.doc_type(DocTag::Return, method.doc_comment.as_deref())?;
        let declared = match &method.return_type {
            Some(decl) => Type::from_decl(decl)?,
            None => Type::mixed(),
        };
        if doc.is_strict_subset_of(&declared) {
            Ok(doc)
        } else {
            Ok(declared)
        }
    }

    /// Method named `name` declared on `class`, else its catch-all handler.
    fn find_method(&self, class: ClassId, name: &str, fallback: &str) -> Option<FunctionId> {
        let methods = &self.script.class(class).methods;
        let lookup = |wanted: &str| {
            methods
                .iter()
                .copied()
                .find(|id| self.script.function(*id).name.eq_ignore_ascii_case(wanted))
        };
        lookup(name).or_else(|| lookup(fallback))
    }

    pub(super) fn method_call(
        &self,
        receiver: OperandId,
        name: OperandId,
        is_static: bool,
    ) -> Result<Option<Candidates>> {
        let Some(method) = self.literal_name(name, "method name")? else {
            return Ok(None);
        };
        let Some(receiver_ty) = self.known(receiver) else {
            return Ok(None);
        };
        let class_name = match receiver_ty {
            Type::String => match self.literal_name(receiver, "class name")? {
                Some(class_name) => class_name,
                None => return Ok(Some(smallvec![Type::mixed()])),
            },
            Type::Object(Some(class_name)) => class_name.as_str(),
            _ => return Ok(None),
        };

        let Some(ancestors) = self.state.hierarchy().resolves(class_name) else {
            let mut candidates = Candidates::new();
            for decl in self.state.builtins().method_returns(class_name, method) {
                candidates.push(Type::from_decl(decl)?);
            }
            return Ok(non_empty(candidates));
        };

        let fallback = if is_static { "__callStatic" } else { "__call" };
        let mut candidates = Candidates::new();
        for class in ancestors.values().flatten() {
            if let Some(found) = self.find_method(*class, method, fallback) {
                candidates.push(self.method_return(self.script.function(found))?);
            }
        }
        Ok(non_empty(candidates))
    }

    pub(super) fn property_fetch(
        &self,
        owner: OperandId,
        name: OperandId,
    ) -> Result<Option<Candidates>> {
        let Some(property) = self.literal_name(name, "property name")? else {
            return Ok(Some(smallvec![Type::mixed()]));
        };
        let Some(owner_ty) = self.class_type(owner)? else {
            return Ok(None);
        };
        let Some(ancestors) = owner_ty
            .class_name()
            .and_then(|class_name| self.state.hierarchy().resolves(class_name))
        else {
            return Ok(None);
        };

        let mut candidates = Candidates::new();
        for class in ancestors.values().flatten() {
            let Some(declared) = self.script.property(*class, property) else {
                continue;
            };
            if declared.ty.is_unknown() {
                debug!(
                    class = %self.script.class(*class).name,
                    property,
                    "Property found to be untyped"
                );
                return Ok(None);
            }
            candidates.push(declared.ty.clone());
        }
        Ok(non_empty(candidates))
    }

    pub(super) fn const_fetch(&self, name: OperandId) -> Result<Option<Candidates>> {
        let Some(name) = self.literal_name(name, "constant name")? else {
            return Ok(None);
        };
        match name.to_ascii_lowercase().as_str() {
            "true" | "false" => return Ok(Some(smallvec![Type::Boolean])),
            "null" => return Ok(Some(smallvec![Type::Null])),
            _ => {}
        }
        if let Some(values) = self.state.constant(name) {
            return Ok(self.all_known(values));
        }
        match self.state.builtins().constant(name.trim_start_matches('\\')) {
            Some(decl) => Ok(Some(smallvec![Type::from_decl(decl)?])),
            None => Ok(None),
        }
    }

    pub(super) fn class_const_fetch(
        &self,
        class: OperandId,
        name: OperandId,
    ) -> Result<Option<Candidates>> {
        let Some(constant) = self.literal_name(name, "constant name")? else {
            return Ok(None);
        };
        let class_name = match self.literal_name(class, "class name")? {
            Some(class_name) => class_name,
            None => match self.known(class) {
                Some(Type::Object(Some(class_name))) => class_name.as_str(),
                _ => return Ok(None),
            },
        };

        if let Some(values) = self.state.constant(&class_constant_key(class_name, constant)) {
            return Ok(self.all_known(values));
        }
        let Some(ancestors) = self.state.hierarchy().resolves(class_name) else {
            return Ok(None);
        };
        let mut candidates = Candidates::new();
        for ancestor in ancestors.keys() {
            if let Some(values) = self.state.constant(&class_constant_key(ancestor, constant)) {
                match self.all_known(values) {
                    Some(types) => candidates.extend(types),
                    None => return Ok(None),
                }
            }
        }
        Ok(non_empty(candidates))
    }
}
