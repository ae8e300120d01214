//! Type guard narrowing

use super::Resolver;
use crate::error::{ReconstructError, Result};
use crate::ir::{Assertion, AssertionMode, Literal, OperandId, TypeAssertion};
use crate::lattice::Type;

impl<'a> Resolver<'a> {
    /// Type of `expr` along a branch guarded by `assertion`.
    pub(super) fn assertion(&self, expr: OperandId, assertion: &Assertion) -> Result<Option<Type>> {
        match assertion {
            Assertion::Type(asserted) => self.type_assertion(asserted),
            Assertion::Negated(inner) => {
                let Some(excluded) = self.assertion(expr, inner)? else {
                    return Ok(None);
                };
                // The source may still be pending; narrow mixed instead of waiting.
                let source = self.known(expr).cloned().unwrap_or_else(Type::mixed);
                Ok(Some(source.remove_type(&excluded)?))
            }
        }
    }

    fn type_assertion(&self, asserted: &TypeAssertion) -> Result<Option<Type>> {
        match asserted {
            TypeAssertion::Operand(operand) => match self.script.operand(*operand).as_literal() {
                Some(Literal::String(decl)) => Ok(Some(Type::from_decl(decl)?)),
                Some(other) => Err(ReconstructError::NonStringLiteral {
                    role: "asserted type",
                    kind: other.kind_name(),
                }),
                None => Ok(self.known(*operand).cloned()),
            },
            TypeAssertion::Composite { mode, members } => {
                let mut types = Vec::with_capacity(members.len());
                for member in members {
                    match self.type_assertion(member)? {
                        Some(ty) => types.push(ty),
                        None => return Ok(None),
                    }
                }
                Ok(Some(match mode {
                    AssertionMode::Union => Type::Union(types),
                    AssertionMode::Intersection => Type::Intersection(types),
                }))
            }
        }
    }
}
