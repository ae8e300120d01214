//! Fixpoint type reconstruction
//!
//! The reconstructor seeds every operand with what is already known
//! (explicit types, literals, typed receivers) and then repeatedly retries
//! the unresolved ones. An operand resolves once every operation producing
//! it resolves; the candidate types are merged with [`merge_types`]. Phi
//! nodes may publish a partial merge early so loops can converge. Operands
//! still unresolved when a round makes no progress end up `Unknown`.

mod assertion;
mod members;
mod rules;

use crate::builtins::BuiltinSignatures;
use crate::config::ReconstructorConfig;
use crate::error::Result;
use crate::ir::{BoundScope, OpId, OperandId, OperandKind, Script};
use crate::lattice::{merge_types, DocTag, Type};
use crate::state::State;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Candidate types contributed by one producing operation.
pub(crate) type Candidates = SmallVec<[Type; 2]>;

/// Summary of one reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionReport {
    /// Worklist rounds executed
    pub rounds: usize,
    /// Operands holding a confirmed type at the end
    pub resolved: usize,
    /// Operands written back as `Unknown`
    pub unresolved: usize,
    /// Whether every operand resolved
    pub converged: bool,
}

/// Output of [`TypeReconstructor::resolve`].
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub state: State,
    pub report: ReconstructionReport,
}

/// Whole-program type reconstructor.
///
/// # Example
/// ```
/// use typerecon_core::{Script, Type, TypeReconstructor};
/// use typerecon_core::builtins::BuiltinSignatures;
///
/// let mut script = Script::new();
/// let one = script.literal(1);
/// let x = script.var("x");
/// script.assign(x, one, x);
///
/// TypeReconstructor::new(BuiltinSignatures::empty()).resolve(&mut script)?;
/// assert_eq!(script.type_of(x), &Type::Long);
/// # Ok::<(), typerecon_core::ReconstructError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeReconstructor {
    builtins: BuiltinSignatures,
    config: ReconstructorConfig,
}

impl TypeReconstructor {
    pub fn new(builtins: BuiltinSignatures) -> Self {
        Self {
            builtins,
            config: ReconstructorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconstructorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReconstructorConfig {
        &self.config
    }

    /// Infer a type for every operand and property of `script`, in place.
    pub fn resolve(&self, script: &mut Script) -> Result<Reconstruction> {
        self.seed_properties(script)?;
        let state = State::new(script, self.builtins.clone());

        let mut resolver = Resolver {
            script: &*script,
            state: &state,
            config: &self.config,
            resolved: IndexMap::new(),
        };
        let mut unresolved = resolver.seed()?;
        debug!(
            operands = script.operands.len(),
            unresolved = unresolved.len(),
            "Starting type reconstruction"
        );

        let limit = self.config.round_limit(script.operands.len());
        let mut rounds = 0;
        while !unresolved.is_empty() && rounds < limit {
            rounds += 1;
            let start = resolver.resolved.len();
            let pending: Vec<OperandId> = unresolved.iter().copied().collect();
            let mut confirmed = Vec::new();
            for var in pending {
                if let Some(ty) = resolver.resolve_var(var)? {
                    trace!(var = var.index(), ty = %ty, "Resolved operand");
                    resolver.resolved.insert(var, ty);
                    confirmed.push(var);
                }
            }
            for var in &confirmed {
                unresolved.shift_remove(var);
            }
            debug!(
                round = rounds,
                confirmed = confirmed.len(),
                remaining = unresolved.len(),
                "Finished round"
            );
            if confirmed.is_empty() && resolver.resolved.len() == start {
                break;
            }
        }

        let mut resolved = resolver.resolved;
        for (i, operand) in script.operands.iter_mut().enumerate() {
            let id = OperandId(i);
            operand.ty = if unresolved.contains(&id) {
                Type::Unknown
            } else {
                resolved.swap_remove(&id).unwrap_or(Type::Unknown)
            };
        }

        let report = ReconstructionReport {
            rounds,
            resolved: script.operands.len() - unresolved.len(),
            unresolved: unresolved.len(),
            converged: unresolved.is_empty(),
        };
        debug!(
            rounds = report.rounds,
            resolved = report.resolved,
            unresolved = report.unresolved,
            "Type reconstruction finished"
        );
        Ok(Reconstruction { state, report })
    }

    /// Give every declared property its type: `@var` tag, declared type, or mixed.
    fn seed_properties(&self, script: &mut Script) -> Result<()> {
        for class in &mut script.classes {
            for property in &mut class.properties {
                let tagged = if self.config.use_doc_comments {
                    crate::lattice::comment::extract(DocTag::Var, property.doc_comment.as_deref())
                } else {
                    None
                };
                property.ty = match tagged.or(property.declared_type.as_deref()) {
                    Some(decl) => Type::from_decl(decl)?,
                    None => Type::mixed(),
                };
            }
        }
        Ok(())
    }
}

/// Mutable context of one run.
pub(crate) struct Resolver<'a> {
    script: &'a Script,
    state: &'a State,
    config: &'a ReconstructorConfig,
    /// Confirmed types plus speculative phi merges
    resolved: IndexMap<OperandId, Type>,
}

impl<'a> Resolver<'a> {
    /// Seed known operands and return the ones left to resolve.
    fn seed(&mut self) -> Result<IndexSet<OperandId>> {
        let mut unresolved = IndexSet::new();
        for (i, operand) in self.script.operands.iter().enumerate() {
            let id = OperandId(i);
            let ty = if !operand.ty.is_unknown() {
                operand.ty.clone()
            } else {
                match &operand.kind {
                    OperandKind::Bound {
                        scope: BoundScope::Object,
                        owner: Some(owner),
                        ..
                    } => Type::from_decl(owner)?,
                    OperandKind::Literal(value) => Type::from_value(value)?,
                    _ => {
                        unresolved.insert(id);
                        continue;
                    }
                }
            };
            self.resolved.insert(id, ty);
        }
        Ok(unresolved)
    }

    fn resolve_var(&mut self, var: OperandId) -> Result<Option<Type>> {
        let script = self.script;
        let mut types = Vec::new();
        for &op in &script.operand(var).ops {
            match self.resolve_op(var, op)? {
                Some(candidates) => types.extend(candidates),
                None => return Ok(None),
            }
        }
        Ok(merge_types(&types))
    }

    fn known(&self, id: OperandId) -> Option<&Type> {
        self.resolved.get(&id)
    }

    /// Type named by a doc-comment tag, or mixed when tags are disabled.
    fn doc_type(&self, tag: DocTag<'_>, comment: Option<&str>) -> Result<Type> {
        if !self.config.use_doc_comments {
            return Ok(Type::mixed());
        }
        Ok(Type::from_comment(tag, comment)?)
    }

    fn op_kind(&self, op: OpId) -> &'static str {
        self.script.op(op).kind_name()
    }
}
