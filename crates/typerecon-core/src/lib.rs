//! # Typerecon Core
//!
//! Whole-program, best-effort type reconstruction over an SSA intermediate
//! representation of a dynamically-typed program.
//!
//! Every operand ends up with either a precise [`Type`] or
//! [`Type::Unknown`]; code that merely cannot be resolved is never an error.
//!
//! ## Modules
//!
//! - **[`lattice`]** - The type lattice: parsing, simplification, equality, subtraction
//! - **[`hierarchy`]** - Transitive ancestor and descendant sets of classes and interfaces
//! - **[`ir`]** - The arena-based IR the engine reads and annotates
//! - **[`builtins`]** - Signature table for standard-library functions and classes
//! - **[`reconstruct`]** - The fixpoint engine
//!
//! ## Quick Start
//!
//! ```rust
//! use typerecon_core::prelude::*;
//!
//! let mut script = Script::new();
//! let a = script.literal("a");
//! let b = script.literal("b");
//! let x = script.var("x");
//! script.emit(Op::Binary { op: BinaryOp::Concat, left: a, right: b }, x);
//!
//! let reconstructor = TypeReconstructor::new(BuiltinSignatures::standard()?);
//! let result = reconstructor.resolve(&mut script)?;
//! assert_eq!(script.type_of(x), &Type::String);
//! assert!(result.report.converged);
//! # Ok::<(), ReconstructError>(())
//! ```

pub mod builtins;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod ir;
pub mod lattice;
pub mod reconstruct;
pub mod state;

pub use builtins::BuiltinSignatures;
pub use config::ReconstructorConfig;
pub use error::{DeclarationError, ReconstructError, Result};
pub use hierarchy::{ClassHierarchyIndex, HierarchyIssue};
pub use ir::{Op, OperandId, Script};
pub use lattice::{merge_types, Type};
pub use reconstruct::{Reconstruction, ReconstructionReport, TypeReconstructor};
pub use state::State;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builtins::{BuiltinClass, BuiltinSignatures, FunctionSignature};
    pub use crate::config::ReconstructorConfig;
    pub use crate::error::{DeclarationError, ReconstructError};
    pub use crate::hierarchy::{ClassHierarchyIndex, HierarchyIssue};
    pub use crate::ir::{
        Assertion, AssertionMode, BinaryOp, BoundScope, CastKind, ClassDecl, FunctionDecl,
        IteratorOp, Literal, Op, OpId, OperandId, PropertyDecl, Script, TypeAssertion, UnaryOp,
    };
    pub use crate::lattice::{merge_types, DocTag, Type};
    pub use crate::reconstruct::{Reconstruction, ReconstructionReport, TypeReconstructor};
    pub use crate::state::State;
}
