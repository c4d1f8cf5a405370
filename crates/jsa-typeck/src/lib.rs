//! Type representation, trait dispatch, const evaluation, symbol
//! resolution, monomorphizing inference, and the specialization store for
//! the `jsa` compiler (spec.md §3-§4, components A, B, C, D, F, G).

pub mod consteval;
pub mod error;
pub mod infer;
pub mod specialize;
pub mod symbols;
pub mod traits;
pub mod ty;

pub use consteval::{ConstLookup, ConstRef, CycleGuard, EvalResult, Evaluator, MAX_EVAL_DEPTH};
pub use infer::{infer_program, register_imported_function, ImportedExport, InferenceOutcome};
pub use specialize::FunctionSpecialization;
pub use symbols::{DeclRef, SymbolEntry, SymbolKind, SymbolTable, MAX_SCOPE_DEPTH};
pub use traits::{promote, BinaryMethod, IndexSubstitution, MethodImpl, Trait, TraitImpl, TraitRegistry};
pub use ty::{TypeContext, TypeId, TypeInfo};
