//! Lowering errors -- the boundary between "inference let this through"
//! and "codegen cannot proceed" (spec.md §4.H, §7's `E9xx` fatal class).
//!
//! Every variant here corresponds to an invariant inference is supposed to
//! have already enforced; reaching one means a bug upstream, not a user
//! mistake, so these are never rendered to a user as a normal diagnostic --
//! `jsac` reports them as an internal error.

use inkwell::builder::BuilderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("no native target available: {0}")]
    NoTarget(String),

    #[error("could not create target machine for {0}")]
    NoTargetMachine(String),

    #[error("function `{0}` has no registered prototype at lowering")]
    MissingFunction(String),

    #[error("struct `{0}` has no registered LLVM type at lowering")]
    MissingStruct(String),

    #[error("`break`/`continue` outside of a loop reached lowering")]
    LoopStackEmpty,

    #[error("builder error: {0}")]
    Builder(#[from] BuilderError),

    #[error("failed to emit object file: {0}")]
    EmitObject(String),

    #[error("LLVM module verification failed:\n{0}")]
    Verification(String),
}
