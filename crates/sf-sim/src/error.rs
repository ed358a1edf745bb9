//! Error types for simulation runs.

use sf_core::SfError;
use sf_stack::StackError;
use thiserror::Error;

/// Errors that end a simulation run.
///
/// Non-convergence and voltage collapse are not errors; they are reported
/// through [`CaseStatus`](crate::CaseStatus).
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid target current density {value} A/m² at position {index}")]
    InvalidTarget { index: usize, value: f64 },

    #[error("Stack error: {0}")]
    Stack(#[from] StackError),

    #[error("Core error: {0}")]
    Core(#[from] SfError),
}

pub type SimResult<T> = Result<T, SimError>;
