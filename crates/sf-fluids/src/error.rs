//! Fluid property errors.

use sf_core::SfError;
use thiserror::Error;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors that can occur during fluid property calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-physical values (negative density, pressure, etc.).
    #[error("Non-physical value for {what}: {value}")]
    NonPhysical { what: &'static str, value: f64 },

    /// Value outside the fitted range of a correlation.
    #[error("Value out of range for {what}: {value}")]
    OutOfRange { what: &'static str, value: f64 },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

impl From<FluidError> for SfError {
    fn from(err: FluidError) -> Self {
        match err {
            FluidError::NonPhysical { what, value } | FluidError::OutOfRange { what, value } => {
                SfError::NonFinite { what, value }
            }
            FluidError::InvalidArg { what } => SfError::InvalidArg { what },
        }
    }
}

/// Reject non-finite and non-positive inputs.
pub(crate) fn check_positive(value: f64, what: &'static str) -> FluidResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FluidError::NonPhysical { what, value })
    }
}
