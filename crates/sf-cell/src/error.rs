//! Error types for cell and half-cell updates.

use sf_core::SfError;
use sf_fluids::FluidError;
use thiserror::Error;

/// Errors raised while updating a cell or one of its half-cells.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellError {
    /// Local current density reached the gas-diffusion-layer limiting current.
    #[error("Limiting current exceeded in {electrode} at element {element} (var = {var})")]
    LimitingCurrentExceeded {
        electrode: &'static str,
        element: usize,
        var: f64,
    },

    /// Local cell voltage dropped to or below zero.
    #[error("Voltage collapse in cell {cell} at element {element}: {voltage} V")]
    VoltageCollapse {
        cell: usize,
        element: usize,
        voltage: f64,
    },

    /// Activation-loss argument left the representable range.
    #[error("Activation loss out of domain in {electrode} at element {element}")]
    ActivationDomain {
        electrode: &'static str,
        element: usize,
    },

    #[error("Negative current density at element {element}: {value}")]
    NegativeCurrentDensity { element: usize, value: f64 },

    /// Membrane area-specific resistance fell to zero or below.
    #[error("Non-positive membrane resistance at element {element}: {value}")]
    MembraneResistance { element: usize, value: f64 },

    #[error("Non-physical value: {what} = {value}")]
    NonPhysical { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Fluid property error: {0}")]
    Fluid(#[from] FluidError),
}

pub type CellResult<T> = Result<T, CellError>;

impl CellError {
    /// True for errors that invalidate the current operating point only.
    pub fn is_domain_violation(&self) -> bool {
        matches!(
            self,
            CellError::LimitingCurrentExceeded { .. }
                | CellError::VoltageCollapse { .. }
                | CellError::ActivationDomain { .. }
                | CellError::NegativeCurrentDensity { .. }
                | CellError::MembraneResistance { .. }
                | CellError::Fluid(FluidError::OutOfRange { .. })
        )
    }
}

impl From<SfError> for CellError {
    fn from(e: SfError) -> Self {
        match e {
            SfError::NonFinite { what, value } => CellError::NonPhysical { what, value },
            SfError::InvalidArg { what }
            | SfError::LengthMismatch { what, .. } => CellError::InvalidArg { what },
        }
    }
}
