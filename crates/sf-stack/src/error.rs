//! Error types for stack construction and the coupled solves.

use sf_cell::CellError;
use sf_core::SfError;
use sf_fluids::FluidError;
use thiserror::Error;

/// Problems found while validating a [`StackConfig`](crate::StackConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: f64,
        reason: String,
    },

    #[error("Flow direction of {field} must be +1 or -1, got {value}")]
    FlowDirection { field: String, value: i8 },

    /// Channels take more footprint than the cell offers.
    #[error(
        "Negative rib width on the {electrode}: channels cover {channel_area} m² of a {cell_area} m² cell"
    )]
    NegativeRibWidth {
        electrode: String,
        channel_area: f64,
        cell_area: f64,
    },

    #[error(
        "Inlet humidity on the {electrode} needs {vapour_pressure} Pa vapour at {inlet_pressure} Pa"
    )]
    InletHumidity {
        electrode: String,
        vapour_pressure: f64,
        inlet_pressure: f64,
    },

    #[error("Thermal network has no heat sink (no ambient convection and no coolant)")]
    Ungrounded,

    /// Coolant is configured but a single cell without end-plate cooling has
    /// no coolant channel to carry it.
    #[error("Coolant flow is set but a single cell has no coolant channel without end-plate cooling")]
    UncooledCoolant,

    #[error("Missing required parameter: {0}")]
    Missing(String),
}

/// Errors raised by [`Stack`](crate::Stack) construction and updates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cell {cell}: {source}")]
    Cell {
        cell: usize,
        #[source]
        source: CellError,
    },

    /// LU factorisation of a network matrix failed.
    #[error("Singular {system} system at {target_current_density} A/m²")]
    SingularSystem {
        system: &'static str,
        target_current_density: f64,
    },

    #[error("Non-positive {circuit} flow {flow} kg/s into cell {cell}")]
    FlowMaldistribution {
        circuit: &'static str,
        cell: usize,
        flow: f64,
    },

    /// The electrical update left a current density below zero.
    #[error("Negative current density {value} A/m² in cell {cell} at element {element}")]
    NegativeCurrent {
        cell: usize,
        element: usize,
        value: f64,
    },

    #[error("Non-physical value: {what} = {value}")]
    NonPhysical { what: &'static str, value: f64 },

    #[error("Fluid property error: {0}")]
    Fluid(#[from] FluidError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] SfError),
}

pub type StackResult<T> = Result<T, StackError>;

impl StackError {
    pub(crate) fn cell(cell: usize) -> impl FnOnce(CellError) -> StackError {
        move |source| StackError::Cell { cell, source }
    }

    /// True for errors that invalidate the current operating point but leave
    /// the stack usable for lower loads.
    pub fn is_domain_violation(&self) -> bool {
        match self {
            StackError::Cell { source, .. } => source.is_domain_violation(),
            StackError::FlowMaldistribution { .. } | StackError::NegativeCurrent { .. } => true,
            StackError::Fluid(FluidError::OutOfRange { .. }) => true,
            _ => false,
        }
    }
}
