//! Simulation driver for stackflow.
//!
//! Runs the stack's outer fixed-point loop for each requested target current
//! density until the current and temperature fields settle, and collects the
//! converged fields into a [`SimulationReport`].

pub mod error;
pub mod results;
pub mod settings;
pub mod simulation;

pub use error::{SimError, SimResult};
pub use results::{
    CaseResult, CaseStatus, CellSnapshot, LossAverages, LossBreakdown, PolarizationPoint,
    SimulationReport,
};
pub use settings::SimulationSettings;
pub use sf_cell::Electrode;
pub use simulation::{SimProgress, Simulation};
