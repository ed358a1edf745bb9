//! Stack-level coupling for stackflow.
//!
//! A [`Stack`] holds `N` cells in series and advances their shared state one
//! outer iteration at a time:
//!
//! 1. every cell re-evaluates its electrochemistry for the present current
//!    and temperature fields (in parallel, cells are independent here);
//! 2. the [`thermal`] resistor network is solved and written back;
//! 3. the [`flow`] distribution over the inlet and outlet headers updates
//!    per-cell stoichiometry and outlet pressure;
//! 4. the [`electrical`] network moves the current density towards equal
//!    voltage along each cell while keeping each cell's total current fixed.
//!
//! Convergence control lives in `sf-sim`; this crate only does one pass per
//! call to [`Stack::update`].

pub mod config;
pub mod electrical;
pub mod error;
pub mod flow;
pub mod stack;
pub mod thermal;

pub use config::{
    CellDef, ChannelDef, ConductivityDef, CoolantDef, ElectrodeDef, HalfCellDef, HeaderShape,
    LossModelDef, ManifoldDef, ManifoldKind, MembraneDef, StackConfig, StackDef,
    TemperatureSystemDef,
};
pub use electrical::{ElectricalNetwork, ElectricalStep, correct_current};
pub use error::{ConfigError, StackError, StackResult};
pub use flow::{
    FanningCorrelation, FlowDistribution, FrictionModel, HeaderFluid, ManifoldInput, distribute,
    header_pressures,
};
pub use stack::{IterationDiagnostics, Stack};
pub use thermal::{CoolantCircuit, Surroundings, ThermalSolution, march_fluid, solve_thermal};
