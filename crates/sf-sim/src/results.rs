//! Result bundle of a simulation run.
//!
//! Everything here is plain data built from a [`Stack`] after a case ends,
//! so that writers and plotters never touch solver state.

use serde::Serialize;
use sf_cell::{Cell, Electrode, ElectrodeLosses, Layer};
use sf_core::units::{ElectricPotential, MassRate, Pressure, Temperature, k, kgps, pa, volts};
use sf_stack::{FlowDistribution, Stack};

/// How an operating point ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CaseStatus {
    Converged,
    /// Iteration cap reached; fields hold the last iterate.
    NotConverged,
    /// A domain violation stopped the case.
    Collapsed,
}

/// Per-element voltage losses of one cell [V].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LossBreakdown {
    pub cathode_activation: Vec<f64>,
    pub cathode_cl_diffusion: Vec<f64>,
    pub cathode_gdl_diffusion: Vec<f64>,
    pub anode_activation: Vec<f64>,
    pub anode_cl_diffusion: Vec<f64>,
    pub anode_gdl_diffusion: Vec<f64>,
    pub membrane: Vec<f64>,
}

impl LossBreakdown {
    fn from_cell(cell: &Cell) -> Self {
        let ElectrodeLosses {
            activation: cathode_activation,
            cl_diffusion: cathode_cl_diffusion,
            gdl_diffusion: cathode_gdl_diffusion,
        } = cell.cathode.losses().clone();
        let ElectrodeLosses {
            activation: anode_activation,
            cl_diffusion: anode_cl_diffusion,
            gdl_diffusion: anode_gdl_diffusion,
        } = cell.anode.losses().clone();
        Self {
            cathode_activation,
            cathode_cl_diffusion,
            cathode_gdl_diffusion,
            anode_activation,
            anode_cl_diffusion,
            anode_gdl_diffusion,
            membrane: cell.membrane.loss().to_vec(),
        }
    }
}

/// Stack-mean of each loss term [V].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LossAverages {
    pub cathode_activation: f64,
    pub cathode_cl_diffusion: f64,
    pub cathode_gdl_diffusion: f64,
    pub anode_activation: f64,
    pub anode_cl_diffusion: f64,
    pub anode_gdl_diffusion: f64,
    pub membrane: f64,
}

impl LossAverages {
    fn from_cells(cells: &[CellSnapshot]) -> Self {
        let mean = |pick: fn(&LossBreakdown) -> &Vec<f64>| {
            let (sum, count) = cells
                .iter()
                .map(|c| pick(&c.losses))
                .fold((0.0, 0usize), |(s, n), v| (s + v.iter().sum::<f64>(), n + v.len()));
            if count == 0 { 0.0 } else { sum / count as f64 }
        };
        Self {
            cathode_activation: mean(|l| &l.cathode_activation),
            cathode_cl_diffusion: mean(|l| &l.cathode_cl_diffusion),
            cathode_gdl_diffusion: mean(|l| &l.cathode_gdl_diffusion),
            anode_activation: mean(|l| &l.anode_activation),
            anode_cl_diffusion: mean(|l| &l.anode_cl_diffusion),
            anode_gdl_diffusion: mean(|l| &l.anode_gdl_diffusion),
            membrane: mean(|l| &l.membrane),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellSnapshot {
    pub index: usize,
    pub average_voltage: f64,
    /// Element voltages [V]
    pub voltage: Vec<f64>,
    /// Element current density [A/m²]
    pub current_density: Vec<f64>,
    pub losses: LossBreakdown,
    /// Node temperatures per layer, anode plate first [K]
    pub layer_temperature: Vec<Vec<f64>>,
    pub anode_gas_temperature: Vec<f64>,
    pub cathode_gas_temperature: Vec<f64>,
    pub anode_pressure: Vec<f64>,
    pub cathode_pressure: Vec<f64>,
    pub anode_stoichiometry: f64,
    pub cathode_stoichiometry: f64,
}

impl CellSnapshot {
    fn capture(cell: &Cell, current: &[f64]) -> Self {
        let layers = [
            Layer::AnodePlate,
            Layer::AnodeGde,
            Layer::Membrane,
            Layer::CathodeGde,
            Layer::CathodePlate,
        ];
        Self {
            index: cell.index(),
            average_voltage: cell.average_voltage(),
            voltage: cell.voltage().to_vec(),
            current_density: current.to_vec(),
            losses: LossBreakdown::from_cell(cell),
            layer_temperature: layers.iter().map(|l| cell.temperature(*l).to_vec()).collect(),
            anode_gas_temperature: cell.anode.temperature().to_vec(),
            cathode_gas_temperature: cell.cathode.temperature().to_vec(),
            anode_pressure: cell.anode.pressure().to_vec(),
            cathode_pressure: cell.cathode.pressure().to_vec(),
            anode_stoichiometry: cell.anode.stoichiometry(),
            cathode_stoichiometry: cell.cathode.stoichiometry(),
        }
    }
}

/// State of the stack at the end of one operating point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseResult {
    pub target_current_density: f64,
    pub status: CaseStatus,
    pub iterations: usize,
    pub current_error: f64,
    pub temperature_error: f64,
    pub average_cell_voltage: f64,
    pub stack_voltage: f64,
    pub cells: Vec<CellSnapshot>,
    /// `[channel][node]` [K]
    pub coolant_temperature: Vec<Vec<f64>>,
    pub cathode_flow: FlowDistribution,
    pub anode_flow: FlowDistribution,
    /// Split of the coolant over the channel rows
    pub coolant_flow: FlowDistribution,
    pub loss_averages: LossAverages,
}

impl CaseResult {
    pub(crate) fn capture(
        stack: &Stack,
        status: CaseStatus,
        iterations: usize,
        current_error: f64,
        temperature_error: f64,
    ) -> Self {
        let cells: Vec<CellSnapshot> = stack
            .cells()
            .iter()
            .zip(stack.current_density())
            .map(|(cell, i)| CellSnapshot::capture(cell, i))
            .collect();
        Self {
            target_current_density: stack.operating_point().target_current_density,
            status,
            iterations,
            current_error,
            temperature_error,
            average_cell_voltage: stack.average_cell_voltage(),
            stack_voltage: stack.stack_voltage(),
            coolant_temperature: stack.coolant_temperature().to_vec(),
            cathode_flow: stack.flow_distribution(Electrode::Cathode).clone(),
            anode_flow: stack.flow_distribution(Electrode::Anode).clone(),
            coolant_flow: stack.coolant_flow_distribution().clone(),
            loss_averages: LossAverages::from_cells(&cells),
            cells,
        }
    }

    pub fn average_voltage(&self) -> ElectricPotential {
        volts(self.average_cell_voltage)
    }

    /// Hottest node over all solid layers.
    pub fn peak_temperature(&self) -> Temperature {
        let t = self
            .cells
            .iter()
            .flat_map(|c| c.layer_temperature.iter().flatten())
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        k(t)
    }

    fn flow(&self, electrode: Electrode) -> &FlowDistribution {
        match electrode {
            Electrode::Anode => &self.anode_flow,
            Electrode::Cathode => &self.cathode_flow,
        }
    }

    /// Reactant flow entering the inlet header.
    pub fn header_flow(&self, electrode: Electrode) -> MassRate {
        kgps(self.flow(electrode).cell_flow.iter().sum())
    }

    /// Coolant flow entering the coolant inlet header.
    pub fn coolant_header_flow(&self) -> MassRate {
        kgps(self.coolant_flow.cell_flow.iter().sum())
    }

    /// Highest inlet-header pressure over lowest outlet-header pressure.
    pub fn header_pressure_drop(&self, electrode: Electrode) -> Pressure {
        let f = self.flow(electrode);
        let p_in = f.inlet_pressure.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let p_out = f.outlet_pressure.iter().copied().fold(f64::INFINITY, f64::min);
        pa(p_in - p_out)
    }
}

/// One point of the polarization curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PolarizationPoint {
    /// A/m²
    pub current_density: f64,
    /// Average cell voltage [V]
    pub voltage: f64,
    pub converged: bool,
}

/// Everything a run produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimulationReport {
    pub cases: Vec<CaseResult>,
    /// Targets skipped after a collapse
    pub abandoned: Vec<f64>,
}

impl SimulationReport {
    /// One point per case that completed its iterations, converged or not.
    pub fn polarization_curve(&self) -> Vec<PolarizationPoint> {
        self.cases
            .iter()
            .filter(|c| c.status != CaseStatus::Collapsed)
            .map(|c| PolarizationPoint {
                current_density: c.target_current_density,
                voltage: c.average_cell_voltage,
                converged: c.status == CaseStatus::Converged,
            })
            .collect()
    }

    pub fn all_converged(&self) -> bool {
        self.abandoned.is_empty() && self.cases.iter().all(|c| c.status == CaseStatus::Converged)
    }
}
