//! The stack: cells, their global state, and one pass of the coupled solves.

use crate::config::StackConfig;
use crate::electrical::{ElectricalNetwork, ElectricalStep, correct_current};
use crate::error::{StackError, StackResult};
use crate::flow::{
    FanningCorrelation, FlowDistribution, FrictionModel, HeaderFluid, ManifoldInput, distribute,
};
use crate::thermal::{CoolantCircuit, Surroundings, ThermalSolution, solve_thermal};
use rayon::prelude::*;
use sf_cell::{Cell, Electrode, HalfCell, LAYERS, Layer};
use sf_core::OperatingPoint;
use sf_core::grid::{inlet_node, outlet_node};
use sf_core::numeric::relative_error_norm;
use sf_fluids::channel_pressure_drop;

/// Convergence measures of one outer iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationDiagnostics {
    /// Relative L2 change of the current-density field
    pub current_error: f64,
    /// Relative L2 change of all layer temperatures
    pub temperature_error: f64,
    pub electrical: Option<ElectricalStep>,
    pub cathode_flow_passes: usize,
    pub anode_flow_passes: usize,
}

#[derive(Debug)]
pub struct Stack {
    config: StackConfig,
    operating_point: OperatingPoint,
    cells: Vec<Cell>,
    /// `[cell][element]` current density [A/m²]
    current: Vec<Vec<f64>>,
    electrical: ElectricalNetwork,
    coolant: CoolantCircuit,
    surroundings: Surroundings,
    cathode_friction: Box<dyn FrictionModel>,
    anode_friction: Box<dyn FrictionModel>,
    cathode_flow: FlowDistribution,
    anode_flow: FlowDistribution,
    coolant_flow: FlowDistribution,
}

fn half(cell: &Cell, electrode: Electrode) -> &HalfCell {
    match electrode {
        Electrode::Anode => &cell.anode,
        Electrode::Cathode => &cell.cathode,
    }
}

fn half_mut(cell: &mut Cell, electrode: Electrode) -> &mut HalfCell {
    match electrode {
        Electrode::Anode => &mut cell.anode,
        Electrode::Cathode => &mut cell.cathode,
    }
}

/// Coolant split over the channel rows. Coolant properties are constant,
/// so the split is fixed once the stack is built.
fn distribute_coolant(
    config: &StackConfig,
    coolant: &CoolantCircuit,
) -> StackResult<FlowDistribution> {
    let cool = &config.coolant;
    let manifold = &config.coolant_manifold;
    let rows = coolant.present_rows();
    let channels = coolant.channels();
    let p_out = manifold.outlet_pressure_pa;
    let row_flow = cool.mass_flow_kg_per_s * cool.channel_count as f64;
    let total_flow = row_flow * rows.len() as f64;
    if rows.is_empty() || row_flow <= 0.0 {
        return Ok(FlowDistribution::uniform(channels, 0.0, p_out));
    }
    if !(config.stack.calc_flow_distribution && manifold.calc_distribution) {
        return Ok(FlowDistribution::uniform(rows.len(), total_flow, p_out)
            .scatter(&rows, channels, p_out));
    }

    let props = &cool.properties;
    let reference_pressure_drop = channel_pressure_drop(
        &cool.channel_section(),
        cool.channel_length_m,
        cool.bends as f64 * cool.bend_loss_coefficient,
        cool.mass_flow_kg_per_s,
        props.density,
        props.viscosity,
    )?;
    let fluid = HeaderFluid {
        density: props.density,
        viscosity: props.viscosity,
    };
    let input = ManifoldInput {
        kind: manifold.kind,
        inlet_segment: manifold.inlet_header(),
        outlet_segment: manifold.outlet_header(),
        outlet_pressure: p_out,
        inlet_fluid: fluid,
        outlet_fluid: fluid,
        cell_flow: vec![row_flow; rows.len()],
        outlet_ratio: vec![1.0; rows.len()],
        reference_pressure_drop,
        reference_flow: row_flow,
        total_flow,
    };
    let s = &config.stack;
    let dist = distribute(
        &input,
        &FanningCorrelation,
        s.flow_tolerance,
        s.max_flow_passes,
        "coolant",
    )?;
    tracing::debug!(rows = rows.len(), passes = dist.passes, "coolant distributed");
    Ok(dist.scatter(&rows, channels, p_out))
}

impl Stack {
    pub fn new(config: StackConfig, operating_point: OperatingPoint) -> StackResult<Self> {
        config.validate()?;
        let n_cells = config.stack.cell_count;
        let elements = config.stack.elements;
        let params = config.cell_params();
        let t0 = config.temperature_system.initial_temperature_k;
        let cells = (0..n_cells)
            .map(|q| {
                Cell::new(q, params.clone(), elements, config.constants, t0)
                    .map_err(StackError::cell(q))
            })
            .collect::<StackResult<Vec<_>>>()?;

        let dx = config.cell.length_m / elements as f64;
        let plate_resistance = dx * dx
            / (config.cell.plate_electrical_conductivity_s_per_m * config.cell.plate_thickness_m);
        let target = operating_point.target_current_density;
        let outlet = |e: Electrode| config.manifold(e).outlet_pressure_pa;

        let mut coolant = CoolantCircuit::new(&config);
        let coolant_flow = distribute_coolant(&config, &coolant)?;
        coolant.set_row_flow(&coolant_flow.cell_flow);

        tracing::debug!(
            cells = n_cells,
            elements,
            plate_resistance,
            coolant_rows = coolant.present_rows().len(),
            "stack assembled"
        );
        Ok(Self {
            operating_point,
            current: vec![vec![target; elements]; n_cells],
            electrical: ElectricalNetwork::new(n_cells, elements, plate_resistance),
            coolant,
            coolant_flow,
            surroundings: Surroundings::from_config(&config),
            cathode_friction: Box::new(FanningCorrelation),
            anode_friction: Box::new(FanningCorrelation),
            cathode_flow: FlowDistribution::uniform(n_cells, 0.0, outlet(Electrode::Cathode)),
            anode_flow: FlowDistribution::uniform(n_cells, 0.0, outlet(Electrode::Anode)),
            cells,
            config,
        })
    }

    /// Replace the header friction model of one reactant side.
    pub fn with_friction(mut self, electrode: Electrode, model: Box<dyn FrictionModel>) -> Self {
        match electrode {
            Electrode::Anode => self.anode_friction = model,
            Electrode::Cathode => self.cathode_friction = model,
        }
        self
    }

    /// Move to a new load. The current field is rescaled so that the last
    /// solution serves as the starting point.
    pub fn set_operating_point(&mut self, operating_point: OperatingPoint) -> StackResult<()> {
        let scale =
            operating_point.target_current_density / self.operating_point.target_current_density;
        for row in self.current.iter_mut() {
            for i in row.iter_mut() {
                *i *= scale;
            }
        }
        correct_current(&mut self.current, operating_point.target_current_density)?;
        self.operating_point = operating_point;
        Ok(())
    }

    /// One outer iteration: electrochemistry, thermal network, manifold
    /// distribution, electrical network, in that order.
    pub fn update(&mut self) -> StackResult<IterationDiagnostics> {
        let target = self.operating_point.target_current_density;
        let old_current = self.flat_current();
        let old_temperature = self.flat_temperature();

        self.cells
            .par_iter_mut()
            .zip(self.current.par_iter())
            .map(|(cell, i)| cell.update(i, target).map_err(StackError::cell(cell.index())))
            .collect::<StackResult<Vec<()>>>()?;

        let s = &self.config.stack;
        let (calc_temperature, calc_current) = (s.calc_temperature, s.calc_current_density);
        if calc_temperature {
            let solution = self.solve_thermal()?;
            self.apply_thermal(solution)?;
        }
        let cathode_flow_passes = self.update_flow(Electrode::Cathode)?;
        let anode_flow_passes = self.update_flow(Electrode::Anode)?;
        let electrical = if calc_current {
            let voltage: Vec<Vec<f64>> = self.cells.iter().map(|c| c.voltage().to_vec()).collect();
            let slope: Vec<Vec<f64>> =
                self.cells.iter().map(|c| c.voltage_slope().to_vec()).collect();
            Some(
                self.electrical
                    .solve(&mut self.current, &voltage, &slope, target)?,
            )
        } else {
            None
        };

        Ok(IterationDiagnostics {
            current_error: relative_error_norm(&self.flat_current(), &old_current)?,
            temperature_error: relative_error_norm(&self.flat_temperature(), &old_temperature)?,
            electrical,
            cathode_flow_passes,
            anode_flow_passes,
        })
    }

    /// Solve the thermal network for the present state without touching it.
    pub fn solve_thermal(&self) -> StackResult<ThermalSolution> {
        solve_thermal(
            &self.cells,
            &self.current,
            &self.coolant,
            &self.surroundings,
            self.operating_point.target_current_density,
        )
    }

    fn apply_thermal(&mut self, solution: ThermalSolution) -> StackResult<()> {
        let ThermalSolution {
            layers,
            coolant,
            anode_gas,
            cathode_gas,
        } = solution;
        for (((cell, t), an), cat) in self
            .cells
            .iter_mut()
            .zip(layers)
            .zip(anode_gas)
            .zip(cathode_gas)
        {
            let q = cell.index();
            let [plate_an, gde_an, membrane, gde_cat, plate_cat] = t;
            for (layer, values) in [
                (Layer::AnodePlate, plate_an),
                (Layer::AnodeGde, gde_an),
                (Layer::Membrane, membrane),
                (Layer::CathodeGde, gde_cat),
                (Layer::CathodePlate, plate_cat),
            ] {
                cell.set_temperature(layer, values)
                    .map_err(StackError::cell(q))?;
            }
            cell.anode.set_temperature(an).map_err(StackError::cell(q))?;
            cell.cathode
                .set_temperature(cat)
                .map_err(StackError::cell(q))?;
        }
        self.coolant.set_temperature(coolant);
        Ok(())
    }

    /// Header distribution of one reactant side. With the solve switched
    /// off the flow is recorded as an even split and stoichiometry stays
    /// nominal; returns the number of manifold passes taken.
    fn update_flow(&mut self, electrode: Electrode) -> StackResult<usize> {
        let manifold = self.config.manifold(electrode).clone();
        let nominal = self.config.half_cell_params(electrode).stoichiometry;
        let n = self.cells.len();
        let solve = self.config.stack.calc_flow_distribution && manifold.calc_distribution;

        let halves: Vec<&HalfCell> = self.cells.iter().map(|c| half(c, electrode)).collect();
        let reference = halves[0];
        let nodes = reference.nodes();
        let dir = reference.flow_direction();
        let (i_in, i_out) = (inlet_node(nodes, dir), outlet_node(nodes, dir));

        let cell_flow: Vec<f64> = halves.iter().map(|h| h.inlet_mass_flow()).collect();
        let outlet_ratio = halves
            .iter()
            .zip(&cell_flow)
            .map(|(h, m)| if *m > 0.0 { h.outlet_mass_flow() / m } else { 1.0 })
            .collect();
        let total_flow: f64 = halves
            .iter()
            .zip(&cell_flow)
            .map(|(h, m)| m * nominal / h.stoichiometry())
            .sum();
        if !solve {
            let dist = FlowDistribution::uniform(n, total_flow, manifold.outlet_pressure_pa);
            match electrode {
                Electrode::Anode => self.anode_flow = dist,
                Electrode::Cathode => self.cathode_flow = dist,
            }
            return Ok(0);
        }
        let mean = |values: Vec<f64>| values.iter().sum::<f64>() / values.len() as f64;
        let input = ManifoldInput {
            kind: manifold.kind,
            inlet_segment: manifold.inlet_header(),
            outlet_segment: manifold.outlet_header(),
            outlet_pressure: manifold.outlet_pressure_pa,
            inlet_fluid: HeaderFluid {
                density: reference.density()[i_in],
                viscosity: reference.viscosity()[i_in],
            },
            outlet_fluid: HeaderFluid {
                density: mean(halves.iter().map(|h| h.density()[i_out]).collect()),
                viscosity: mean(halves.iter().map(|h| h.viscosity()[i_out]).collect()),
            },
            cell_flow,
            outlet_ratio,
            reference_pressure_drop: reference.pressure_drop(),
            reference_flow: reference.inlet_mass_flow(),
            total_flow,
        };
        let friction = match electrode {
            Electrode::Anode => self.anode_friction.as_ref(),
            Electrode::Cathode => self.cathode_friction.as_ref(),
        };
        let s = &self.config.stack;
        let dist = distribute(
            &input,
            friction,
            s.flow_tolerance,
            s.max_flow_passes,
            electrode.name(),
        )?;

        let mean_flow = total_flow / n as f64;
        for (q, cell) in self.cells.iter_mut().enumerate() {
            let h = half_mut(cell, electrode);
            h.set_stoichiometry(nominal * dist.cell_flow[q] / mean_flow)
                .map_err(StackError::cell(q))?;
            h.set_outlet_pressure(dist.outlet_pressure[q])
                .map_err(StackError::cell(q))?;
        }
        let passes = dist.passes;
        match electrode {
            Electrode::Anode => self.anode_flow = dist,
            Electrode::Cathode => self.cathode_flow = dist,
        }
        Ok(passes)
    }

    fn flat_current(&self) -> Vec<f64> {
        self.current.iter().flatten().copied().collect()
    }

    fn flat_temperature(&self) -> Vec<f64> {
        let layers = [
            Layer::AnodePlate,
            Layer::AnodeGde,
            Layer::Membrane,
            Layer::CathodeGde,
            Layer::CathodePlate,
        ];
        debug_assert_eq!(layers.len(), LAYERS);
        self.cells
            .iter()
            .flat_map(|c| layers.iter().flat_map(move |l| c.temperature(*l).iter().copied()))
            .collect()
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn operating_point(&self) -> OperatingPoint {
        self.operating_point
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Current density `[cell][element]` (A/m²).
    pub fn current_density(&self) -> &[Vec<f64>] {
        &self.current
    }

    /// Coolant temperature `[channel][node]` (K).
    pub fn coolant_temperature(&self) -> &[Vec<f64>] {
        self.coolant.temperature()
    }

    pub fn flow_distribution(&self, electrode: Electrode) -> &FlowDistribution {
        match electrode {
            Electrode::Anode => &self.anode_flow,
            Electrode::Cathode => &self.cathode_flow,
        }
    }

    /// Coolant flow per channel row; missing rows carry none.
    pub fn coolant_flow_distribution(&self) -> &FlowDistribution {
        &self.coolant_flow
    }

    /// Mean of the cell voltages (V).
    pub fn average_cell_voltage(&self) -> f64 {
        self.stack_voltage() / self.cells.len() as f64
    }

    /// Sum of the cell voltages (V).
    pub fn stack_voltage(&self) -> f64 {
        self.cells.iter().map(Cell::average_voltage).sum()
    }

    pub fn is_collapsed(&self) -> bool {
        self.cells.iter().any(Cell::is_collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(cells: usize) -> StackConfig {
        let mut config = StackConfig::default();
        config.stack.cell_count = cells;
        config.stack.elements = 8;
        config
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let mut config = small_config(2);
        config.cathode.flow_direction = 2;
        let err = Stack::new(config, OperatingPoint::new(4000.0).unwrap()).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }

    #[test]
    fn update_conserves_current_per_cell() {
        let mut stack = Stack::new(small_config(3), OperatingPoint::new(4000.0).unwrap()).unwrap();
        for _ in 0..3 {
            stack.update().unwrap();
        }
        for row in stack.current_density() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 8.0 * 4000.0).abs() < 1e-8 * 8.0 * 4000.0);
        }
        let v = stack.average_cell_voltage();
        assert!(v > 0.0 && v < 0.95, "V = {v}");
        assert!(!stack.is_collapsed());
    }

    #[test]
    fn disabled_solvers_keep_their_state() {
        let mut config = small_config(2);
        config.stack.calc_temperature = false;
        config.stack.calc_current_density = false;
        config.stack.calc_flow_distribution = false;
        let mut stack = Stack::new(config, OperatingPoint::new(3000.0).unwrap()).unwrap();
        let d = stack.update().unwrap();
        assert_eq!(d.current_error, 0.0);
        assert_eq!(d.temperature_error, 0.0);
        assert!(d.electrical.is_none());
        assert!(stack.current_density().iter().flatten().all(|i| *i == 3000.0));
    }

    #[test]
    fn thermal_solve_is_idempotent() {
        let mut stack = Stack::new(small_config(2), OperatingPoint::new(4000.0).unwrap()).unwrap();
        stack.update().unwrap();
        let first = stack.solve_thermal().unwrap();
        let second = stack.solve_thermal().unwrap();
        assert_eq!(first, second);
        for cell in &first.layers {
            for layer in cell {
                assert!(layer.iter().all(|t| *t > 250.0 && *t < 600.0));
            }
        }
    }

    #[test]
    fn flow_feedback_sets_stoichiometry_around_nominal() {
        let mut stack = Stack::new(small_config(4), OperatingPoint::new(4000.0).unwrap()).unwrap();
        stack.update().unwrap();
        let dist = stack.flow_distribution(Electrode::Cathode);
        assert_eq!(dist.cell_flow.len(), 4);
        let stoi: Vec<f64> = stack
            .cells()
            .iter()
            .map(|c| c.cathode.stoichiometry())
            .collect();
        let mean = stoi.iter().sum::<f64>() / 4.0;
        assert!((mean - 2.5).abs() < 1e-6, "{stoi:?}");
    }

    #[test]
    fn coolant_splits_over_the_channel_rows() {
        let stack = Stack::new(small_config(3), OperatingPoint::new(4000.0).unwrap()).unwrap();
        let dist = stack.coolant_flow_distribution();
        assert_eq!(dist.cell_flow.len(), 4);
        let total: f64 = dist.cell_flow.iter().sum();
        assert!((total - 4.0e-4).abs() < 1e-12 * 4.0e-4);
        assert!(dist.cell_flow.iter().all(|m| *m > 0.0));
        assert!(dist.converged && dist.passes >= 1);
        assert!(dist.reference_pressure_drop > 0.0);
    }

    #[test]
    fn coolant_rows_without_channel_stay_dry() {
        let mut config = small_config(3);
        config.coolant.end_plate_cooling = false;
        let stack = Stack::new(config.clone(), OperatingPoint::new(4000.0).unwrap()).unwrap();
        let flow = &stack.coolant_flow_distribution().cell_flow;
        assert_eq!(flow.len(), 3);
        assert_eq!(flow[0], 0.0);
        assert!((flow[1] + flow[2] - 2.0e-4).abs() < 1e-15);

        config.coolant_manifold.calc_distribution = false;
        let stack = Stack::new(config, OperatingPoint::new(4000.0).unwrap()).unwrap();
        assert_eq!(stack.coolant_flow_distribution().cell_flow, vec![0.0, 1.0e-4, 1.0e-4]);
    }

    #[test]
    fn manifold_switch_is_per_side() {
        let mut config = small_config(3);
        config.cathode_manifold.calc_distribution = false;
        let mut stack = Stack::new(config, OperatingPoint::new(4000.0).unwrap()).unwrap();
        let d = stack.update().unwrap();
        assert_eq!(d.cathode_flow_passes, 0);
        assert!(d.anode_flow_passes >= 1);
        assert!(stack.cells().iter().all(|c| c.cathode.stoichiometry() == 2.5));
        let cathode = stack.flow_distribution(Electrode::Cathode);
        assert!(cathode.cell_flow.iter().all(|m| *m > 0.0));
        assert!(cathode.cell_flow.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn operating_point_change_rescales_current() {
        let mut stack = Stack::new(small_config(1), OperatingPoint::new(2000.0).unwrap()).unwrap();
        stack.update().unwrap();
        stack
            .set_operating_point(OperatingPoint::new(4000.0).unwrap())
            .unwrap();
        let sum: f64 = stack.current_density()[0].iter().sum();
        assert!((sum - 8.0 * 4000.0).abs() < 1e-8);
    }
}
