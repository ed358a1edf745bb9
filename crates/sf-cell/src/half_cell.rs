//! Anode/cathode half-cell: species balance, channel hydraulics, electrode losses.
//!
//! A half-cell models one representative channel; the cell carries
//! `channel_count` identical copies of it side by side. Flows and
//! conductances are per channel unless a method says otherwise.

use crate::channel::{Channel, ChannelGeometry};
use crate::common::{
    CP_LIQUID_WATER, MIN_CONCENTRATION, NUSSELT_LAMINAR, check_direction, check_finite,
    check_positive,
};
use crate::error::{CellError, CellResult};
use crate::losses::{
    ElectrodeLosses, ElectrodeParams, LossContext, LossFlags, TRANSPORT_CHARGE_NUMBER,
    electrode_losses, upstream_nodes,
};
use sf_core::PhysicalConstants;
use sf_core::grid::{add_source, inlet_node, node_to_element, outlet_node};
use sf_fluids::{MixtureProperties, Species, laminar_darcy_friction_factor, reynolds, saturation_pressure};

pub const ID_REACTANT: usize = 0;
pub const ID_INERT: usize = 1;
pub const ID_WATER: usize = 2;

/// Which side of the membrane a half-cell sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Electrode {
    Anode,
    Cathode,
}

impl Electrode {
    pub fn name(&self) -> &'static str {
        match self {
            Electrode::Anode => "anode",
            Electrode::Cathode => "cathode",
        }
    }

    /// Species in channel order: reactant, inert, water.
    pub fn species(&self) -> [Species; 3] {
        match self {
            Electrode::Anode => [Species::H2, Species::N2, Species::H2O],
            Electrode::Cathode => [Species::O2, Species::N2, Species::H2O],
        }
    }

    /// Electrons transferred per reactant molecule.
    pub fn charge_number(&self) -> f64 {
        match self {
            Electrode::Anode => 2.0,
            Electrode::Cathode => 4.0,
        }
    }

    /// Water molecules produced per electron.
    pub fn water_per_charge(&self) -> f64 {
        match self {
            Electrode::Anode => 0.0,
            Electrode::Cathode => 0.5,
        }
    }
}

/// Construction inputs of one half-cell.
#[derive(Clone, Debug, PartialEq)]
pub struct HalfCellParams {
    pub electrode: Electrode,
    pub channel: ChannelGeometry,
    pub channel_count: usize,
    /// +1 along the x axis, -1 against it
    pub flow_direction: i8,
    pub stoichiometry: f64,
    /// Inert-to-reactant mole ratio of the feed
    pub inert_ratio: f64,
    /// Relative humidity of the feed [-]
    pub inlet_humidity: f64,
    pub inlet_temperature: f64,
    pub outlet_pressure: f64,
    pub electrode_params: ElectrodeParams,
    pub loss_flags: LossFlags,
}

/// Per-channel state of one half-cell.
#[derive(Clone, Debug)]
pub struct HalfCell {
    params: HalfCellParams,
    constants: PhysicalConstants,
    channel: Channel,
    species: [Species; 3],
    active_area: f64,
    active_area_dx: Vec<f64>,
    stoichiometry: f64,
    outlet_pressure: f64,

    // node arrays
    mol_flow: [Vec<f64>; 3],
    mol_flow_gas: [Vec<f64>; 3],
    liquid_water_flow: Vec<f64>,
    mol_fraction_gas: [Vec<f64>; 3],
    concentration: [Vec<f64>; 3],
    pressure: Vec<f64>,
    temperature: Vec<f64>,
    velocity: Vec<f64>,
    density: Vec<f64>,
    viscosity: Vec<f64>,
    conductivity: Vec<f64>,
    heat_capacity_flow: Vec<f64>,

    // element arrays
    condensation_rate: Vec<f64>,
    heat_transfer: Vec<f64>,
    losses: ElectrodeLosses,
    limited_at: Option<usize>,
}

impl HalfCell {
    /// Build a half-cell on a cell of `cell_area` (m²) split into `elements` elements.
    pub fn new(
        params: HalfCellParams,
        cell_area: f64,
        elements: usize,
        constants: PhysicalConstants,
    ) -> CellResult<Self> {
        check_direction(params.flow_direction)?;
        check_positive(cell_area, "cell area")?;
        check_positive(params.stoichiometry, "stoichiometry")?;
        check_positive(params.inlet_temperature, "inlet temperature")?;
        check_positive(params.outlet_pressure, "outlet pressure")?;
        if params.channel_count == 0 {
            return Err(CellError::InvalidArg {
                what: "half-cell needs at least one channel",
            });
        }
        if !params.inert_ratio.is_finite() || params.inert_ratio < 0.0 {
            return Err(CellError::NonPhysical {
                what: "inert ratio",
                value: params.inert_ratio,
            });
        }
        if !(0.0..=1.0).contains(&params.inlet_humidity) {
            return Err(CellError::NonPhysical {
                what: "inlet humidity",
                value: params.inlet_humidity,
            });
        }
        params.electrode_params.validate()?;

        let channel = Channel::new(params.channel.clone(), elements)?;
        let area_factor = cell_area / (channel.base_area() * params.channel_count as f64);
        if area_factor < 1.0 {
            return Err(CellError::InvalidArg {
                what: "channel footprint exceeds cell area (negative rib width)",
            });
        }
        let active_area = cell_area / params.channel_count as f64;
        let active_area_dx = channel
            .dx()
            .iter()
            .map(|dx| active_area * dx / channel.length())
            .collect();

        let nodes = channel.nodes();
        let zeros = vec![0.0; nodes];
        let three = || [zeros.clone(), zeros.clone(), zeros.clone()];
        Ok(Self {
            species: params.electrode.species(),
            stoichiometry: params.stoichiometry,
            outlet_pressure: params.outlet_pressure,
            mol_flow: three(),
            mol_flow_gas: three(),
            liquid_water_flow: zeros.clone(),
            mol_fraction_gas: three(),
            concentration: three(),
            pressure: vec![params.outlet_pressure; nodes],
            temperature: vec![params.inlet_temperature; nodes],
            velocity: zeros.clone(),
            density: zeros.clone(),
            viscosity: zeros.clone(),
            conductivity: zeros.clone(),
            heat_capacity_flow: zeros,
            condensation_rate: vec![0.0; elements],
            heat_transfer: vec![0.0; elements],
            losses: ElectrodeLosses::zeros(elements),
            limited_at: None,
            active_area,
            active_area_dx,
            channel,
            constants,
            params,
        })
    }

    /// Recompute mass balance, properties, pressure, heat transfer and losses
    /// for the element current densities `current` (A/m²).
    ///
    /// Reaching the limiting current leaves sentinel losses in place and
    /// returns [`CellError::LimitingCurrentExceeded`].
    pub fn update(&mut self, current: &[f64], target_current_density: f64) -> CellResult<()> {
        if current.len() != self.elements() {
            return Err(CellError::InvalidArg {
                what: "current profile length differs from element count",
            });
        }
        self.mass_balance(current, target_current_density)?;
        self.concentrations()?;
        self.two_phase_split();
        self.gas_properties()?;
        self.channel_pressure()?;
        self.heat_transfer_coefficients();
        self.update_losses(current)
    }

    fn mass_balance(&mut self, current: &[f64], target: f64) -> CellResult<()> {
        let faraday = self.constants.faraday;
        let z = self.params.electrode.charge_number();
        let dir = self.params.flow_direction;
        let inlet = inlet_node(self.nodes(), dir);

        let reactant_in = target * self.active_area / (z * faraday) * self.stoichiometry;
        check_finite(reactant_in, "reactant inlet flow")?;
        let consumed: Vec<f64> = current
            .iter()
            .zip(&self.active_area_dx)
            .map(|(i, a)| -i * a / (z * faraday))
            .collect();
        let reactant = &mut self.mol_flow[ID_REACTANT];
        reactant[inlet] = reactant_in;
        add_source(reactant, &consumed, dir);

        let inert_in = reactant_in * self.params.inert_ratio;
        self.mol_flow[ID_INERT].fill(inert_in);

        let phi = self.params.inlet_humidity;
        let p_sat = saturation_pressure(self.params.inlet_temperature)?;
        let p_in = self.pressure[inlet];
        let denom = p_in - phi * p_sat;
        if denom <= 0.0 {
            return Err(CellError::NonPhysical {
                what: "inlet pressure below humidified vapour pressure",
                value: denom,
            });
        }
        let water_in = (reactant_in + inert_in) * phi * p_sat / denom;
        let water_per_charge = self.params.electrode.water_per_charge();
        let produced: Vec<f64> = current
            .iter()
            .zip(&self.active_area_dx)
            .map(|(i, a)| water_per_charge * i * a / faraday)
            .collect();
        let water = &mut self.mol_flow[ID_WATER];
        water[inlet] = water_in;
        add_source(water, &produced, dir);

        for flow in self.mol_flow.iter_mut() {
            for v in flow.iter_mut() {
                *v = v.max(0.0);
            }
        }
        Ok(())
    }

    fn concentrations(&mut self) -> CellResult<()> {
        let r = self.constants.gas_constant;
        for n in 0..self.nodes() {
            let t = self.temperature[n];
            let total_conc = self.pressure[n] / (r * t);
            let sat_conc = saturation_pressure(t)? / (r * t);
            let flows = [
                self.mol_flow[ID_REACTANT][n],
                self.mol_flow[ID_INERT][n],
                self.mol_flow[ID_WATER][n],
            ];
            let total: f64 = flows.iter().sum();
            let mut conc = [0.0; 3];
            if total > 0.0 {
                for (c, f) in conc.iter_mut().zip(&flows) {
                    *c = total_conc * f / total;
                }
            }
            if conc[ID_WATER] > sat_conc {
                let dry = flows[ID_REACTANT] + flows[ID_INERT];
                let dry_conc = total_conc - sat_conc;
                if dry > 0.0 {
                    conc[ID_REACTANT] = dry_conc * flows[ID_REACTANT] / dry;
                    conc[ID_INERT] = dry_conc * flows[ID_INERT] / dry;
                }
                conc[ID_WATER] = sat_conc;
            }
            for (k, c) in conc.iter().enumerate() {
                self.concentration[k][n] = c.max(MIN_CONCENTRATION);
            }
        }
        Ok(())
    }

    /// Split water into vapour and condensate so that the gas phase holds
    /// water at the concentration ratio found above.
    fn two_phase_split(&mut self) {
        for n in 0..self.nodes() {
            let water = self.mol_flow[ID_WATER][n];
            let ratio = self.concentration[ID_WATER][n] / self.concentration[ID_REACTANT][n];
            let vapour = (ratio * self.mol_flow[ID_REACTANT][n]).clamp(0.0, water);
            self.liquid_water_flow[n] = water - vapour;
            self.mol_flow_gas[ID_REACTANT][n] = self.mol_flow[ID_REACTANT][n];
            self.mol_flow_gas[ID_INERT][n] = self.mol_flow[ID_INERT][n];
            self.mol_flow_gas[ID_WATER][n] = vapour;

            let gas_total: f64 = self.mol_flow_gas.iter().map(|f| f[n]).sum();
            for k in 0..3 {
                self.mol_fraction_gas[k][n] = if gas_total > 0.0 {
                    self.mol_flow_gas[k][n] / gas_total
                } else {
                    0.0
                };
            }
        }
        let dir = self.params.flow_direction;
        for e in 0..self.elements() {
            let (up, down) = if dir >= 0 { (e, e + 1) } else { (e + 1, e) };
            self.condensation_rate[e] = self.liquid_water_flow[down] - self.liquid_water_flow[up];
        }
    }

    fn gas_properties(&mut self) -> CellResult<()> {
        let area = self.channel.cross_area();
        let m_water = Species::H2O.molar_mass();
        for n in 0..self.nodes() {
            let x: Vec<f64> = self.mol_fraction_gas.iter().map(|f| f[n]).collect();
            let gas_mass: f64 = self
                .species
                .iter()
                .zip(&self.mol_flow_gas)
                .map(|(s, f)| s.molar_mass() * f[n])
                .sum();
            let liquid_mass = self.liquid_water_flow[n] * m_water;
            if gas_mass <= 0.0 {
                // Open circuit with a dry, empty channel: nothing flows.
                self.velocity[n] = 0.0;
                self.heat_capacity_flow[n] = liquid_mass * CP_LIQUID_WATER;
                continue;
            }
            let props =
                MixtureProperties::evaluate(&self.species, &x, self.temperature[n], self.pressure[n])?;
            self.density[n] = props.density;
            self.viscosity[n] = props.viscosity;
            self.conductivity[n] = props.conductivity;
            self.velocity[n] = gas_mass / (props.density * area);
            self.heat_capacity_flow[n] = gas_mass * props.cp + liquid_mass * CP_LIQUID_WATER;
        }
        Ok(())
    }

    fn channel_pressure(&mut self) -> CellResult<()> {
        let d_h = self.channel.hydraulic_diameter();
        let zeta = self.channel.bend_loss_per_element();
        let rho_ele = node_to_element(&self.density);
        let u_ele = node_to_element(&self.velocity);
        let mut re_nodes = Vec::with_capacity(self.nodes());
        for n in 0..self.nodes() {
            let re = if self.velocity[n] > 0.0 {
                reynolds(self.density[n], self.velocity[n], d_h, self.viscosity[n])?
            } else {
                0.0
            };
            re_nodes.push(re);
        }
        let re_ele = node_to_element(&re_nodes);

        let mut dp = Vec::with_capacity(self.elements());
        for e in 0..self.elements() {
            let drop = if re_ele[e] > 0.0 {
                let f = laminar_darcy_friction_factor(re_ele[e])?;
                (f * self.channel.dx()[e] / d_h + zeta) * rho_ele[e] * 0.5 * u_ele[e] * u_ele[e]
            } else {
                0.0
            };
            dp.push(check_finite(drop, "channel pressure drop")?);
        }
        let dir = self.params.flow_direction;
        let outlet = outlet_node(self.nodes(), dir);
        self.pressure.fill(0.0);
        self.pressure[outlet] = self.outlet_pressure;
        add_source(&mut self.pressure, &dp, -dir);
        Ok(())
    }

    fn heat_transfer_coefficients(&mut self) {
        let d_h = self.channel.hydraulic_diameter();
        let perimeter = self.channel.perimeter();
        let lambda_ele = node_to_element(&self.conductivity);
        for (e, h) in self.heat_transfer.iter_mut().enumerate() {
            let alpha = lambda_ele[e] * NUSSELT_LAMINAR / d_h;
            *h = alpha * self.channel.dx()[e] * perimeter;
        }
    }

    fn loss_context(&self) -> LossContext<'_> {
        LossContext {
            params: &self.params.electrode_params,
            flags: self.params.loss_flags,
            faraday: self.constants.faraday,
            charge_number: TRANSPORT_CHARGE_NUMBER,
            direction: self.params.flow_direction,
            electrode: self.params.electrode.name(),
        }
    }

    fn update_losses(&mut self, current: &[f64]) -> CellResult<()> {
        let reactant = &self.concentration[ID_REACTANT];
        let conc_ele = node_to_element(reactant);
        let upstream = upstream_nodes(reactant, self.params.flow_direction);
        let profile = electrode_losses(&self.loss_context(), current, &conc_ele, &upstream)?;
        self.losses = profile.losses;
        self.limited_at = profile.limited_at.map(|(e, _)| e);
        match profile.limited_at {
            Some((element, var)) => Err(CellError::LimitingCurrentExceeded {
                electrode: self.params.electrode.name(),
                element,
                var,
            }),
            None => Ok(()),
        }
    }

    /// Slope of the total electrode loss with respect to local current density
    /// (V m²/A), at frozen concentrations.
    ///
    /// Uses a backward difference of width `delta`, which stays on the safe
    /// side of the limiting current; at open circuit a forward step is taken.
    pub fn loss_slope(&self, current: &[f64], delta: f64) -> CellResult<Vec<f64>> {
        let delta = check_positive(delta, "finite difference step")?;
        let reactant = &self.concentration[ID_REACTANT];
        let conc_ele = node_to_element(reactant);
        let upstream = upstream_nodes(reactant, self.params.flow_direction);
        let ctx = self.loss_context();
        let lower: Vec<f64> = current.iter().map(|i| (i - delta).max(0.0)).collect();
        let upper: Vec<f64> = current
            .iter()
            .zip(&lower)
            .map(|(i, lo)| if *i > *lo { *i } else { lo + delta })
            .collect();
        let at_lower = electrode_losses(&ctx, &lower, &conc_ele, &upstream)?;
        let at_upper = electrode_losses(&ctx, &upper, &conc_ele, &upstream)?;
        if let Some((element, var)) = at_upper.limited_at.or(at_lower.limited_at) {
            return Err(CellError::LimitingCurrentExceeded {
                electrode: self.params.electrode.name(),
                element,
                var,
            });
        }
        Ok((0..current.len())
            .map(|e| {
                (at_upper.losses.total(e) - at_lower.losses.total(e)) / (upper[e] - lower[e])
            })
            .collect())
    }

    pub fn electrode(&self) -> Electrode {
        self.params.electrode
    }

    pub fn params(&self) -> &HalfCellParams {
        &self.params
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn elements(&self) -> usize {
        self.channel.elements()
    }

    pub fn nodes(&self) -> usize {
        self.channel.nodes()
    }

    pub fn flow_direction(&self) -> i8 {
        self.params.flow_direction
    }

    pub fn channel_count(&self) -> usize {
        self.params.channel_count
    }

    /// Active area served by one channel (m²).
    pub fn active_area(&self) -> f64 {
        self.active_area
    }

    pub fn stoichiometry(&self) -> f64 {
        self.stoichiometry
    }

    pub fn set_stoichiometry(&mut self, stoichiometry: f64) -> CellResult<()> {
        self.stoichiometry = check_positive(stoichiometry, "stoichiometry")?;
        Ok(())
    }

    pub fn outlet_pressure(&self) -> f64 {
        self.outlet_pressure
    }

    pub fn set_outlet_pressure(&mut self, p: f64) -> CellResult<()> {
        self.outlet_pressure = check_positive(p, "outlet pressure")?;
        Ok(())
    }

    pub fn inlet_temperature(&self) -> f64 {
        self.params.inlet_temperature
    }

    /// Gas temperature at the nodes (K).
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn set_temperature(&mut self, temperature: Vec<f64>) -> CellResult<()> {
        if temperature.len() != self.nodes() {
            return Err(CellError::InvalidArg {
                what: "fluid temperature length differs from node count",
            });
        }
        for t in &temperature {
            check_positive(*t, "fluid temperature")?;
        }
        self.temperature = temperature;
        Ok(())
    }

    pub fn mol_flow(&self, id: usize) -> &[f64] {
        &self.mol_flow[id]
    }

    pub fn gas_mol_flow(&self, id: usize) -> &[f64] {
        &self.mol_flow_gas[id]
    }

    pub fn liquid_water_flow(&self) -> &[f64] {
        &self.liquid_water_flow
    }

    pub fn gas_mol_fraction(&self, id: usize) -> &[f64] {
        &self.mol_fraction_gas[id]
    }

    pub fn concentration(&self, id: usize) -> &[f64] {
        &self.concentration[id]
    }

    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    pub fn viscosity(&self) -> &[f64] {
        &self.viscosity
    }

    /// Channel pressure drop from inlet to outlet (Pa).
    pub fn pressure_drop(&self) -> f64 {
        let dir = self.params.flow_direction;
        self.pressure[inlet_node(self.nodes(), dir)] - self.pressure[outlet_node(self.nodes(), dir)]
    }

    /// Total inlet mass flow over all channels of the cell (kg/s).
    pub fn inlet_mass_flow(&self) -> f64 {
        let inlet = inlet_node(self.nodes(), self.params.flow_direction);
        let per_channel: f64 = self
            .species
            .iter()
            .zip(&self.mol_flow)
            .map(|(s, f)| s.molar_mass() * f[inlet])
            .sum();
        per_channel * self.params.channel_count as f64
    }

    /// Total outlet mass flow over all channels of the cell, gas and liquid (kg/s).
    pub fn outlet_mass_flow(&self) -> f64 {
        let outlet = outlet_node(self.nodes(), self.params.flow_direction);
        let per_channel: f64 = self
            .species
            .iter()
            .zip(&self.mol_flow)
            .map(|(s, f)| s.molar_mass() * f[outlet])
            .sum();
        per_channel * self.params.channel_count as f64
    }

    /// Heat capacity flow over all channels, per node (W/K).
    pub fn heat_capacity_flow(&self) -> Vec<f64> {
        let n = self.params.channel_count as f64;
        self.heat_capacity_flow.iter().map(|g| g * n).collect()
    }

    /// Convective wall conductance over all channels, per element (W/K).
    pub fn wall_conductance(&self) -> Vec<f64> {
        let n = self.params.channel_count as f64;
        self.heat_transfer.iter().map(|k| k * n).collect()
    }

    /// Condensation rate over all channels, per element (mol/s).
    pub fn condensation_rate(&self) -> Vec<f64> {
        let n = self.params.channel_count as f64;
        self.condensation_rate.iter().map(|c| c * n).collect()
    }

    pub fn losses(&self) -> &ElectrodeLosses {
        &self.losses
    }

    /// First element past the limiting current from the last update, if any.
    pub fn limited_at(&self) -> Option<usize> {
        self.limited_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::units::m;

    fn cathode_params() -> HalfCellParams {
        HalfCellParams {
            electrode: Electrode::Cathode,
            channel: ChannelGeometry {
                length: m(0.24),
                width: m(1e-3),
                height: m(1e-3),
                bends: 48,
                bend_loss_coefficient: 0.1,
            },
            channel_count: 10,
            flow_direction: 1,
            stoichiometry: 2.5,
            inert_ratio: 0.79 / 0.21,
            inlet_humidity: 0.0,
            inlet_temperature: 433.15,
            outlet_pressure: 1.0e5,
            electrode_params: ElectrodeParams {
                tafel_slope: 0.03,
                exchange_current_density: 817.0,
                cl_proton_conductivity: 3.5,
                cl_diffusivity: 1.36e-8,
                gdl_diffusivity: 2.59e-6,
                cl_thickness: 10e-6,
                gdl_thickness: 200e-6,
            },
            loss_flags: LossFlags::default(),
        }
    }

    const AREA: f64 = 0.067 * 0.067;

    #[test]
    fn reactant_consumption_matches_faraday() {
        let mut hc = HalfCell::new(cathode_params(), AREA, 10, PhysicalConstants::default()).unwrap();
        let current = vec![4000.0; 10];
        hc.update(&current, 4000.0).unwrap();
        let f = PhysicalConstants::default().faraday;
        let o2 = hc.mol_flow(ID_REACTANT);
        let consumed = o2[0] - o2[10];
        let expected = 4000.0 * hc.active_area() / (4.0 * f);
        assert!((consumed - expected).abs() / expected < 1e-12);
        // Stoichiometry 2.5 leaves 60 % of the feed.
        assert!((o2[10] / o2[0] - 0.6).abs() < 1e-12);
        // Two water per oxygen consumed.
        let w = hc.mol_flow(ID_WATER);
        assert!((w[10] - 2.0 * consumed).abs() / w[10] < 1e-12);
    }

    #[test]
    fn anode_losses_reference_each_upstream_node() {
        let mut p = cathode_params();
        p.electrode = Electrode::Anode;
        p.inert_ratio = 0.0;
        p.stoichiometry = 2.0;
        p.flow_direction = -1;
        p.electrode_params.exchange_current_density = 8.17e8;
        let mut hc = HalfCell::new(p.clone(), AREA, 10, PhysicalConstants::default()).unwrap();
        hc.update(&[4000.0; 10], 4000.0).unwrap();

        assert_eq!(hc.loss_context().charge_number, TRANSPORT_CHARGE_NUMBER);
        assert_eq!(Electrode::Anode.charge_number(), 2.0);

        // Flow runs from node 10 to node 0: element 0 is fed by node 1.
        let c = hc.concentration(ID_REACTANT);
        let mean = 0.5 * (c[0] + c[1]);
        let expected =
            crate::losses::activation_loss(&p.electrode_params, 4000.0, mean, c[1]).unwrap();
        assert_eq!(hc.losses().activation[0], expected);
    }

    #[test]
    fn pressure_decreases_along_flow_and_anchors_outlet() {
        let mut p = cathode_params();
        p.flow_direction = -1;
        let mut hc = HalfCell::new(p, AREA, 8, PhysicalConstants::default()).unwrap();
        let current = vec![4000.0; 8];
        hc.update(&current, 4000.0).unwrap();
        hc.update(&current, 4000.0).unwrap();
        let pr = hc.pressure();
        assert_eq!(pr[0], 1.0e5);
        for w in pr.windows(2) {
            assert!(w[1] > w[0]);
        }
        assert!(hc.pressure_drop() > 0.0);
    }

    #[test]
    fn gas_and_liquid_water_sum_to_total() {
        let mut p = cathode_params();
        p.inlet_temperature = 330.0;
        p.inlet_humidity = 0.9;
        let mut hc = HalfCell::new(p, AREA, 10, PhysicalConstants::default()).unwrap();
        hc.update(&vec![8000.0; 10], 8000.0).unwrap();
        let total = hc.mol_flow(ID_WATER);
        let gas = hc.gas_mol_flow(ID_WATER);
        let liq = hc.liquid_water_flow();
        assert!(liq.iter().any(|v| *v > 0.0), "expected condensation at 330 K");
        for n in 0..total.len() {
            assert!(gas[n] >= 0.0 && liq[n] >= 0.0);
            assert!((gas[n] + liq[n] - total[n]).abs() <= 1e-15 * total[n].max(1.0));
        }
        assert!(hc.gas_mol_fraction(ID_WATER).iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn oversized_channels_rejected() {
        let mut p = cathode_params();
        p.channel_count = 400;
        assert!(HalfCell::new(p, AREA, 10, PhysicalConstants::default()).is_err());
    }

    #[test]
    fn limiting_current_reported_without_nan() {
        let mut hc = HalfCell::new(cathode_params(), AREA, 10, PhysicalConstants::default()).unwrap();
        let current = vec![60_000.0; 10];
        let err = hc.update(&current, 4000.0).unwrap_err();
        assert!(matches!(err, CellError::LimitingCurrentExceeded { .. }));
        assert!(hc.limited_at().is_some());
        assert!(hc.losses().gdl_diffusion.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn loss_slope_is_positive() {
        let mut hc = HalfCell::new(cathode_params(), AREA, 6, PhysicalConstants::default()).unwrap();
        let current = vec![4000.0; 6];
        hc.update(&current, 4000.0).unwrap();
        let slope = hc.loss_slope(&current, 1.0).unwrap();
        assert!(slope.iter().all(|s| *s > 0.0));
        let at_zero = hc.loss_slope(&[0.0; 6], 1.0).unwrap();
        assert!(at_zero.iter().all(|s| s.is_finite() && *s >= 0.0));
    }
}
