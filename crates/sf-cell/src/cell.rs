//! A single cell: two half-cells around a membrane, plus its solid layers.

use crate::common::check_positive;
use crate::error::{CellError, CellResult};
use crate::half_cell::{HalfCell, HalfCellParams};
use crate::membrane::{Membrane, MembraneParams};
use sf_core::PhysicalConstants;
use sf_core::grid::{node_to_element, node_widths};

/// Number of temperature layers through one cell.
pub const LAYERS: usize = 5;

/// Temperature layers in through-plane order, anode side first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    AnodePlate = 0,
    AnodeGde = 1,
    Membrane = 2,
    CathodeGde = 3,
    CathodePlate = 4,
}

/// Local current-density step used for voltage sensitivities (A/m²).
const SLOPE_STEP: f64 = 1.0e-2;

/// Smallest voltage sensitivity magnitude kept on the diagonal (Ω m²).
const MIN_VOLTAGE_SLOPE: f64 = 1.0e-9;

/// Thermal conductivities of a solid layer [W/(m K)].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerConductivity {
    pub through_plane: f64,
    pub in_plane: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellParams {
    /// Cell extent across the channels [m]
    pub width: f64,
    /// Cell extent along the channels [m]
    pub length: f64,
    pub open_circuit_voltage: f64,
    /// Bipolar plate thickness per half-cell [m]
    pub plate_thickness: f64,
    /// In-plane electrical conductivity of the bipolar plate [S/m]
    pub plate_electrical_conductivity: f64,
    pub plate_conductivity: LayerConductivity,
    pub gde_conductivity: LayerConductivity,
    pub membrane: MembraneParams,
    pub anode: HalfCellParams,
    pub cathode: HalfCellParams,
}

impl CellParams {
    pub fn area(&self) -> f64 {
        self.width * self.length
    }
}

/// Conductances of the solid layers of one cell [W/K].
#[derive(Clone, Debug, PartialEq)]
pub struct LayerConductances {
    /// Between layer `l` and `l + 1`, per node
    pub through_plane: [Vec<f64>; LAYERS - 1],
    /// Along layer `l`, per element
    pub in_plane: [Vec<f64>; LAYERS],
    /// From this cell's cathode plate to the next cell's anode plate, per node
    pub plate_contact: Vec<f64>,
    /// Layer thicknesses [m]
    pub thickness: [f64; LAYERS],
}

impl LayerConductances {
    fn new(params: &CellParams, dx: &[f64]) -> Self {
        let gde_an = params.anode.electrode_params.gdl_thickness
            + params.anode.electrode_params.cl_thickness;
        let gde_cat = params.cathode.electrode_params.gdl_thickness
            + params.cathode.electrode_params.cl_thickness;
        let thickness = [
            params.plate_thickness,
            gde_an,
            params.membrane.thickness,
            gde_cat,
            params.plate_thickness,
        ];
        let k_through = [
            params.plate_conductivity.through_plane,
            params.gde_conductivity.through_plane,
            params.membrane.thermal_conductivity,
            params.gde_conductivity.through_plane,
            params.plate_conductivity.through_plane,
        ];
        let k_in_plane = [
            params.plate_conductivity.in_plane,
            params.gde_conductivity.in_plane,
            params.membrane.thermal_conductivity,
            params.gde_conductivity.in_plane,
            params.plate_conductivity.in_plane,
        ];
        let half_r: Vec<f64> = thickness
            .iter()
            .zip(&k_through)
            .map(|(t, k)| 0.5 * t / k)
            .collect();
        let widths = node_widths(dx);
        let w = params.width;

        let through_plane = std::array::from_fn(|l| {
            widths
                .iter()
                .map(|nw| w * nw / (half_r[l] + half_r[l + 1]))
                .collect()
        });
        let in_plane = std::array::from_fn(|l| {
            dx.iter()
                .map(|d| k_in_plane[l] * thickness[l] * w / d)
                .collect()
        });
        let plate_contact = widths
            .iter()
            .map(|nw| {
                w * nw / (half_r[Layer::CathodePlate as usize] + half_r[Layer::AnodePlate as usize])
            })
            .collect();
        Self {
            through_plane,
            in_plane,
            plate_contact,
            thickness,
        }
    }
}

/// One cell of the stack.
#[derive(Clone, Debug)]
pub struct Cell {
    index: usize,
    params: CellParams,
    constants: PhysicalConstants,
    pub anode: HalfCell,
    pub cathode: HalfCell,
    pub membrane: Membrane,
    conductances: LayerConductances,
    element_area: Vec<f64>,
    temperature: [Vec<f64>; LAYERS],
    voltage: Vec<f64>,
    voltage_slope: Vec<f64>,
    collapsed: bool,
}

impl Cell {
    pub fn new(
        index: usize,
        params: CellParams,
        elements: usize,
        constants: PhysicalConstants,
        initial_temperature: f64,
    ) -> CellResult<Self> {
        check_positive(params.width, "cell width")?;
        check_positive(params.length, "cell length")?;
        check_positive(params.open_circuit_voltage, "open circuit voltage")?;
        check_positive(params.plate_thickness, "plate thickness")?;
        check_positive(params.plate_electrical_conductivity, "plate electrical conductivity")?;
        for k in [
            params.plate_conductivity.through_plane,
            params.plate_conductivity.in_plane,
            params.gde_conductivity.through_plane,
            params.gde_conductivity.in_plane,
        ] {
            check_positive(k, "layer thermal conductivity")?;
        }
        check_positive(initial_temperature, "initial temperature")?;

        let area = params.area();
        let anode = HalfCell::new(params.anode.clone(), area, elements, constants)?;
        let cathode = HalfCell::new(params.cathode.clone(), area, elements, constants)?;
        let membrane = Membrane::new(params.membrane, elements)?;

        // Elements follow the cell length; channel meanders map onto it evenly.
        let dx: Vec<f64> = vec![params.length / elements as f64; elements];
        let conductances = LayerConductances::new(&params, &dx);
        let element_area = dx.iter().map(|d| d * params.width).collect();
        let temperature = std::array::from_fn(|_| vec![initial_temperature; elements + 1]);

        Ok(Self {
            index,
            constants,
            anode,
            cathode,
            membrane,
            conductances,
            element_area,
            temperature,
            voltage: vec![params.open_circuit_voltage; elements],
            voltage_slope: vec![-MIN_VOLTAGE_SLOPE; elements],
            collapsed: false,
            params,
        })
    }

    /// Update both half-cells, the membrane and the voltage profile for the
    /// element current densities `current`.
    ///
    /// Domain violations mark the cell as collapsed before they are returned.
    pub fn update(&mut self, current: &[f64], target_current_density: f64) -> CellResult<()> {
        let result = self.try_update(current, target_current_density);
        self.collapsed = matches!(&result, Err(e) if e.is_domain_violation());
        if let Err(e) = &result {
            tracing::debug!(cell = self.index, error = %e, "cell update failed");
        }
        result
    }

    fn try_update(&mut self, current: &[f64], target: f64) -> CellResult<()> {
        self.anode.update(current, target)?;
        self.cathode.update(current, target)?;
        let t_membrane = node_to_element(&self.temperature[Layer::Membrane as usize]);
        self.membrane.update(&t_membrane, current)?;

        let ocv = self.params.open_circuit_voltage;
        let an = self.anode.losses();
        let cat = self.cathode.losses();
        for e in 0..self.elements() {
            let v = ocv - an.total(e) - cat.total(e) - self.membrane.loss()[e];
            if !(v > 0.0) {
                return Err(CellError::VoltageCollapse {
                    cell: self.index,
                    element: e,
                    voltage: v,
                });
            }
            self.voltage[e] = v;
        }

        let slope_an = self.anode.loss_slope(current, SLOPE_STEP)?;
        let slope_cat = self.cathode.loss_slope(current, SLOPE_STEP)?;
        let slope_mem = self.membrane.loss_slope();
        for e in 0..self.elements() {
            let dv = -(slope_an[e] + slope_cat[e] + slope_mem[e]);
            self.voltage_slope[e] = dv.min(-MIN_VOLTAGE_SLOPE);
        }
        Ok(())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn params(&self) -> &CellParams {
        &self.params
    }

    pub fn elements(&self) -> usize {
        self.voltage.len()
    }

    pub fn nodes(&self) -> usize {
        self.voltage.len() + 1
    }

    /// Electrode area of each element over the full cell width (m²).
    pub fn element_area(&self) -> &[f64] {
        &self.element_area
    }

    /// Element length along the flow axis (m).
    pub fn dx(&self) -> f64 {
        self.params.length / self.elements() as f64
    }

    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    /// Area-weighted mean of the element voltages.
    pub fn average_voltage(&self) -> f64 {
        let total: f64 = self.element_area.iter().sum();
        self.voltage
            .iter()
            .zip(&self.element_area)
            .map(|(v, a)| v * a)
            .sum::<f64>()
            / total
    }

    /// dV/di per element (Ω m²); strictly negative.
    pub fn voltage_slope(&self) -> &[f64] {
        &self.voltage_slope
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn conductances(&self) -> &LayerConductances {
        &self.conductances
    }

    pub fn temperature(&self, layer: Layer) -> &[f64] {
        &self.temperature[layer as usize]
    }

    pub fn set_temperature(&mut self, layer: Layer, values: Vec<f64>) -> CellResult<()> {
        if values.len() != self.nodes() {
            return Err(CellError::InvalidArg {
                what: "layer temperature length differs from node count",
            });
        }
        for t in &values {
            check_positive(*t, "layer temperature")?;
        }
        self.temperature[layer as usize] = values;
        Ok(())
    }

    /// Ohmic heat released in the membrane, per element (W).
    pub fn membrane_heat(&self, current: &[f64]) -> Vec<f64> {
        self.heat(current, |e| self.membrane.loss()[e])
    }

    /// Reaction heat at the cathode electrode, per element (W).
    pub fn cathode_heat(&self, current: &[f64]) -> Vec<f64> {
        let offset = self.constants.thermoneutral_voltage - self.params.open_circuit_voltage;
        self.heat(current, |e| offset + self.cathode.losses().total(e))
    }

    /// Overpotential heat at the anode electrode, per element (W).
    pub fn anode_heat(&self, current: &[f64]) -> Vec<f64> {
        self.heat(current, |e| self.anode.losses().total(e))
    }

    fn heat(&self, current: &[f64], volts: impl Fn(usize) -> f64) -> Vec<f64> {
        current
            .iter()
            .zip(&self.element_area)
            .enumerate()
            .map(|(e, (i, a))| volts(e) * i * a)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelGeometry;
    use crate::half_cell::Electrode;
    use crate::losses::{ElectrodeParams, LossFlags};
    use sf_core::units::m;

    fn half(electrode: Electrode, direction: i8, stoi: f64, inert: f64, j0: f64) -> HalfCellParams {
        HalfCellParams {
            electrode,
            channel: ChannelGeometry {
                length: m(0.24),
                width: m(1e-3),
                height: m(1e-3),
                bends: 48,
                bend_loss_coefficient: 0.1,
            },
            channel_count: 10,
            flow_direction: direction,
            stoichiometry: stoi,
            inert_ratio: inert,
            inlet_humidity: 0.0,
            inlet_temperature: 433.15,
            outlet_pressure: 1.0e5,
            electrode_params: ElectrodeParams {
                tafel_slope: 0.03,
                exchange_current_density: j0,
                cl_proton_conductivity: 3.5,
                cl_diffusivity: 1.36e-8,
                gdl_diffusivity: 2.59e-6,
                cl_thickness: 10e-6,
                gdl_thickness: 200e-6,
            },
            loss_flags: LossFlags::default(),
        }
    }

    fn params() -> CellParams {
        CellParams {
            width: 0.067,
            length: 0.067,
            open_circuit_voltage: 0.95,
            plate_thickness: 2e-3,
            plate_electrical_conductivity: 6.0e4,
            plate_conductivity: LayerConductivity {
                through_plane: 50.0,
                in_plane: 100.0,
            },
            gde_conductivity: LayerConductivity {
                through_plane: 1.0,
                in_plane: 10.0,
            },
            membrane: MembraneParams {
                thickness: 50e-6,
                resistance_base: 4.3e-5,
                resistance_slope: 7.0e-8,
                thermal_conductivity: 0.26,
                calc_loss: true,
            },
            anode: half(Electrode::Anode, -1, 2.0, 0.0, 8.17e8),
            cathode: half(Electrode::Cathode, 1, 2.5, 0.79 / 0.21, 817.0),
        }
    }

    #[test]
    fn voltage_is_plausible_and_slope_negative() {
        let mut cell = Cell::new(0, params(), 10, PhysicalConstants::default(), 433.15).unwrap();
        let current = vec![4000.0; 10];
        cell.update(&current, 4000.0).unwrap();
        let v = cell.average_voltage();
        assert!((0.35..0.55).contains(&v), "V = {v}");
        assert!(cell.voltage_slope().iter().all(|s| *s < 0.0));
        assert!(!cell.is_collapsed());
    }

    #[test]
    fn higher_current_gives_lower_voltage() {
        let mut cell = Cell::new(0, params(), 10, PhysicalConstants::default(), 433.15).unwrap();
        cell.update(&vec![4000.0; 10], 4000.0).unwrap();
        let v_low = cell.average_voltage();
        cell.update(&vec![8000.0; 10], 8000.0).unwrap();
        assert!(cell.average_voltage() < v_low);
    }

    #[test]
    fn heat_sources_are_positive() {
        let mut cell = Cell::new(0, params(), 4, PhysicalConstants::default(), 433.15).unwrap();
        let current = vec![4000.0; 4];
        cell.update(&current, 4000.0).unwrap();
        let total: f64 = cell
            .membrane_heat(&current)
            .iter()
            .chain(cell.cathode_heat(&current).iter())
            .chain(cell.anode_heat(&current).iter())
            .sum();
        // Heat equals (V_tn - V) I over the cell.
        let i_total = 4000.0 * params().area();
        let expected = (1.28 - cell.average_voltage()) * i_total;
        assert!((total - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn collapse_flag_set_on_domain_violation() {
        let mut p = params();
        p.open_circuit_voltage = 0.3;
        let mut cell = Cell::new(2, p, 4, PhysicalConstants::default(), 433.15).unwrap();
        let err = cell.update(&[4000.0; 4], 4000.0).unwrap_err();
        assert!(matches!(err, CellError::VoltageCollapse { cell: 2, .. }));
        assert!(cell.is_collapsed());
    }

    #[test]
    fn layer_conductances_have_expected_shape() {
        let cell = Cell::new(0, params(), 5, PhysicalConstants::default(), 433.15).unwrap();
        let g = cell.conductances();
        assert_eq!(g.through_plane.len(), 4);
        assert_eq!(g.through_plane[0].len(), 6);
        assert_eq!(g.in_plane[2].len(), 5);
        // Boundary nodes carry half the area of interior nodes.
        assert!((g.through_plane[1][0] * 2.0 - g.through_plane[1][2]).abs() < 1e-9);
    }
}
