//! Thermal resistor network of the stack.
//!
//! Every (cell, axial node) pair carries five solid temperatures, see
//! [`Layer`]. Solids exchange heat by conduction through and along the
//! layers, with the gas streams and the coolant by convection, and with the
//! surroundings through their edges. Fluid temperatures enter the linear
//! system as known values; they are advanced afterwards by an explicit
//! march along their flow direction.
//!
//! Assembly ([`ThermalNetwork::assemble`]) is a pure function of the network
//! description and returns a triplet list, so coefficients can be checked
//! on small hand-built cases without solving anything.

use crate::config::StackConfig;
use crate::error::{StackError, StackResult};
use nalgebra::{DMatrix, DVector};
use sf_cell::{Cell, LAYERS, Layer};
use sf_core::grid::{inlet_node, node_widths};

/// Convective link between one row of solid nodes and a fluid stream.
#[derive(Clone, Debug, PartialEq)]
pub struct FluidLink {
    /// Conductance per node [W/K]
    pub conductance: Vec<f64>,
    /// Fluid temperature per node [K]
    pub temperature: Vec<f64>,
}

impl FluidLink {
    #[cfg(test)]
    fn none(nodes: usize) -> Self {
        Self {
            conductance: vec![0.0; nodes],
            temperature: vec![0.0; nodes],
        }
    }
}

/// Conductances and heat sources of one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellThermal {
    /// Between layer `l` and `l + 1`, per node
    pub through_plane: [Vec<f64>; LAYERS - 1],
    /// Along layer `l`, per element
    pub in_plane: [Vec<f64>; LAYERS],
    /// Cathode plate to the next cell's anode plate, per node
    pub plate_contact: Vec<f64>,
    /// Edge losses to the surroundings, per layer and node
    pub ambient: [Vec<f64>; LAYERS],
    pub anode_gas: FluidLink,
    pub cathode_gas: FluidLink,
    /// Heat released per layer and node [W]
    pub source: [Vec<f64>; LAYERS],
}

/// Sparse coefficients of the network: `A T = b`.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermalSystem {
    pub size: usize,
    /// `(row, col, value)`; duplicates add up
    pub triplets: Vec<(usize, usize, f64)>,
    pub rhs: Vec<f64>,
}

impl ThermalSystem {
    fn conductance(&mut self, a: usize, b: usize, g: f64) {
        if g == 0.0 {
            return;
        }
        self.triplets.push((a, a, g));
        self.triplets.push((b, b, g));
        self.triplets.push((a, b, -g));
        self.triplets.push((b, a, -g));
    }

    fn fixed(&mut self, a: usize, g: f64, t: f64) {
        if g == 0.0 {
            return;
        }
        self.triplets.push((a, a, g));
        self.rhs[a] += g * t;
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.size, self.size);
        for &(r, c, v) in &self.triplets {
            m[(r, c)] += v;
        }
        m
    }
}

/// Full description of the stack's thermal network for one solve.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermalNetwork {
    pub nodes: usize,
    pub ambient_temperature: f64,
    pub cells: Vec<CellThermal>,
    /// Channel `c < N` wets the anode plate of cell `c`; channel `N` (with
    /// end-plate cooling) the cathode plate of the last cell.
    pub coolant: Vec<FluidLink>,
}

impl ThermalNetwork {
    pub fn index(&self, cell: usize, layer: usize, node: usize) -> usize {
        (cell * LAYERS + layer) * self.nodes + node
    }

    pub fn size(&self) -> usize {
        self.cells.len() * LAYERS * self.nodes
    }

    /// Build the coefficient triplets and right-hand side.
    pub fn assemble(&self) -> ThermalSystem {
        let mut sys = ThermalSystem {
            size: self.size(),
            triplets: Vec::new(),
            rhs: vec![0.0; self.size()],
        };
        let n_cells = self.cells.len();
        let plate_an = Layer::AnodePlate as usize;
        let gde_an = Layer::AnodeGde as usize;
        let gde_cat = Layer::CathodeGde as usize;
        let plate_cat = Layer::CathodePlate as usize;

        for (q, cell) in self.cells.iter().enumerate() {
            for n in 0..self.nodes {
                for l in 0..LAYERS - 1 {
                    sys.conductance(
                        self.index(q, l, n),
                        self.index(q, l + 1, n),
                        cell.through_plane[l][n],
                    );
                }
                for l in 0..LAYERS {
                    let a = self.index(q, l, n);
                    sys.fixed(a, cell.ambient[l][n], self.ambient_temperature);
                    sys.rhs[a] += cell.source[l][n];
                }
                for (plate, gde, gas) in [
                    (plate_an, gde_an, &cell.anode_gas),
                    (plate_cat, gde_cat, &cell.cathode_gas),
                ] {
                    let half = 0.5 * gas.conductance[n];
                    sys.fixed(self.index(q, plate, n), half, gas.temperature[n]);
                    sys.fixed(self.index(q, gde, n), half, gas.temperature[n]);
                }
                if q + 1 < n_cells {
                    sys.conductance(
                        self.index(q, plate_cat, n),
                        self.index(q + 1, plate_an, n),
                        cell.plate_contact[n],
                    );
                }
            }
            for l in 0..LAYERS {
                for (e, g) in cell.in_plane[l].iter().enumerate() {
                    sys.conductance(self.index(q, l, e), self.index(q, l, e + 1), *g);
                }
            }
        }

        for (c, link) in self.coolant.iter().enumerate() {
            let (q, layer) = if c < n_cells {
                (c, plate_an)
            } else {
                (n_cells - 1, plate_cat)
            };
            for n in 0..self.nodes {
                sys.fixed(self.index(q, layer, n), link.conductance[n], link.temperature[n]);
            }
        }
        sys
    }

    /// Solve for all solid-layer temperatures, `[cell][layer][node]`.
    pub fn solve(&self, target_current_density: f64) -> StackResult<Vec<[Vec<f64>; LAYERS]>> {
        let sys = self.assemble();
        let a = sys.to_dense();
        let b = DVector::from_vec(sys.rhs);
        let t = a.lu().solve(&b).ok_or_else(|| {
            tracing::error!(
                target_current_density,
                unknowns = self.size(),
                "thermal network matrix is singular"
            );
            StackError::SingularSystem {
                system: "thermal",
                target_current_density,
            }
        })?;
        if let Some(bad) = t.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(StackError::NonPhysical {
                what: "layer temperature",
                value: *bad,
            });
        }
        Ok((0..self.cells.len())
            .map(|q| {
                std::array::from_fn(|l| {
                    (0..self.nodes).map(|n| t[self.index(q, l, n)]).collect()
                })
            })
            .collect())
    }
}

/// Heat sink settings shared by all cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surroundings {
    pub ambient_temperature: f64,
    pub ambient_heat_transfer: f64,
    pub end_plate_heat: f64,
    /// Latent heat of condensation [J/mol]
    pub h_vap: f64,
}

impl Surroundings {
    pub fn from_config(config: &StackConfig) -> Self {
        let t = &config.temperature_system;
        Self {
            ambient_temperature: t.ambient_temperature_k,
            ambient_heat_transfer: t.ambient_heat_transfer_w_per_m2k,
            end_plate_heat: t.end_plate_heat_w,
            h_vap: config.constants.h_vap,
        }
    }
}

/// Split element values half-and-half onto their two nodes.
fn spread(elements: &[f64]) -> Vec<f64> {
    let mut nodes = vec![0.0; elements.len() + 1];
    for (e, v) in elements.iter().enumerate() {
        nodes[e] += 0.5 * v;
        nodes[e + 1] += 0.5 * v;
    }
    nodes
}

/// Thermal description of one cell at its current state.
pub fn cell_thermal(cell: &Cell, current: &[f64], env: &Surroundings) -> CellThermal {
    let g = cell.conductances();
    let nodes = cell.nodes();
    let widths = node_widths(&vec![cell.dx(); cell.elements()]);
    let w = cell.params().width;

    let ambient = std::array::from_fn(|l| {
        let t = g.thickness[l];
        (0..nodes)
            .map(|n| {
                let end_face = if n == 0 || n + 1 == nodes { t * w } else { 0.0 };
                env.ambient_heat_transfer * (2.0 * t * widths[n] + end_face)
            })
            .collect()
    });

    let latent = |rate: Vec<f64>| -> Vec<f64> {
        spread(&rate.iter().map(|r| env.h_vap * r).collect::<Vec<_>>())
    };
    let mut source: [Vec<f64>; LAYERS] = std::array::from_fn(|_| vec![0.0; nodes]);
    source[Layer::Membrane as usize] = spread(&cell.membrane_heat(current));
    source[Layer::CathodeGde as usize] = spread(&cell.cathode_heat(current))
        .iter()
        .zip(latent(cell.cathode.condensation_rate()))
        .map(|(a, b)| a + b)
        .collect();
    source[Layer::AnodeGde as usize] = spread(&cell.anode_heat(current))
        .iter()
        .zip(latent(cell.anode.condensation_rate()))
        .map(|(a, b)| a + b)
        .collect();

    let gas = |half: &sf_cell::HalfCell| FluidLink {
        conductance: spread(&half.wall_conductance()),
        temperature: half.temperature().to_vec(),
    };

    CellThermal {
        through_plane: g.through_plane.clone(),
        in_plane: g.in_plane.clone(),
        plate_contact: g.plate_contact.clone(),
        ambient,
        anode_gas: gas(&cell.anode),
        cathode_gas: gas(&cell.cathode),
        source,
    }
}

/// Coolant channels of the stack and their temperatures.
///
/// A channel row is one plate's worth of parallel coolant channels. Rows
/// missing from the geometry (the first one without end-plate cooling) keep
/// zero conductance and zero flow.
#[derive(Clone, Debug, PartialEq)]
pub struct CoolantCircuit {
    inlet_temperature: f64,
    direction: i8,
    cp: f64,
    present: Vec<bool>,
    /// Mass flow per channel row [kg/s]
    row_flow: Vec<f64>,
    /// Wall conductance per channel row, per element [W/K]
    element_conductance: Vec<Vec<f64>>,
    temperature: Vec<Vec<f64>>,
}

impl CoolantCircuit {
    /// Rows start with the nominal flow, `channel_count` times the
    /// per-channel mass flow.
    pub fn new(config: &StackConfig) -> Self {
        let cool = &config.coolant;
        let elements = config.stack.elements;
        let channels = config.coolant_channel_count();
        let dx = cool.channel_length_m / elements as f64;
        let perimeter = cool.channel_section().perimeter();
        let per_element = cool.heat_transfer_coefficient_w_per_m2k
            * perimeter
            * dx
            * cool.channel_count as f64;
        // Without end-plate cooling the first cell has no coolant on its
        // anode side.
        let present: Vec<bool> = (0..channels)
            .map(|c| c > 0 || cool.end_plate_cooling)
            .collect();
        let element_conductance = present
            .iter()
            .map(|p| vec![if *p { per_element } else { 0.0 }; elements])
            .collect();
        let nominal = cool.mass_flow_kg_per_s * cool.channel_count as f64;
        Self {
            inlet_temperature: cool.inlet_temperature_k,
            direction: cool.flow_direction,
            cp: cool.properties.cp,
            row_flow: present.iter().map(|p| if *p { nominal } else { 0.0 }).collect(),
            present,
            element_conductance,
            temperature: vec![vec![cool.inlet_temperature_k; elements + 1]; channels],
        }
    }

    /// Indices of the rows that exist in the stack.
    pub fn present_rows(&self) -> Vec<usize> {
        (0..self.channels()).filter(|&c| self.present[c]).collect()
    }

    /// Mass flow per channel row [kg/s].
    pub fn row_flow(&self) -> &[f64] {
        &self.row_flow
    }

    /// Replace the row flows, e.g. with the result of the header
    /// distribution. Missing rows stay dry.
    pub fn set_row_flow(&mut self, row_flow: &[f64]) {
        for (c, (dst, src)) in self.row_flow.iter_mut().zip(row_flow).enumerate() {
            *dst = if self.present[c] { *src } else { 0.0 };
        }
    }

    pub fn channels(&self) -> usize {
        self.temperature.len()
    }

    pub fn temperature(&self) -> &[Vec<f64>] {
        &self.temperature
    }

    pub fn set_temperature(&mut self, temperature: Vec<Vec<f64>>) {
        self.temperature = temperature;
    }

    fn links(&self) -> Vec<FluidLink> {
        self.element_conductance
            .iter()
            .zip(&self.temperature)
            .map(|(k, t)| FluidLink {
                conductance: spread(k),
                temperature: t.clone(),
            })
            .collect()
    }

    /// Coolant temperatures for the given plate temperatures.
    pub fn march(&self, layers: &[[Vec<f64>; LAYERS]]) -> Vec<Vec<f64>> {
        let n_cells = layers.len();
        self.element_conductance
            .iter()
            .enumerate()
            .map(|(c, k)| {
                let wall = if c < n_cells {
                    &layers[c][Layer::AnodePlate as usize]
                } else {
                    &layers[n_cells - 1][Layer::CathodePlate as usize]
                };
                let capacity = vec![self.row_flow[c] * self.cp; wall.len()];
                march_fluid(self.inlet_temperature, wall, k, &capacity, self.direction)
            })
            .collect()
    }
}

/// Fluid temperatures along a channel heated by a wall.
///
/// Per element the wall sits at the mean of its two node temperatures and
/// the fluid relaxes towards it exactly:
/// `T_d = Tw + (T_u - Tw) exp(-k / G)`, with `G` the heat capacity flow at
/// the upstream node. The fluid never crosses the wall temperature.
pub fn march_fluid(
    inlet_temperature: f64,
    wall: &[f64],
    conductance: &[f64],
    capacity: &[f64],
    direction: i8,
) -> Vec<f64> {
    let nodes = wall.len();
    let mut t = vec![inlet_temperature; nodes];
    if nodes == 0 {
        return t;
    }
    let start = inlet_node(nodes, direction);
    t[start] = inlet_temperature;
    let elements = nodes - 1;
    for step in 0..elements {
        let (e, up, down) = if direction >= 0 {
            (step, step, step + 1)
        } else {
            let e = elements - 1 - step;
            (e, e + 1, e)
        };
        let g = capacity[up];
        let wall_mean = 0.5 * (wall[up] + wall[down]);
        t[down] = if g > 0.0 {
            wall_mean + (t[up] - wall_mean) * (-conductance[e] / g).exp()
        } else {
            wall_mean
        };
    }
    t
}

/// Result of one thermal update, before it is written back to the stack.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermalSolution {
    /// `[cell][layer][node]`
    pub layers: Vec<[Vec<f64>; LAYERS]>,
    /// `[channel][node]`
    pub coolant: Vec<Vec<f64>>,
    /// `[cell][node]`
    pub anode_gas: Vec<Vec<f64>>,
    pub cathode_gas: Vec<Vec<f64>>,
}

/// Build and solve the network for the current stack state.
pub fn solve_thermal(
    cells: &[Cell],
    current: &[Vec<f64>],
    coolant: &CoolantCircuit,
    env: &Surroundings,
    target_current_density: f64,
) -> StackResult<ThermalSolution> {
    let Some(first) = cells.first() else {
        return Err(StackError::NonPhysical {
            what: "cell count",
            value: 0.0,
        });
    };
    let nodes = first.nodes();
    let n_cells = cells.len();
    let mut thermal: Vec<CellThermal> = cells
        .iter()
        .zip(current)
        .map(|(cell, i)| cell_thermal(cell, i, env))
        .collect();

    let widths = node_widths(&vec![first.dx(); first.elements()]);
    let w = first.params().width;
    let length = first.params().length;
    let cooled_ends = coolant.channels() > n_cells;
    for (q, layer) in [(0, Layer::AnodePlate), (n_cells - 1, Layer::CathodePlate)] {
        let l = layer as usize;
        for n in 0..nodes {
            thermal[q].source[l][n] += env.end_plate_heat * widths[n] / length;
            if !cooled_ends {
                thermal[q].ambient[l][n] += env.ambient_heat_transfer * w * widths[n];
            }
        }
    }

    let network = ThermalNetwork {
        nodes,
        ambient_temperature: env.ambient_temperature,
        cells: thermal,
        coolant: coolant.links(),
    };
    let layers = network.solve(target_current_density)?;
    let coolant_t = coolant.march(&layers);

    let gas = |half: &sf_cell::HalfCell, plate: &[f64], gde: &[f64]| {
        let wall: Vec<f64> = plate.iter().zip(gde).map(|(a, b)| 0.5 * (a + b)).collect();
        march_fluid(
            half.inlet_temperature(),
            &wall,
            &half.wall_conductance(),
            &half.heat_capacity_flow(),
            half.flow_direction(),
        )
    };
    let mut anode_gas = Vec::with_capacity(n_cells);
    let mut cathode_gas = Vec::with_capacity(n_cells);
    for (cell, t) in cells.iter().zip(&layers) {
        anode_gas.push(gas(
            &cell.anode,
            &t[Layer::AnodePlate as usize],
            &t[Layer::AnodeGde as usize],
        ));
        cathode_gas.push(gas(
            &cell.cathode,
            &t[Layer::CathodePlate as usize],
            &t[Layer::CathodeGde as usize],
        ));
    }
    Ok(ThermalSolution {
        layers,
        coolant: coolant_t,
        anode_gas,
        cathode_gas,
    })
}
