//! Flow distribution over parallel cells through inlet/outlet headers.
//!
//! Used for both reactant sides and for the coolant rows. Each cell behaves like a linear flow resistance `m = K Δp`, with `K`
//! taken from the reference (first) cell. Header friction and momentum
//! change shift the pressure difference seen by every cell; the reference
//! pressure drop is then chosen so that the cells together take exactly the
//! header flow. Header pressures depend on the distribution, so the two are
//! iterated until the cell flows settle.

use crate::config::ManifoldKind;
use crate::error::{StackError, StackResult};
use serde::Serialize;
use sf_fluids::{HeaderSegment, fanning_friction_factor, header_pressure_drop, reynolds};
use std::fmt::Debug;

/// Friction factor of the header sections.
pub trait FrictionModel: Debug + Send + Sync {
    /// Fanning factor of header section `segment` (between cell ports
    /// `segment` and `segment + 1`) at Reynolds number `re`.
    fn fanning(&self, re: f64, segment: usize) -> StackResult<f64>;
}

/// Laminar `16 / Re`, Blasius above transition.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FanningCorrelation;

impl FrictionModel for FanningCorrelation {
    fn fanning(&self, re: f64, _segment: usize) -> StackResult<f64> {
        Ok(fanning_friction_factor(re)?)
    }
}

/// Header fluid state on one side of the manifold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeaderFluid {
    pub density: f64,
    pub viscosity: f64,
}

/// Everything the distribution needs from the cells of one flow circuit.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifoldInput {
    pub kind: ManifoldKind,
    pub inlet_segment: HeaderSegment,
    pub outlet_segment: HeaderSegment,
    /// Pressure where the outlet header leaves the stack [Pa]
    pub outlet_pressure: f64,
    pub inlet_fluid: HeaderFluid,
    pub outlet_fluid: HeaderFluid,
    /// Current inlet mass flow per cell [kg/s]
    pub cell_flow: Vec<f64>,
    /// Outlet over inlet mass flow per cell
    pub outlet_ratio: Vec<f64>,
    /// Channel pressure drop of the reference cell [Pa]
    pub reference_pressure_drop: f64,
    /// Inlet mass flow of the reference cell [kg/s]
    pub reference_flow: f64,
    /// Header flow to distribute [kg/s]
    pub total_flow: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowDistribution {
    pub inlet_pressure: Vec<f64>,
    pub outlet_pressure: Vec<f64>,
    pub cell_flow: Vec<f64>,
    /// `(p_in - p_out) / Δp_ref` per cell
    pub distribution_factor: Vec<f64>,
    pub reference_pressure_drop: f64,
    pub passes: usize,
    pub converged: bool,
}

impl FlowDistribution {
    /// Header flow split evenly, for stacks that skip the manifold solve.
    pub fn uniform(cells: usize, total_flow: f64, outlet_pressure: f64) -> Self {
        Self {
            inlet_pressure: vec![outlet_pressure; cells],
            outlet_pressure: vec![outlet_pressure; cells],
            cell_flow: vec![total_flow / cells as f64; cells],
            distribution_factor: vec![1.0; cells],
            reference_pressure_drop: 0.0,
            passes: 0,
            converged: true,
        }
    }

    /// Place a distribution over `rows` into a list of `total_rows` entries.
    /// Rows not listed carry no flow and sit at `outlet_pressure`.
    pub fn scatter(self, rows: &[usize], total_rows: usize, outlet_pressure: f64) -> Self {
        let mut full = Self {
            inlet_pressure: vec![outlet_pressure; total_rows],
            outlet_pressure: vec![outlet_pressure; total_rows],
            cell_flow: vec![0.0; total_rows],
            distribution_factor: vec![0.0; total_rows],
            ..self
        };
        for (k, &row) in rows.iter().enumerate() {
            full.inlet_pressure[row] = self.inlet_pressure[k];
            full.outlet_pressure[row] = self.outlet_pressure[k];
            full.cell_flow[row] = self.cell_flow[k];
            full.distribution_factor[row] = self.distribution_factor[k];
        }
        full
    }
}

fn section_drop(
    header: &HeaderSegment,
    fluid: HeaderFluid,
    friction: &dyn FrictionModel,
    segment: usize,
    flow_up: f64,
    flow_down: f64,
) -> StackResult<f64> {
    let area = header.cross_area();
    let v_up = flow_up / (fluid.density * area);
    let v_down = flow_down / (fluid.density * area);
    let v_mean = 0.5 * (v_up.abs() + v_down.abs());
    let fanning = if v_mean > 0.0 {
        let re = reynolds(fluid.density, v_mean, header.hydraulic_diameter(), fluid.viscosity)?;
        friction.fanning(re, segment)?
    } else {
        0.0
    };
    Ok(header_pressure_drop(
        header,
        fluid.density,
        fanning,
        v_up,
        v_down,
    )?)
}

/// Inlet pressures relative to the first port and absolute outlet pressures
/// for the given cell flows.
pub fn header_pressures(
    input: &ManifoldInput,
    flows: &[f64],
    friction: &dyn FrictionModel,
) -> StackResult<(Vec<f64>, Vec<f64>)> {
    let n = flows.len();
    // Inlet header is fed before port 0; F[q] arrives at port q.
    let mut arriving = vec![0.0; n];
    let mut acc = 0.0;
    for q in (0..n).rev() {
        acc += flows[q];
        arriving[q] = acc;
    }
    let mut inlet_rel = vec![0.0; n];
    for q in 1..n {
        let drop = section_drop(
            &input.inlet_segment,
            input.inlet_fluid,
            friction,
            q - 1,
            arriving[q - 1],
            arriving[q],
        )?;
        inlet_rel[q] = inlet_rel[q - 1] - drop;
    }

    let out: Vec<f64> = flows
        .iter()
        .zip(&input.outlet_ratio)
        .map(|(m, r)| m * r)
        .collect();
    let mut outlet = vec![input.outlet_pressure; n];
    match input.kind {
        ManifoldKind::Z => {
            // Leaves after the last port; G[q] flows from port q to q + 1.
            let mut leaving = vec![0.0; n];
            let mut acc = 0.0;
            for q in 0..n {
                acc += out[q];
                leaving[q] = acc;
            }
            for q in (1..n).rev() {
                let drop = section_drop(
                    &input.outlet_segment,
                    input.outlet_fluid,
                    friction,
                    q - 1,
                    leaving[q - 1],
                    leaving[q],
                )?;
                outlet[q - 1] = outlet[q] + drop;
            }
        }
        ManifoldKind::U => {
            // Leaves before port 0; H[q] flows from port q to q - 1.
            let mut leaving = vec![0.0; n];
            let mut acc = 0.0;
            for q in (0..n).rev() {
                acc += out[q];
                leaving[q] = acc;
            }
            for q in 1..n {
                let drop = section_drop(
                    &input.outlet_segment,
                    input.outlet_fluid,
                    friction,
                    q - 1,
                    leaving[q],
                    leaving[q - 1],
                )?;
                outlet[q] = outlet[q - 1] + drop;
            }
        }
    }
    Ok((inlet_rel, outlet))
}

/// Distribute `input.total_flow` over the cells.
///
/// Every pass reproduces the header flow exactly; passes repeat until the
/// largest relative change of a cell flow drops below `tolerance`.
pub fn distribute(
    input: &ManifoldInput,
    friction: &dyn FrictionModel,
    tolerance: f64,
    max_passes: usize,
    circuit: &'static str,
) -> StackResult<FlowDistribution> {
    let n = input.cell_flow.len();
    if n == 0 || input.outlet_ratio.len() != n {
        return Err(StackError::Numeric(sf_core::SfError::LengthMismatch {
            what: "manifold cell arrays",
            expected: n,
            actual: input.outlet_ratio.len(),
        }));
    }
    if !(input.reference_pressure_drop > 0.0 && input.reference_flow > 0.0) {
        return Err(StackError::NonPhysical {
            what: "reference cell pressure drop",
            value: input.reference_pressure_drop,
        });
    }
    let permeability = input.reference_flow / input.reference_pressure_drop;

    let mut flows = input.cell_flow.clone();
    let mut result = None;
    for pass in 1..=max_passes.max(1) {
        let (inlet_rel, outlet) = header_pressures(input, &flows, friction)?;
        let offset: Vec<f64> = (0..n)
            .map(|q| inlet_rel[q] - (outlet[q] - outlet[0]))
            .collect();
        let ref_dp = (input.total_flow / permeability - offset.iter().sum::<f64>()) / n as f64;

        let new_flows: Vec<f64> = offset.iter().map(|d| permeability * (ref_dp + d)).collect();
        if let Some((cell, flow)) = new_flows.iter().enumerate().find(|(_, m)| !(**m > 0.0)) {
            tracing::warn!(circuit, cell, flow, "header starves a cell");
            return Err(StackError::FlowMaldistribution {
                circuit,
                cell,
                flow: *flow,
            });
        }
        let change = new_flows
            .iter()
            .zip(&flows)
            .map(|(a, b)| ((a - b) / a).abs())
            .fold(0.0, f64::max);
        flows = new_flows;

        let inlet_pressure: Vec<f64> = inlet_rel.iter().map(|p| outlet[0] + ref_dp + p).collect();
        let distribution_factor = (0..n)
            .map(|q| (inlet_pressure[q] - outlet[q]) / ref_dp)
            .collect();
        let converged = change < tolerance;
        result = Some(FlowDistribution {
            inlet_pressure,
            outlet_pressure: outlet,
            cell_flow: flows.clone(),
            distribution_factor,
            reference_pressure_drop: ref_dp,
            passes: pass,
            converged,
        });
        if converged {
            break;
        }
    }
    let result = result.ok_or(StackError::NonPhysical {
        what: "manifold passes",
        value: 0.0,
    })?;
    if !result.converged {
        tracing::debug!(circuit, passes = result.passes, "manifold distribution not settled");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_fluids::CrossSection;

    fn header(diameter: f64) -> HeaderSegment {
        HeaderSegment {
            length: 5e-3,
            cross_section: CrossSection::Circular { diameter },
            loss_coefficient: 0.4,
        }
    }

    fn input(kind: ManifoldKind, cells: usize) -> ManifoldInput {
        ManifoldInput {
            kind,
            inlet_segment: header(3e-3),
            outlet_segment: header(3e-3),
            outlet_pressure: 1.0e5,
            inlet_fluid: HeaderFluid {
                density: 0.8,
                viscosity: 2.5e-5,
            },
            outlet_fluid: HeaderFluid {
                density: 0.75,
                viscosity: 2.5e-5,
            },
            cell_flow: vec![2e-5; cells],
            outlet_ratio: vec![0.95; cells],
            reference_pressure_drop: 400.0,
            reference_flow: 2e-5,
            total_flow: 2e-5 * cells as f64,
        }
    }

    #[test]
    fn single_cell_takes_all_flow() {
        let d = distribute(&input(ManifoldKind::U, 1), &FanningCorrelation, 1e-8, 20, "cathode")
            .unwrap();
        assert_eq!(d.cell_flow.len(), 1);
        assert!((d.cell_flow[0] - 2e-5).abs() < 1e-18);
        assert!((d.reference_pressure_drop - 400.0).abs() < 1e-9);
        assert!(d.converged);
    }

    #[test]
    fn flows_sum_to_header_flow() {
        for kind in [ManifoldKind::U, ManifoldKind::Z] {
            let inp = input(kind, 6);
            let d = distribute(&inp, &FanningCorrelation, 1e-10, 50, "cathode").unwrap();
            let total: f64 = d.cell_flow.iter().sum();
            assert!((total - inp.total_flow).abs() < 1e-12 * inp.total_flow);
            assert!(d.converged);
            assert!(d.passes >= 2);
        }
    }

    #[test]
    fn u_manifold_starves_far_cells() {
        let d = distribute(&input(ManifoldKind::U, 6), &FanningCorrelation, 1e-10, 50, "cathode")
            .unwrap();
        // In a U header with pressure recovery in the inlet the last cells
        // see a different drop than the first; the spread must be visible
        // but mild.
        let min = d.cell_flow.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = d.cell_flow.iter().cloned().fold(0.0, f64::max);
        assert!(max > min);
        assert!(max / min < 1.5);
        for (a, m) in d.distribution_factor.iter().zip(&d.cell_flow) {
            assert!((a * d.reference_pressure_drop * 2e-5 / 400.0 - m).abs() < 1e-15);
        }
    }

    #[test]
    fn z_outlet_pressure_rises_upstream() {
        let inp = input(ManifoldKind::Z, 4);
        let (_, outlet) = header_pressures(&inp, &inp.cell_flow, &FanningCorrelation).unwrap();
        assert_eq!(outlet[3], 1.0e5);
        assert!(outlet.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn wider_outlet_header_lowers_outlet_pressure_rise() {
        let narrow = input(ManifoldKind::Z, 4);
        let wide = ManifoldInput {
            outlet_segment: header(6e-3),
            ..narrow.clone()
        };
        let (in_narrow, out_narrow) =
            header_pressures(&narrow, &narrow.cell_flow, &FanningCorrelation).unwrap();
        let (in_wide, out_wide) =
            header_pressures(&wide, &wide.cell_flow, &FanningCorrelation).unwrap();
        assert_eq!(in_narrow, in_wide);
        assert!(out_wide[0] - out_wide[3] < out_narrow[0] - out_narrow[3]);
    }

    #[test]
    fn rectangular_headers_distribute() {
        let slot = HeaderSegment {
            length: 5e-3,
            cross_section: CrossSection::Rectangular {
                width: 4e-3,
                height: 2e-3,
            },
            loss_coefficient: 0.4,
        };
        let inp = ManifoldInput {
            inlet_segment: slot,
            outlet_segment: slot,
            ..input(ManifoldKind::U, 5)
        };
        let d = distribute(&inp, &FanningCorrelation, 1e-10, 50, "coolant").unwrap();
        let total: f64 = d.cell_flow.iter().sum();
        assert!((total - inp.total_flow).abs() < 1e-12 * inp.total_flow);
        assert!(d.converged);
    }

    #[test]
    fn scatter_leaves_missing_rows_dry() {
        let d = FlowDistribution::uniform(2, 4.0, 1.0e5).scatter(&[1, 2], 3, 9.0e4);
        assert_eq!(d.cell_flow, vec![0.0, 2.0, 2.0]);
        assert_eq!(d.inlet_pressure, vec![9.0e4, 1.0e5, 1.0e5]);
        assert_eq!(d.distribution_factor, vec![0.0, 1.0, 1.0]);
        assert!(d.converged);
    }

    #[derive(Debug)]
    struct Steep;

    impl FrictionModel for Steep {
        fn fanning(&self, _re: f64, _segment: usize) -> StackResult<f64> {
            Ok(5.0e4)
        }
    }

    #[test]
    fn starved_cell_is_a_domain_violation() {
        let err = distribute(&input(ManifoldKind::Z, 5), &Steep, 1e-8, 20, "anode").unwrap_err();
        assert!(matches!(err, StackError::FlowMaldistribution { circuit: "anode", .. }));
        assert!(err.is_domain_violation());
    }
}
