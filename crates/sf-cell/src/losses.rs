//! Electrode overpotentials after Kulikovsky's closed-form catalyst-layer model.
//!
//! All functions here are pure: they take the local current density and
//! reactant concentrations and return voltage losses per element. The
//! half-cell owns the state they are evaluated on.

use crate::common::{EPSILON_CURRENT, SENTINEL_LOSS, check_positive};
use crate::error::{CellError, CellResult};

/// Depletion margins at or below this count as limiting (round-off guard).
pub const MARGIN_FLOOR: f64 = 1e-12;

/// Charge number of the transport terms. The catalyst-layer model is the
/// oxygen-electrode one and is applied unchanged to the anode.
pub const TRANSPORT_CHARGE_NUMBER: f64 = 4.0;

/// Catalyst- and diffusion-layer parameters of one electrode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElectrodeParams {
    /// Tafel slope [V]
    pub tafel_slope: f64,
    /// Volumetric exchange current density [A/m³]
    pub exchange_current_density: f64,
    /// Proton conductivity of the catalyst layer [S/m]
    pub cl_proton_conductivity: f64,
    /// Reactant diffusivity in the catalyst layer [m²/s]
    pub cl_diffusivity: f64,
    /// Reactant diffusivity in the gas-diffusion layer [m²/s]
    pub gdl_diffusivity: f64,
    /// Catalyst-layer thickness [m]
    pub cl_thickness: f64,
    /// Gas-diffusion-layer thickness [m]
    pub gdl_thickness: f64,
}

impl ElectrodeParams {
    pub fn validate(&self) -> CellResult<()> {
        check_positive(self.tafel_slope, "tafel slope")?;
        check_positive(self.exchange_current_density, "exchange current density")?;
        check_positive(self.cl_proton_conductivity, "catalyst layer proton conductivity")?;
        check_positive(self.cl_diffusivity, "catalyst layer diffusivity")?;
        check_positive(self.gdl_diffusivity, "gas diffusion layer diffusivity")?;
        check_positive(self.cl_thickness, "catalyst layer thickness")?;
        check_positive(self.gdl_thickness, "gas diffusion layer thickness")?;
        Ok(())
    }

    /// Current density scale of the activation term, `sqrt(2 j0 σ b)`.
    pub fn i_sigma(&self) -> f64 {
        (2.0 * self.exchange_current_density * self.cl_proton_conductivity * self.tafel_slope)
            .sqrt()
    }

    /// Characteristic current density of proton transport, `σ b / l_cl`.
    pub fn i_star(&self) -> f64 {
        self.cl_proton_conductivity * self.tafel_slope / self.cl_thickness
    }
}

/// Per-term switches. A disabled term is reported as zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LossFlags {
    pub activation: bool,
    pub cl_diffusion: bool,
    pub gdl_diffusion: bool,
}

impl Default for LossFlags {
    fn default() -> Self {
        Self {
            activation: true,
            cl_diffusion: true,
            gdl_diffusion: true,
        }
    }
}

/// Voltage losses of one electrode, per element [V].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElectrodeLosses {
    pub activation: Vec<f64>,
    pub cl_diffusion: Vec<f64>,
    pub gdl_diffusion: Vec<f64>,
}

impl ElectrodeLosses {
    pub fn zeros(elements: usize) -> Self {
        Self {
            activation: vec![0.0; elements],
            cl_diffusion: vec![0.0; elements],
            gdl_diffusion: vec![0.0; elements],
        }
    }

    pub fn len(&self) -> usize {
        self.activation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activation.is_empty()
    }

    pub fn total(&self, element: usize) -> f64 {
        self.activation[element] + self.cl_diffusion[element] + self.gdl_diffusion[element]
    }

    pub fn totals(&self) -> Vec<f64> {
        (0..self.len()).map(|e| self.total(e)).collect()
    }
}

/// Result of a loss evaluation along a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct LossProfile {
    pub losses: ElectrodeLosses,
    /// First element (in flow order) where the limiting current was reached,
    /// with its depletion margin.
    pub limited_at: Option<(usize, f64)>,
}

/// Inputs shared by every element of one electrode.
#[derive(Clone, Copy, Debug)]
pub struct LossContext<'a> {
    pub params: &'a ElectrodeParams,
    pub flags: LossFlags,
    pub faraday: f64,
    /// Charge number used by the limiting current and catalyst-layer terms
    pub charge_number: f64,
    pub direction: i8,
    pub electrode: &'static str,
}

/// Depletion margin `1 - i l_gdl / (z F D_gdl c)`; zero at the limiting current.
pub fn limiting_margin(ctx: &LossContext<'_>, current: f64, concentration: f64) -> f64 {
    let p = ctx.params;
    1.0 - current * p.gdl_thickness
        / (ctx.charge_number * ctx.faraday * p.gdl_diffusivity * concentration)
}

/// Activation overpotential `b asinh((i/iσ)² / (2 (c/c_up) (1 - exp(-i / 2i*))))`,
/// with `c_up` the concentration at the element's upstream node.
///
/// Returns `None` when the argument is not representable.
pub fn activation_loss(
    params: &ElectrodeParams,
    current: f64,
    concentration: f64,
    upstream_concentration: f64,
) -> Option<f64> {
    if current <= EPSILON_CURRENT {
        return Some(0.0);
    }
    let ratio = concentration / upstream_concentration;
    let saturation = 1.0 - (-current / (2.0 * params.i_star())).exp();
    let arg = (current / params.i_sigma()).powi(2) / (2.0 * ratio * saturation);
    let loss = params.tafel_slope * arg.asinh();
    loss.is_finite().then_some(loss)
}

/// Catalyst-layer transport overpotential, scaled by the depletion margin.
pub fn cl_diffusion_loss(
    ctx: &LossContext<'_>,
    current: f64,
    concentration: f64,
    margin: f64,
) -> f64 {
    if current <= EPSILON_CURRENT {
        return 0.0;
    }
    let p = ctx.params;
    let i_hat = current / p.i_star();
    let root = (2.0 * i_hat).sqrt();
    let beta = root / (1.0 + (1.12 * i_hat).sqrt() * root.exp())
        + std::f64::consts::PI * i_hat / (2.0 + i_hat);
    let scale = p.cl_proton_conductivity * p.tafel_slope * p.tafel_slope
        / (ctx.charge_number * ctx.faraday * p.cl_diffusivity * concentration);
    scale * (i_hat - (1.0 + i_hat * i_hat / (beta * beta)).log10()) / margin
}

/// Gas-diffusion-layer overpotential `-b log10(margin)` for a positive margin.
pub fn gdl_diffusion_loss(params: &ElectrodeParams, margin: f64) -> f64 {
    -params.tafel_slope * margin.log10()
}

/// Node values on the upstream side of every element.
pub fn upstream_nodes(nodes: &[f64], direction: i8) -> Vec<f64> {
    match nodes.len() {
        0 => Vec::new(),
        n if direction >= 0 => nodes[..n - 1].to_vec(),
        _ => nodes[1..].to_vec(),
    }
}

/// Evaluate all three losses along the channel.
///
/// `concentration` holds element means and `upstream` the concentration at
/// each element's upstream node. Elements are visited in flow order. Once the depletion margin is at or
/// below zero, that element and every element downstream of it receive the
/// sentinel loss for each enabled term, and the failure position is reported.
pub fn electrode_losses(
    ctx: &LossContext<'_>,
    current: &[f64],
    concentration: &[f64],
    upstream: &[f64],
) -> CellResult<LossProfile> {
    if current.len() != concentration.len() || current.len() != upstream.len() {
        return Err(CellError::InvalidArg {
            what: "current and concentration profiles differ in length",
        });
    }
    let n = current.len();
    if let Some((element, value)) = current
        .iter()
        .copied()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    {
        return Err(CellError::NegativeCurrentDensity { element, value });
    }

    let diffusion_active = ctx.flags.cl_diffusion || ctx.flags.gdl_diffusion;
    let order: Vec<usize> = if ctx.direction >= 0 {
        (0..n).collect()
    } else {
        (0..n).rev().collect()
    };

    let mut losses = ElectrodeLosses::zeros(n);
    let mut limited_at = None;
    for e in order {
        let i = current[e];
        let c = concentration[e];
        let margin = limiting_margin(ctx, i, c);

        if limited_at.is_none() && diffusion_active && (margin.is_nan() || margin <= MARGIN_FLOOR) {
            limited_at = Some((e, margin));
        }
        if limited_at.is_some() {
            if ctx.flags.activation {
                losses.activation[e] = SENTINEL_LOSS;
            }
            if ctx.flags.cl_diffusion {
                losses.cl_diffusion[e] = SENTINEL_LOSS;
            }
            if ctx.flags.gdl_diffusion {
                losses.gdl_diffusion[e] = SENTINEL_LOSS;
            }
            continue;
        }

        if ctx.flags.activation {
            losses.activation[e] = activation_loss(ctx.params, i, c, upstream[e])
                .ok_or(CellError::ActivationDomain {
                    electrode: ctx.electrode,
                    element: e,
                })?;
        }
        if ctx.flags.cl_diffusion {
            losses.cl_diffusion[e] = cl_diffusion_loss(ctx, i, c, margin);
        }
        if ctx.flags.gdl_diffusion {
            losses.gdl_diffusion[e] = gdl_diffusion_loss(ctx.params, margin);
        }
    }

    Ok(LossProfile { losses, limited_at })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ElectrodeParams {
        ElectrodeParams {
            tafel_slope: 0.03,
            exchange_current_density: 817.0,
            cl_proton_conductivity: 3.5,
            cl_diffusivity: 1.36e-8,
            gdl_diffusivity: 2.59e-6,
            cl_thickness: 10e-6,
            gdl_thickness: 200e-6,
        }
    }

    fn ctx(p: &ElectrodeParams, flags: LossFlags, direction: i8) -> LossContext<'_> {
        LossContext {
            params: p,
            flags,
            faraday: 96_485.332_9,
            charge_number: TRANSPORT_CHARGE_NUMBER,
            direction,
            electrode: "cathode",
        }
    }

    #[test]
    fn zero_current_gives_zero_losses() {
        let p = params();
        let c = ctx(&p, LossFlags::default(), 1);
        let out = electrode_losses(&c, &[0.0, 0.0], &[5.0, 5.0], &[5.0, 5.0]).unwrap();
        assert!(out.losses.totals().iter().all(|v| *v == 0.0));
        assert!(out.limited_at.is_none());
    }

    #[test]
    fn cathode_losses_have_expected_magnitude() {
        let p = params();
        let c = ctx(&p, LossFlags::default(), 1);
        let out = electrode_losses(&c, &[4000.0], &[5.0], &[5.0]).unwrap();
        let l = &out.losses;
        assert!((0.35..0.45).contains(&l.activation[0]), "{}", l.activation[0]);
        assert!((0.01..0.08).contains(&l.cl_diffusion[0]), "{}", l.cl_diffusion[0]);
        assert!((0.0..0.01).contains(&l.gdl_diffusion[0]), "{}", l.gdl_diffusion[0]);
    }

    #[test]
    fn margin_vanishes_at_limiting_current() {
        let p = params();
        let c = ctx(&p, LossFlags::default(), 1);
        let conc = 5.0;
        let i_lim = 4.0 * c.faraday * p.gdl_diffusivity * conc / p.gdl_thickness;
        assert!(limiting_margin(&c, i_lim, conc).abs() < 1e-12);
    }

    #[test]
    fn upstream_nodes_follow_flow_direction() {
        let nodes = [6.0, 5.0, 4.0];
        assert_eq!(upstream_nodes(&nodes, 1), vec![6.0, 5.0]);
        assert_eq!(upstream_nodes(&nodes, -1), vec![5.0, 4.0]);
        assert!(upstream_nodes(&[], 1).is_empty());
    }

    #[test]
    fn activation_uses_the_local_upstream_concentration() {
        // Far down the channel the element mean sits just below its own
        // upstream node but far below the inlet.
        let p = params();
        let c = ctx(&p, LossFlags::default(), 1);
        let (inlet, upstream, mean) = (5.0, 2.0, 1.9);
        let local = electrode_losses(&c, &[4000.0], &[mean], &[upstream]).unwrap();
        let expected = activation_loss(&p, 4000.0, mean, upstream).unwrap();
        assert_eq!(local.losses.activation[0], expected);
        let from_inlet = activation_loss(&p, 4000.0, mean, inlet).unwrap();
        assert!(from_inlet > expected + 0.01, "{from_inlet} vs {expected}");
    }

    #[test]
    fn sentinel_applies_downstream_in_flow_order() {
        let p = params();
        let conc = [5.0, 5.0, 0.1, 5.0];
        let i = [1000.0; 4];

        let fwd = electrode_losses(&ctx(&p, LossFlags::default(), 1), &i, &conc, &conc).unwrap();
        assert_eq!(fwd.limited_at.map(|(e, _)| e), Some(2));
        assert!(fwd.losses.gdl_diffusion[1] < 1.0);
        assert_eq!(fwd.losses.gdl_diffusion[2], SENTINEL_LOSS);
        assert_eq!(fwd.losses.gdl_diffusion[3], SENTINEL_LOSS);

        let bwd = electrode_losses(&ctx(&p, LossFlags::default(), -1), &i, &conc, &conc).unwrap();
        assert_eq!(bwd.limited_at.map(|(e, _)| e), Some(2));
        assert_eq!(bwd.losses.gdl_diffusion[0], SENTINEL_LOSS);
        assert!(bwd.losses.gdl_diffusion[3] < 1.0);
        assert!(bwd.losses.totals().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn disabled_terms_are_zero() {
        let p = params();
        let flags = LossFlags {
            activation: false,
            cl_diffusion: true,
            gdl_diffusion: false,
        };
        let conc = [5.0, 4.0];
        let out = electrode_losses(&ctx(&p, flags, 1), &[3000.0, 6000.0], &conc, &conc).unwrap();
        assert!(out.losses.activation.iter().all(|v| *v == 0.0));
        assert!(out.losses.gdl_diffusion.iter().all(|v| *v == 0.0));
        assert!(out.losses.cl_diffusion.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn negative_current_rejected() {
        let p = params();
        let conc = [5.0, 5.0];
        let err = electrode_losses(&ctx(&p, LossFlags::default(), 1), &[1.0, -1.0], &conc, &conc)
            .unwrap_err();
        assert!(matches!(
            err,
            CellError::NegativeCurrentDensity { element: 1, .. }
        ));
    }
}
