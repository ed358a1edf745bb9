//! Dimensionless-number and pressure-drop helpers for channels and headers.

use crate::error::{FluidError, FluidResult, check_positive};

/// Reynolds number below which flow is treated as laminar.
pub const RE_LAMINAR: f64 = 2300.0;

/// Reynolds number `ρ v d_h / μ`. Flow speed may be zero; the magnitude is used.
pub fn reynolds(rho: f64, velocity: f64, d_h: f64, mu: f64) -> FluidResult<f64> {
    let rho = check_positive(rho, "density")?;
    let d_h = check_positive(d_h, "hydraulic diameter")?;
    let mu = check_positive(mu, "viscosity")?;
    if !velocity.is_finite() {
        return Err(FluidError::NonPhysical {
            what: "velocity",
            value: velocity,
        });
    }
    Ok(rho * velocity.abs() * d_h / mu)
}

/// Darcy friction factor for fully developed laminar flow, `64 / Re`.
pub fn laminar_darcy_friction_factor(re: f64) -> FluidResult<f64> {
    let re = check_positive(re, "Reynolds number")?;
    Ok(64.0 / re)
}

/// Fanning friction factor: `16 / Re` when laminar, Blasius `0.0791 Re^-0.25` otherwise.
pub fn fanning_friction_factor(re: f64) -> FluidResult<f64> {
    let re = check_positive(re, "Reynolds number")?;
    if re < RE_LAMINAR {
        Ok(16.0 / re)
    } else {
        Ok(0.0791 * re.powf(-0.25))
    }
}

/// Flow cross-section of a header or channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CrossSection {
    Circular { diameter: f64 },
    Rectangular { width: f64, height: f64 },
}

impl CrossSection {
    pub fn area(&self) -> f64 {
        match *self {
            CrossSection::Circular { diameter } => 0.25 * std::f64::consts::PI * diameter * diameter,
            CrossSection::Rectangular { width, height } => width * height,
        }
    }

    pub fn perimeter(&self) -> f64 {
        match *self {
            CrossSection::Circular { diameter } => std::f64::consts::PI * diameter,
            CrossSection::Rectangular { width, height } => 2.0 * (width + height),
        }
    }

    /// `4 A / P`; the diameter itself for a circle.
    pub fn hydraulic_diameter(&self) -> f64 {
        match *self {
            CrossSection::Circular { diameter } => diameter,
            CrossSection::Rectangular { .. } => 4.0 * self.area() / self.perimeter(),
        }
    }
}

/// One header section between two neighbouring cell ports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeaderSegment {
    /// Section length [m]
    pub length: f64,
    pub cross_section: CrossSection,
    /// Momentum-change coefficient at a branch junction [-]
    pub loss_coefficient: f64,
}

impl HeaderSegment {
    pub fn cross_area(&self) -> f64 {
        self.cross_section.area()
    }

    pub fn hydraulic_diameter(&self) -> f64 {
        self.cross_section.hydraulic_diameter()
    }
}

/// Pressure drop of a straight channel with bends: laminar or Blasius wall
/// friction over `length` plus `bends · ζ` dynamic heads.
pub fn channel_pressure_drop(
    section: &CrossSection,
    length: f64,
    bend_losses: f64,
    mass_flow: f64,
    rho: f64,
    mu: f64,
) -> FluidResult<f64> {
    let rho = check_positive(rho, "channel density")?;
    let area = check_positive(section.area(), "channel cross-section")?;
    let d_h = section.hydraulic_diameter();
    let velocity = mass_flow / (rho * area);
    let re = reynolds(rho, velocity, d_h, mu)?;
    if re == 0.0 {
        return Ok(0.0);
    }
    let darcy = 4.0 * fanning_friction_factor(re)?;
    let dp = (darcy * length / d_h + bend_losses) * 0.5 * rho * velocity * velocity;
    if dp.is_finite() {
        Ok(dp)
    } else {
        Err(FluidError::NonPhysical {
            what: "channel pressure drop",
            value: dp,
        })
    }
}

/// Pressure difference `p_up - p_down` over a header section.
///
/// Friction uses the mean velocity of the section and the supplied Fanning
/// factor: `4 f L / d · ρ v̄² / 2`. The junction term
/// `k ρ (v_down² - v_up²) / 2` is negative where the stream decelerates
/// (pressure recovery in a dividing header).
pub fn header_pressure_drop(
    segment: &HeaderSegment,
    rho: f64,
    fanning: f64,
    v_up: f64,
    v_down: f64,
) -> FluidResult<f64> {
    let rho = check_positive(rho, "header density")?;
    let v_mean = 0.5 * (v_up.abs() + v_down.abs());
    let friction =
        4.0 * fanning * segment.length / segment.hydraulic_diameter() * 0.5 * rho * v_mean * v_mean;
    let momentum = segment.loss_coefficient * 0.5 * rho * (v_down * v_down - v_up * v_up);
    let dp = friction + momentum;
    if dp.is_finite() {
        Ok(dp)
    } else {
        Err(FluidError::NonPhysical {
            what: "header pressure drop",
            value: dp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reynolds_is_direction_independent() {
        let a = reynolds(1.0, 2.0, 0.01, 1e-5).unwrap();
        let b = reynolds(1.0, -2.0, 0.01, 1e-5).unwrap();
        assert_eq!(a, b);
        assert!((a - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn friction_factor_regimes() {
        assert!((fanning_friction_factor(1000.0).unwrap() - 0.016).abs() < 1e-15);
        assert!((laminar_darcy_friction_factor(1000.0).unwrap() - 0.064).abs() < 1e-15);
        let turb = fanning_friction_factor(1.0e4).unwrap();
        assert!((turb - 0.0791 / 10.0).abs() < 1e-12);
        assert!(fanning_friction_factor(0.0).is_err());
    }

    #[test]
    fn decelerating_header_recovers_pressure_without_friction() {
        let seg = HeaderSegment {
            length: 0.01,
            cross_section: CrossSection::Circular { diameter: 0.025 },
            loss_coefficient: 1.0,
        };
        let dp = header_pressure_drop(&seg, 1.0, 0.0, 2.0, 1.0).unwrap();
        assert!((dp + 1.5).abs() < 1e-12);
    }

    #[test]
    fn friction_always_adds_loss() {
        let seg = HeaderSegment {
            length: 0.01,
            cross_section: CrossSection::Circular { diameter: 0.025 },
            loss_coefficient: 0.0,
        };
        let dp = header_pressure_drop(&seg, 1.0, 0.01, 1.0, 1.0).unwrap();
        assert!(dp > 0.0);
        assert!(seg.cross_area() > 4.9e-4 && seg.cross_area() < 4.91e-4);
    }

    #[test]
    fn rectangular_section_geometry() {
        let square = CrossSection::Rectangular {
            width: 10e-3,
            height: 10e-3,
        };
        assert!((square.area() - 1e-4).abs() < 1e-18);
        assert!((square.hydraulic_diameter() - 10e-3).abs() < 1e-15);
        let slot = CrossSection::Rectangular {
            width: 2e-3,
            height: 1e-3,
        };
        assert!((slot.hydraulic_diameter() - 4.0e-3 / 3.0).abs() < 1e-15);

        // Same area: the slot rubs more wall than the circle.
        let round = CrossSection::Circular {
            diameter: (4.0 * slot.area() / std::f64::consts::PI).sqrt(),
        };
        let seg = |cross_section| HeaderSegment {
            length: 0.01,
            cross_section,
            loss_coefficient: 0.0,
        };
        let dp_slot = header_pressure_drop(&seg(slot), 1.0, 0.01, 1.0, 1.0).unwrap();
        let dp_round = header_pressure_drop(&seg(round), 1.0, 0.01, 1.0, 1.0).unwrap();
        assert!(dp_slot > dp_round);
    }

    #[test]
    fn laminar_channel_drop_is_linear_in_flow() {
        let slot = CrossSection::Rectangular {
            width: 2e-3,
            height: 1e-3,
        };
        let a = channel_pressure_drop(&slot, 0.14, 0.0, 1e-4, 850.0, 2e-3).unwrap();
        let b = channel_pressure_drop(&slot, 0.14, 0.0, 2e-4, 850.0, 2e-3).unwrap();
        assert!(a > 0.0);
        assert!((b / a - 2.0).abs() < 1e-12);
        let bends = channel_pressure_drop(&slot, 0.14, 0.2, 1e-4, 850.0, 2e-3).unwrap();
        assert!(bends > a);
        assert_eq!(channel_pressure_drop(&slot, 0.14, 0.2, 0.0, 850.0, 2e-3).unwrap(), 0.0);
    }
}
