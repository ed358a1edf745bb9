//! Physical constants and the per-run operating point.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SfError;

/// Universal constants used by the electrochemistry and heat balance.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicalConstants {
    /// Faraday constant, C/mol.
    pub faraday: f64,
    /// Molar gas constant, J/(mol K).
    pub gas_constant: f64,
    /// Molar enthalpy of evaporation of water, J/mol.
    pub h_vap: f64,
    /// Thermoneutral voltage of the hydrogen oxidation, V.
    pub thermoneutral_voltage: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            faraday: 96_485.332_9,
            gas_constant: 8.314_459_848,
            h_vap: 45_400.0,
            thermoneutral_voltage: 1.28,
        }
    }
}

/// Load target for one simulation case.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperatingPoint {
    /// Stack-average current density, A/m².
    pub target_current_density: f64,
}

impl OperatingPoint {
    pub fn new(target_current_density: f64) -> Result<Self, SfError> {
        if !target_current_density.is_finite() || target_current_density <= 0.0 {
            return Err(SfError::InvalidArg {
                what: "target current density must be positive and finite",
            });
        }
        Ok(Self {
            target_current_density,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operating_point_rejects_non_positive() {
        assert!(OperatingPoint::new(4000.0).is_ok());
        assert!(OperatingPoint::new(0.0).is_err());
        assert!(OperatingPoint::new(-1.0).is_err());
        assert!(OperatingPoint::new(f64::NAN).is_err());
    }

    #[test]
    fn default_constants_are_positive() {
        let c = PhysicalConstants::default();
        assert!(c.faraday > 9.6e4 && c.gas_constant > 8.3);
        assert!(c.thermoneutral_voltage > 1.2);
    }
}
