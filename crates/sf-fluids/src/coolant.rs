//! Coolant with temperature-independent properties.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FluidResult, check_positive};

/// Liquid coolant properties, held constant over the operating range.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoolantProperties {
    /// Specific heat [J/(kg K)]
    pub cp: f64,
    /// Density [kg/m³]
    pub density: f64,
    /// Dynamic viscosity [Pa s]
    pub viscosity: f64,
    /// Thermal conductivity [W/(m K)]
    pub conductivity: f64,
}

impl Default for CoolantProperties {
    /// Synthetic heat-transfer oil around 160 °C.
    fn default() -> Self {
        Self {
            cp: 2200.0,
            density: 850.0,
            viscosity: 2.0e-3,
            conductivity: 0.12,
        }
    }
}

impl CoolantProperties {
    pub fn validate(&self) -> FluidResult<()> {
        check_positive(self.cp, "coolant heat capacity")?;
        check_positive(self.density, "coolant density")?;
        check_positive(self.viscosity, "coolant viscosity")?;
        check_positive(self.conductivity, "coolant conductivity")?;
        Ok(())
    }

    pub fn prandtl(&self) -> f64 {
        self.viscosity * self.cp / self.conductivity
    }
}
