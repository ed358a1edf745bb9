//! Membrane ohmic loss with a temperature-dependent area-specific resistance.

use crate::common::check_positive;
use crate::error::{CellError, CellResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MembraneParams {
    /// Thickness [m]
    pub thickness: f64,
    /// Area-specific resistance at 0 K, `r_base` in `ω = r_base - r_slope T` [Ω m²]
    pub resistance_base: f64,
    /// Decrease of the area-specific resistance per kelvin [Ω m²/K]
    pub resistance_slope: f64,
    /// Through-plane thermal conductivity [W/(m K)]
    pub thermal_conductivity: f64,
    /// Include the ohmic loss in the cell voltage
    pub calc_loss: bool,
}

impl MembraneParams {
    pub fn validate(&self) -> CellResult<()> {
        check_positive(self.thickness, "membrane thickness")?;
        check_positive(self.resistance_base, "membrane base resistance")?;
        check_positive(self.thermal_conductivity, "membrane thermal conductivity")?;
        if !self.resistance_slope.is_finite() || self.resistance_slope < 0.0 {
            return Err(CellError::NonPhysical {
                what: "membrane resistance slope",
                value: self.resistance_slope,
            });
        }
        Ok(())
    }

    /// Area-specific resistance at temperature `t` (K).
    pub fn resistance(&self, t: f64) -> f64 {
        self.resistance_base - self.resistance_slope * t
    }
}

#[derive(Clone, Debug)]
pub struct Membrane {
    params: MembraneParams,
    resistance: Vec<f64>,
    loss: Vec<f64>,
}

impl Membrane {
    pub fn new(params: MembraneParams, elements: usize) -> CellResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            resistance: vec![0.0; elements],
            loss: vec![0.0; elements],
        })
    }

    /// Evaluate resistance and ohmic loss from element temperatures and currents.
    pub fn update(&mut self, temperature: &[f64], current: &[f64]) -> CellResult<()> {
        if temperature.len() != self.loss.len() || current.len() != self.loss.len() {
            return Err(CellError::InvalidArg {
                what: "membrane profile length differs from element count",
            });
        }
        for (e, (t, i)) in temperature.iter().zip(current).enumerate() {
            let omega = self.params.resistance(*t);
            if !(omega > 0.0) {
                return Err(CellError::MembraneResistance {
                    element: e,
                    value: omega,
                });
            }
            self.resistance[e] = omega;
            self.loss[e] = if self.params.calc_loss { omega * i } else { 0.0 };
        }
        Ok(())
    }

    pub fn params(&self) -> &MembraneParams {
        &self.params
    }

    /// Area-specific resistance per element [Ω m²].
    pub fn resistance(&self) -> &[f64] {
        &self.resistance
    }

    /// Ohmic voltage loss per element [V].
    pub fn loss(&self) -> &[f64] {
        &self.loss
    }

    /// Slope of the ohmic loss with respect to current density.
    pub fn loss_slope(&self) -> Vec<f64> {
        if self.params.calc_loss {
            self.resistance.clone()
        } else {
            vec![0.0; self.resistance.len()]
        }
    }
}
