//! Water saturation pressure.

use sf_core::numeric::polyval;

use crate::error::{FluidError, FluidResult};

// log10(p_sat / bar) as a cubic in Celsius.
const LOG10_PSAT_BAR: [f64; 4] = [1.4454e-7, -9.1837e-5, 0.029_53, -2.1794];

const T_MIN: f64 = 273.15;
const T_MAX: f64 = 523.15;

/// Saturation pressure of water in Pa at absolute temperature `t` (K).
pub fn saturation_pressure(t: f64) -> FluidResult<f64> {
    if !t.is_finite() {
        return Err(FluidError::NonPhysical {
            what: "saturation temperature",
            value: t,
        });
    }
    if !(T_MIN..=T_MAX).contains(&t) {
        return Err(FluidError::OutOfRange {
            what: "saturation temperature",
            value: t,
        });
    }
    let celsius = t - 273.15;
    Ok(1.0e5 * 10f64.powf(polyval(&LOG10_PSAT_BAR, celsius)))
}
