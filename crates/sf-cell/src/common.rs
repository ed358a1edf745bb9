//! Shared numeric guards and constants for the cell models.

use crate::error::{CellError, CellResult};
use sf_core::numeric::ensure_finite;

/// Floor applied to gas-phase concentrations (mol/m³).
pub const MIN_CONCENTRATION: f64 = 1e-6;

/// Loss assigned downstream of a limiting-current failure (V).
pub const SENTINEL_LOSS: f64 = 1e50;

/// Currents at or below this are treated as open circuit (A/m²).
pub const EPSILON_CURRENT: f64 = 1e-9;

/// Heat capacity of liquid water (J/(kg K)).
pub const CP_LIQUID_WATER: f64 = 4182.0;

/// Laminar Nusselt number for constant wall temperature.
pub const NUSSELT_LAMINAR: f64 = 3.66;

/// Ensure a value is finite, returning CellError if not.
pub fn check_finite(value: f64, what: &'static str) -> CellResult<f64> {
    ensure_finite(value, what).map_err(|_| CellError::NonPhysical { what, value })
}

/// Ensure a value is finite and strictly positive.
pub fn check_positive(value: f64, what: &'static str) -> CellResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CellError::NonPhysical { what, value })
    }
}

/// Validate a flow direction flag.
pub fn check_direction(direction: i8) -> CellResult<i8> {
    match direction {
        1 | -1 => Ok(direction),
        _ => Err(CellError::InvalidArg {
            what: "flow direction must be +1 or -1",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_finite() {
        assert!(check_finite(1.0, "test").is_ok());
        assert!(check_finite(f64::NAN, "test").is_err());
        assert!(check_finite(f64::INFINITY, "test").is_err());
    }

    #[test]
    fn test_check_positive() {
        assert!(check_positive(1e-3, "t").is_ok());
        assert!(check_positive(0.0, "t").is_err());
    }

    #[test]
    fn test_check_direction() {
        assert_eq!(check_direction(1).unwrap(), 1);
        assert_eq!(check_direction(-1).unwrap(), -1);
        assert!(check_direction(0).is_err());
        assert!(check_direction(2).is_err());
    }
}
