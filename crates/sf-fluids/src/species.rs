//! Chemical species carried by the reactant channels.
//!
//! Property fits are 7th-order polynomials in absolute temperature (K),
//! coefficients ordered from the highest power down. Thermal conductivity
//! is fitted at 1 bar and 10 bar and interpolated linearly in pressure.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use sf_core::numeric::polyval;

use crate::error::{FluidError, FluidResult, check_positive};

/// Lower bound of the temperature range the fits were made on (K).
pub const T_FIT_MIN: f64 = 200.0;
/// Upper bound of the temperature range the fits were made on (K).
pub const T_FIT_MAX: f64 = 1000.0;

const P_FIT_LOW: f64 = 1.0e5;
const P_FIT_HIGH: f64 = 1.0e6;

/// Gas species relevant to hydrogen/air cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Species {
    /// Oxygen (O₂)
    O2,
    /// Hydrogen (H₂)
    H2,
    /// Nitrogen (N₂)
    N2,
    /// Water (H₂O)
    H2O,
}

struct PolyFits {
    cp: [f64; 8],
    visc: [f64; 8],
    lambda_low: [f64; 8],
    lambda_high: [f64; 8],
}

const OXYGEN: PolyFits = PolyFits {
    cp: [
        -8.66817221e-19, 4.73115002e-15, -1.15709215e-11, 1.66145697e-08, -1.50422620e-05,
        8.23507193e-03, -2.12067742, 1.10964386e+03,
    ],
    visc: [
        1.18758866e-26, -6.48183635e-23, 1.55753837e-19, -2.18596122e-16, 2.02541399e-13,
        -1.38130567e-10, 1.02085148e-07, -1.50063345e-06,
    ],
    lambda_low: [
        -1.58986421e-22, 8.03802084e-19, -1.67882604e-15, 1.84325862e-12, -1.11449899e-09,
        3.57769046e-07, 2.11463976e-05, 8.31514294e-03,
    ],
    lambda_high: [
        -1.79821722e-22, 9.07145474e-19, -1.89752639e-15, 2.10059733e-12, -1.29817069e-09,
        4.38946254e-07, -4.88815163e-07, 1.15869249e-02,
    ],
};

const HYDROGEN: PolyFits = PolyFits {
    cp: [
        2.75575856e-17, -1.58350769e-13, 3.93319791e-10, -5.48239691e-07, 4.61978745e-04,
        -2.32058478e-01, 6.35361636e+01, 7.25459677e+03,
    ],
    visc: [
        6.62607149e-27, -3.42854972e-23, 7.69171320e-20, -9.86354577e-17, 8.10498717e-14,
        -4.74743879e-11, 3.50618247e-08, 1.14582528e-06,
    ],
    lambda_low: [
        -1.24645824e-21, 6.61764024e-18, -1.52054216e-14, 1.99690675e-11, -1.49509678e-08,
        5.68819226e-06, -4.82527146e-04, 7.12531055e-02,
    ],
    lambda_high: [
        -1.27194170e-21, 6.74517329e-18, -1.54782877e-14, 2.02945953e-11, -1.51875168e-08,
        5.79536974e-06, -5.12222368e-04, 7.61461664e-02,
    ],
};

const NITROGEN: PolyFits = PolyFits {
    cp: [
        -5.97839654e-18, 2.58035023e-14, -4.51777701e-11, 4.09644416e-08, -2.06285776e-05,
        6.06476999e-03, -9.88549011e-01, 1.10768881e+03,
    ],
    visc: [
        1.53556927e-26, -8.08312960e-23, 1.85403378e-19, -2.44766231e-16, 2.08881853e-13,
        -1.27545734e-10, 8.53886431e-08, -3.89241700e-07,
    ],
    lambda_low: [
        -2.70705853e-22, 1.16336874e-18, -1.95546587e-15, 1.51768486e-12, -4.03713326e-10,
        -1.15746366e-07, 1.46652557e-04, -3.27592873e-03,
    ],
    lambda_high: [
        -2.89265541e-22, 1.25583526e-18, -2.15215826e-15, 1.75051772e-12, -5.71060853e-10,
        -4.11730776e-08, 1.26579523e-04, -1.99639546e-04,
    ],
};

const WATER: PolyFits = PolyFits {
    cp: [
        4.91358141e-18, -1.85174687e-14, 2.53707252e-11, -1.22872163e-08, -4.19918931e-06,
        7.45080766e-03, -2.56601734e+00, 2.12709233e+03,
    ],
    visc: [
        1.45183739e-25, -7.27081451e-22, 1.55686360e-18, -1.85885301e-15, 1.35158418e-12,
        -6.12002995e-10, 2.08858479e-07, -1.90872183e-05,
    ],
    lambda_low: [
        -7.69988150e-22, 3.81045861e-18, -7.88736102e-15, 8.77358057e-12, -5.61460795e-09,
        2.11880777e-06, -3.22515696e-04, 2.21293426e-02,
    ],
    lambda_high: [
        -9.94179604e-21, 4.66529326e-17, -9.19773736e-14, 9.85634165e-11, -6.18830008e-08,
        2.27982875e-05, -4.45126170e-03, 3.69981235e-01,
    ],
};

impl Species {
    pub const ALL: [Species; 4] = [Species::O2, Species::H2, Species::N2, Species::H2O];

    pub fn key(&self) -> &'static str {
        match self {
            Species::O2 => "O2",
            Species::H2 => "H2",
            Species::N2 => "N2",
            Species::H2O => "H2O",
        }
    }

    /// Molar mass in kg/mol.
    pub fn molar_mass(&self) -> f64 {
        match self {
            Species::O2 => 0.032,
            Species::H2 => 0.002_016,
            Species::N2 => 0.028,
            Species::H2O => 0.018,
        }
    }

    fn fits(&self) -> &'static PolyFits {
        match self {
            Species::O2 => &OXYGEN,
            Species::H2 => &HYDROGEN,
            Species::N2 => &NITROGEN,
            Species::H2O => &WATER,
        }
    }

    /// Specific heat capacity in J/(kg K).
    pub fn cp(&self, t: f64) -> FluidResult<f64> {
        let t = check_temperature(t)?;
        check_positive(polyval(&self.fits().cp, t), "species heat capacity")
    }

    /// Dynamic viscosity in Pa s.
    pub fn viscosity(&self, t: f64) -> FluidResult<f64> {
        let t = check_temperature(t)?;
        check_positive(polyval(&self.fits().visc, t), "species viscosity")
    }

    /// Thermal conductivity in W/(m K), linear in pressure between the two fits.
    pub fn conductivity(&self, t: f64, p: f64) -> FluidResult<f64> {
        let t = check_temperature(t)?;
        let p = check_positive(p, "pressure")?;
        let fits = self.fits();
        let low = polyval(&fits.lambda_low, t);
        let high = polyval(&fits.lambda_high, t);
        let lambda = low + (p - P_FIT_LOW) / (P_FIT_HIGH - P_FIT_LOW) * (high - low);
        check_positive(lambda, "species thermal conductivity")
    }
}

impl std::str::FromStr for Species {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "O2" | "OXYGEN" => Ok(Species::O2),
            "H2" | "HYDROGEN" => Ok(Species::H2),
            "N2" | "NITROGEN" => Ok(Species::N2),
            "H2O" | "WATER" => Ok(Species::H2O),
            _ => Err("unknown species"),
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

fn check_temperature(t: f64) -> FluidResult<f64> {
    if !t.is_finite() {
        return Err(FluidError::NonPhysical {
            what: "temperature",
            value: t,
        });
    }
    if !(T_FIT_MIN..=T_FIT_MAX).contains(&t) {
        return Err(FluidError::OutOfRange {
            what: "temperature for species fits",
            value: t,
        });
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_parse_and_display() {
        for s in Species::ALL {
            assert_eq!(s.key().parse::<Species>().unwrap(), s);
            assert_eq!(s.to_string(), s.key());
        }
        assert_eq!("water".parse::<Species>().unwrap(), Species::H2O);
        assert!("CH4".parse::<Species>().is_err());
    }

    #[test]
    fn properties_are_plausible_at_operating_temperature() {
        let t = 433.15;
        // Reference values within a few percent of tabulated data.
        let cp_o2 = Species::O2.cp(t).unwrap();
        assert!((900.0..1000.0).contains(&cp_o2), "cp O2 {cp_o2}");
        let cp_h2 = Species::H2.cp(t).unwrap();
        assert!((14_000.0..15_000.0).contains(&cp_h2), "cp H2 {cp_h2}");
        let mu_n2 = Species::N2.viscosity(t).unwrap();
        assert!((2.0e-5..2.6e-5).contains(&mu_n2), "mu N2 {mu_n2}");
        let k_h2 = Species::H2.conductivity(t, 1.0e5).unwrap();
        assert!((0.2..0.3).contains(&k_h2), "lambda H2 {k_h2}");
    }

    #[test]
    fn hydrogen_conductivity_rises_with_pressure() {
        let low = Species::H2.conductivity(400.0, 1.0e5).unwrap();
        let high = Species::H2.conductivity(400.0, 1.0e6).unwrap();
        assert!(high > low);
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        assert!(matches!(
            Species::O2.cp(50.0),
            Err(FluidError::OutOfRange { .. })
        ));
        assert!(matches!(
            Species::O2.viscosity(f64::NAN),
            Err(FluidError::NonPhysical { .. })
        ));
    }
}
