//! Ideal gas-mixture properties from species data.

use crate::error::{FluidError, FluidResult, check_positive};
use crate::species::Species;

/// Universal gas constant in J/(mol K).
pub const GAS_CONSTANT: f64 = 8.314_459_848;

/// Bulk properties of a gas mixture at one state point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixtureProperties {
    /// Molar mass [kg/mol]
    pub molar_mass: f64,
    /// Mass-weighted specific heat [J/(kg K)]
    pub cp: f64,
    /// Dynamic viscosity [Pa s]
    pub viscosity: f64,
    /// Thermal conductivity [W/(m K)]
    pub conductivity: f64,
    /// Specific gas constant [J/(kg K)]
    pub gas_constant: f64,
    /// Ideal-gas density [kg/m³]
    pub density: f64,
}

impl MixtureProperties {
    /// Evaluate mixture properties for mole fractions `x` of `species` at
    /// temperature `t` (K) and pressure `p` (Pa).
    ///
    /// Mole fractions are normalized before use.
    pub fn evaluate(species: &[Species], x: &[f64], t: f64, p: f64) -> FluidResult<Self> {
        let x = normalize(species, x)?;
        let p = check_positive(p, "mixture pressure")?;

        let mut cp_i = Vec::with_capacity(species.len());
        let mut mu_i = Vec::with_capacity(species.len());
        let mut lambda_i = Vec::with_capacity(species.len());
        for s in species {
            cp_i.push(s.cp(t)?);
            mu_i.push(s.viscosity(t)?);
            lambda_i.push(s.conductivity(t, p)?);
        }

        let molar_mass: f64 = species
            .iter()
            .zip(&x)
            .map(|(s, xi)| xi * s.molar_mass())
            .sum();
        let y = mass_fractions(species, &x)?;
        let cp = y.iter().zip(&cp_i).map(|(yi, c)| yi * c).sum();
        let viscosity = wilke_viscosity(species, &x, &mu_i)?;
        let conductivity = mixture_conductivity(species, &x, &mu_i, &lambda_i)?;
        let gas_constant = GAS_CONSTANT / molar_mass;
        let density = check_positive(p / (gas_constant * t), "mixture density")?;

        Ok(Self {
            molar_mass,
            cp,
            viscosity,
            conductivity,
            gas_constant,
            density,
        })
    }

    /// Prandtl number of the mixture.
    pub fn prandtl(&self) -> f64 {
        self.viscosity * self.cp / self.conductivity
    }
}

/// Convert mole fractions to mass fractions.
pub fn mass_fractions(species: &[Species], x: &[f64]) -> FluidResult<Vec<f64>> {
    let x = normalize(species, x)?;
    let weighted: Vec<f64> = species
        .iter()
        .zip(&x)
        .map(|(s, xi)| xi * s.molar_mass())
        .collect();
    let total: f64 = weighted.iter().sum();
    Ok(weighted.into_iter().map(|w| w / total).collect())
}

/// Mixture viscosity by Wilke's rule.
pub fn wilke_viscosity(species: &[Species], x: &[f64], mu: &[f64]) -> FluidResult<f64> {
    check_len(species, mu)?;
    let phi = interaction_matrix(species, mu);
    Ok(weighted_by_phi(x, mu, &phi))
}

/// Mixture conductivity by the Wassiljewa equation with Mason–Saxena coefficients.
pub fn mixture_conductivity(
    species: &[Species],
    x: &[f64],
    mu: &[f64],
    lambda: &[f64],
) -> FluidResult<f64> {
    check_len(species, mu)?;
    check_len(species, lambda)?;
    let phi = interaction_matrix(species, mu);
    Ok(weighted_by_phi(x, lambda, &phi))
}

fn interaction_matrix(species: &[Species], mu: &[f64]) -> Vec<Vec<f64>> {
    species
        .iter()
        .zip(mu)
        .map(|(si, mui)| {
            let mi = si.molar_mass();
            species
                .iter()
                .zip(mu)
                .map(|(sj, muj)| {
                    let mj = sj.molar_mass();
                    let num = (1.0 + (mui / muj).sqrt() * (mj / mi).powf(0.25)).powi(2);
                    num / (8.0 * (1.0 + mi / mj)).sqrt()
                })
                .collect()
        })
        .collect()
}

fn weighted_by_phi(x: &[f64], prop: &[f64], phi: &[Vec<f64>]) -> f64 {
    x.iter()
        .enumerate()
        .filter(|(_, xi)| **xi > 0.0)
        .map(|(i, xi)| {
            let denom: f64 = x.iter().zip(&phi[i]).map(|(xj, p)| xj * p).sum();
            xi * prop[i] / denom
        })
        .sum()
}

fn normalize(species: &[Species], x: &[f64]) -> FluidResult<Vec<f64>> {
    check_len(species, x)?;
    if x.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(FluidError::InvalidArg {
            what: "mole fractions must be finite and non-negative",
        });
    }
    let sum: f64 = x.iter().sum();
    if sum <= 0.0 {
        return Err(FluidError::InvalidArg {
            what: "mole fractions sum to zero",
        });
    }
    Ok(x.iter().map(|v| v / sum).collect())
}

fn check_len(species: &[Species], values: &[f64]) -> FluidResult<()> {
    if species.is_empty() || species.len() != values.len() {
        return Err(FluidError::InvalidArg {
            what: "species and property arrays differ in length",
        });
    }
    Ok(())
}
