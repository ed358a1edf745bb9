//! Outer-loop settings and the list of operating points to run.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

fn default_tolerance() -> f64 {
    1e-6
}

fn default_min_iterations() -> usize {
    3
}

fn default_max_iterations() -> usize {
    100
}

/// Convergence control of the outer fixed-point loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Bound on both the current and the temperature relative-error norm
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_min_iterations")]
    pub min_iterations: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Operating points, run in the given order
    pub target_current_densities_a_per_m2: Vec<f64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            min_iterations: default_min_iterations(),
            max_iterations: default_max_iterations(),
            target_current_densities_a_per_m2: vec![2000.0, 4000.0, 6000.0, 8000.0],
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SimError::InvalidArg {
                what: "tolerance must be positive and finite",
            });
        }
        if self.max_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: "max_iterations must be at least 1",
            });
        }
        if self.min_iterations > self.max_iterations {
            return Err(SimError::InvalidArg {
                what: "min_iterations exceeds max_iterations",
            });
        }
        validate_targets(&self.target_current_densities_a_per_m2)
    }
}

/// A target list must be non-empty and hold positive, finite values.
pub fn validate_targets(targets: &[f64]) -> SimResult<()> {
    if targets.is_empty() {
        return Err(SimError::InvalidArg {
            what: "no target current densities given",
        });
    }
    for (index, &value) in targets.iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(SimError::InvalidTarget { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationSettings::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_iteration_bounds() {
        let s = SimulationSettings {
            min_iterations: 10,
            max_iterations: 5,
            ..Default::default()
        };
        assert!(matches!(s.validate(), Err(SimError::InvalidArg { .. })));
    }

    #[test]
    fn rejects_non_positive_target() {
        let s = SimulationSettings {
            target_current_densities_a_per_m2: vec![1000.0, 0.0],
            ..Default::default()
        };
        assert!(matches!(
            s.validate(),
            Err(SimError::InvalidTarget { index: 1, .. })
        ));
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let s: SimulationSettings =
            serde_json::from_str(r#"{"target_current_densities_a_per_m2":[4000.0]}"#).unwrap();
        assert_eq!(s.tolerance, 1e-6);
        assert_eq!(s.min_iterations, 3);
        assert_eq!(s.max_iterations, 100);
    }
}
