//! Outer fixed-point loop over a list of operating points.

use crate::error::SimResult;
use crate::results::{CaseResult, CaseStatus, SimulationReport};
use crate::settings::{SimulationSettings, validate_targets};
use sf_core::OperatingPoint;
use sf_stack::{IterationDiagnostics, Stack, StackConfig};

/// Events emitted while a run progresses.
#[derive(Clone, Debug, PartialEq)]
pub enum SimProgress {
    CaseStarted {
        case: usize,
        cases: usize,
        target_current_density: f64,
    },
    Iteration {
        case: usize,
        iteration: usize,
        max_iterations: usize,
        diagnostics: IterationDiagnostics,
    },
    CaseFinished {
        case: usize,
        status: CaseStatus,
        iterations: usize,
        average_cell_voltage: f64,
    },
    /// Remaining targets dropped after a collapse.
    Abandoned { targets: Vec<f64> },
}

#[derive(Debug, Clone)]
pub struct Simulation {
    stack: StackConfig,
    settings: SimulationSettings,
}

impl Simulation {
    pub fn new(stack: StackConfig, settings: SimulationSettings) -> SimResult<Self> {
        settings.validate()?;
        stack.validate().map_err(sf_stack::StackError::from)?;
        Ok(Self { stack, settings })
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn stack_config(&self) -> &StackConfig {
        &self.stack
    }

    pub fn run(&self) -> SimResult<SimulationReport> {
        self.run_with_progress(None)
    }

    /// Run the configured targets, reporting progress through `progress`.
    pub fn run_with_progress(
        &self,
        progress: Option<&mut dyn FnMut(SimProgress)>,
    ) -> SimResult<SimulationReport> {
        self.run_targets_with_progress(&self.settings.target_current_densities_a_per_m2, progress)
    }

    /// Run an explicit list of targets instead of the configured one.
    pub fn run_targets(&self, targets: &[f64]) -> SimResult<SimulationReport> {
        self.run_targets_with_progress(targets, None)
    }

    /// Run every target in order. The stack is built once and each case
    /// starts from the previous case's solution.
    pub fn run_targets_with_progress(
        &self,
        targets: &[f64],
        mut progress: Option<&mut dyn FnMut(SimProgress)>,
    ) -> SimResult<SimulationReport> {
        validate_targets(targets)?;
        let cases = targets.len();
        let mut report = SimulationReport::default();
        let mut warm: Option<Stack> = None;

        for (case, &target) in targets.iter().enumerate() {
            let op = OperatingPoint::new(target)?;
            let mut stack = match warm.take() {
                Some(mut s) => {
                    s.set_operating_point(op)?;
                    s
                }
                None => Stack::new(self.stack.clone(), op)?,
            };
            if let Some(cb) = progress.as_mut() {
                cb(SimProgress::CaseStarted {
                    case,
                    cases,
                    target_current_density: target,
                });
            }

            let result = self.run_case(&mut stack, case, &mut progress)?;
            tracing::info!(
                target_current_density = target,
                average_cell_voltage = result.average_cell_voltage,
                iterations = result.iterations,
                status = ?result.status,
                "operating point finished"
            );
            if let Some(cb) = progress.as_mut() {
                cb(SimProgress::CaseFinished {
                    case,
                    status: result.status,
                    iterations: result.iterations,
                    average_cell_voltage: result.average_cell_voltage,
                });
            }
            let collapsed = result.status == CaseStatus::Collapsed;
            report.cases.push(result);

            if collapsed {
                let remaining = targets[case + 1..].to_vec();
                if !remaining.is_empty() {
                    tracing::warn!(
                        collapsed_at = target,
                        abandoned = remaining.len(),
                        "voltage collapse, abandoning higher current densities"
                    );
                    if let Some(cb) = progress.as_mut() {
                        cb(SimProgress::Abandoned {
                            targets: remaining.clone(),
                        });
                    }
                }
                report.abandoned = remaining;
                break;
            }
            warm = Some(stack);
        }
        Ok(report)
    }

    fn run_case(
        &self,
        stack: &mut Stack,
        case: usize,
        progress: &mut Option<&mut dyn FnMut(SimProgress)>,
    ) -> SimResult<CaseResult> {
        let s = &self.settings;
        let target = stack.operating_point().target_current_density;
        let (mut current_error, mut temperature_error) = (f64::INFINITY, f64::INFINITY);

        for iteration in 1..=s.max_iterations {
            let diagnostics = match stack.update() {
                Ok(d) => d,
                Err(e) if e.is_domain_violation() => {
                    tracing::warn!(
                        target_current_density = target,
                        iteration,
                        error = %e,
                        "domain violation"
                    );
                    return Ok(CaseResult::capture(
                        stack,
                        CaseStatus::Collapsed,
                        iteration,
                        current_error,
                        temperature_error,
                    ));
                }
                Err(e) => {
                    tracing::error!(target_current_density = target, iteration, error = %e, "stack update failed");
                    return Err(e.into());
                }
            };
            current_error = diagnostics.current_error;
            temperature_error = diagnostics.temperature_error;
            tracing::debug!(
                target_current_density = target,
                iteration,
                current_error,
                temperature_error,
                "outer iteration"
            );
            if let Some(cb) = progress.as_mut() {
                cb(SimProgress::Iteration {
                    case,
                    iteration,
                    max_iterations: s.max_iterations,
                    diagnostics,
                });
            }

            if stack.is_collapsed() {
                return Ok(CaseResult::capture(
                    stack,
                    CaseStatus::Collapsed,
                    iteration,
                    current_error,
                    temperature_error,
                ));
            }
            if iteration >= s.min_iterations
                && current_error < s.tolerance
                && temperature_error < s.tolerance
            {
                return Ok(CaseResult::capture(
                    stack,
                    CaseStatus::Converged,
                    iteration,
                    current_error,
                    temperature_error,
                ));
            }
        }

        tracing::warn!(
            target_current_density = target,
            max_iterations = s.max_iterations,
            current_error,
            temperature_error,
            "outer loop did not converge"
        );
        Ok(CaseResult::capture(
            stack,
            CaseStatus::NotConverged,
            s.max_iterations,
            current_error,
            temperature_error,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn small_stack(cells: usize) -> StackConfig {
        let mut c = StackConfig::default();
        c.stack.cell_count = cells;
        c.stack.elements = 6;
        c
    }

    #[test]
    fn invalid_settings_are_rejected_up_front() {
        let settings = SimulationSettings {
            target_current_densities_a_per_m2: vec![],
            ..Default::default()
        };
        assert!(Simulation::new(small_stack(1), settings).is_err());
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let settings = SimulationSettings {
            tolerance: 1e-14,
            min_iterations: 1,
            max_iterations: 2,
            target_current_densities_a_per_m2: vec![3000.0],
        };
        let sim = Simulation::new(small_stack(2), settings).unwrap();
        let report = sim.run().unwrap();
        assert_eq!(report.cases.len(), 1);
        assert_eq!(report.cases[0].status, CaseStatus::NotConverged);
        assert_eq!(report.cases[0].iterations, 2);
        assert_eq!(report.polarization_curve().len(), 1);
        assert!(!report.polarization_curve()[0].converged);
    }

    #[test]
    fn progress_reports_every_iteration() {
        let settings = SimulationSettings {
            tolerance: 1e-14,
            min_iterations: 1,
            max_iterations: 3,
            target_current_densities_a_per_m2: vec![2000.0, 3000.0],
        };
        let sim = Simulation::new(small_stack(1), settings).unwrap();
        let mut iterations = 0;
        let mut finished = 0;
        let mut cb = |e: SimProgress| match e {
            SimProgress::Iteration { .. } => iterations += 1,
            SimProgress::CaseFinished { .. } => finished += 1,
            _ => {}
        };
        sim.run_with_progress(Some(&mut cb)).unwrap();
        assert_eq!(iterations, 6);
        assert_eq!(finished, 2);
    }

    #[test]
    fn explicit_targets_override_the_settings() {
        let settings = SimulationSettings {
            tolerance: 1e-14,
            min_iterations: 1,
            max_iterations: 2,
            target_current_densities_a_per_m2: vec![2000.0],
        };
        let sim = Simulation::new(small_stack(1), settings).unwrap();
        let report = sim.run_targets(&[1000.0, 1500.0, 2500.0]).unwrap();
        let targets: Vec<f64> = report.cases.iter().map(|c| c.target_current_density).collect();
        assert_eq!(targets, vec![1000.0, 1500.0, 2500.0]);

        assert!(matches!(sim.run_targets(&[]), Err(SimError::InvalidArg { .. })));
        assert!(matches!(
            sim.run_targets(&[1000.0, -5.0]),
            Err(SimError::InvalidTarget { index: 1, .. })
        ));
    }
}
