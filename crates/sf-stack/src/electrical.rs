//! Electrical coupling of the cells through their bipolar plates.
//!
//! Cells are stacked in series. Between two cells the bipolar plate carries
//! in-plane current wherever their local current densities differ, with an
//! ohmic drop `R = dx² / (σ t)` per element. Unknowns are the element
//! current densities `i[q][e]`. For every cell there are `E - 1` rows
//!
//! ```text
//! V_q(e) - V_q(e+1) - R (S_{q+1}(e) - S_q(e)) = 0,   S_p(e) = Σ_{k≤e} (i_{p-1}(k) - i_p(k))
//! ```
//!
//! (`S` vanishes on the end plates) and one conservation row
//! `Σ_e i_q(e) = E · target`. One Newton step is taken per outer iteration
//! with the local voltage slopes on the diagonal.

use crate::error::{StackError, StackResult};
use nalgebra::{DMatrix, DVector};

/// Floor on local current density after a step, as a fraction of the target.
const MIN_CURRENT_FRACTION: f64 = 1e-3;

const BACKTRACK_FACTOR: f64 = 0.5;
const MAX_BACKTRACKS: usize = 30;

/// Outcome of one electrical update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElectricalStep {
    /// Fraction of the Newton step that was applied
    pub step_fraction: f64,
    /// Norm of the residual before the step
    pub residual_norm: f64,
}

#[derive(Clone, Debug)]
pub struct ElectricalNetwork {
    cells: usize,
    elements: usize,
    plate_resistance: f64,
    coupling: DMatrix<f64>,
}

impl ElectricalNetwork {
    /// `plate_resistance` is the in-plane plate drop per element and unit
    /// current density (Ω m²).
    pub fn new(cells: usize, elements: usize, plate_resistance: f64) -> Self {
        let n = cells * elements;
        let mut coupling = DMatrix::zeros(n, n);
        let r = plate_resistance;
        for q in 0..cells {
            for e in 0..elements {
                let row = q * elements + e;
                if e + 1 == elements {
                    for k in 0..elements {
                        coupling[(row, q * elements + k)] = 1.0;
                    }
                    continue;
                }
                for k in 0..=e {
                    if q + 1 < cells {
                        coupling[(row, q * elements + k)] -= r;
                        coupling[(row, (q + 1) * elements + k)] += r;
                    }
                    if q > 0 {
                        coupling[(row, (q - 1) * elements + k)] += r;
                        coupling[(row, q * elements + k)] -= r;
                    }
                }
            }
        }
        Self {
            cells,
            elements,
            plate_resistance,
            coupling,
        }
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn plate_resistance(&self) -> f64 {
        self.plate_resistance
    }

    /// Resistive coupling and conservation rows, `(N·E) × (N·E)`.
    pub fn coupling(&self) -> &DMatrix<f64> {
        &self.coupling
    }

    fn flatten(&self, rows: &[Vec<f64>]) -> DVector<f64> {
        DVector::from_iterator(
            self.cells * self.elements,
            rows.iter().flat_map(|r| r.iter().copied()),
        )
    }

    fn check_shape(&self, what: &'static str, rows: &[Vec<f64>]) -> StackResult<()> {
        if rows.len() != self.cells || rows.iter().any(|r| r.len() != self.elements) {
            return Err(StackError::Numeric(sf_core::SfError::LengthMismatch {
                what,
                expected: self.cells * self.elements,
                actual: rows.iter().map(Vec::len).sum(),
            }));
        }
        Ok(())
    }

    /// Residual of the network equations for the given state.
    pub fn residual(
        &self,
        current: &[Vec<f64>],
        voltage: &[Vec<f64>],
        target_current_density: f64,
    ) -> StackResult<DVector<f64>> {
        self.check_shape("current density", current)?;
        self.check_shape("cell voltage", voltage)?;
        let mut f = &self.coupling * self.flatten(current);
        for (q, v) in voltage.iter().enumerate() {
            let base = q * self.elements;
            for e in 0..self.elements - 1 {
                f[base + e] += v[e] - v[e + 1];
            }
            f[base + self.elements - 1] -= self.elements as f64 * target_current_density;
        }
        Ok(f)
    }

    /// Jacobian of [`residual`](Self::residual) for local slopes `dV/di`.
    pub fn jacobian(&self, slope: &[Vec<f64>]) -> StackResult<DMatrix<f64>> {
        self.check_shape("voltage slope", slope)?;
        let mut g = self.coupling.clone();
        for (q, dv) in slope.iter().enumerate() {
            let base = q * self.elements;
            for e in 0..self.elements - 1 {
                g[(base + e, base + e)] += dv[e];
                g[(base + e, base + e + 1)] -= dv[e + 1];
            }
        }
        Ok(g)
    }

    /// Take one damped Newton step on `current` in place, then restore
    /// exact per-cell conservation.
    pub fn solve(
        &self,
        current: &mut [Vec<f64>],
        voltage: &[Vec<f64>],
        slope: &[Vec<f64>],
        target_current_density: f64,
    ) -> StackResult<ElectricalStep> {
        let f = self.residual(current, voltage, target_current_density)?;
        let g = self.jacobian(slope)?;
        let delta = g.lu().solve(&(-f.clone())).ok_or_else(|| {
            tracing::error!(
                target_current_density,
                cells = self.cells,
                elements = self.elements,
                "electrical network matrix is singular"
            );
            StackError::SingularSystem {
                system: "electrical",
                target_current_density,
            }
        })?;
        if delta.iter().any(|d| !d.is_finite()) {
            return Err(StackError::SingularSystem {
                system: "electrical",
                target_current_density,
            });
        }

        let floor = MIN_CURRENT_FRACTION * target_current_density;
        let old = self.flatten(current);
        let mut alpha = 1.0;
        for _ in 0..MAX_BACKTRACKS {
            if old.iter().zip(delta.iter()).all(|(i, d)| i + alpha * d >= floor) {
                break;
            }
            alpha *= BACKTRACK_FACTOR;
        }
        for (q, row) in current.iter_mut().enumerate() {
            for (e, i) in row.iter_mut().enumerate() {
                let k = q * self.elements + e;
                *i = (old[k] + alpha * delta[k]).max(floor);
            }
        }
        correct_current(current, target_current_density)?;
        Ok(ElectricalStep {
            step_fraction: alpha,
            residual_norm: f.norm(),
        })
    }
}

/// Set the last element of every cell so that the cell carries exactly
/// `elements × target` in total.
///
/// Fails when the other elements already carry more than that total, since
/// the last element would have to run backwards.
pub fn correct_current(current: &mut [Vec<f64>], target_current_density: f64) -> StackResult<()> {
    for (cell, row) in current.iter_mut().enumerate() {
        let Some((last, rest)) = row.split_last_mut() else {
            continue;
        };
        let total = (rest.len() + 1) as f64 * target_current_density;
        *last = total - rest.iter().sum::<f64>();
        if *last < 0.0 {
            tracing::warn!(cell, value = *last, "current correction went negative");
            return Err(StackError::NegativeCurrent {
                cell,
                element: rest.len(),
                value: *last,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_voltage(current: &[Vec<f64>], ocv: &[f64], r: &[f64]) -> Vec<Vec<f64>> {
        current
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(e, i)| ocv[e] - r[e] * i)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn coupling_rows_sum_to_zero_inside_the_stack() {
        let net = ElectricalNetwork::new(3, 4, 2.0);
        let c = net.coupling();
        for q in 0..3 {
            for e in 0..3 {
                let row = q * 4 + e;
                let sum: f64 = (0..12).map(|k| c[(row, k)]).sum();
                assert!(sum.abs() < 1e-12);
            }
            let conservation: f64 = (0..12).map(|k| c[(q * 4 + 3, k)]).sum();
            assert_eq!(conservation, 4.0);
        }
        // Middle cell couples to both neighbours.
        assert_eq!(c[(4, 0)], 2.0);
        assert_eq!(c[(4, 8)], 2.0);
        assert_eq!(c[(4, 4)], -4.0);
    }

    #[test]
    fn single_cell_linear_voltage_equalises_in_one_step() {
        let ocv = [1.0, 0.98, 0.96, 0.94];
        let r = [1e-5, 1.2e-5, 1.4e-5, 1.6e-5];
        let target = 4000.0;
        let net = ElectricalNetwork::new(1, 4, 1e-7);
        let mut current = vec![vec![target; 4]];
        let voltage = linear_voltage(&current, &ocv, &r);
        let slope = vec![r.iter().map(|x| -x).collect::<Vec<_>>()];
        let step = net.solve(&mut current, &voltage, &slope, target).unwrap();
        assert_eq!(step.step_fraction, 1.0);

        let v = linear_voltage(&current, &ocv, &r);
        for e in 1..4 {
            assert!((v[0][e] - v[0][0]).abs() < 1e-9, "{:?}", v[0]);
        }
        let sum: f64 = current[0].iter().sum();
        assert!((sum - 4.0 * target).abs() < 1e-9);
        assert!(current[0][0] > current[0][3]);
    }

    #[test]
    fn identical_cells_keep_uniform_current() {
        let target = 6000.0;
        let net = ElectricalNetwork::new(3, 5, 1e-7);
        let mut current = vec![vec![target; 5]; 3];
        let voltage = vec![vec![0.5; 5]; 3];
        let slope = vec![vec![-2e-5; 5]; 3];
        net.solve(&mut current, &voltage, &slope, target).unwrap();
        for row in &current {
            for i in row {
                assert!((i - target).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn backtracking_keeps_current_positive() {
        let target = 1000.0;
        let net = ElectricalNetwork::new(1, 3, 0.0);
        let mut current = vec![vec![target; 3]];
        // A huge voltage gap with a tiny slope asks for a negative current.
        let voltage = vec![vec![0.9, 0.1, 0.1]];
        let slope = vec![vec![-1e-6; 3]];
        let step = net.solve(&mut current, &voltage, &slope, target).unwrap();
        assert!(step.step_fraction < 1.0);
        assert!(current[0].iter().all(|i| *i > 0.0));
        let sum: f64 = current[0].iter().sum();
        assert!((sum - 3.0 * target).abs() < 1e-9);
    }

    #[test]
    fn zero_slope_single_element_rows_are_singular() {
        let net = ElectricalNetwork::new(1, 3, 0.0);
        let mut current = vec![vec![100.0; 3]];
        let voltage = vec![vec![0.5; 3]];
        let slope = vec![vec![0.0; 3]];
        let err = net.solve(&mut current, &voltage, &slope, 100.0).unwrap_err();
        assert!(matches!(err, StackError::SingularSystem { system: "electrical", .. }));
    }

    #[test]
    fn correction_restores_row_sums() {
        let mut current = vec![vec![1.0, 2.0, 3.0], vec![4.0, 4.0, 4.0]];
        correct_current(&mut current, 3.0).unwrap();
        assert_eq!(current[0][2], 6.0);
        assert_eq!(current[1][2], 1.0);
    }

    #[test]
    fn correction_refuses_a_negative_last_element() {
        let mut current = vec![vec![3.0, 3.0, 3.0], vec![5.0, 6.0, 1.0]];
        let err = correct_current(&mut current, 3.0).unwrap_err();
        assert!(matches!(
            err,
            StackError::NegativeCurrent { cell: 1, element: 2, value } if value == -2.0
        ));
        assert!(err.is_domain_violation());
    }

    #[test]
    fn exhausted_backtracking_is_reported() {
        // The step moves 8e12 A/m² from element 0 to element 1. Even the
        // smallest backtracked fraction floors element 0 and overloads
        // element 1, so the last element would have to go negative.
        let target = 100.0;
        let net = ElectricalNetwork::new(1, 3, 0.0);
        let mut current = vec![vec![target; 3]];
        let voltage = vec![vec![0.1, 0.9, 0.9]];
        let slope = vec![vec![-1e-13, 0.0, -1.0]];
        let err = net.solve(&mut current, &voltage, &slope, target).unwrap_err();
        assert!(matches!(err, StackError::NegativeCurrent { cell: 0, .. }), "{err:?}");
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let net = ElectricalNetwork::new(2, 3, 0.0);
        let current = vec![vec![1.0; 3]];
        let voltage = vec![vec![1.0; 3]; 2];
        assert!(net.residual(&current, &voltage, 1.0).is_err());
    }
}
