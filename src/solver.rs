use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use std::time::Instant;

use crate::error::{AnalysisError, Result};

/// Solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub method: SolverMethod,
    /// Compute `|Y*V - I|` after every solve
    pub check_residual: bool,
    /// Relative residual above which a warning is logged
    pub residual_tolerance: f64,
    /// Smallest pivot, relative to the largest, accepted as full rank
    pub pivot_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            method: SolverMethod::ColPivQr,
            check_residual: false,
            residual_tolerance: 1e-9,
            pivot_tolerance: 1e-12,
        }
    }
}

/// Available dense decompositions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMethod {
    /// Column-pivoted Householder QR
    ColPivQr,
    /// LU with partial pivoting
    Lu,
}

/// Solver statistics
#[derive(Debug, Clone)]
pub struct SolverStats {
    pub method_used: SolverMethod,
    pub residual_norm: Option<f64>,
    pub solve_time: f64,
}

/// Dense complex linear solver for `Y * V = I`
#[derive(Debug, Clone)]
pub struct LinearSolver {
    config: SolverConfig,
}

impl LinearSolver {
    /// Create a new solver with default configuration
    pub fn new() -> Self {
        LinearSolver {
            config: SolverConfig::default(),
        }
    }

    /// Create a new solver with custom configuration
    pub fn with_config(config: SolverConfig) -> Self {
        LinearSolver { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve for node voltages; `s` only labels the error if the system is singular
    pub fn solve(
        &self,
        matrix: &DMatrix<Complex64>,
        rhs: &DVector<Complex64>,
        s: Complex64,
    ) -> Result<DVector<Complex64>> {
        self.solve_with_stats(matrix, rhs, s).map(|(solution, _)| solution)
    }

    pub fn solve_with_stats(
        &self,
        matrix: &DMatrix<Complex64>,
        rhs: &DVector<Complex64>,
        s: Complex64,
    ) -> Result<(DVector<Complex64>, SolverStats)> {
        let start_time = Instant::now();

        if matrix.nrows() != matrix.ncols() {
            return Err(AnalysisError::DimensionMismatch {
                expected: matrix.nrows(),
                actual: matrix.ncols(),
            });
        }
        if matrix.nrows() != rhs.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: matrix.nrows(),
                actual: rhs.len(),
            });
        }

        let solution = if rhs.is_empty() {
            DVector::from_element(0, Complex64::new(0.0, 0.0))
        } else {
            let solved = match self.config.method {
                SolverMethod::ColPivQr => {
                    let qr = matrix.clone().col_piv_qr();
                    check_rank(&qr.r(), self.config.pivot_tolerance, s)?;
                    qr.solve(rhs)
                }
                SolverMethod::Lu => {
                    let lu = matrix.clone().lu();
                    check_rank(&lu.u(), self.config.pivot_tolerance, s)?;
                    lu.solve(rhs)
                }
            };
            solved.ok_or(AnalysisError::SingularNetwork { s })?
        };

        if solution.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            debug!("Non-finite node voltage at s = {}", s);
            return Err(AnalysisError::SingularNetwork { s });
        }

        let residual_norm = if self.config.check_residual {
            let residual = (matrix * &solution - rhs).norm();
            let scale = rhs.norm().max(f64::MIN_POSITIVE);
            if residual / scale > self.config.residual_tolerance {
                warn!(
                    "Large relative residual {:.3e} at s = {} - matrix may be ill-conditioned",
                    residual / scale,
                    s
                );
            }
            Some(residual)
        } else {
            None
        };

        Ok((
            solution,
            SolverStats {
                method_used: self.config.method,
                residual_norm,
                solve_time: start_time.elapsed().as_secs_f64(),
            },
        ))
    }
}

/// Reject a triangular factor whose smallest pivot is negligible next to its
/// largest. Floating sub-networks leave a rounding-sized pivot rather than an
/// exact zero, which the decompositions' own `solve` would accept.
fn check_rank(factor: &DMatrix<Complex64>, tolerance: f64, s: Complex64) -> Result<()> {
    let pivots: Vec<f64> = (0..factor.nrows().min(factor.ncols()))
        .map(|i| factor[(i, i)].norm())
        .collect();
    let largest = pivots.iter().copied().fold(0.0, f64::max);
    let smallest = pivots.iter().copied().fold(f64::INFINITY, f64::min);

    if smallest > tolerance * largest {
        Ok(())
    } else {
        debug!(
            "Rank-deficient admittance matrix at s = {} (pivots {:.3e}..{:.3e})",
            s, smallest, largest
        );
        Err(AnalysisError::SingularNetwork { s })
    }
}

impl Default for LinearSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_complex_qr_solve() {
        let solver = LinearSolver::new();

        // [2 1; 1 2] * [1+i; 1-i] = [3+i; 3-i]
        let matrix = DMatrix::from_row_slice(2, 2, &[c(2.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(2.0, 0.0)]);
        let rhs = DVector::from_vec(vec![c(3.0, 1.0), c(3.0, -1.0)]);

        let solution = solver.solve(&matrix, &rhs, c(0.0, 0.0)).unwrap();

        assert!((solution[0] - c(1.0, 1.0)).norm() < 1e-10);
        assert!((solution[1] - c(1.0, -1.0)).norm() < 1e-10);
    }

    #[test]
    fn test_lu_matches_qr() {
        let matrix = DMatrix::from_row_slice(
            2,
            2,
            &[c(0.01, 0.5), c(-0.01, 0.0), c(-0.01, 0.0), c(0.02, -0.1)],
        );
        let rhs = DVector::from_vec(vec![c(1.0, 0.0), c(0.0, 0.0)]);

        let qr = LinearSolver::new().solve(&matrix, &rhs, c(0.0, 0.0)).unwrap();
        let lu = LinearSolver::with_config(SolverConfig {
            method: SolverMethod::Lu,
            ..SolverConfig::default()
        })
        .solve(&matrix, &rhs, c(0.0, 0.0))
        .unwrap();

        assert!((&qr - &lu).norm() < 1e-9);
    }

    #[test]
    fn test_singular_matrix() {
        let solver = LinearSolver::new();
        let matrix = DMatrix::from_element(2, 2, c(0.0, 0.0));
        let rhs = DVector::from_vec(vec![c(1.0, 0.0), c(0.0, 0.0)]);

        let err = solver.solve(&matrix, &rhs, c(0.1, 0.1)).unwrap_err();
        assert!(matches!(err, AnalysisError::SingularNetwork { .. }));
    }

    #[test]
    fn test_floating_pair_is_rank_deficient() {
        // Node 1 tied to ground; nodes 2 and 3 only see each other
        let g = c(0.01, 0.0);
        let z = c(0.0, 0.0);
        let matrix = DMatrix::from_row_slice(3, 3, &[g, z, z, z, g, -g, z, -g, g]);
        let rhs = DVector::from_vec(vec![c(1e4, 0.0), z, z]);

        for s in [c(0.0, 10.0), c(0.1, 0.1), c(0.1, 3.7)] {
            assert!(matches!(
                LinearSolver::new().solve(&matrix, &rhs, s),
                Err(AnalysisError::SingularNetwork { .. })
            ));
        }

        let lu = LinearSolver::with_config(SolverConfig {
            method: SolverMethod::Lu,
            ..SolverConfig::default()
        });
        assert!(matches!(
            lu.solve(&matrix, &rhs, c(0.0, 10.0)),
            Err(AnalysisError::SingularNetwork { .. })
        ));
    }

    #[test]
    fn test_wide_conductance_spread_still_solves() {
        // 1 ohm and 1 Gohm branches in the same network
        let matrix = DMatrix::from_row_slice(
            2,
            2,
            &[c(1.0 + 1e-9, 0.0), c(-1e-9, 0.0), c(-1e-9, 0.0), c(2e-9, 0.0)],
        );
        let rhs = DVector::from_vec(vec![c(1.0, 0.0), c(0.0, 0.0)]);
        assert!(LinearSolver::new().solve(&matrix, &rhs, c(0.0, 0.0)).is_ok());
    }

    #[test]
    fn test_dimension_mismatch() {
        let solver = LinearSolver::new();
        let matrix = DMatrix::from_element(2, 2, c(1.0, 0.0));
        let rhs = DVector::from_element(3, c(1.0, 0.0));
        assert!(matches!(
            solver.solve(&matrix, &rhs, c(0.0, 0.0)),
            Err(AnalysisError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_residual_reported() {
        let solver = LinearSolver::with_config(SolverConfig {
            check_residual: true,
            ..SolverConfig::default()
        });
        let matrix = DMatrix::from_row_slice(1, 1, &[c(0.001, 0.0)]);
        let rhs = DVector::from_vec(vec![c(1.0, 0.0)]);

        let (solution, stats) = solver.solve_with_stats(&matrix, &rhs, c(1.0, 0.0)).unwrap();
        assert!((solution[0] - c(1000.0, 0.0)).norm() < 1e-9);
        assert!(stats.residual_norm.unwrap() < 1e-12);
        assert_eq!(stats.method_used, SolverMethod::ColPivQr);
    }
}
