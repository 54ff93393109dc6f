//! Box-constrained minimum-variance QP, solved with Clarabel.
//!
//!   minimize    wᵀ Σ w
//!   subject to  Σ w_i = 1
//!               μᵀ w = target          (optional)
//!               min ≤ w_i ≤ max
//!
//! Solver state lives only for the duration of one call.

use clarabel::algebra::*;
use clarabel::solver::*;
use nalgebra::{DMatrix, DVector};

use super::error::MarketsenseError;

/// Slack allowed before a returned weight counts as a bound violation.
const BOUND_SLACK: f64 = 1e-6;

pub(crate) struct MinVarianceProblem<'a> {
    pub covariance: &'a DMatrix<f64>,
    pub min_weight: f64,
    pub max_weight: f64,
    pub return_target: Option<(&'a DVector<f64>, f64)>,
}

impl MinVarianceProblem<'_> {
    pub(crate) fn solve(&self) -> Result<DVector<f64>, MarketsenseError> {
        let n = self.covariance.nrows();
        if n == 0 {
            return Err(MarketsenseError::InfeasibleConstraints {
                reason: "no assets to allocate".to_string(),
            });
        }

        let p = self.quadratic_term();
        let q = vec![0.0; n];
        let equalities = if self.return_target.is_some() { 2 } else { 1 };
        let (a, b) = self.constraints(equalities);
        let cones = [ZeroConeT(equalities), NonnegativeConeT(2 * n)];

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|e| MarketsenseError::NumericalInstability {
                reason: format!("failed to build solver settings: {}", e),
            })?;
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings).map_err(|e| {
            MarketsenseError::NumericalInstability {
                reason: format!("failed to create solver: {:?}", e),
            }
        })?;
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                return Err(MarketsenseError::InfeasibleConstraints {
                    reason: match self.return_target {
                        Some((_, target)) => format!("target return {:.6} is not reachable", target),
                        None => "weight bounds admit no portfolio".to_string(),
                    },
                });
            }
            status => {
                return Err(MarketsenseError::NumericalInstability {
                    reason: format!("solver did not converge: {:?}", status),
                });
            }
        }

        let x = &solver.solution.x;
        if x.iter().any(|w| !w.is_finite()) {
            return Err(MarketsenseError::NumericalInstability {
                reason: "solver returned non-finite weights".to_string(),
            });
        }
        let within = |w: f64| w >= self.min_weight - BOUND_SLACK && w <= self.max_weight + BOUND_SLACK;
        if !x.iter().all(|&w| within(w)) {
            return Err(MarketsenseError::NumericalInstability {
                reason: "solver weights violate bounds".to_string(),
            });
        }

        Ok(DVector::from_iterator(
            n,
            x.iter().map(|w| w.clamp(self.min_weight, self.max_weight)),
        ))
    }

    /// Upper triangle of 2Σ in CSC form.
    fn quadratic_term(&self) -> CscMatrix<f64> {
        let n = self.covariance.nrows();
        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for j in 0..n {
            for i in 0..=j {
                let v = self.covariance[(i, j)];
                if v != 0.0 {
                    rowval.push(i);
                    nzval.push(2.0 * v);
                }
            }
            colptr.push(nzval.len());
        }
        CscMatrix::new(n, n, colptr, rowval, nzval)
    }

    /// Rows: equalities first, then w ≤ max, then −w ≤ −min.
    fn constraints(&self, equalities: usize) -> (CscMatrix<f64>, Vec<f64>) {
        let n = self.covariance.nrows();
        let m = equalities + 2 * n;
        let mut colptr = Vec::with_capacity(n + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();
        colptr.push(0);
        for j in 0..n {
            rowval.push(0);
            nzval.push(1.0);
            if let Some((mu, _)) = self.return_target {
                rowval.push(1);
                nzval.push(mu[j]);
            }
            rowval.push(equalities + j);
            nzval.push(1.0);
            rowval.push(equalities + n + j);
            nzval.push(-1.0);
            colptr.push(nzval.len());
        }

        let mut b = vec![1.0];
        if let Some((_, target)) = self.return_target {
            b.push(target);
        }
        b.extend(std::iter::repeat(self.max_weight).take(n));
        b.extend(std::iter::repeat(-self.min_weight).take(n));

        (CscMatrix::new(m, n, colptr, rowval, nzval), b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn two_uncorrelated_assets_split_by_inverse_variance() {
        // var 0.04 and 0.01 -> weights 0.2 / 0.8
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]);
        let w = MinVarianceProblem {
            covariance: &cov,
            min_weight: 0.0,
            max_weight: 1.0,
            return_target: None,
        }
        .solve()
        .unwrap();
        assert_relative_eq!(w[0], 0.2, epsilon = 1e-5);
        assert_relative_eq!(w[1], 0.8, epsilon = 1e-5);
    }

    #[test]
    fn upper_bound_binds() {
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]);
        let w = MinVarianceProblem {
            covariance: &cov,
            min_weight: 0.0,
            max_weight: 0.6,
            return_target: None,
        }
        .solve()
        .unwrap();
        assert_relative_eq!(w[1], 0.6, epsilon = 1e-5);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn return_target_is_met() {
        let cov = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.006, 0.0, 0.006, 0.09, 0.01, 0.0, 0.01, 0.02],
        );
        let mu = DVector::from_vec(vec![0.08, 0.15, 0.05]);
        let w = MinVarianceProblem {
            covariance: &cov,
            min_weight: 0.0,
            max_weight: 1.0,
            return_target: Some((&mu, 0.10)),
        }
        .solve()
        .unwrap();
        assert_relative_eq!(mu.dot(&w), 0.10, epsilon = 1e-6);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-6);
        assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn unreachable_target_is_infeasible() {
        let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]);
        let mu = DVector::from_vec(vec![0.05, 0.10]);
        let result = MinVarianceProblem {
            covariance: &cov,
            min_weight: 0.0,
            max_weight: 1.0,
            return_target: Some((&mu, 0.50)),
        }
        .solve();
        assert!(matches!(
            result,
            Err(MarketsenseError::InfeasibleConstraints { .. })
        ));
    }
}
