//! Augmented-Lagrangian minimiser for inequality-constrained problems.
//!
//! Outer iterations update one multiplier per constraint,
//! `λ ← max(0, λ − ρ·c)`, and grow the penalty `ρ` while the worst
//! violation fails to shrink. Inner iterations run BFGS on the augmented
//! Lagrangian with Armijo backtracking, using central finite
//! differences since the problems solved here are only piecewise smooth
//! (clipped radii, wrapped hues).

use anyhow::{bail, Result};
use ndarray::{Array1, Array2};
use serde_json::json;
use tracing::debug;

use super::{max_violation, ConstrainedProblem, Minimizer, SolverReport, SolverStatus};
use crate::config::SolverConfig;

/// Sufficient-decrease constant of the Armijo condition.
const ARMIJO_SLOPE: f64 = 1.0e-4;
/// Step length below which a line search gives up.
const MIN_STEP: f64 = 1.0e-12;
/// Smallest `sᵀy` accepted for a BFGS update.
const CURVATURE_FLOOR: f64 = 1.0e-12;
/// Gradient norm treated as stationary.
const GRADIENT_FLOOR: f64 = 1.0e-9;

/// Augmented-Lagrangian minimiser with a finite-difference descent core.
#[derive(Debug, Clone, Default)]
pub struct AugmentedLagrangian {
    config: SolverConfig,
}

impl AugmentedLagrangian {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn gradient(
        &self,
        problem: &mut dyn ConstrainedProblem,
        x: &Array1<f64>,
        lambdas: &[f64],
        rho: f64,
        evaluations: &mut usize,
    ) -> Array1<f64> {
        let mut grad = Array1::zeros(x.len());
        let mut shifted = x.clone();
        for i in 0..x.len() {
            let h = self.config.finite_difference_step * x[i].abs().max(1.0);
            shifted[i] = x[i] + h;
            let (f_plus, c_plus) = evaluate(problem, &shifted, evaluations);
            shifted[i] = x[i] - h;
            let (f_minus, c_minus) = evaluate(problem, &shifted, evaluations);
            shifted[i] = x[i];
            let plus = merit(f_plus, &c_plus, lambdas, rho);
            let minus = merit(f_minus, &c_minus, lambdas, rho);
            grad[i] = (plus - minus) / (2.0 * h);
        }
        grad
    }

    /// Minimises the augmented Lagrangian for fixed multipliers and penalty
    /// with BFGS steps and a backtracking Armijo line search.
    fn descend(
        &self,
        problem: &mut dyn ConstrainedProblem,
        x: &mut Array1<f64>,
        lambdas: &[f64],
        rho: f64,
        evaluations: &mut usize,
    ) -> Result<()> {
        let n = x.len();
        let initial_scale = self.config.learning_rate;
        let settle = self.config.convergence_tolerance * 1.0e-3;
        let (f, c) = evaluate(problem, x, evaluations);
        let mut current = merit(f, &c, lambdas, rho);
        let mut inverse_hessian = Array2::<f64>::eye(n) * initial_scale;
        let mut grad = self.gradient(problem, x, lambdas, rho, evaluations);

        for _ in 0..self.config.max_inner_iterations {
            if grad.iter().any(|g| !g.is_finite()) {
                bail!("augmented Lagrangian gradient is not finite");
            }
            if grad.dot(&grad).sqrt() < GRADIENT_FLOOR {
                break;
            }

            let mut direction = -inverse_hessian.dot(&grad);
            let mut slope = grad.dot(&direction);
            if slope >= 0.0 {
                inverse_hessian = Array2::<f64>::eye(n) * initial_scale;
                direction = &grad * -initial_scale;
                slope = grad.dot(&direction);
            }

            let mut step = 1.0;
            let mut accepted = None;
            while step >= MIN_STEP {
                let candidate = &*x + &(&direction * step);
                let (fc, cc) = evaluate(problem, &candidate, evaluations);
                let value = merit(fc, &cc, lambdas, rho);
                if value.is_finite() && value <= current + ARMIJO_SLOPE * step * slope {
                    accepted = Some((candidate, value));
                    break;
                }
                step *= 0.5;
            }
            let Some((candidate, value)) = accepted else {
                break;
            };

            let next_grad = self.gradient(problem, &candidate, lambdas, rho, evaluations);
            let s = &candidate - &*x;
            let y = &next_grad - &grad;
            let sy = s.dot(&y);
            if sy > CURVATURE_FLOOR {
                let hy = inverse_hessian.dot(&y);
                let yhy = y.dot(&hy);
                for i in 0..n {
                    for j in 0..n {
                        inverse_hessian[[i, j]] += (sy + yhy) * s[i] * s[j] / (sy * sy)
                            - (hy[i] * s[j] + s[i] * hy[j]) / sy;
                    }
                }
            }

            let decrease = current - value;
            *x = candidate;
            grad = next_grad;
            current = value;
            if decrease <= settle {
                break;
            }
        }
        Ok(())
    }
}

impl Minimizer for AugmentedLagrangian {
    fn minimize(
        &mut self,
        problem: &mut dyn ConstrainedProblem,
        x0: Array1<f64>,
    ) -> Result<SolverReport> {
        let dimension = problem.dimension();
        if x0.len() != dimension {
            bail!(
                "starting point has {} entries, problem expects {}",
                x0.len(),
                dimension
            );
        }

        let mut evaluations = 0usize;
        let (f0, c0) = evaluate(problem, &x0, &mut evaluations);
        if !f0.is_finite() || c0.iter().any(|c| !c.is_finite()) {
            bail!("objective or constraints are not finite at the starting point");
        }

        let tolerance = self.config.feasibility_tolerance;
        let mut best: Option<(Array1<f64>, f64)> = None;
        if max_violation(&c0) <= tolerance {
            best = Some((x0.clone(), f0));
        }

        let mut x = x0;
        let mut lambdas = vec![0.0; c0.len()];
        let mut rho = self.config.initial_penalty;
        let mut previous_objective = f0;
        let mut previous_violation = max_violation(&c0);
        let mut converged = false;
        let mut outer = 0usize;

        while outer < self.config.max_outer_iterations {
            outer += 1;
            self.descend(problem, &mut x, &lambdas, rho, &mut evaluations)?;

            let (f, c) = evaluate(problem, &x, &mut evaluations);
            if !f.is_finite() || c.iter().any(|v| !v.is_finite()) {
                bail!("objective or constraints became non-finite during descent");
            }
            let violation = max_violation(&c);
            debug!(
                outer,
                objective = f,
                violation,
                penalty = rho,
                "augmented lagrangian iteration"
            );

            if violation <= tolerance && best.as_ref().map_or(true, |(_, bf)| f < *bf) {
                best = Some((x.clone(), f));
            }
            if violation <= tolerance
                && (previous_objective - f).abs() < self.config.convergence_tolerance
            {
                converged = true;
                break;
            }

            for (lambda, value) in lambdas.iter_mut().zip(&c) {
                *lambda = (*lambda - rho * value).max(0.0);
            }
            if violation > 0.25 * previous_violation {
                rho = (rho * self.config.penalty_growth).min(self.config.max_penalty);
            }
            previous_violation = violation;
            previous_objective = f;
        }

        let success = best.is_some();
        let x_out = match best {
            Some((bx, _)) => bx,
            None => x,
        };
        let (objective, constraints) = evaluate(problem, &x_out, &mut evaluations);
        let status = if converged {
            SolverStatus::Converged
        } else if success {
            SolverStatus::IterationLimit
        } else {
            SolverStatus::Infeasible
        };

        Ok(SolverReport {
            success,
            status,
            x: x_out,
            objective,
            max_violation: max_violation(&constraints),
            outer_iterations: outer,
            evaluations,
            meta: json!({
                "minimizer": self.name(),
                "penalty": rho,
                "multipliers": lambdas,
            }),
        })
    }

    fn name(&self) -> &str {
        "augmented_lagrangian"
    }
}

fn evaluate(
    problem: &mut dyn ConstrainedProblem,
    x: &Array1<f64>,
    evaluations: &mut usize,
) -> (f64, Vec<f64>) {
    *evaluations += 1;
    let f = problem.objective(x);
    let c = problem.constraints(x);
    (f, c)
}

/// Augmented Lagrangian of `f` under `c ≥ 0`.
fn merit(f: f64, constraints: &[f64], lambdas: &[f64], rho: f64) -> f64 {
    let mut total = f;
    for (&c, &lambda) in constraints.iter().zip(lambdas) {
        if c <= lambda / rho {
            total += -lambda * c + 0.5 * rho * c * c;
        } else {
            total -= lambda * lambda / (2.0 * rho);
        }
    }
    total
}
