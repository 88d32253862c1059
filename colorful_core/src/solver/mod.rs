//! Minimiser trait and implementations for bounded-change category adaptation
//!
//! This module provides a trait-based interface for solving smooth-ish
//! inequality-constrained problems over a flat parameter vector, such as
//! the margin problem built by the constrained adapter.

pub mod augmented;

use anyhow::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use augmented::AugmentedLagrangian;

/// An objective with inequality constraints over `R^n`.
///
/// Methods take `&mut self` so implementations may cache work keyed on the
/// last evaluated vector.
pub trait ConstrainedProblem {
    /// Length of the parameter vector
    fn dimension(&self) -> usize;

    /// Value to minimise at `x`
    fn objective(&mut self, x: &Array1<f64>) -> f64;

    /// Constraint values at `x`; the point is feasible when every entry is ≥ 0
    fn constraints(&mut self, x: &Array1<f64>) -> Vec<f64>;
}

/// How a minimisation run terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Feasible and the objective settled within tolerance
    Converged,
    /// Iteration cap reached, but a feasible point was found on the way
    IterationLimit,
    /// Iteration cap reached without any feasible point
    Infeasible,
}

/// Result of a minimisation run
#[derive(Debug, Clone, Serialize)]
pub struct SolverReport {
    /// Whether `x` satisfies every constraint within tolerance
    pub success: bool,

    pub status: SolverStatus,

    /// Best feasible point, or the last iterate when none was feasible
    pub x: Array1<f64>,

    /// Objective value at `x`
    pub objective: f64,

    /// Largest constraint violation at `x` (0 when feasible)
    pub max_violation: f64,

    pub outer_iterations: usize,

    /// Number of objective/constraint evaluations
    pub evaluations: usize,

    /// Additional metadata (penalty, multipliers, ...)
    pub meta: Value,
}

/// Trait for constrained minimisers
pub trait Minimizer {
    /// Minimise `problem` starting from `x0`
    ///
    /// Non-convergence is reported through [`SolverReport::success`]; an
    /// `Err` signals an unrecoverable failure such as a non-finite objective.
    fn minimize(
        &mut self,
        problem: &mut dyn ConstrainedProblem,
        x0: Array1<f64>,
    ) -> Result<SolverReport>;

    /// Get minimiser name for logging/debugging
    fn name(&self) -> &str {
        "UnknownMinimizer"
    }
}

/// Largest violation of `c ≥ 0` over a constraint vector.
pub fn max_violation(constraints: &[f64]) -> f64 {
    constraints.iter().fold(0.0f64, |worst, c| worst.max(-c))
}
