//! Learning rules that move category prototypes.
//!
//! Two rules are provided:
//!
//! - [`ConstrainedAdapter`] adjusts every category referenced by a batch of
//!   contrastive goals so each target beats its distractors by a margin,
//!   with the smallest possible movement of the category borders.
//! - [`StatisticalAdapter`] folds a single labelled observation into its
//!   category's running circular/linear statistics.
//!
//! Both rules either commit atomically or leave the model untouched; the
//! decision is reported as a [`LearningOutcome`].

pub mod constrained;
pub mod statistical;

use std::fmt;

use serde::Serialize;

use crate::model::Category;
use crate::solver::{SolverReport, SolverStatus};

pub use constrained::ConstrainedAdapter;
pub use statistical::StatisticalAdapter;

/// Why a learning call declined to change the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The optimiser stopped without satisfying every margin constraint.
    OptimizationDivergence {
        status: SolverStatus,
        max_violation: f64,
    },
    /// A valid update was found but moves the borders more than allowed.
    ChangeBudgetExceeded { cost: f64, limit: f64 },
}

/// Result of a learning call that did not fail outright.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LearningOutcome {
    /// The model was updated; `cost` is the total border change.
    Committed { cost: f64 },
    /// Every goal was already satisfied, nothing to optimise.
    NoChangeNeeded,
    Rejected(RejectReason),
}

impl LearningOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, LearningOutcome::Committed { .. })
    }

    /// Whether the model is unchanged after the call.
    pub fn left_model_unchanged(&self) -> bool {
        !self.is_committed()
    }
}

impl fmt::Display for LearningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningOutcome::Committed { cost } => {
                write!(f, "committed (border change {:.4})", cost)
            }
            LearningOutcome::NoChangeNeeded => write!(f, "no change needed"),
            LearningOutcome::Rejected(RejectReason::OptimizationDivergence {
                status,
                max_violation,
            }) => write!(
                f,
                "rejected: optimiser stopped with {:?} (max violation {:.4})",
                status, max_violation
            ),
            LearningOutcome::Rejected(RejectReason::ChangeBudgetExceeded { cost, limit }) => write!(
                f,
                "rejected: border change {:.4} exceeds limit {}",
                cost, limit
            ),
        }
    }
}

/// Full diagnostic of one adaptation call.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptationReport {
    pub outcome: LearningOutcome,
    /// Categories the call was allowed to touch, in name order.
    pub involved: Vec<String>,
    /// Candidate prototypes for the involved categories, whether committed or not.
    pub candidates: Vec<(String, Category)>,
    /// Present only when the optimiser ran.
    pub solver: Option<SolverReport>,
}

impl AdaptationReport {
    pub(crate) fn unchanged() -> Self {
        Self {
            outcome: LearningOutcome::NoChangeNeeded,
            involved: Vec::new(),
            candidates: Vec::new(),
            solver: None,
        }
    }
}
