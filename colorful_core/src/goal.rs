//! Contrastive learning goals.
//!
//! A goal names the category a colour slot should be described by and the
//! categories that currently beat it there and must be pushed below it.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::scoring::{Metric, ScoredTable};

/// Which competitors a goal pushes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractorPolicy {
    /// Only the currently top-ranked category, if it is not the target.
    #[default]
    Strongest,
    /// Every category whose metric exceeds the target's.
    AllOutranking,
}

impl DistractorPolicy {
    pub fn from_flag(add_all_distracting_categories: bool) -> Self {
        if add_all_distracting_categories {
            DistractorPolicy::AllOutranking
        } else {
            DistractorPolicy::Strongest
        }
    }
}

/// One learning constraint set for a single colour slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub color_index: usize,
    pub target_category: String,
    pub distracting_categories: Vec<String>,
}

impl Goal {
    /// A goal without distractors carries no constraint.
    pub fn is_noop(&self) -> bool {
        self.distracting_categories.is_empty()
    }
}

/// Builds goals from a scored context.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GoalBuilder {
    policy: DistractorPolicy,
}

impl GoalBuilder {
    pub fn new(policy: DistractorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DistractorPolicy {
        self.policy
    }

    /// Goal on acceptability.
    pub fn naive(
        &self,
        table: &ScoredTable,
        color_index: usize,
        target: &str,
    ) -> ModelResult<Goal> {
        self.build(table, color_index, target, Metric::Acc)
    }

    /// Goal on the blended score.
    pub fn context_sensitive(
        &self,
        table: &ScoredTable,
        color_index: usize,
        target: &str,
    ) -> ModelResult<Goal> {
        self.build(table, color_index, target, Metric::Score)
    }

    pub fn build(
        &self,
        table: &ScoredTable,
        color_index: usize,
        target: &str,
        metric: Metric,
    ) -> ModelResult<Goal> {
        if color_index >= table.slots() {
            return Err(ModelError::invalid_context(format!(
                "colour index {} out of range for {} colours",
                color_index,
                table.slots()
            )));
        }
        if table.value(target, color_index, metric).is_none() {
            return Err(ModelError::unknown_category(target));
        }

        let distracting_categories = match self.policy {
            DistractorPolicy::AllOutranking => table.outranking(color_index, metric, target),
            DistractorPolicy::Strongest => match table.best(color_index, metric) {
                Some(best) if best != target => vec![best.to_string()],
                _ => Vec::new(),
            },
        };

        Ok(Goal {
            color_index,
            target_category: target.to_string(),
            distracting_categories,
        })
    }
}
