//! Constrained margin optimisation over the categories named by a batch of goals.
//!
//! Every involved category gets six contiguous slots in a flat vector of
//! parameter offsets `(Δhc, Δhr, Δsc, Δsr, Δlc, Δlr)`. The minimiser looks for
//! the offsets with the smallest total border change such that, for every goal
//! and distractor, `metric(target) − metric(distractor) ≥ margin` when the whole
//! model is re-scored with the adjusted prototypes substituted in.

use std::collections::BTreeSet;

use ndarray::Array1;
use tracing::{debug, info, warn};

use super::{AdaptationReport, LearningOutcome, RejectReason};
use crate::color::Color;
use crate::config::LearningConfig;
use crate::error::{ModelError, ModelResult};
use crate::goal::Goal;
use crate::model::{border_change, Category, CategoryModel};
use crate::scoring::{Metric, ScoredTable, ScoringEngine};
use crate::solver::{AugmentedLagrangian, ConstrainedProblem, Minimizer};

/// Parameters per category in the flat offset vector.
pub const PARAMS_PER_CATEGORY: usize = 6;

/// One `(goal, distractor)` inequality.
#[derive(Debug, Clone)]
struct MarginConstraint {
    color_index: usize,
    target: String,
    distractor: String,
}

/// Adjusted state for the last evaluated offset vector.
#[derive(Debug, Clone)]
struct AdjustmentCache {
    x: Array1<f64>,
    adjusted: Vec<Category>,
    cost: f64,
    table: ScoredTable,
}

/// Immutable part of the working copy.
///
/// Holds the pre-update ("real") prototypes of the involved categories, the
/// untouched remainder of the model needed for discriminatory power, and the
/// observation context.
struct Snapshot {
    involved: Vec<(String, Category)>,
    uninvolved: Vec<(String, Category)>,
    colors: Vec<Color>,
    constraints: Vec<MarginConstraint>,
    engine: ScoringEngine,
    metric: Metric,
    threshold: f64,
}

impl Snapshot {
    /// Applies offsets to the real prototypes, wrapping hue and clipping radii.
    fn reconstruct(&self, x: &Array1<f64>) -> Vec<Category> {
        self.involved
            .iter()
            .enumerate()
            .map(|(idx, (_, real))| {
                let o = idx * PARAMS_PER_CATEGORY;
                Category::clamped(
                    real.hc().map(|hc| hc + x[o]),
                    real.hr() + x[o + 1],
                    real.sc() + x[o + 2],
                    real.sr() + x[o + 3],
                    real.lc() + x[o + 4],
                    real.lr() + x[o + 5],
                )
            })
            .collect()
    }

    fn evaluate(&self, x: &Array1<f64>) -> AdjustmentCache {
        let adjusted = self.reconstruct(x);
        let cost = self
            .involved
            .iter()
            .zip(&adjusted)
            .map(|((_, real), new)| border_change(real, new))
            .sum();
        let substituted = self
            .involved
            .iter()
            .zip(&adjusted)
            .map(|((name, _), cat)| (name.as_str(), cat))
            .chain(self.uninvolved.iter().map(|(name, cat)| (name.as_str(), cat)));
        let table = self.engine.score(substituted, &self.colors);
        AdjustmentCache {
            x: x.clone(),
            adjusted,
            cost,
            table,
        }
    }

    fn margins(&self, table: &ScoredTable) -> Vec<f64> {
        self.constraints
            .iter()
            .map(|c| {
                let target = table
                    .value(&c.target, c.color_index, self.metric)
                    .unwrap_or(0.0);
                let distractor = table
                    .value(&c.distractor, c.color_index, self.metric)
                    .unwrap_or(0.0);
                target - distractor - self.threshold
            })
            .collect()
    }
}

/// Per-call projection of the model onto the involved categories, with the
/// adjustment memoised on the last offset vector. Dropped once the call
/// commits or rejects.
struct WorkingCopy {
    snapshot: Snapshot,
    cache: Option<AdjustmentCache>,
}

impl WorkingCopy {
    fn new(
        model: &CategoryModel,
        colors: &[Color],
        goals: &[&Goal],
        engine: ScoringEngine,
        metric: Metric,
        threshold: f64,
    ) -> Self {
        let mut names = BTreeSet::new();
        let mut constraints = Vec::new();
        for goal in goals {
            names.insert(goal.target_category.clone());
            for distractor in &goal.distracting_categories {
                names.insert(distractor.clone());
                constraints.push(MarginConstraint {
                    color_index: goal.color_index,
                    target: goal.target_category.clone(),
                    distractor: distractor.clone(),
                });
            }
        }

        let (involved, uninvolved): (Vec<_>, Vec<_>) = model
            .iter()
            .map(|(name, cat)| (name.to_string(), cat.clone()))
            .partition(|(name, _)| names.contains(name));

        Self {
            snapshot: Snapshot {
                involved,
                uninvolved,
                colors: colors.to_vec(),
                constraints,
                engine,
                metric,
                threshold,
            },
            cache: None,
        }
    }

    fn involved_names(&self) -> Vec<String> {
        self.snapshot
            .involved
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn refresh(&mut self, x: &Array1<f64>) -> &AdjustmentCache {
        refresh(&mut self.cache, &self.snapshot, x)
    }

    fn candidates(&mut self, x: &Array1<f64>) -> Vec<(String, Category)> {
        let names = self.involved_names();
        let adjusted = self.refresh(x).adjusted.clone();
        names.into_iter().zip(adjusted).collect()
    }
}

fn refresh<'a>(
    cache: &'a mut Option<AdjustmentCache>,
    snapshot: &Snapshot,
    x: &Array1<f64>,
) -> &'a AdjustmentCache {
    if let Some(hit) = cache.take().filter(|cached| cached.x == *x) {
        return cache.insert(hit);
    }
    cache.insert(snapshot.evaluate(x))
}

impl ConstrainedProblem for WorkingCopy {
    fn dimension(&self) -> usize {
        self.snapshot.involved.len() * PARAMS_PER_CATEGORY
    }

    fn objective(&mut self, x: &Array1<f64>) -> f64 {
        self.refresh(x).cost
    }

    fn constraints(&mut self, x: &Array1<f64>) -> Vec<f64> {
        let cache = refresh(&mut self.cache, &self.snapshot, x);
        self.snapshot.margins(&cache.table)
    }
}

/// Contrastive learning rule over batches of goals.
#[derive(Debug, Clone)]
pub struct ConstrainedAdapter<M: Minimizer = AugmentedLagrangian> {
    minimizer: M,
    engine: ScoringEngine,
    margin: f64,
    slack: f64,
}

impl ConstrainedAdapter<AugmentedLagrangian> {
    pub fn from_config(config: &LearningConfig) -> Self {
        Self::with_minimizer(
            AugmentedLagrangian::new(config.solver.clone()),
            ScoringEngine::from_config(&config.scoring),
            config.learning.margin,
        )
        .with_slack(config.solver.feasibility_tolerance)
    }
}

impl Default for ConstrainedAdapter<AugmentedLagrangian> {
    fn default() -> Self {
        Self::from_config(&LearningConfig::default())
    }
}

impl<M: Minimizer> ConstrainedAdapter<M> {
    pub fn with_minimizer(minimizer: M, engine: ScoringEngine, margin: f64) -> Self {
        Self {
            minimizer,
            engine,
            margin: margin.max(0.0),
            slack: 0.0,
        }
    }

    /// Extra gap added on top of the margin inside the optimiser, so points
    /// accepted within the minimiser's feasibility tolerance still clear the
    /// margin exactly.
    pub fn with_slack(mut self, slack: f64) -> Self {
        self.slack = slack.max(0.0);
        self
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn minimizer(&self) -> &M {
        &self.minimizer
    }

    /// Adapts the categories referenced by `goals`.
    ///
    /// Goals without distractors are dropped; if none remain the outcome is
    /// [`LearningOutcome::NoChangeNeeded`]. Unknown names and slot indices
    /// outside `colors` are hard errors and leave the model untouched, as do
    /// rejections. Only the involved categories are ever written.
    pub fn adapt(
        &mut self,
        model: &mut CategoryModel,
        colors: &[Color],
        goals: &[Goal],
        metric: Metric,
        change_limit: f64,
    ) -> ModelResult<AdaptationReport> {
        let active: Vec<&Goal> = goals.iter().filter(|goal| !goal.is_noop()).collect();
        if active.is_empty() {
            debug!("all goals already satisfied; skipping optimisation");
            return Ok(AdaptationReport::unchanged());
        }

        for goal in &active {
            if goal.color_index >= colors.len() {
                return Err(ModelError::invalid_context(format!(
                    "goal refers to colour {} but only {} colours were shown",
                    goal.color_index,
                    colors.len()
                )));
            }
            model.require(&goal.target_category)?;
            for distractor in &goal.distracting_categories {
                model.require(distractor)?;
            }
        }

        let mut working = WorkingCopy::new(
            model,
            colors,
            &active,
            self.engine,
            metric,
            self.margin + self.slack,
        );
        let involved = working.involved_names();
        let x0 = Array1::zeros(working.dimension());
        let report = self
            .minimizer
            .minimize(&mut working, x0)
            .map_err(|err| ModelError::solver(format!("{:#}", err)))?;
        let candidates = working.candidates(&report.x);

        if !report.success {
            warn!(
                minimizer = self.minimizer.name(),
                status = ?report.status,
                max_violation = report.max_violation,
                "optimisation did not satisfy every margin; model not changed"
            );
            return Ok(AdaptationReport {
                outcome: LearningOutcome::Rejected(RejectReason::OptimizationDivergence {
                    status: report.status,
                    max_violation: report.max_violation,
                }),
                involved,
                candidates,
                solver: Some(report),
            });
        }

        let cost = working.refresh(&report.x).cost;
        let outcome = if cost < change_limit {
            model.commit_rows(&candidates)?;
            info!(border_change = cost, categories = ?involved, "committed constrained update");
            LearningOutcome::Committed { cost }
        } else {
            info!(
                border_change = cost,
                change_limit, "change limit exceeded; model not changed"
            );
            LearningOutcome::Rejected(RejectReason::ChangeBudgetExceeded {
                cost,
                limit: change_limit,
            })
        };

        Ok(AdaptationReport {
            outcome,
            involved,
            candidates,
            solver: Some(report),
        })
    }
}
