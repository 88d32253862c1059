//! Experiment session: the owner of the live category model.
//!
//! A [`ColorSession`] holds the one mutable [`CategoryModel`] of an
//! experiment together with a frozen copy of the preset it started from. All
//! scoring and learning goes through it, so there is exactly one writer per
//! model.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::color::Color;
use crate::config::LearningConfig;
use crate::error::{ModelError, ModelResult};
use crate::goal::{DistractorPolicy, Goal, GoalBuilder};
use crate::learning::{AdaptationReport, ConstrainedAdapter, StatisticalAdapter};
use crate::logging::{LearningJournal, LearningLogEntry, LearningMode};
use crate::model::{Category, CategoryModel};
use crate::scoring::{Metric, ScoredTable, ScoringEngine};

/// Smallest number of colours shown together in one trial.
pub const MIN_CONTEXT_COLORS: usize = 2;
/// Largest number of colours shown together in one trial.
pub const MAX_CONTEXT_COLORS: usize = 4;

pub struct ColorSession {
    model: CategoryModel,
    baseline: CategoryModel,
    config: LearningConfig,
    engine: ScoringEngine,
    goals: GoalBuilder,
    constrained: ConstrainedAdapter,
    statistical: StatisticalAdapter,
    context: Option<ScoredTable>,
    journal: LearningJournal,
}

impl ColorSession {
    /// Starts a session on `model`, which is also frozen as the baseline.
    pub fn new(model: CategoryModel, config: LearningConfig) -> ModelResult<Self> {
        let statistical = StatisticalAdapter::from_config(&config.learning)?;
        Ok(Self {
            baseline: model.clone(),
            model,
            engine: ScoringEngine::from_config(&config.scoring),
            goals: GoalBuilder::new(DistractorPolicy::from_flag(
                config.learning.add_all_distracting_categories,
            )),
            constrained: ConstrainedAdapter::from_config(&config),
            statistical,
            config,
            context: None,
            journal: LearningJournal::in_memory(),
        })
    }

    /// Loads a CSV preset and starts a session on it.
    pub fn from_preset<P: AsRef<Path>>(path: P, config: LearningConfig) -> ModelResult<Self> {
        let model = CategoryModel::load_csv(path)?;
        info!(categories = model.len(), "loaded category preset");
        Self::new(model, config)
    }

    pub fn with_journal(mut self, journal: LearningJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn model(&self) -> &CategoryModel {
        &self.model
    }

    pub fn baseline(&self) -> &CategoryModel {
        &self.baseline
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn journal(&self) -> &LearningJournal {
        &self.journal
    }

    /// Scores of the last fitted context, if any.
    pub fn context(&self) -> Option<&ScoredTable> {
        self.context.as_ref()
    }

    pub fn category_exists(&self, name: &str) -> bool {
        self.model.contains(name)
    }

    /// Scores `colors` against the current model and keeps the result as the
    /// current context.
    pub fn fit_colors(&mut self, colors: &[Color]) -> ModelResult<&ScoredTable> {
        validate_colors(colors)?;
        let table = self.engine.score_model(&self.model, colors);
        Ok(&*self.context.insert(table))
    }

    /// Best category per slot of the current context.
    pub fn best_descriptions(&self, metric: Metric) -> ModelResult<Vec<String>> {
        let table = self
            .context
            .as_ref()
            .ok_or_else(|| ModelError::invalid_context("no colours have been fitted yet"))?;
        table
            .best_descriptions(metric)
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ModelError::invalid_context("the model has no categories"))
    }

    /// Folds `colors[target_index]` into category `label`.
    ///
    /// `change_limit` falls back to the configured limit when `None`.
    pub fn statistical_learning(
        &mut self,
        label: &str,
        colors: &[Color],
        target_index: usize,
        change_limit: Option<f64>,
    ) -> ModelResult<AdaptationReport> {
        validate_colors(colors)?;
        check_index(target_index, colors.len())?;
        self.model.require(label)?;

        let table = self.engine.score_model(&self.model, colors);
        let naive_correct = table.best(target_index, Metric::Acc) == Some(label);
        let context_correct = table.best(target_index, Metric::Score) == Some(label);
        info!(
            label,
            naive_prediction_correct = naive_correct,
            context_prediction_correct = context_correct,
            "statistical learning"
        );

        let limit = self.limit(change_limit);
        let before = self.rows(&[label.to_string()]);
        let report = self
            .statistical
            .adapt(&mut self.model, label, &colors[target_index], limit)?;

        self.context = Some(self.engine.score_model(&self.model, colors));
        self.journal_entry(
            LearningMode::Statistical,
            colors,
            Some(target_index),
            vec![label.to_string()],
            (naive_correct, context_correct),
            &report,
            before,
        );
        Ok(report)
    }

    /// Contrastive learning on acceptability.
    ///
    /// `labels[i]` names the category colour `i` should be described by;
    /// `None` leaves a slot unconstrained.
    pub fn naive_learning(
        &mut self,
        colors: &[Color],
        labels: &[Option<&str>],
        change_limit: Option<f64>,
    ) -> ModelResult<AdaptationReport> {
        self.contrastive_learning(colors, labels, Metric::Acc, change_limit)
    }

    /// Contrastive learning on the blended score.
    pub fn context_sensitive_learning(
        &mut self,
        colors: &[Color],
        labels: &[Option<&str>],
        change_limit: Option<f64>,
    ) -> ModelResult<AdaptationReport> {
        self.contrastive_learning(colors, labels, Metric::Score, change_limit)
    }

    /// Pushes the current best-acceptability category of `target_index` by
    /// the configured diversity bump, returning its name.
    pub fn indistinguishable_colors(&mut self, target_index: usize) -> ModelResult<String> {
        let table = self
            .context
            .as_ref()
            .ok_or_else(|| ModelError::invalid_context("no colours have been fitted yet"))?;
        check_index(target_index, table.slots())?;
        let name = table
            .best(target_index, Metric::Acc)
            .map(str::to_string)
            .ok_or_else(|| ModelError::invalid_context("the model has no categories"))?;
        self.bump_diversity(&name)?;
        Ok(name)
    }

    /// Adds the configured diversity bump to `name`, returning the new bias.
    pub fn bump_diversity(&mut self, name: &str) -> ModelResult<f64> {
        let value = self
            .model
            .bump_diversity(name, self.config.learning.diversity_bump)?;
        debug!(category = name, add_diversity = value, "diversity bumped");
        Ok(value)
    }

    /// Discards everything learned and returns to the preset.
    pub fn reset_to_baseline(&mut self) {
        self.model = self.baseline.clone();
        self.context = None;
        info!("model reset to baseline");
    }

    /// Writes the current prototypes to `dir/kb_colors_learned_{id}.csv`.
    pub fn save_snapshot<P: AsRef<Path>>(&self, dir: P, id: &str) -> ModelResult<PathBuf> {
        let path = dir.as_ref().join(format!("kb_colors_learned_{}.csv", id));
        self.model.save_csv(&path)?;
        info!(path = %path.display(), "model snapshot saved");
        Ok(path)
    }

    fn contrastive_learning(
        &mut self,
        colors: &[Color],
        labels: &[Option<&str>],
        metric: Metric,
        change_limit: Option<f64>,
    ) -> ModelResult<AdaptationReport> {
        validate_colors(colors)?;
        if labels.len() != colors.len() {
            return Err(ModelError::invalid_context(format!(
                "{} labels given for {} colours",
                labels.len(),
                colors.len()
            )));
        }
        for label in labels.iter().flatten() {
            self.model.require(label)?;
        }

        let table = self.engine.score_model(&self.model, colors);
        let mut goals: Vec<Goal> = Vec::new();
        let mut naive_correct = true;
        let mut context_correct = true;
        for (index, label) in labels.iter().enumerate() {
            let Some(label) = label else { continue };
            naive_correct &= table.best(index, Metric::Acc) == Some(*label);
            context_correct &= table.best(index, Metric::Score) == Some(*label);
            let goal = self.goals.build(&table, index, label, metric)?;
            if !goal.is_noop() {
                goals.push(goal);
            }
        }

        let names: Vec<String> = labels.iter().flatten().map(|l| l.to_string()).collect();
        let mode = match metric {
            Metric::Acc => LearningMode::Naive,
            Metric::Score => LearningMode::ContextSensitive,
        };
        let limit = self.limit(change_limit);
        let involved: Vec<String> = goals
            .iter()
            .flat_map(|g| std::iter::once(&g.target_category).chain(&g.distracting_categories))
            .cloned()
            .collect();
        let before = self.rows(&involved);

        let report = self
            .constrained
            .adapt(&mut self.model, colors, &goals, metric, limit)?;
        info!(mode = ?mode, outcome = %report.outcome, "contrastive learning");

        self.context = Some(self.engine.score_model(&self.model, colors));
        self.journal_entry(
            mode,
            colors,
            None,
            names,
            (naive_correct, context_correct),
            &report,
            before,
        );
        Ok(report)
    }

    fn limit(&self, change_limit: Option<f64>) -> f64 {
        change_limit.unwrap_or_else(|| self.config.learning.change_limit_or_unbounded())
    }

    fn rows(&self, names: &[String]) -> Vec<(String, Category)> {
        let mut rows: Vec<(String, Category)> = names
            .iter()
            .filter_map(|name| self.model.get(name).map(|cat| (name.clone(), cat.clone())))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows.dedup_by(|a, b| a.0 == b.0);
        rows
    }

    /// Records a finished learning call. The model has already been updated
    /// at this point, so a failed write is logged and not returned.
    #[allow(clippy::too_many_arguments)]
    fn journal_entry(
        &mut self,
        mode: LearningMode,
        colors: &[Color],
        target_index: Option<usize>,
        labels: Vec<String>,
        predictions: (bool, bool),
        report: &AdaptationReport,
        categories_before: Vec<(String, Category)>,
    ) {
        let names: Vec<String> = categories_before.iter().map(|(n, _)| n.clone()).collect();
        let entry = LearningLogEntry {
            sequence: 0,
            mode,
            timestamp_ms: LearningJournal::timestamp_now(),
            colors: colors.to_vec(),
            target_index,
            labels,
            naive_prediction_correct: predictions.0,
            context_prediction_correct: predictions.1,
            outcome: report.outcome.clone(),
            categories_before,
            categories_after: self.rows(&names),
        };
        if let Err(err) = self.journal.record(entry) {
            warn!(error = %err, "failed to write learning journal entry");
        }
    }
}

fn validate_colors(colors: &[Color]) -> ModelResult<()> {
    if !(MIN_CONTEXT_COLORS..=MAX_CONTEXT_COLORS).contains(&colors.len()) {
        return Err(ModelError::invalid_context(format!(
            "expected {} to {} colours, got {}",
            MIN_CONTEXT_COLORS,
            MAX_CONTEXT_COLORS,
            colors.len()
        )));
    }
    Ok(())
}

fn check_index(index: usize, len: usize) -> ModelResult<()> {
    if index >= len {
        return Err(ModelError::invalid_context(format!(
            "target index {} out of range for {} colours",
            index, len
        )));
    }
    Ok(())
}
