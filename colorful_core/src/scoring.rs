//! Acceptability, discriminatory power and blended scores.
//!
//! Scoring is a pure function of a category snapshot and an observation
//! context. The resulting [`ScoredTable`] holds, for every category and every
//! colour slot, the three derived columns `acc`, `dp` and `score`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{hue_distance, Color};
use crate::config::ScoringConfig;
use crate::model::{Category, CategoryModel};

/// Which column a goal or a prediction is judged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Acceptability alone (naive learning).
    Acc,
    /// Blend of acceptability and discriminatory power (context-sensitive learning).
    Score,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Acc => "acc",
            Metric::Score => "score",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "acc" => Ok(Metric::Acc),
            "score" => Ok(Metric::Score),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

/// Derived columns of one category for one colour slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotScore {
    pub acc: f64,
    pub dp: f64,
    pub score: f64,
}

impl SlotScore {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Acc => self.acc,
            Metric::Score => self.score,
        }
    }
}

/// Per-category, per-slot scores for one observation context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTable {
    colors: Vec<Color>,
    rows: BTreeMap<String, Vec<SlotScore>>,
}

impl ScoredTable {
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn slots(&self) -> usize {
        self.colors.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn slot(&self, name: &str, slot: usize) -> Option<SlotScore> {
        self.rows.get(name).and_then(|row| row.get(slot)).copied()
    }

    pub fn value(&self, name: &str, slot: usize, metric: Metric) -> Option<f64> {
        self.slot(name, slot).map(|s| s.get(metric))
    }

    /// Category with the maximal `metric` for `slot`.
    ///
    /// Ties go to the lexicographically smallest name.
    pub fn best(&self, slot: usize, metric: Metric) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (name, row) in &self.rows {
            let Some(value) = row.get(slot).map(|s| s.get(metric)) else {
                continue;
            };
            match best {
                Some((_, top)) if value <= top => {}
                _ => best = Some((name.as_str(), value)),
            }
        }
        best.map(|(name, _)| name)
    }

    /// Best category for every slot, in slot order. A slot no category
    /// covers is `None`.
    pub fn best_descriptions(&self, metric: Metric) -> Vec<Option<String>> {
        (0..self.slots())
            .map(|slot| self.best(slot, metric).map(str::to_string))
            .collect()
    }

    /// Every category whose `metric` for `slot` strictly exceeds `target`'s.
    pub fn outranking(&self, slot: usize, metric: Metric, target: &str) -> Vec<String> {
        let Some(reference) = self.value(target, slot, metric) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|(name, row)| {
                name.as_str() != target
                    && row.get(slot).map(|s| s.get(metric) > reference).unwrap_or(false)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Evaluates categories against observed colours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringEngine {
    alpha: f64,
    lower_bound: f64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            lower_bound: 0.02,
        }
    }
}

impl ScoringEngine {
    /// `alpha` weights acceptability against discriminatory power;
    /// `lower_bound` floors acceptability so no category is ever locked out.
    pub fn new(alpha: f64, lower_bound: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            lower_bound: lower_bound.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.alpha, config.lower_bound)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    /// Gaussian-like goodness of fit in `[lower_bound, 1]`.
    pub fn acceptability(&self, category: &Category, color: &Color) -> f64 {
        let h_part = match category.hc() {
            Some(hc) => (hue_distance(color.h(), hc) / category.hr()).powi(2),
            None => 0.0,
        };
        let s_part = ((color.s() - category.sc()) / category.sr()).powi(2);
        let l_part = ((color.l() - category.lc()) / category.lr()).powi(2);
        (-0.5 * (h_part + s_part + l_part)).exp().max(self.lower_bound)
    }

    /// Share of `acc` in the total acceptability of a slot.
    pub fn discriminatory_power(&self, acc: f64, slot_total: f64) -> f64 {
        if slot_total > 0.0 {
            acc / slot_total
        } else {
            0.0
        }
    }

    pub fn blend(&self, acc: f64, dp: f64) -> f64 {
        self.alpha * acc + (1.0 - self.alpha) * dp
    }

    /// Scores every category against every colour of the context.
    pub fn score<'a, I>(&self, categories: I, colors: &[Color]) -> ScoredTable
    where
        I: IntoIterator<Item = (&'a str, &'a Category)>,
    {
        let mut acc_rows: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (name, category) in categories {
            let accs = colors
                .iter()
                .map(|color| self.acceptability(category, color))
                .collect();
            acc_rows.insert(name.to_string(), accs);
        }

        let totals: Vec<f64> = (0..colors.len())
            .map(|slot| acc_rows.values().map(|accs| accs[slot]).sum())
            .collect();

        let rows = acc_rows
            .into_iter()
            .map(|(name, accs)| {
                let scores = accs
                    .iter()
                    .zip(&totals)
                    .map(|(&acc, &total)| {
                        let dp = self.discriminatory_power(acc, total);
                        SlotScore {
                            acc,
                            dp,
                            score: self.blend(acc, dp),
                        }
                    })
                    .collect();
                (name, scores)
            })
            .collect();

        ScoredTable {
            colors: colors.to_vec(),
            rows,
        }
    }

    pub fn score_model(&self, model: &CategoryModel, colors: &[Color]) -> ScoredTable {
        self.score(model.iter(), colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Category {
        Category::new(Some(0.0), 20.0, 90.0, 10.0, 50.0, 15.0).unwrap()
    }

    fn yellow() -> Category {
        Category::new(Some(50.0), 20.0, 90.0, 10.0, 50.0, 15.0).unwrap()
    }

    fn model() -> CategoryModel {
        let mut model = CategoryModel::new();
        model.insert("red", red());
        model.insert("yellow", yellow());
        model
    }

    fn color(h: f64) -> Color {
        Color::new(h, 90.0, 50.0).unwrap()
    }

    #[test]
    fn acceptability_is_one_at_prototype_centre() {
        let engine = ScoringEngine::default();
        assert_eq!(engine.acceptability(&red(), &color(0.0)), 1.0);
        assert!(engine.acceptability(&red(), &color(10.0)) < 1.0);
    }

    #[test]
    fn acceptability_is_floored() {
        let engine = ScoringEngine::default();
        let far = Color::new(180.0, 0.0, 100.0).unwrap();
        assert_eq!(engine.acceptability(&red(), &far), engine.lower_bound());
    }

    #[test]
    fn acceptability_wraps_hue() {
        let engine = ScoringEngine::default();
        let a = engine.acceptability(&red(), &color(350.0));
        let b = engine.acceptability(&red(), &color(10.0));
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn hue_agnostic_category_ignores_hue() {
        let engine = ScoringEngine::default();
        let grey = Category::new(None, 10.0, 90.0, 10.0, 50.0, 15.0).unwrap();
        assert_eq!(engine.acceptability(&grey, &color(0.0)), 1.0);
        assert_eq!(engine.acceptability(&grey, &color(200.0)), 1.0);
    }

    #[test]
    fn discriminatory_power_sums_to_one_per_slot() {
        let engine = ScoringEngine::default();
        let table = engine.score_model(&model(), &[color(10.0), color(45.0)]);
        for slot in 0..table.slots() {
            let total: f64 = table
                .names()
                .map(|name| table.slot(name, slot).unwrap().dp)
                .sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn score_blends_acc_and_dp() {
        let engine = ScoringEngine::new(0.3, 0.02);
        let table = engine.score_model(&model(), &[color(10.0)]);
        let s = table.slot("red", 0).unwrap();
        assert!((s.score - (0.3 * s.acc + 0.7 * s.dp)).abs() < 1e-12);
    }

    #[test]
    fn best_prefers_smallest_name_on_tie() {
        let mut model = CategoryModel::new();
        model.insert("b", red());
        model.insert("a", red());
        let table = ScoringEngine::default().score_model(&model, &[color(0.0)]);
        assert_eq!(table.best(0, Metric::Acc), Some("a"));
    }

    #[test]
    fn best_descriptions_keep_one_entry_per_slot() {
        let colors = [color(0.0), color(45.0)];
        let empty = ScoringEngine::default().score_model(&CategoryModel::new(), &colors);
        assert_eq!(empty.best_descriptions(Metric::Score), vec![None, None]);

        let table = ScoringEngine::default().score_model(&model(), &colors);
        assert_eq!(
            table.best_descriptions(Metric::Acc),
            vec![Some("red".to_string()), Some("yellow".to_string())]
        );
    }

    #[test]
    fn outranking_lists_strictly_better_categories() {
        let table = ScoringEngine::default().score_model(&model(), &[color(45.0)]);
        assert_eq!(table.outranking(0, Metric::Acc, "red"), vec!["yellow".to_string()]);
        assert!(table.outranking(0, Metric::Acc, "yellow").is_empty());
    }

    #[test]
    fn metric_parses_from_str() {
        assert_eq!("acc".parse::<Metric>(), Ok(Metric::Acc));
        assert_eq!("score".parse::<Metric>(), Ok(Metric::Score));
        assert!("dp".parse::<Metric>().is_err());
    }
}
