//! Running-statistics category update.
//!
//! One labelled observation is folded into its category as if the category
//! had been estimated from a window of `N` samples: `N − 1` copies of the
//! current centre plus the new colour. Hue uses the circular mean of that
//! window; saturation and lightness use the plain mean. Radii follow the
//! pooled-variance recurrence
//!
//! ```text
//! r' = sqrt(((N − 1)·(r² + δ²) + d²) / N)
//! ```
//!
//! where `δ` is the shift of the centre and `d` the distance of the sample
//! from the new centre.

use tracing::{debug, info};

use super::{AdaptationReport, LearningOutcome, RejectReason};
use crate::color::{circular_mean, hue_distance, signed_hue_delta, Color};
use crate::config::AdaptationConfig;
use crate::error::{ModelError, ModelResult};
use crate::model::{border_change, Category, CategoryModel, MIN_RADIUS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalAdapter {
    accumulated_number: usize,
}

impl Default for StatisticalAdapter {
    fn default() -> Self {
        Self {
            accumulated_number: 15,
        }
    }
}

impl StatisticalAdapter {
    pub fn new(accumulated_number: usize) -> ModelResult<Self> {
        if accumulated_number < 2 {
            return Err(ModelError::invalid_parameter(
                "accumulated_number",
                accumulated_number.to_string(),
                ">= 2",
            ));
        }
        Ok(Self { accumulated_number })
    }

    pub fn from_config(config: &AdaptationConfig) -> ModelResult<Self> {
        Self::new(config.accumulated_number)
    }

    pub fn accumulated_number(&self) -> usize {
        self.accumulated_number
    }

    /// Prototype `category` would move to after observing `color`.
    pub fn candidate(&self, category: &Category, color: &Color) -> Category {
        let n = self.accumulated_number as f64;

        let (hc, hr) = match category.hc() {
            Some(hc) => {
                let mut window = vec![hc; self.accumulated_number - 1];
                window.push(color.h());
                let new_hc = circular_mean(&window).unwrap_or(hc);
                let delta = signed_hue_delta(hc, new_hc);
                let spread = hue_distance(color.h(), new_hc);
                (Some(new_hc), pooled_radius(category.hr(), delta, spread, n))
            }
            None => (None, category.hr()),
        };

        let (sc, sr) = linear_update(category.sc(), category.sr(), color.s(), n);
        let (lc, lr) = linear_update(category.lc(), category.lr(), color.l(), n);

        for (name, raw) in [("hr", hr), ("sr", sr), ("lr", lr)] {
            if raw < MIN_RADIUS {
                debug!(parameter = name, value = raw, "radius clamped to minimum");
            }
        }
        Category::clamped(hc, hr, sc, sr, lc, lr)
    }

    /// Folds `color` into category `name` if the resulting border change is
    /// strictly below `change_limit`.
    pub fn adapt(
        &self,
        model: &mut CategoryModel,
        name: &str,
        color: &Color,
        change_limit: f64,
    ) -> ModelResult<AdaptationReport> {
        let current = model.require(name)?;
        let candidate = self.candidate(current, color);
        let cost = border_change(current, &candidate);
        let candidates = vec![(name.to_string(), candidate)];

        let outcome = if cost < change_limit {
            model.commit_rows(&candidates)?;
            info!(category = name, border_change = cost, "committed statistical update");
            LearningOutcome::Committed { cost }
        } else {
            info!(
                category = name,
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
            involved: vec![name.to_string()],
            candidates,
            solver: None,
        })
    }
}

fn pooled_radius(radius: f64, delta: f64, spread: f64, n: f64) -> f64 {
    (((n - 1.0) * (radius * radius + delta * delta) + spread * spread) / n).sqrt()
}

fn linear_update(centre: f64, radius: f64, sample: f64, n: f64) -> (f64, f64) {
    let new_centre = ((n - 1.0) * centre + sample) / n;
    let delta = new_centre - centre;
    (
        new_centre,
        pooled_radius(radius, delta, sample - new_centre, n),
    )
}
