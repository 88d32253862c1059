//! A single colour category: a Gaussian-like region in HSL space.

use serde::{Deserialize, Serialize};

use crate::color::{canonical_hue, hue_distance};
use crate::error::{ModelError, ModelResult};

/// Smallest admissible radius in any dimension.
pub const MIN_RADIUS: f64 = 1.0;
/// Largest admissible hue half-width.
pub const MAX_HUE_RADIUS: f64 = 180.0;
/// Upper end of the saturation and lightness scales.
pub const LINEAR_MAX: f64 = 100.0;

/// Category prototype with hue, saturation and lightness centres and radii.
///
/// `hc` is `None` for hue-agnostic categories (white, grey, black); their
/// hue radius is carried but never consulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    hc: Option<f64>,
    hr: f64,
    sc: f64,
    sr: f64,
    lc: f64,
    lr: f64,
    add_diversity: f64,
}

/// Derived boundaries of a category; never stored as ground truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Borders {
    pub h0: Option<f64>,
    pub h1: Option<f64>,
    pub s0: f64,
    pub s1: f64,
    pub l0: f64,
    pub l1: f64,
}

impl Category {
    /// Validates imported parameters.
    ///
    /// Radii must be positive and no wider than their scale allows
    /// ([`MAX_HUE_RADIUS`] for hue, [`LINEAR_MAX`] otherwise); radii below
    /// [`MIN_RADIUS`] are lifted to it. Centres must lie on their scale. The
    /// hue centre is reduced modulo 360.
    pub fn new(
        hc: Option<f64>,
        hr: f64,
        sc: f64,
        sr: f64,
        lc: f64,
        lr: f64,
    ) -> ModelResult<Self> {
        if let Some(h) = hc {
            if !h.is_finite() {
                return Err(ModelError::invalid_parameter("hc", h.to_string(), "finite"));
            }
        }
        for (name, value, max) in [
            ("hr", hr, MAX_HUE_RADIUS),
            ("sr", sr, LINEAR_MAX),
            ("lr", lr, LINEAR_MAX),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ModelError::degenerate_radius("<import>", name, value));
            }
            if value > max {
                return Err(ModelError::invalid_parameter(
                    name,
                    value.to_string(),
                    format!("value <= {}", max),
                ));
            }
        }
        for (name, value) in [("sc", sc), ("lc", lc)] {
            if !(0.0..=LINEAR_MAX).contains(&value) {
                return Err(ModelError::invalid_parameter(
                    name,
                    value.to_string(),
                    "0 <= value <= 100",
                ));
            }
        }
        Ok(Self::clamped(hc, hr, sc, sr, lc, lr))
    }

    /// Builds a category by wrapping the hue and clipping every other value
    /// into its admissible range. Used for candidate prototypes produced by
    /// learning, where a radius must never reach zero.
    pub fn clamped(hc: Option<f64>, hr: f64, sc: f64, sr: f64, lc: f64, lr: f64) -> Self {
        Self {
            hc: hc.map(canonical_hue),
            hr: hr.clamp(MIN_RADIUS, MAX_HUE_RADIUS),
            sc: sc.clamp(0.0, LINEAR_MAX),
            sr: sr.clamp(MIN_RADIUS, LINEAR_MAX),
            lc: lc.clamp(0.0, LINEAR_MAX),
            lr: lr.clamp(MIN_RADIUS, LINEAR_MAX),
            add_diversity: 0.0,
        }
    }

    pub fn hc(&self) -> Option<f64> {
        self.hc
    }

    pub fn hr(&self) -> f64 {
        self.hr
    }

    pub fn sc(&self) -> f64 {
        self.sc
    }

    pub fn sr(&self) -> f64 {
        self.sr
    }

    pub fn lc(&self) -> f64 {
        self.lc
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn add_diversity(&self) -> f64 {
        self.add_diversity
    }

    pub fn is_hue_agnostic(&self) -> bool {
        self.hc.is_none()
    }

    /// Increases the diversity bias. Negative or non-finite amounts are ignored
    /// so the value never decreases.
    pub fn bump_diversity(&mut self, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.add_diversity += amount;
        }
    }

    pub(crate) fn with_diversity(mut self, add_diversity: f64) -> Self {
        self.add_diversity = add_diversity.max(0.0);
        self
    }

    /// Replaces the six prototype parameters, keeping the diversity bias.
    pub(crate) fn adopt_prototype(&mut self, other: &Category) {
        let add_diversity = self.add_diversity;
        *self = other.clone();
        self.add_diversity = add_diversity;
    }

    pub fn borders(&self) -> Borders {
        Borders {
            h0: self.hc.map(|hc| canonical_hue(hc - self.hr)),
            h1: self.hc.map(|hc| canonical_hue(hc + self.hr)),
            s0: (self.sc - self.sr).clamp(0.0, LINEAR_MAX),
            s1: (self.sc + self.sr).clamp(0.0, LINEAR_MAX),
            l0: (self.lc - self.lr).clamp(0.0, LINEAR_MAX),
            l1: (self.lc + self.lr).clamp(0.0, LINEAR_MAX),
        }
    }
}

impl Borders {
    /// Sum of squared boundary displacements between two border sets.
    ///
    /// Hue borders use circular distance; a hue-agnostic side contributes
    /// nothing for hue.
    pub fn squared_change(&self, other: &Borders) -> f64 {
        let mut total = 0.0;
        for (a, b) in [(self.h0, other.h0), (self.h1, other.h1)] {
            if let (Some(a), Some(b)) = (a, b) {
                total += hue_distance(a, b).powi(2);
            }
        }
        total += (self.s0 - other.s0).powi(2);
        total += (self.s1 - other.s1).powi(2);
        total += (self.l0 - other.l0).powi(2);
        total += (self.l1 - other.l1).powi(2);
        total
    }
}

/// Border change between an old and a new prototype.
pub fn border_change(old: &Category, new: &Category) -> f64 {
    old.borders().squared_change(&new.borders())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Category {
        Category::new(Some(0.0), 20.0, 90.0, 10.0, 50.0, 15.0).unwrap()
    }

    #[test]
    fn new_rejects_non_positive_radius() {
        let err = Category::new(Some(0.0), 0.0, 50.0, 10.0, 50.0, 10.0).unwrap_err();
        assert!(matches!(err, ModelError::DegenerateRadius { .. }));
        assert!(Category::new(Some(0.0), 10.0, 50.0, -1.0, 50.0, 10.0).is_err());
    }

    #[test]
    fn new_rejects_radius_wider_than_its_scale() {
        let err = Category::new(None, 200.0, 10.0, 15.0, 50.0, 20.0).unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { .. }));
        assert!(Category::new(None, 180.0, 10.0, 120.0, 50.0, 20.0).is_err());
        assert!(Category::new(Some(0.0), 20.0, 10.0, 15.0, 50.0, 100.5).is_err());
        let widest = Category::new(None, 180.0, 10.0, 100.0, 50.0, 100.0).unwrap();
        assert_eq!((widest.hr(), widest.sr(), widest.lr()), (180.0, 100.0, 100.0));
    }

    #[test]
    fn new_lifts_small_radius_and_wraps_hue() {
        let cat = Category::new(Some(-30.0), 0.5, 50.0, 10.0, 50.0, 10.0).unwrap();
        assert_eq!(cat.hr(), MIN_RADIUS);
        assert_eq!(cat.hc(), Some(330.0));
    }

    #[test]
    fn borders_wrap_around_zero() {
        let borders = red().borders();
        assert_eq!(borders.h0, Some(340.0));
        assert_eq!(borders.h1, Some(20.0));
        assert_eq!(borders.s0, 80.0);
        assert_eq!(borders.s1, 100.0);
    }

    #[test]
    fn border_change_is_zero_for_identical_prototypes() {
        assert_eq!(border_change(&red(), &red()), 0.0);
    }

    #[test]
    fn border_change_uses_short_hue_arc() {
        let shifted = Category::clamped(Some(350.0), 20.0, 90.0, 10.0, 50.0, 15.0);
        // both hue borders move 10 degrees across the seam
        assert!((border_change(&red(), &shifted) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn border_change_ignores_hue_for_agnostic_categories() {
        let grey = Category::new(None, 10.0, 5.0, 5.0, 50.0, 20.0).unwrap();
        let lighter = Category::new(None, 10.0, 5.0, 5.0, 52.0, 20.0).unwrap();
        assert!((border_change(&grey, &lighter) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn diversity_never_decreases() {
        let mut cat = red();
        cat.bump_diversity(5.0);
        cat.bump_diversity(-3.0);
        cat.bump_diversity(f64::NAN);
        assert_eq!(cat.add_diversity(), 5.0);
    }
}
