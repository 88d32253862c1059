//! HSL colours and circular hue arithmetic.
//!
//! Hue is measured in degrees on the circle `[0, 360)`; saturation and
//! lightness are percentages in `[0, 100]`. Every hue difference in the crate
//! goes through the helpers here so that the red/magenta seam at 0°/360° is
//! never treated as a long way round.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Full turn of the hue circle in degrees.
pub const HUE_PERIOD: f64 = 360.0;

/// Wraps a hue angle into the canonical `[0, 360)` range.
pub fn canonical_hue(h: f64) -> f64 {
    let wrapped = h.rem_euclid(HUE_PERIOD);
    // rem_euclid can round up to the period for tiny negative inputs
    if wrapped >= HUE_PERIOD {
        wrapped - HUE_PERIOD
    } else {
        wrapped
    }
}

/// Shortest unsigned distance between two hues, in `[0, 180]`.
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let d = canonical_hue(a - b);
    d.min(HUE_PERIOD - d)
}

/// Signed shortest rotation taking `from` onto `to`, in `(-180, 180]`.
pub fn signed_hue_delta(from: f64, to: f64) -> f64 {
    let d = canonical_hue(to - from);
    if d > HUE_PERIOD / 2.0 {
        d - HUE_PERIOD
    } else {
        d
    }
}

/// Circular mean of hue angles in degrees using vector addition.
///
/// Returns `None` when the resultant vector vanishes (for example two
/// opposite hues), where no mean direction exists.
pub fn circular_mean(hues: &[f64]) -> Option<f64> {
    if hues.is_empty() {
        return None;
    }
    let (sum_sin, sum_cos) = hues.iter().fold((0.0f64, 0.0f64), |(s, c), hue| {
        let rad = canonical_hue(*hue).to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    let scale = hues.len() as f64;
    if sum_sin.abs() / scale < 1e-12 && sum_cos.abs() / scale < 1e-12 {
        return None;
    }
    Some(canonical_hue(sum_sin.atan2(sum_cos).to_degrees()))
}

/// Immutable HSL colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    h: f64,
    s: f64,
    l: f64,
}

impl Color {
    /// Builds a colour, reducing the hue modulo 360.
    ///
    /// Saturation and lightness must lie in `[0, 100]`.
    pub fn new(h: f64, s: f64, l: f64) -> ModelResult<Self> {
        if !h.is_finite() {
            return Err(ModelError::invalid_parameter("h", h.to_string(), "finite"));
        }
        if !(0.0..=100.0).contains(&s) {
            return Err(ModelError::invalid_parameter(
                "s",
                s.to_string(),
                "0 <= s <= 100",
            ));
        }
        if !(0.0..=100.0).contains(&l) {
            return Err(ModelError::invalid_parameter(
                "l",
                l.to_string(),
                "0 <= l <= 100",
            ));
        }
        Ok(Self {
            h: canonical_hue(h),
            s,
            l,
        })
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn s(&self) -> f64 {
        self.s
    }

    pub fn l(&self) -> f64 {
        self.l
    }

    pub fn hsl(&self) -> (f64, f64, f64) {
        (self.h, self.s, self.l)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(h: {}, s: {}, l: {})", self.h, self.s, self.l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_equal(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "{} !≈ {}", a, b);
    }

    #[test]
    fn canonical_hue_wraps_both_directions() {
        approx_equal(canonical_hue(370.0), 10.0, 1e-12);
        approx_equal(canonical_hue(-10.0), 350.0, 1e-12);
        approx_equal(canonical_hue(720.0), 0.0, 1e-12);
        assert!(canonical_hue(-1e-18) < HUE_PERIOD);
    }

    #[test]
    fn hue_distance_crosses_seam() {
        approx_equal(hue_distance(355.0, 5.0), 10.0, 1e-12);
        approx_equal(hue_distance(5.0, 355.0), 10.0, 1e-12);
        approx_equal(hue_distance(0.0, 180.0), 180.0, 1e-12);
    }

    #[test]
    fn signed_delta_prefers_short_way() {
        approx_equal(signed_hue_delta(350.0, 10.0), 20.0, 1e-12);
        approx_equal(signed_hue_delta(10.0, 350.0), -20.0, 1e-12);
    }

    #[test]
    fn circular_mean_respects_wraparound() {
        let mean = circular_mean(&[350.0, 10.0]).unwrap();
        assert!(hue_distance(mean, 0.0) < 1e-9);
        assert!(circular_mean(&[0.0, 180.0]).is_none());
        assert!(circular_mean(&[]).is_none());
    }

    #[test]
    fn color_reduces_hue_and_rejects_out_of_range() {
        let color = Color::new(370.0, 50.0, 50.0).unwrap();
        approx_equal(color.h(), 10.0, 1e-12);
        assert!(Color::new(10.0, 120.0, 50.0).is_err());
        assert!(Color::new(f64::NAN, 50.0, 50.0).is_err());
    }
}
