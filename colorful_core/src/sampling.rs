//! Trial generation: pairs of neighbouring colours to show together.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::color::{canonical_hue, Color, HUE_PERIOD};
use crate::error::{ModelError, ModelResult};
use crate::model::CategoryModel;

/// Saturation of every sampled colour.
pub const TRIAL_SATURATION: f64 = 100.0;
/// Inclusive lightness range of [`two_adjacent_colors`].
pub const TRIAL_LIGHTNESS: (u32, u32) = (30, 60);

/// Two fully saturated mid-lightness colours `step` degrees apart, starting
/// from a uniformly random whole-degree hue.
pub fn two_adjacent_colors_naive<R: Rng + ?Sized>(
    rng: &mut R,
    step: f64,
) -> ModelResult<[Color; 2]> {
    let h1 = f64::from(rng.gen_range(0u32..360));
    Ok([
        Color::new(h1, TRIAL_SATURATION, 50.0)?,
        Color::new(canonical_hue(h1 + step), TRIAL_SATURATION, 50.0)?,
    ])
}

/// Two colours straddling the hue border of a random category.
///
/// The first hue falls inside the category's hue radius; the second lies
/// `radius_portion` radii further out on a random side, pushed out by the
/// category's diversity bias as well. The pair is returned in random order.
pub fn two_adjacent_colors<R: Rng + ?Sized>(
    model: &CategoryModel,
    rng: &mut R,
    radius_portion: f64,
) -> ModelResult<[Color; 2]> {
    let names: Vec<&str> = model.names().collect();
    let name = names
        .choose(rng)
        .ok_or_else(|| ModelError::invalid_context("cannot sample from an empty model"))?;
    let category = model.require(name)?;

    let hc = match category.hc() {
        Some(hc) => hc,
        None => rng.gen_range(0.0..HUE_PERIOD),
    };
    let hr = category.hr();
    let mut deviation: f64 = rng.gen_range(-1.0..=1.0);
    let h1 = hc + hr * deviation;

    let h2 = if rng.gen::<bool>() {
        deviation -= radius_portion;
        hc + hr * deviation - category.add_diversity()
    } else {
        deviation += radius_portion;
        hc + hr * deviation + category.add_diversity()
    };

    let (lo, hi) = TRIAL_LIGHTNESS;
    let mut pair = [
        Color::new(
            canonical_hue(h1.trunc()),
            TRIAL_SATURATION,
            f64::from(rng.gen_range(lo..=hi)),
        )?,
        Color::new(
            canonical_hue(h2.trunc()),
            TRIAL_SATURATION,
            f64::from(rng.gen_range(lo..=hi)),
        )?,
    ];
    pair.shuffle(rng);
    Ok(pair)
}
