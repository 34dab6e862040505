//! Argmax with uniform random tie-breaking.
//!
//! A plain argmax always returns the first maximal index, which is itself a
//! selection bias: with tied arms the first arm would be "chosen" every time
//! and its noise would dominate the measurement.
use rand::Rng;

use crate::error::SimulationError;

/// Index of the maximal score, with ties broken uniformly at random.
///
/// One uniform key is drawn for every entry (tied or not), keys of
/// non-maximal entries are discarded, and the entry with the largest
/// surviving key wins. The number of draws is therefore always
/// `scores.len()`, independent of how many entries tie.
///
/// # Errors
///
/// Returns [`SimulationError::EmptyCandidates`] for an empty slice and
/// [`SimulationError::NonFiniteScore`] when a score is NaN. Both checks run
/// before any draw.
#[allow(clippy::float_cmp)]
pub fn select_best<R: Rng + ?Sized>(
    scores: &[f64],
    rng: &mut R,
) -> Result<usize, SimulationError> {
    if scores.is_empty() {
        return Err(SimulationError::EmptyCandidates);
    }
    if let Some(index) = scores.iter().position(|score| score.is_nan()) {
        return Err(SimulationError::NonFiniteScore { index });
    }

    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut best: Option<(usize, f64)> = None;
    for (index, &score) in scores.iter().enumerate() {
        let key: f64 = rng.r#gen();
        if score == max && best.is_none_or(|(_, best_key)| key > best_key) {
            best = Some((index, key));
        }
    }
    best.map(|(index, _)| index)
        .ok_or(SimulationError::EmptyCandidates)
}

/// Indices of every entry tied for the maximum. Empty for empty or NaN input.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn maximal_indices(scores: &[f64]) -> Vec<usize> {
    if scores.iter().any(|score| score.is_nan()) {
        return Vec::new();
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score == max)
        .map(|(index, _)| index)
        .collect()
}
