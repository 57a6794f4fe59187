//! Feedback-driven reweighting
//!
//! Shifts emphasis between factors of an existing breakdown without
//! rescoring raw conditions.

use crate::scorer::{
    to_overall, weighted_score, Breakdown, Factor, Rating, RatingThresholds, ScoreWeights,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounds applied to every multiplier before use
pub const MIN_MULTIPLIER: f64 = 0.0;
pub const MAX_MULTIPLIER: f64 = 3.0;

/// Per-factor weight multipliers; missing factors count as 1.0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMultipliers(BTreeMap<Factor, f64>);

impl WeightMultipliers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, factor: Factor, multiplier: f64) -> Self {
        self.0.insert(factor, multiplier);
        self
    }

    pub fn insert(&mut self, factor: Factor, multiplier: f64) {
        self.0.insert(factor, multiplier);
    }

    /// Clamped multiplier for a factor; non-finite values are ignored
    pub fn get(&self, factor: Factor) -> f64 {
        match self.0.get(&factor) {
            Some(m) if m.is_finite() => m.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER),
            _ => 1.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Factor, f64)> for WeightMultipliers {
    fn from_iter<I: IntoIterator<Item = (Factor, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Adjusted overall score and its tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reweighted {
    pub score: u8,
    pub rating: Rating,
}

/// Recompute the overall score of a breakdown under multiplied weights.
///
/// Weights are renormalized over the factors present in the breakdown.
/// Returns `None` when every applicable weight ends up zero.
pub fn reweight(
    breakdown: &Breakdown,
    base: &ScoreWeights,
    multipliers: &WeightMultipliers,
    thresholds: &RatingThresholds,
) -> Option<Reweighted> {
    let raw = weighted_score(breakdown, |f| base.get(f) * multipliers.get(f))?;
    let score = to_overall(raw);
    Some(Reweighted {
        score,
        rating: thresholds.rating(score),
    })
}
