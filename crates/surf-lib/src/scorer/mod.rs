//! Surf quality scoring
//!
//! Turns a reconciled observation into a 0-100 score: six condition curves
//! plus a source-count confidence term, combined with fixed weights, then
//! mapped onto a rating tier with a templated explanation.

pub mod curves;
mod narrative;

use crate::feedback::{self, Reweighted, WeightMultipliers};
use crate::models::Observation;
use crate::spot::SpotProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scored aspects of conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    WaveHeight,
    WavePeriod,
    SwellQuality,
    WindSpeed,
    WindDirection,
    WaveDirection,
    Confidence,
}

impl Factor {
    pub const ALL: [Factor; 7] = [
        Factor::WaveHeight,
        Factor::WavePeriod,
        Factor::SwellQuality,
        Factor::WindSpeed,
        Factor::WindDirection,
        Factor::WaveDirection,
        Factor::Confidence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Factor::WaveHeight => "wave_height",
            Factor::WavePeriod => "wave_period",
            Factor::SwellQuality => "swell_quality",
            Factor::WindSpeed => "wind_speed",
            Factor::WindDirection => "wind_direction",
            Factor::WaveDirection => "wave_direction",
            Factor::Confidence => "confidence",
        }
    }

    pub fn parse(name: &str) -> Option<Factor> {
        Self::ALL.into_iter().find(|f| f.as_str() == name.trim())
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor sub-scores, each 0-100
pub type Breakdown = BTreeMap<Factor, u8>;

/// Relative importance of each factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub wave_height: f64,
    pub wave_period: f64,
    pub swell_quality: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub wave_direction: f64,
    pub confidence: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            wave_height: 0.20,
            wave_period: 0.20,
            swell_quality: 0.15,
            wind_speed: 0.15,
            wind_direction: 0.15,
            wave_direction: 0.10,
            confidence: 0.05,
        }
    }
}

impl ScoreWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::WaveHeight => self.wave_height,
            Factor::WavePeriod => self.wave_period,
            Factor::SwellQuality => self.swell_quality,
            Factor::WindSpeed => self.wind_speed,
            Factor::WindDirection => self.wind_direction,
            Factor::WaveDirection => self.wave_direction,
            Factor::Confidence => self.confidence,
        }
    }

    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

/// Rating tiers, worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Flat,
    Poor,
    PoorToFair,
    Fair,
    Good,
    VeryGood,
    Epic,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::Flat => "flat",
            Rating::Poor => "poor",
            Rating::PoorToFair => "poor to fair",
            Rating::Fair => "fair",
            Rating::Good => "good",
            Rating::VeryGood => "very good",
            Rating::Epic => "epic",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lowest overall score for each tier above flat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingThresholds {
    pub poor: u8,
    pub poor_to_fair: u8,
    pub fair: u8,
    pub good: u8,
    pub very_good: u8,
    pub epic: u8,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            poor: 15,
            poor_to_fair: 30,
            fair: 45,
            good: 60,
            very_good: 72,
            epic: 85,
        }
    }
}

impl RatingThresholds {
    pub fn rating(&self, score: u8) -> Rating {
        if score >= self.epic {
            Rating::Epic
        } else if score >= self.very_good {
            Rating::VeryGood
        } else if score >= self.good {
            Rating::Good
        } else if score >= self.fair {
            Rating::Fair
        } else if score >= self.poor_to_fair {
            Rating::PoorToFair
        } else if score >= self.poor {
            Rating::Poor
        } else {
            Rating::Flat
        }
    }
}

/// Scoring constants
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub thresholds: RatingThresholds,
}

/// Result of scoring one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub overall: u8,
    pub rating: Rating,
    pub breakdown: Breakdown,
    pub explanation: String,
}

impl Score {
    pub fn factor(&self, factor: Factor) -> u8 {
        self.breakdown.get(&factor).copied().unwrap_or(0)
    }
}

/// Weighted mean of the breakdown over the factors it contains.
///
/// Returns `None` when the applicable weights sum to zero.
pub fn weighted_score(breakdown: &Breakdown, weight: impl Fn(Factor) -> f64) -> Option<f64> {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (factor, value) in breakdown {
        let w = weight(*factor);
        if w.is_finite() && w > 0.0 {
            weighted += w * f64::from(*value);
            total += w;
        }
    }
    if total <= f64::EPSILON {
        return None;
    }
    Some(weighted / total)
}

/// Round and clamp into an overall score
pub fn to_overall(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Stateless scorer over a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.config.weights
    }

    pub fn thresholds(&self) -> &RatingThresholds {
        &self.config.thresholds
    }

    /// Score an observation for a spot given how many sources backed it
    pub fn score(&self, obs: &Observation, profile: &SpotProfile, source_count: usize) -> Score {
        if curves::is_flat(obs.wave_height.avg) {
            return Score {
                overall: 0,
                rating: Rating::Flat,
                breakdown: Factor::ALL.iter().map(|f| (*f, 0)).collect(),
                explanation: narrative::flat(obs.wave_height.avg.unwrap_or(0.0)),
            };
        }

        let breakdown = self.breakdown(obs, profile, source_count);
        let overall = to_overall(
            weighted_score(&breakdown, |f| self.config.weights.get(f)).unwrap_or(0.0),
        );

        Score {
            overall,
            rating: self.config.thresholds.rating(overall),
            explanation: narrative::explain(obs, profile, &breakdown),
            breakdown,
        }
    }

    fn breakdown(
        &self,
        obs: &Observation,
        profile: &SpotProfile,
        source_count: usize,
    ) -> Breakdown {
        let raw = [
            (
                Factor::WaveHeight,
                curves::wave_height(obs.wave_height.avg, &profile.wave_height),
            ),
            (
                Factor::WavePeriod,
                curves::wave_period(obs.wave_period, &profile.wave_period),
            ),
            (Factor::SwellQuality, curves::swell_quality(obs, profile)),
            (
                Factor::WindSpeed,
                curves::wind_speed(obs.wind_speed, obs.wind_gust),
            ),
            (
                Factor::WindDirection,
                curves::direction(obs.wind_direction, &profile.offshore_wind),
            ),
            (
                Factor::WaveDirection,
                curves::direction(obs.effective_direction(), &profile.best_swell),
            ),
            (Factor::Confidence, curves::confidence(source_count)),
        ];

        raw.into_iter().map(|(f, v)| (f, to_overall(v))).collect()
    }

    /// Recompute the overall score from a breakdown with adjusted emphasis
    pub fn reweight(
        &self,
        breakdown: &Breakdown,
        multipliers: &WeightMultipliers,
    ) -> Option<Reweighted> {
        feedback::reweight(
            breakdown,
            &self.config.weights,
            multipliers,
            &self.config.thresholds,
        )
    }
}
