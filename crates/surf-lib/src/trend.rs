//! Short-range trend analysis over the hourly forecast
//!
//! The forecast is cut into named blocks for today and tomorrow. Each block
//! is reduced to one synthetic observation and scored, which gives a best
//! window and an overall direction relative to the current score.

use crate::aggregator::Aggregator;
use crate::models::{HourlyTimeline, Observation};
use crate::scorer::{Score, Scorer};
use crate::spot::SpotProfile;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tunable trend constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Points the block mean must move past the current score
    pub threshold: f64,
    /// Source count used when scoring synthetic block observations
    pub synthetic_source_count: usize,
    /// Fewer timeline entries than this means no trend
    pub min_entries: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            threshold: 8.0,
            synthetic_source_count: 2,
            min_entries: 3,
        }
    }
}

/// Daily block boundaries as [start, end) hours
const BLOCKS: [(&str, &str, u32, u32); 4] = [
    ("This morning", "Tomorrow morning", 6, 10),
    ("Midday today", "Tomorrow midday", 10, 14),
    ("This afternoon", "Tomorrow afternoon", 14, 18),
    ("This evening", "Tomorrow evening", 18, 21),
];

/// Wind drop (km/h) that counts as easing
const WIND_EASING_KMH: f64 = 5.0;
/// Height gain (m) that counts as building
const SWELL_BUILDING_M: f64 = 0.2;
/// Period gain (s) that counts as increasing
const PERIOD_INCREASING_S: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// One evaluated time block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockScore {
    pub label: String,
    pub date: NaiveDate,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Timeline entries that fell inside the block
    pub entries: usize,
    pub observation: Observation,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub best_window: BlockScore,
    pub message: String,
    /// Evaluated blocks in chronological order
    pub blocks: Vec<BlockScore>,
}

/// Scores forecast blocks and summarizes where conditions are heading
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    aggregator: Aggregator,
    scorer: Scorer,
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(aggregator: Aggregator, scorer: Scorer) -> Self {
        Self::with_config(aggregator, scorer, TrendConfig::default())
    }

    pub fn with_config(aggregator: Aggregator, scorer: Scorer, config: TrendConfig) -> Self {
        Self {
            aggregator,
            scorer,
            config,
        }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Analyze the timeline relative to `now` (spot-local time).
    ///
    /// Returns `None` when the timeline is too short or no block has data.
    pub fn analyze(
        &self,
        timeline: &HourlyTimeline,
        profile: &SpotProfile,
        current_score: u8,
        now: NaiveDateTime,
    ) -> Option<TrendResult> {
        if timeline.len() < self.config.min_entries {
            return None;
        }

        let blocks = self.score_blocks(timeline, profile, now);
        if blocks.is_empty() {
            return None;
        }

        let mut best = &blocks[0];
        for block in &blocks[1..] {
            if block.score.overall > best.score.overall {
                best = block;
            }
        }

        let mean = blocks
            .iter()
            .map(|b| f64::from(b.score.overall))
            .sum::<f64>()
            / blocks.len() as f64;
        let current = f64::from(current_score);
        let direction = if mean - current > self.config.threshold {
            TrendDirection::Improving
        } else if current - mean > self.config.threshold {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        };

        let message = describe(direction, &blocks[0], best, profile);
        let best_window = best.clone();

        Some(TrendResult {
            direction,
            best_window,
            message,
            blocks,
        })
    }

    fn score_blocks(
        &self,
        timeline: &HourlyTimeline,
        profile: &SpotProfile,
        now: NaiveDateTime,
    ) -> Vec<BlockScore> {
        let today = now.date();
        let tomorrow = today + Duration::days(1);
        let hour = now.hour();

        let today_blocks = BLOCKS
            .iter()
            .filter(|(_, _, _, end)| *end > hour)
            .map(|(label, _, start, end)| (*label, today, *start, *end));
        let tomorrow_blocks = BLOCKS
            .iter()
            .map(|(_, label, start, end)| (*label, tomorrow, *start, *end));

        today_blocks
            .chain(tomorrow_blocks)
            .filter_map(|(label, date, start, end)| {
                let observations: Vec<&Observation> = timeline
                    .iter()
                    .filter(|e| {
                        e.timestamp.date() == date
                            && e.timestamp.hour() >= start
                            && e.timestamp.hour() < end
                    })
                    .map(|e| &e.observation)
                    .collect();
                if observations.is_empty() {
                    return None;
                }

                let observation = self.aggregator.reconcile_observations(&observations);
                let score =
                    self.scorer
                        .score(&observation, profile, self.config.synthetic_source_count);
                Some(BlockScore {
                    label: label.to_string(),
                    date,
                    start_hour: start,
                    end_hour: end,
                    entries: observations.len(),
                    observation,
                    score,
                })
            })
            .collect()
    }
}

/// Why the best block differs from the nearest one
fn drivers(nearest: &Observation, best: &Observation, profile: &SpotProfile) -> Vec<&'static str> {
    let mut found = Vec::new();

    if let (Some(now), Some(later)) = (nearest.wind_speed, best.wind_speed) {
        if now - later > WIND_EASING_KMH {
            found.push("wind easing");
        }
    }

    let offshore = |o: &Observation| o.wind_direction.map_or(false, |d| profile.is_offshore(d));
    if offshore(best) && !offshore(nearest) {
        found.push("wind turning offshore");
    }

    let size = |o: &Observation| o.swell_height().or(o.wave_height.avg);
    if let (Some(now), Some(later)) = (size(nearest), size(best)) {
        if later - now > SWELL_BUILDING_M {
            found.push("swell building");
        }
    }

    if let (Some(now), Some(later)) = (nearest.effective_period(), best.effective_period()) {
        if later - now > PERIOD_INCREASING_S {
            found.push("period increasing");
        }
    }

    found
}

fn join_phrases(phrases: &[&str]) -> String {
    match phrases {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn describe(
    direction: TrendDirection,
    nearest: &BlockScore,
    best: &BlockScore,
    profile: &SpotProfile,
) -> String {
    let headline = match direction {
        TrendDirection::Improving => "Conditions improving",
        TrendDirection::Declining => "Conditions declining",
        TrendDirection::Stable => "Conditions holding steady",
    };
    let when = best.label.to_lowercase();
    let score = best.score.overall;

    if std::ptr::eq(nearest, best) {
        return format!("{}. Best window is {} (score {}).", headline, when, score);
    }

    let found = drivers(&nearest.observation, &best.observation, profile);
    if found.is_empty() {
        format!("{}. Better conditions by {} (score {}).", headline, when, score)
    } else {
        format!(
            "{}. {} by {} (score {}).",
            headline,
            capitalize(&join_phrases(&found)),
            when,
            score
        )
    }
}
