//! Core data models for surf conditions
//!
//! Every condition field is optional: providers populate different subsets,
//! and an absent value is excluded from reconciliation rather than read as
//! zero. Units are canonical by the time a value lands here (meters, km/h,
//! °C, seconds).

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 8-point compass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Compass {
    /// Points in clockwise order starting from north
    pub const WHEEL: [Compass; 8] = [
        Compass::N,
        Compass::NE,
        Compass::E,
        Compass::SE,
        Compass::S,
        Compass::SW,
        Compass::W,
        Compass::NW,
    ];

    /// Convert a bearing in degrees (any range) to the nearest compass point
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() {
            return None;
        }
        let normalized = degrees.rem_euclid(360.0);
        let index = ((normalized + 22.5) / 45.0).floor() as usize % 8;
        Some(Self::WHEEL[index])
    }

    fn index(self) -> usize {
        Self::WHEEL.iter().position(|c| *c == self).unwrap_or(0)
    }

    /// The two points one step either side on the wheel
    pub fn neighbors(self) -> [Compass; 2] {
        let i = self.index();
        [Self::WHEEL[(i + 7) % 8], Self::WHEEL[(i + 1) % 8]]
    }

    pub fn is_adjacent_to(self, other: Compass) -> bool {
        self.neighbors().contains(&other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Compass::N => "N",
            Compass::NE => "NE",
            Compass::E => "E",
            Compass::SE => "SE",
            Compass::S => "S",
            Compass::SW => "SW",
            Compass::W => "W",
            Compass::NW => "NW",
        }
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::WHEEL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown compass direction: {}", s))
    }
}

/// Sky state label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudCover {
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
}

impl CloudCover {
    /// Bucket a cloud cover percentage (0-100)
    pub fn from_percent(percent: f64) -> Self {
        if percent < 20.0 {
            CloudCover::Clear
        } else if percent < 50.0 {
            CloudCover::PartlyCloudy
        } else if percent < 85.0 {
            CloudCover::Cloudy
        } else {
            CloudCover::Overcast
        }
    }
}

/// Combined sea-state height in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveHeight {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl WaveHeight {
    pub fn avg(avg: f64) -> Self {
        Self {
            min: None,
            max: None,
            avg: Some(avg),
        }
    }

    /// Both range ends, when present
    pub fn range(&self) -> Option<(f64, f64)> {
        Some((self.min?, self.max?))
    }
}

/// Groundswell component, distinct from the combined sea state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Swell {
    pub height: Option<f64>,
    pub period: Option<f64>,
    pub direction: Option<Compass>,
}

/// Conditions snapshot: one provider's reading or the reconciled consensus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub wave_height: WaveHeight,
    pub wave_period: Option<f64>,
    pub wave_direction: Option<Compass>,
    pub swell: Option<Swell>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<Compass>,
    pub wind_gust: Option<f64>,
    pub air_temperature: Option<f64>,
    pub water_temperature: Option<f64>,
    pub cloud_cover: Option<CloudCover>,
}

impl Observation {
    /// Swell height if a swell sub-record carries one
    pub fn swell_height(&self) -> Option<f64> {
        self.swell.and_then(|s| s.height)
    }

    /// Swell period, falling back to the combined wave period
    pub fn effective_period(&self) -> Option<f64> {
        self.swell.and_then(|s| s.period).or(self.wave_period)
    }

    /// Swell direction, falling back to the combined wave direction
    pub fn effective_direction(&self) -> Option<Compass> {
        self.swell.and_then(|s| s.direction).or(self.wave_direction)
    }
}

/// One forecast hour from a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    /// Spot-local wall-clock time
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub conditions: Observation,
}

/// One provider's snapshot of conditions with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub source: String,
    pub retrieved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub conditions: Observation,
    #[serde(default)]
    pub hourly: Vec<HourlyReading>,
}

impl Reading {
    pub fn new(source: impl Into<String>, conditions: Observation) -> Self {
        Self {
            source: source.into(),
            retrieved_at: Utc::now(),
            source_url: None,
            conditions,
            hourly: Vec::new(),
        }
    }

    pub fn with_hourly(mut self, hourly: Vec<HourlyReading>) -> Self {
        self.hourly = hourly;
        self
    }
}

/// A reconciled forecast hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: NaiveDateTime,
    pub observation: Observation,
}

/// Reconciled forecast, strictly increasing by hour with one entry per hour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyTimeline {
    entries: Vec<TimelineEntry>,
}

impl HourlyTimeline {
    /// Build a timeline, sorting and keeping the first entry for each hour
    pub fn new(mut entries: Vec<TimelineEntry>) -> Self {
        for entry in entries.iter_mut() {
            entry.timestamp = truncate_to_hour(entry.timestamp);
        }
        entries.sort_by_key(|e| e.timestamp);
        entries.dedup_by_key(|e| e.timestamp);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }
}

/// Drop minutes, seconds and sub-second parts
pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(ts)
}

/// Round to one decimal place (meters)
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
