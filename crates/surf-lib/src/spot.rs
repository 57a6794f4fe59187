//! Spot profiles and the spot registry
//!
//! A profile describes what "good" looks like at one break. Profiles are
//! loaded once from configuration and never change while serving requests.

use crate::models::Compass;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ideal band for a measured quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub ideal: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, ideal: f64, max: f64) -> Self {
        Self { min, ideal, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Band ordering is min <= ideal <= max with a positive minimum
    pub fn is_valid(&self) -> bool {
        self.min > 0.0 && self.min <= self.ideal && self.ideal <= self.max
    }
}

/// What conditions suit a particular break
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotProfile {
    /// Wave height band in meters
    pub wave_height: Band,
    /// Wave period band in seconds
    pub wave_period: Band,
    /// Wind directions that blow offshore on this coastline
    #[serde(default)]
    pub offshore_wind: Vec<Compass>,
    /// Swell directions the break handles best
    #[serde(default)]
    pub best_swell: Vec<Compass>,
}

impl Default for SpotProfile {
    fn default() -> Self {
        Self {
            wave_height: Band::new(0.8, 1.5, 2.5),
            wave_period: Band::new(8.0, 12.0, 16.0),
            offshore_wind: Vec::new(),
            best_swell: Vec::new(),
        }
    }
}

impl SpotProfile {
    pub fn is_offshore(&self, direction: Compass) -> bool {
        self.offshore_wind.contains(&direction)
    }

    pub fn is_best_swell(&self, direction: Compass) -> bool {
        self.best_swell.contains(&direction)
    }
}

/// A registered surf location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Offset of spot-local wall-clock time from UTC, applied to both the
    /// report instant and upstream UTC forecast hours
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub profile: SpotProfile,
}

impl Spot {
    /// Wall-clock time at the spot for a UTC instant
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        self.local_from_naive_utc(at.naive_utc())
    }

    /// Wall-clock time at the spot for a naive UTC timestamp
    pub fn local_from_naive_utc(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + Duration::minutes(i64::from(self.utc_offset_minutes))
    }
}

/// Lookup of spots by location identifier
pub trait SpotRegistry: Send + Sync {
    fn get(&self, location_id: &str) -> Option<Spot>;

    /// All spots, ordered by id
    fn list(&self) -> Vec<Spot>;
}

/// Registry built once from configuration
#[derive(Debug, Clone, Default)]
pub struct InMemorySpotRegistry {
    spots: HashMap<String, Spot>,
}

impl InMemorySpotRegistry {
    pub fn new(spots: impl IntoIterator<Item = Spot>) -> Self {
        Self {
            spots: spots.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}

impl SpotRegistry for InMemorySpotRegistry {
    fn get(&self, location_id: &str) -> Option<Spot> {
        self.spots.get(location_id).cloned()
    }

    fn list(&self) -> Vec<Spot> {
        let mut spots: Vec<Spot> = self.spots.values().cloned().collect();
        spots.sort_by(|a, b| a.id.cmp(&b.id));
        spots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(id: &str) -> Spot {
        Spot {
            id: id.to_string(),
            name: id.to_uppercase(),
            latitude: 0.0,
            longitude: 0.0,
            utc_offset_minutes: 0,
            profile: SpotProfile::default(),
        }
    }

    #[test]
    fn test_band_contains() {
        let band = Band::new(0.8, 1.5, 2.5);
        assert!(band.contains(0.8));
        assert!(band.contains(2.5));
        assert!(!band.contains(2.6));
        assert!(band.is_valid());
        assert!(!Band::new(2.0, 1.0, 3.0).is_valid());
    }

    #[test]
    fn test_registry_lookup_and_order() {
        let registry = InMemorySpotRegistry::new(vec![spot("rincon"), spot("malibu")]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("malibu").is_some());
        assert!(registry.get("mavericks").is_none());

        let ids: Vec<_> = registry.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["malibu", "rincon"]);
    }

    #[test]
    fn test_profile_deserializes_compass_sets() {
        let json = r#"{
            "wave_height": {"min": 0.5, "ideal": 1.0, "max": 2.0},
            "wave_period": {"min": 7, "ideal": 11, "max": 15},
            "offshore_wind": ["E", "NE"]
        }"#;
        let profile: SpotProfile = serde_json::from_str(json).unwrap();
        assert!(profile.is_offshore(Compass::NE));
        assert!(!profile.is_offshore(Compass::W));
        assert!(profile.best_swell.is_empty());
    }

    #[test]
    fn test_local_time_applies_offset() {
        let mut honolulu = spot("pipeline");
        honolulu.utc_offset_minutes = -600;
        let at = DateTime::parse_from_rfc3339("2026-10-17T18:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            honolulu.local_time(at).to_string(),
            "2026-10-17 08:30:00"
        );
    }
}
