//! Short-lived cache of reconciled conditions per spot

use crate::models::{HourlyTimeline, Observation};
use crate::orchestrator::{AdapterFailure, SourceTally};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Everything one fetch produced for a spot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedConditions {
    pub observation: Observation,
    pub timeline: HourlyTimeline,
    pub tally: SourceTally,
    pub failures: Vec<AdapterFailure>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedConditions {
    /// Number of sources that contributed data
    pub fn source_count(&self) -> usize {
        self.tally.succeeded
    }
}

/// Read/write store for fetched conditions, keyed by location id
pub trait ObservationCache: Send + Sync {
    fn get(&self, location_id: &str) -> Option<CachedConditions>;

    fn put(&self, location_id: &str, conditions: CachedConditions, ttl: Duration);

    fn invalidate(&self, location_id: &str);
}

struct Entry {
    conditions: CachedConditions,
    expires_at: Instant,
}

/// Concurrent in-memory cache; expired entries are evicted on read
#[derive(Default)]
pub struct InMemoryObservationCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryObservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently held, including any not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }
}

impl ObservationCache for InMemoryObservationCache {
    fn get(&self, location_id: &str) -> Option<CachedConditions> {
        {
            let entry = self.entries.get(location_id)?;
            if entry.expires_at > Instant::now() {
                return Some(entry.conditions.clone());
            }
        }

        // A concurrent put may have refreshed the entry since the read
        let evicted = self
            .entries
            .remove_if(location_id, |_, entry| entry.expires_at <= Instant::now());
        if evicted.is_some() {
            debug!(spot = %location_id, "Evicted expired conditions");
        }
        None
    }

    fn put(&self, location_id: &str, conditions: CachedConditions, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(
            location_id.to_string(),
            Entry {
                conditions,
                expires_at,
            },
        );
    }

    fn invalidate(&self, location_id: &str) {
        self.entries.remove(location_id);
    }
}
