//! Observability for the conditions pipeline
//!
//! Provides:
//! - Prometheus metrics (fetch latency, per-source outcomes, scores per spot)
//! - Structured JSON logging of pipeline events with tracing

use crate::orchestrator::SourceTally;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for upstream fetch latency (in seconds)
const FETCH_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SurfMetricsInner> = OnceLock::new();

struct SurfMetricsInner {
    fetch_latency_seconds: Histogram,
    adapter_outcomes: IntCounterVec,
    all_sources_failed: IntCounter,
    spots_monitored: IntGauge,
    scores_computed: IntCounter,
    spot_score: IntGaugeVec,
}

impl SurfMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "surf_fetch_latency_seconds",
                "Time spent gathering readings from every source for one spot",
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            adapter_outcomes: register_int_counter_vec!(
                "surf_adapter_outcomes_total",
                "Settled adapter calls by source and outcome",
                &["source", "outcome"]
            )
            .expect("Failed to register adapter_outcomes_total"),

            all_sources_failed: register_int_counter!(
                "surf_all_sources_failed_total",
                "Fetches where no source produced data"
            )
            .expect("Failed to register all_sources_failed_total"),

            spots_monitored: register_int_gauge!(
                "surf_spots_monitored",
                "Number of registered spots"
            )
            .expect("Failed to register spots_monitored"),

            scores_computed: register_int_counter!(
                "surf_scores_computed_total",
                "Total number of observations scored"
            )
            .expect("Failed to register scores_computed_total"),

            spot_score: register_int_gauge_vec!(
                "surf_spot_score",
                "Most recent overall score per spot",
                &["spot"]
            )
            .expect("Failed to register spot_score"),
        }
    }
}

/// Handle to the process-wide metrics; clones share the same series
#[derive(Clone)]
pub struct SurfMetrics {
    _private: (),
}

impl Default for SurfMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SurfMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SurfMetricsInner {
        GLOBAL_METRICS.get_or_init(SurfMetricsInner::new)
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    /// Count one settled adapter call; outcome is "data", "empty" or an error kind
    pub fn record_adapter_outcome(&self, source: &str, outcome: &str) {
        self.inner()
            .adapter_outcomes
            .with_label_values(&[source, outcome])
            .inc();
    }

    pub fn inc_all_sources_failed(&self) {
        self.inner().all_sources_failed.inc();
    }

    pub fn set_spots_monitored(&self, count: i64) {
        self.inner().spots_monitored.set(count);
    }

    /// Record a computed score for a spot
    pub fn record_score(&self, spot_id: &str, overall: u8) {
        self.inner().scores_computed.inc();
        self.inner()
            .spot_score
            .with_label_values(&[spot_id])
            .set(i64::from(overall));
    }
}

/// Structured logger for pipeline events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_conditions_fetched(&self, spot_id: &str, tally: &SourceTally, elapsed_ms: u128) {
        if tally.is_degraded() {
            warn!(
                event = "conditions_fetched",
                instance = %self.instance,
                spot = %spot_id,
                succeeded = tally.succeeded,
                empty = tally.empty,
                failed = tally.failed,
                elapsed_ms = elapsed_ms as u64,
                "Fetched conditions with some sources missing"
            );
        } else {
            info!(
                event = "conditions_fetched",
                instance = %self.instance,
                spot = %spot_id,
                succeeded = tally.succeeded,
                elapsed_ms = elapsed_ms as u64,
                "Fetched conditions"
            );
        }
    }

    pub fn log_adapter_failed(&self, spot_id: &str, source: &str, kind: &str, message: &str) {
        warn!(
            event = "adapter_failed",
            instance = %self.instance,
            spot = %spot_id,
            source = %source,
            kind = %kind,
            error = %message,
            "Source adapter failed"
        );
    }

    pub fn log_all_sources_failed(&self, spot_id: &str, attempted: usize) {
        warn!(
            event = "all_sources_failed",
            instance = %self.instance,
            spot = %spot_id,
            attempted = attempted,
            "No source produced data"
        );
    }

    pub fn log_spot_scored(&self, spot_id: &str, overall: u8, rating: &str, source_count: usize) {
        info!(
            event = "spot_scored",
            instance = %self.instance,
            spot = %spot_id,
            overall = overall,
            rating = %rating,
            source_count = source_count,
            "Scored spot conditions"
        );
    }

    pub fn log_trend_analyzed(&self, spot_id: &str, direction: Option<&str>, best: Option<&str>) {
        match direction {
            Some(direction) => info!(
                event = "trend_analyzed",
                instance = %self.instance,
                spot = %spot_id,
                direction = %direction,
                best_window = best.unwrap_or(""),
                "Analyzed forecast trend"
            ),
            None => debug!(
                event = "trend_analyzed",
                instance = %self.instance,
                spot = %spot_id,
                "Forecast too short for a trend"
            ),
        }
    }

    pub fn log_startup(&self, version: &str, spots: usize, sources: usize) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            spots = spots,
            sources = sources,
            "Surf agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Surf agent shutting down"
        );
    }
}
