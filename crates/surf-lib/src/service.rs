//! Conditions service
//!
//! Facade over the pipeline for callers such as the HTTP API and the
//! refresh loop. Owns the spot registry and cache collaborators and records
//! metrics, structured events and provider health as requests flow through.

use crate::aggregator::{Aggregator, AggregatorConfig};
use crate::cache::{CachedConditions, ObservationCache};
use crate::error::{Result, SurfError};
use crate::feedback::{Reweighted, WeightMultipliers};
use crate::health::HealthRegistry;
use crate::models::{HourlyTimeline, Observation};
use crate::observability::{StructuredLogger, SurfMetrics};
use crate::orchestrator::{AdapterFailure, SourceOrchestrator, SourceTally};
use crate::scorer::{Breakdown, Score, Scorer, ScoringConfig};
use crate::spot::{Spot, SpotProfile, SpotRegistry};
use crate::trend::{TrendAnalyzer, TrendConfig, TrendResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of cached conditions
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Reconciled conditions for a spot and where they came from
#[derive(Debug, Clone)]
pub struct FetchedConditions {
    pub spot: Spot,
    pub conditions: CachedConditions,
    pub from_cache: bool,
}

impl FetchedConditions {
    pub fn observation(&self) -> &Observation {
        &self.conditions.observation
    }

    pub fn source_count(&self) -> usize {
        self.conditions.source_count()
    }
}

/// Everything known about a spot right now
#[derive(Debug, Clone, Serialize)]
pub struct SpotReport {
    pub spot: Spot,
    pub observation: Observation,
    pub score: Score,
    pub trend: Option<TrendResult>,
    pub sources: SourceTally,
    pub failures: Vec<AdapterFailure>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

pub struct ConditionsService {
    registry: Arc<dyn SpotRegistry>,
    cache: Arc<dyn ObservationCache>,
    orchestrator: SourceOrchestrator,
    aggregator: Aggregator,
    scorer: Scorer,
    trend: TrendAnalyzer,
    cache_ttl: Duration,
    health: HealthRegistry,
    metrics: SurfMetrics,
    logger: StructuredLogger,
}

impl ConditionsService {
    pub fn new(
        registry: Arc<dyn SpotRegistry>,
        cache: Arc<dyn ObservationCache>,
        orchestrator: SourceOrchestrator,
    ) -> Self {
        Self {
            registry,
            cache,
            orchestrator,
            aggregator: Aggregator::new(),
            scorer: Scorer::new(),
            trend: TrendAnalyzer::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            health: HealthRegistry::new(),
            metrics: SurfMetrics::new(),
            logger: StructuredLogger::new("surf-agent"),
        }
    }

    pub fn with_aggregator_config(mut self, config: AggregatorConfig) -> Self {
        self.aggregator = Aggregator::with_config(config);
        let trend = *self.trend.config();
        self.rebuild_trend(trend)
    }

    pub fn with_scoring_config(mut self, config: ScoringConfig) -> Self {
        self.scorer = Scorer::with_config(config);
        let trend = *self.trend.config();
        self.rebuild_trend(trend)
    }

    pub fn with_trend_config(self, config: TrendConfig) -> Self {
        self.rebuild_trend(config)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    fn rebuild_trend(mut self, config: TrendConfig) -> Self {
        self.trend =
            TrendAnalyzer::with_config(self.aggregator.clone(), self.scorer.clone(), config);
        self
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn orchestrator(&self) -> &SourceOrchestrator {
        &self.orchestrator
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Registered spots ordered by id
    pub fn spots(&self) -> Vec<Spot> {
        let spots = self.registry.list();
        self.metrics.set_spots_monitored(spots.len() as i64);
        spots
    }

    /// Look up a spot, rejecting unknown locations
    pub fn spot(&self, location_id: &str) -> Result<Spot> {
        self.registry
            .get(location_id)
            .ok_or_else(|| SurfError::InvalidProfile(location_id.to_string()))
    }

    /// Current reconciled conditions, served from cache while fresh
    pub async fn fetch_and_aggregate(&self, location_id: &str) -> Result<FetchedConditions> {
        let spot = self.spot(location_id)?;
        if let Some(conditions) = self.cache.get(location_id) {
            return Ok(FetchedConditions {
                spot,
                conditions,
                from_cache: true,
            });
        }
        self.fetch_spot(spot).await
    }

    /// Fetch from every source regardless of the cache
    pub async fn refresh(&self, location_id: &str) -> Result<FetchedConditions> {
        let spot = self.spot(location_id)?;
        self.fetch_spot(spot).await
    }

    async fn fetch_spot(&self, spot: Spot) -> Result<FetchedConditions> {
        let outcome = match self.orchestrator.gather(&spot).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let SurfError::AllSourcesFailed {
                    attempted,
                    failed,
                    empty,
                    ..
                } = &err
                {
                    self.metrics.inc_all_sources_failed();
                    self.logger.log_all_sources_failed(&spot.id, *attempted);
                    self.health
                        .record_tally(&SourceTally {
                            succeeded: 0,
                            empty: *empty,
                            failed: *failed,
                        })
                        .await;
                }
                return Err(err);
            }
        };

        self.metrics
            .observe_fetch_latency(outcome.elapsed.as_secs_f64());
        for reading in &outcome.readings {
            self.metrics.record_adapter_outcome(&reading.source, "data");
        }
        for source in &outcome.empty_sources {
            self.metrics.record_adapter_outcome(source, "empty");
        }
        for failure in &outcome.failures {
            self.metrics
                .record_adapter_outcome(&failure.source, &failure.kind);
            self.logger
                .log_adapter_failed(&spot.id, &failure.source, &failure.kind, &failure.message);
        }
        self.logger
            .log_conditions_fetched(&spot.id, &outcome.tally, outcome.elapsed.as_millis());
        self.health.record_tally(&outcome.tally).await;

        let conditions = CachedConditions {
            observation: self.aggregator.reconcile(&outcome.readings),
            timeline: self.aggregator.reconcile_timeline(&outcome.readings),
            tally: outcome.tally,
            failures: outcome.failures,
            fetched_at: Utc::now(),
        };
        self.cache.put(&spot.id, conditions.clone(), self.cache_ttl);

        Ok(FetchedConditions {
            spot,
            conditions,
            from_cache: false,
        })
    }

    pub fn score(
        &self,
        observation: &Observation,
        profile: &SpotProfile,
        source_count: usize,
    ) -> Score {
        self.scorer.score(observation, profile, source_count)
    }

    pub fn analyze_trend(
        &self,
        timeline: &HourlyTimeline,
        profile: &SpotProfile,
        current_score: u8,
        now: NaiveDateTime,
    ) -> Option<TrendResult> {
        self.trend.analyze(timeline, profile, current_score, now)
    }

    pub fn reweight(
        &self,
        breakdown: &Breakdown,
        multipliers: &WeightMultipliers,
    ) -> Option<Reweighted> {
        self.scorer.reweight(breakdown, multipliers)
    }

    /// Score and trend for a spot as of `at`
    pub async fn report(&self, location_id: &str, at: DateTime<Utc>) -> Result<SpotReport> {
        let fetched = self.fetch_and_aggregate(location_id).await?;
        let FetchedConditions {
            spot,
            conditions,
            from_cache,
        } = fetched;

        let source_count = conditions.source_count();
        let score = self.score(&conditions.observation, &spot.profile, source_count);
        self.metrics.record_score(&spot.id, score.overall);
        self.logger
            .log_spot_scored(&spot.id, score.overall, score.rating.label(), source_count);

        let trend = self.analyze_trend(
            &conditions.timeline,
            &spot.profile,
            score.overall,
            spot.local_time(at),
        );
        let direction = trend.as_ref().map(|t| t.direction.to_string());
        self.logger.log_trend_analyzed(
            &spot.id,
            direction.as_deref(),
            trend.as_ref().map(|t| t.best_window.label.as_str()),
        );

        Ok(SpotReport {
            spot,
            observation: conditions.observation,
            score,
            trend,
            sources: conditions.tally,
            failures: conditions.failures,
            fetched_at: conditions.fetched_at,
            from_cache,
        })
    }
}
