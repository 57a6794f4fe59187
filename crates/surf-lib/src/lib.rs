//! Surf conditions library
//!
//! This crate provides the core functionality for:
//! - Fetching readings from many upstream sources concurrently
//! - Reconciling them into one consensus observation and hourly timeline
//! - Scoring conditions against a spot profile, with trend analysis
//! - Reweighting scores from user feedback
//! - Health checks and observability

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod feedback;
pub mod health;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod provider;
pub mod refresh;
pub mod scorer;
pub mod service;
pub mod spot;
pub mod trend;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use cache::{CachedConditions, InMemoryObservationCache, ObservationCache};
pub use error::{ProviderError, SurfError};
pub use feedback::{Reweighted, WeightMultipliers};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, SurfMetrics};
pub use orchestrator::{AdapterFailure, GatherOutcome, SourceOrchestrator, SourceTally};
pub use provider::ProviderAdapter;
pub use refresh::{RefreshConfig, RefreshLoop, RefreshLoopBuilder};
pub use scorer::{
    Breakdown, Factor, Rating, RatingThresholds, Score, ScoreWeights, Scorer, ScoringConfig,
};
pub use service::{ConditionsService, FetchedConditions, SpotReport};
pub use spot::{Band, InMemorySpotRegistry, Spot, SpotProfile, SpotRegistry};
pub use trend::{BlockScore, TrendAnalyzer, TrendConfig, TrendDirection, TrendResult};
