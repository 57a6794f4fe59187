//! Concurrent multi-source fetch
//!
//! Every adapter runs as its own task and every task is awaited to
//! completion. A failing, empty or panicking adapter is counted and logged,
//! never allowed to cancel its siblings. Only a batch with zero readings is
//! an error.

use crate::error::{ProviderError, SurfError};
use crate::models::Reading;
use crate::provider::ProviderAdapter;
use crate::spot::Spot;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Counts of adapter outcomes for one gather
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
}

impl SourceTally {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.empty + self.failed
    }

    pub fn is_degraded(&self) -> bool {
        self.succeeded > 0 && (self.empty > 0 || self.failed > 0)
    }
}

/// Why one adapter produced nothing usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterFailure {
    pub source: String,
    pub kind: String,
    pub message: String,
}

/// Settled result of a single adapter
#[derive(Debug)]
pub enum AdapterOutcome {
    Data(Reading),
    Empty,
    Failed(ProviderError),
}

/// Readings from every adapter that produced data, plus the tally
#[derive(Debug, Clone)]
pub struct GatherOutcome {
    pub readings: Vec<Reading>,
    pub tally: SourceTally,
    pub failures: Vec<AdapterFailure>,
    /// Sources that answered without data
    pub empty_sources: Vec<String>,
    pub elapsed: Duration,
}

/// Runs all registered adapters for a spot and settles every one
#[derive(Clone, Default)]
pub struct SourceOrchestrator {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl SourceOrchestrator {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.source_id().to_string())
            .collect()
    }

    /// Launch every adapter concurrently and wait for all of them.
    ///
    /// Readings come back in adapter registration order, which keeps
    /// downstream mode tie-breaks stable between runs.
    pub async fn gather(&self, spot: &Spot) -> Result<GatherOutcome, SurfError> {
        let start = Instant::now();

        let handles: Vec<(String, JoinHandle<Result<Option<Reading>, ProviderError>>)> = self
            .adapters
            .iter()
            .map(|adapter| {
                let adapter = Arc::clone(adapter);
                let spot = spot.clone();
                let source_id = adapter.source_id().to_string();
                let handle = tokio::spawn(async move { adapter.fetch(&spot).await });
                (source_id, handle)
            })
            .collect();

        let mut readings = Vec::with_capacity(handles.len());
        let mut tally = SourceTally::default();
        let mut failures = Vec::new();
        let mut empty_sources = Vec::new();

        for (source_id, handle) in handles {
            match settle(&source_id, handle.await) {
                AdapterOutcome::Data(reading) => {
                    tally.succeeded += 1;
                    readings.push(reading);
                }
                AdapterOutcome::Empty => {
                    tally.empty += 1;
                    debug!(spot = %spot.id, source = %source_id, "Source returned no data");
                    empty_sources.push(source_id);
                }
                AdapterOutcome::Failed(error) => {
                    tally.failed += 1;
                    debug!(
                        spot = %spot.id,
                        source = %source_id,
                        kind = error.kind(),
                        error = %error,
                        "Source adapter failed"
                    );
                    failures.push(AdapterFailure {
                        source: source_id,
                        kind: error.kind().to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }

        if readings.is_empty() {
            return Err(SurfError::AllSourcesFailed {
                location_id: spot.id.clone(),
                attempted: tally.attempted(),
                failed: tally.failed,
                empty: tally.empty,
            });
        }

        Ok(GatherOutcome {
            readings,
            tally,
            failures,
            empty_sources,
            elapsed: start.elapsed(),
        })
    }
}

/// Tag a joined task result with its outcome
fn settle(
    source_id: &str,
    joined: Result<Result<Option<Reading>, ProviderError>, tokio::task::JoinError>,
) -> AdapterOutcome {
    match joined {
        Ok(Ok(Some(reading))) => AdapterOutcome::Data(reading),
        Ok(Ok(None)) => AdapterOutcome::Empty,
        Ok(Err(error)) => AdapterOutcome::Failed(error),
        Err(join_error) => AdapterOutcome::Failed(ProviderError::Panicked {
            source_id: source_id.to_string(),
            message: join_error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, WaveHeight};
    use crate::provider::async_trait;
    use crate::spot::SpotProfile;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Data(f64),
        Empty,
        Fail,
        Panic,
        Slow(f64, u64),
    }

    struct MockAdapter {
        id: String,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        fn new(id: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        fn source_id(&self) -> &str {
            &self.id
        }

        async fn fetch(&self, _spot: &Spot) -> Result<Option<Reading>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reading = |height: f64| {
                Reading::new(
                    self.id.clone(),
                    Observation {
                        wave_height: WaveHeight::avg(height),
                        ..Default::default()
                    },
                )
            };
            match self.behavior {
                Behavior::Data(h) => Ok(Some(reading(h))),
                Behavior::Empty => Ok(None),
                Behavior::Fail => Err(ProviderError::Status {
                    source_id: self.id.clone(),
                    status: 502,
                }),
                Behavior::Panic => panic!("parser exploded"),
                Behavior::Slow(h, ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(Some(reading(h)))
                }
            }
        }
    }

    fn test_spot() -> Spot {
        Spot {
            id: "lower-trestles".to_string(),
            name: "Lower Trestles".to_string(),
            latitude: 33.38,
            longitude: -117.59,
            utc_offset_minutes: -420,
            profile: SpotProfile::default(),
        }
    }

    #[tokio::test]
    async fn test_gather_all_succeed() {
        let orchestrator = SourceOrchestrator::new(vec![
            MockAdapter::new("a", Behavior::Data(1.0)),
            MockAdapter::new("b", Behavior::Data(1.4)),
        ]);

        let outcome = orchestrator.gather(&test_spot()).await.unwrap();

        assert_eq!(outcome.readings.len(), 2);
        assert_eq!(
            outcome.tally,
            SourceTally {
                succeeded: 2,
                empty: 0,
                failed: 0
            }
        );
        assert!(outcome.failures.is_empty());
        assert!(!outcome.tally.is_degraded());
    }

    #[tokio::test]
    async fn test_gather_tolerates_failures_and_panics() {
        let slow = MockAdapter::new("slow", Behavior::Slow(1.2, 50));
        let orchestrator = SourceOrchestrator::new(vec![
            MockAdapter::new("broken", Behavior::Fail),
            MockAdapter::new("panicky", Behavior::Panic),
            MockAdapter::new("empty", Behavior::Empty),
            slow.clone(),
        ]);

        let outcome = orchestrator.gather(&test_spot()).await.unwrap();

        assert_eq!(outcome.readings.len(), 1);
        assert_eq!(outcome.readings[0].source, "slow");
        assert_eq!(outcome.tally.succeeded, 1);
        assert_eq!(outcome.tally.empty, 1);
        assert_eq!(outcome.tally.failed, 2);
        assert!(outcome.tally.is_degraded());
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);

        let kinds: Vec<_> = outcome.failures.iter().map(|f| f.kind.as_str()).collect();
        assert_eq!(kinds, vec!["status", "panicked"]);
    }

    #[tokio::test]
    async fn test_gather_preserves_registration_order() {
        let orchestrator = SourceOrchestrator::new(vec![
            MockAdapter::new("first", Behavior::Slow(1.0, 40)),
            MockAdapter::new("second", Behavior::Data(2.0)),
        ]);

        let outcome = orchestrator.gather(&test_spot()).await.unwrap();
        let sources: Vec<_> = outcome.readings.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_gather_all_failed_is_hard_error() {
        let orchestrator = SourceOrchestrator::new(vec![
            MockAdapter::new("broken", Behavior::Fail),
            MockAdapter::new("empty", Behavior::Empty),
        ]);

        let err = orchestrator.gather(&test_spot()).await.unwrap_err();
        match err {
            SurfError::AllSourcesFailed {
                location_id,
                attempted,
                failed,
                empty,
            } => {
                assert_eq!(location_id, "lower-trestles");
                assert_eq!(attempted, 2);
                assert_eq!(failed, 1);
                assert_eq!(empty, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_gather_with_no_adapters() {
        let orchestrator = SourceOrchestrator::default();
        let result = orchestrator.gather(&test_spot()).await;
        assert!(matches!(
            result,
            Err(SurfError::AllSourcesFailed { attempted: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_each_adapter_called_once() {
        let a = MockAdapter::new("a", Behavior::Fail);
        let b = MockAdapter::new("b", Behavior::Data(1.0));
        let orchestrator = SourceOrchestrator::default()
            .with_adapter(a.clone())
            .with_adapter(b.clone());

        assert_eq!(orchestrator.adapter_count(), 2);
        assert_eq!(orchestrator.source_ids(), vec!["a", "b"]);

        orchestrator.gather(&test_spot()).await.unwrap();
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }
}
