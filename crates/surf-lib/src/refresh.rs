//! Background refresh loop
//!
//! Periodically re-fetches every registered spot so API reads are served
//! from a warm cache, with jitter between cycles so a fleet of agents does
//! not hit upstream sources in lockstep.

use crate::error::SurfError;
use crate::health::components;
use crate::service::ConditionsService;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Base time between cycles (default: 10 minutes)
    pub interval: Duration,
    /// Maximum jitter added to each interval (default: 15 seconds)
    pub jitter: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            jitter: Duration::from_secs(15),
        }
    }
}

/// Outcome counts for one refresh cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshResults {
    pub success_count: usize,
    pub error_count: usize,
}

pub struct RefreshLoop {
    service: Arc<ConditionsService>,
    config: RefreshConfig,
}

impl RefreshLoop {
    pub fn new(service: Arc<ConditionsService>, config: RefreshConfig) -> Self {
        Self { service, config }
    }

    /// Run until a shutdown signal arrives; the first cycle starts immediately
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting conditions refresh loop"
        );

        self.service.health().register(components::REFRESH).await;
        let mut delay = Duration::ZERO;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let start = Instant::now();
                    let results = self.refresh_all().await;

                    debug!(
                        refreshed = results.success_count,
                        errors = results.error_count,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Refresh cycle complete"
                    );

                    delay = self.next_delay();
                }
                _ = shutdown.recv() => {
                    info!("Shutting down conditions refresh loop");
                    break;
                }
            }
        }
    }

    fn next_delay(&self) -> Duration {
        let jitter_ms = rand_jitter(self.config.jitter.as_millis() as u64);
        self.config.interval + Duration::from_millis(jitter_ms)
    }

    /// Refresh every registered spot once and update refresh health
    pub async fn refresh_all(&self) -> RefreshResults {
        let mut results = RefreshResults::default();

        for spot in self.service.spots() {
            match self.service.refresh(&spot.id).await {
                Ok(_) => results.success_count += 1,
                Err(SurfError::AllSourcesFailed { .. }) => {
                    // Already logged and counted by the service
                    results.error_count += 1;
                }
                Err(e) => {
                    results.error_count += 1;
                    warn!(spot = %spot.id, error = %e, "Failed to refresh spot");
                }
            }
        }

        let health = self.service.health();
        if results.error_count == 0 {
            health.set_healthy(components::REFRESH).await;
        } else if results.success_count > 0 {
            health
                .set_degraded(
                    components::REFRESH,
                    format!("{} spots failed to refresh", results.error_count),
                )
                .await;
        } else {
            health
                .set_unhealthy(components::REFRESH, "no spot could be refreshed")
                .await;
        }

        results
    }
}

/// Generate a jitter value between 0 and max_ms
fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }

    // Sub-second clock noise is enough to spread agents apart
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    now % max_ms
}

/// Builder for the refresh loop
pub struct RefreshLoopBuilder {
    service: Option<Arc<ConditionsService>>,
    config: RefreshConfig,
}

impl RefreshLoopBuilder {
    pub fn new() -> Self {
        Self {
            service: None,
            config: RefreshConfig::default(),
        }
    }

    pub fn service(mut self, service: Arc<ConditionsService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn build(self) -> Result<RefreshLoop> {
        let service = self
            .service
            .ok_or_else(|| anyhow::anyhow!("Conditions service is required"))?;

        Ok(RefreshLoop::new(service, self.config))
    }
}

impl Default for RefreshLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
