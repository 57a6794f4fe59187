//! Surf agent - surf conditions service
//!
//! Polls upstream marine and weather sources for every configured spot,
//! keeps reconciled conditions cached, and serves scores and trends.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use surf_agent::{api, config::AgentConfig};
use surf_lib::{
    health::{components, HealthRegistry},
    provider::{OpenMeteoMarineAdapter, OpenMeteoWeatherAdapter, ProviderAdapter},
    ConditionsService, InMemoryObservationCache, InMemorySpotRegistry, RefreshLoopBuilder,
    SourceOrchestrator, StructuredLogger, SurfMetrics,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting surf-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        spots = config.spots.len(),
        "Agent configured"
    );
    if config.spots.is_empty() {
        warn!("No spots configured; the API will have nothing to report");
    }

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PROVIDERS).await;
    health_registry.register(components::REFRESH).await;
    health_registry.register(components::CACHE).await;

    let metrics = SurfMetrics::new();
    metrics.set_spots_monitored(config.spots.len() as i64);

    let logger = StructuredLogger::new(&config.instance_name);

    let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
        Arc::new(
            OpenMeteoMarineAdapter::new(config.providers.clone())
                .context("Failed to build marine adapter")?,
        ),
        Arc::new(
            OpenMeteoWeatherAdapter::new(config.providers.clone())
                .context("Failed to build weather adapter")?,
        ),
    ];
    let orchestrator = SourceOrchestrator::new(adapters);
    let source_count = orchestrator.adapter_count();

    let service = Arc::new(
        ConditionsService::new(
            Arc::new(InMemorySpotRegistry::new(config.spots.clone())),
            Arc::new(InMemoryObservationCache::new()),
            orchestrator,
        )
        .with_aggregator_config(config.aggregator)
        .with_scoring_config(config.scoring)
        .with_trend_config(config.trend)
        .with_cache_ttl(Duration::from_secs(config.cache_ttl_secs))
        .with_health(health_registry.clone())
        .with_logger(logger.clone()),
    );

    logger.log_startup(AGENT_VERSION, config.spots.len(), source_count);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let refresh_loop = RefreshLoopBuilder::new()
        .service(service.clone())
        .interval(Duration::from_secs(config.refresh_interval_secs))
        .jitter(Duration::from_secs(config.refresh_jitter_secs))
        .build()?;
    let refresh_handle = tokio::spawn(refresh_loop.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(service));

    // Serving from cache or upstream both work, so ready once wired up
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    logger.log_shutdown("API server failed");
                    return Err(e.context("API server failed"));
                }
                Err(e) => return Err(e).context("API server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = refresh_handle.await {
        warn!(error = %e, "Refresh loop did not stop cleanly");
    }
    info!("Shutting down");

    Ok(())
}
