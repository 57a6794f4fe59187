//! HTTP API for conditions reports, health checks and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use surf_lib::{
    health::{ComponentStatus, HealthRegistry},
    ConditionsService, Rating, Reweighted, Spot, SurfError, WeightMultipliers,
};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConditionsService>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: Arc<ConditionsService>) -> Self {
        let health_registry = service.health().clone();
        Self {
            service,
            health_registry,
        }
    }
}

/// Pipeline errors mapped onto HTTP statuses
pub struct ApiError(SurfError);

impl From<SurfError> for ApiError {
    fn from(err: SurfError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            SurfError::InvalidProfile(_) => (StatusCode::NOT_FOUND, "unknown_spot"),
            SurfError::AllSourcesFailed { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "all_sources_failed")
            }
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn list_spots(State(state): State<Arc<AppState>>) -> Json<Vec<Spot>> {
    Json(state.service.spots())
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Evaluate the trend as of this instant instead of now
    pub at: Option<DateTime<Utc>>,
}

async fn spot_report(
    State(state): State<Arc<AppState>>,
    Path(spot_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let at = query.at.unwrap_or_else(Utc::now);
    let report = state.service.report(&spot_id, at).await?;
    Ok(Json(report))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReweightRequest {
    #[serde(default)]
    pub multipliers: WeightMultipliers,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReweightResponse {
    pub spot_id: String,
    pub original_score: u8,
    pub original_rating: Rating,
    /// Absent when the multipliers leave no weight to score with
    pub adjusted: Option<Reweighted>,
}

async fn reweight(
    State(state): State<Arc<AppState>>,
    Path(spot_id): Path<String>,
    Json(request): Json<ReweightRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fetched = state.service.fetch_and_aggregate(&spot_id).await?;
    let score = state.service.score(
        fetched.observation(),
        &fetched.spot.profile,
        fetched.source_count(),
    );
    let adjusted = state.service.reweight(&score.breakdown, &request.multipliers);

    Ok(Json(ReweightResponse {
        spot_id,
        original_score: score.overall,
        original_rating: score.rating,
        adjusted,
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/spots", get(list_spots))
        .route("/api/v1/spots/:id/report", get(spot_report))
        .route("/api/v1/spots/:id/reweight", post(reweight))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
