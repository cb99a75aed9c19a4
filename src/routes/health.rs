//! GET /api/v1/health

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    /// The dive log is unreachable; tide and marine lookups may still work.
    Degraded,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    /// Whether the dive store answered a ping
    pub database: bool,
}

/// Liveness plus dive-store reachability. Always 200; upstream providers
/// are not probed.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up (status may be degraded)", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.dives.ping().await;
    if !database {
        tracing::warn!("Health check: dive store unreachable");
    }

    Json(HealthResponse {
        status: if database {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        },
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}
