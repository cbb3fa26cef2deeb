//! Health check handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    /// Decode tooling present in PATH
    pub feature_extractor: bool,
    /// Cache directory accepts writes
    pub cache: bool,
    pub providers: ProviderHealth,
}

#[derive(Serialize)]
pub struct ProviderHealth {
    pub cloud: bool,
    pub local: bool,
}

/// Liveness and dependency availability.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        services: ServiceHealth {
            feature_extractor: state.extractor.is_healthy(),
            cache: state.cache.is_healthy().await,
            providers: ProviderHealth {
                cloud: state.router.cloud_available(),
                local: state.router.local_available(),
            },
        },
    })
}
