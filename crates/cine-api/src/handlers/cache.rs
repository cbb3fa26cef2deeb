//! Cache management handlers.

use axum::extract::State;
use axum::Json;

use cine_cache::CacheStats;

use crate::error::ApiResult;
use crate::handlers::costs::StatusResponse;
use crate::state::AppState;

/// Cache counters and on-disk footprint.
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Drop every cached entry.
pub async fn clear_cache(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    state.cache.clear().await?;
    Ok(Json(StatusResponse { status: "cleared" }))
}
