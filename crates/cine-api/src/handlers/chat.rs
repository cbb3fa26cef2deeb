//! Chat handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cine_models::OperationKind;

use crate::error::ApiResult;
use crate::state::AppState;

/// Chat endpoint request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Fingerprint hex of a prior analysis to use as context
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub use_local: bool,
}

/// Chat endpoint response.
#[derive(Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub provider: String,
    pub cost: f64,
}

/// Answer a chat message, optionally grounded on a cached analysis.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    // A missing or expired context entry degrades to context-free chat.
    let context: Option<Value> = match &request.analysis_id {
        Some(id) => state.cache.get(&format!("analysis:{}", id)).await,
        None => None,
    };

    let routed = state
        .router
        .chat(&request.message, context.as_ref(), request.use_local)
        .await?;

    let cost = state
        .ledger
        .record(
            OperationKind::Chat,
            routed.provider,
            &routed.model,
            routed.tokens,
        )
        .await?;

    Ok(Json(ChatResponse {
        message: routed.text,
        provider: routed.provider.to_string(),
        cost,
    }))
}
