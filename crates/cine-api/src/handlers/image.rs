//! Image generation handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use cine_models::OperationKind;

use crate::error::ApiResult;
use crate::state::AppState;

/// Image generation request.
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

/// Image generation response.
#[derive(Serialize)]
pub struct ImageResponse {
    /// Base64-encoded image payload
    pub image: String,
    pub mime_type: String,
    pub provider: String,
    pub cost: f64,
}

/// Generate an image. Cloud-only.
pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> ApiResult<Json<ImageResponse>> {
    let routed = state
        .router
        .generate_image(&request.prompt, &request.aspect_ratio)
        .await?;

    let cost = state
        .ledger
        .record(
            OperationKind::ImageGeneration,
            routed.provider,
            &routed.model,
            0,
        )
        .await?;

    Ok(Json(ImageResponse {
        image: routed.image.base64_data,
        mime_type: routed.image.mime_type,
        provider: routed.provider.to_string(),
        cost,
    }))
}
