//! Video analysis handler.
//!
//! Flow per upload: fingerprint the bytes, check the cache, extract local
//! features, route to a provider, record the cost, cache the result.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cine_cache::DEFAULT_ANALYSIS_TTL;
use cine_features::ExtractionOptions;
use cine_models::{AnalysisResult, MediaFingerprint, OperationKind};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Estimated cloud cost avoided by a cache hit, reported to the client.
const CACHE_HIT_COST_SAVED: f64 = 2.50;

/// Query parameters for the analyze endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    /// Serve a cached result when one exists
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Skip the cloud provider entirely
    #[serde(default)]
    pub force_local: bool,
}

fn default_use_cache() -> bool {
    true
}

/// Which local features fed the analysis.
#[derive(Serialize)]
pub struct FeatureCounts {
    pub audio_analyzed: bool,
    pub frames_sampled: usize,
    pub scenes_detected: usize,
}

/// Analyze endpoint response.
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisResult,
    /// Fingerprint hex digest; reusable as chat context id
    pub analysis_id: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_saved: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureCounts>,
}

/// Analyze an uploaded media file.
pub async fn analyze_video(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    mut multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let (filename, bytes) = read_upload(&mut multipart).await?;
    info!(filename = %filename, size = bytes.len(), "Starting analysis");

    let fingerprint = MediaFingerprint::from_bytes(&bytes);
    let cache_key = fingerprint.cache_key();

    if query.use_cache {
        if let Some(analysis) = state.cache.get::<AnalysisResult>(&cache_key).await {
            info!(fingerprint = %fingerprint.short(), "Serving cached analysis");
            state.ledger.record_cache_hit(OperationKind::Analysis).await?;

            return Ok(Json(AnalyzeResponse {
                analysis,
                analysis_id: fingerprint.as_hex().to_string(),
                cached: true,
                cost_saved: Some(CACHE_HIT_COST_SAVED),
                provider: None,
                cost: None,
                degraded: None,
                features: None,
            }));
        }
    }

    // Spill the upload to a temp file for the decode tooling and the
    // cloud upload path. The file is removed when the guard drops.
    let temp = tempfile::Builder::new()
        .prefix("cinecritique_")
        .suffix(&file_suffix(&filename))
        .tempfile()
        .map_err(|e| ApiError::internal(format!("temp file: {}", e)))?;
    tokio::fs::write(temp.path(), &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("spill upload: {}", e)))?;
    drop(bytes);

    let summary = state
        .extractor
        .extract(temp.path(), ExtractionOptions::default())
        .await?;

    let routed = state
        .router
        .analyze(&summary, temp.path(), query.force_local)
        .await?;

    let cost = state
        .ledger
        .record(
            OperationKind::Analysis,
            routed.provider,
            &routed.model,
            routed.tokens,
        )
        .await?;

    if !state
        .cache
        .set(&cache_key, &routed.analysis, Some(DEFAULT_ANALYSIS_TTL))
        .await
    {
        warn!(fingerprint = %fingerprint.short(), "Analysis result not cached");
    }

    Ok(Json(AnalyzeResponse {
        analysis: routed.analysis,
        analysis_id: fingerprint.as_hex().to_string(),
        cached: false,
        cost_saved: None,
        provider: Some(routed.provider.to_string()),
        cost: Some(cost),
        degraded: Some(routed.degraded),
        features: Some(FeatureCounts {
            audio_analyzed: summary.audio.is_some(),
            frames_sampled: summary.frames.len(),
            scenes_detected: summary.scenes.len(),
        }),
    }))
}

/// Pull the `file` field out of a multipart upload.
async fn read_upload(multipart: &mut Multipart) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .unwrap_or("upload.mp4")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("uploaded file is empty"));
        }
        return Ok((filename, bytes.to_vec()));
    }
    Err(ApiError::bad_request("missing 'file' field"))
}

/// Extension-preserving suffix for the temp file.
fn file_suffix(filename: &str) -> String {
    match std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!(".{}", ext),
        None => ".mp4".to_string(),
    }
}
