//! Application state.

use std::sync::Arc;

use tracing::info;

use cine_cache::AnalysisCache;
use cine_features::FeatureExtractor;
use cine_ledger::CostLedger;
use cine_router::{GeminiClient, InferenceRouter, LlamaServerClient};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub extractor: Arc<FeatureExtractor>,
    pub router: Arc<InferenceRouter>,
    pub cache: Arc<AnalysisCache>,
    pub ledger: Arc<CostLedger>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let extractor = FeatureExtractor::with_workers(config.max_workers);
        let cache = AnalysisCache::open(&config.cache_dir).await?;
        let ledger = CostLedger::open(&config.ledger_path).await?;

        let cloud = GeminiClient::from_env();
        if cloud.is_some() {
            info!("Cloud provider configured");
        } else {
            info!("GEMINI_API_KEY not set, cloud provider disabled");
        }

        // The local probe pings a server over blocking HTTP.
        let local = tokio::task::spawn_blocking(LlamaServerClient::from_env).await?;
        if local.is_some() {
            info!("Local model available");
        } else {
            info!("Local model not reachable, running cloud-only");
        }

        let router = InferenceRouter::new(
            cloud.map(|c| Arc::new(c) as Arc<dyn cine_router::CloudProvider>),
            local.map(|l| Arc::new(l) as Arc<dyn cine_router::LocalModel>),
        );

        Ok(Self {
            config,
            extractor: Arc::new(extractor),
            router: Arc::new(router),
            cache: Arc::new(cache),
            ledger: Arc::new(ledger),
        })
    }
}
