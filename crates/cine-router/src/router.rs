//! Inference routing.
//!
//! Routes each request to the cloud multimodal provider or the offline
//! local model. The cloud path uploads the media, polls until the
//! provider finishes processing it, then generates against the media plus
//! a feature-grounded prompt. Any cloud call failure falls back to the
//! local model when one is configured. The local path is text-only and
//! runs its blocking completion on the blocking pool.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, warn};

use cine_models::{AnalysisResult, FeatureSummary, Provider};

use crate::error::{RouterError, RouterResult};
use crate::parse::parse_analysis;
use crate::prompt;
use crate::provider::{CloudProvider, FileState, GeneratedImage, LocalModel};

/// How long to wait between processing-state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long uploaded media may stay in processing before the call is
/// abandoned and the fallback cascade runs.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(120);

const LOCAL_ANALYSIS_MAX_TOKENS: u32 = 2048;
const LOCAL_CHAT_MAX_TOKENS: u32 = 512;
const LOCAL_TEMPERATURE: f32 = 0.7;

/// Routing configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub poll_interval: Duration,
    pub poll_deadline: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_deadline: DEFAULT_POLL_DEADLINE,
        }
    }
}

/// An analysis plus the provenance needed for cost accounting.
#[derive(Debug, Clone)]
pub struct RoutedAnalysis {
    pub analysis: AnalysisResult,
    pub provider: Provider,
    pub model: String,
    pub tokens: u64,
    /// True when the provider text lacked the expected structure.
    pub degraded: bool,
}

/// A chat reply plus provenance.
#[derive(Debug, Clone)]
pub struct RoutedChat {
    pub text: String,
    pub provider: Provider,
    pub model: String,
    pub tokens: u64,
}

/// A generated image plus provenance.
#[derive(Debug, Clone)]
pub struct RoutedImage {
    pub image: GeneratedImage,
    pub provider: Provider,
    pub model: String,
}

/// Routes requests between the cloud provider and the local model.
pub struct InferenceRouter {
    cloud: Option<Arc<dyn CloudProvider>>,
    local: Option<Arc<dyn LocalModel>>,
    config: RouterConfig,
}

impl InferenceRouter {
    pub fn new(
        cloud: Option<Arc<dyn CloudProvider>>,
        local: Option<Arc<dyn LocalModel>>,
    ) -> Self {
        Self {
            cloud,
            local,
            config: RouterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cloud_available(&self) -> bool {
        self.cloud.is_some()
    }

    pub fn local_available(&self) -> bool {
        self.local.is_some()
    }

    /// Analyze an asset.
    ///
    /// When `force_local` is set or no cloud provider is configured the
    /// local model is used directly. Otherwise the cloud path runs, with
    /// any cloud call failure falling back to the local model.
    pub async fn analyze(
        &self,
        summary: &FeatureSummary,
        media_path: &Path,
        force_local: bool,
    ) -> RouterResult<RoutedAnalysis> {
        let cloud = match &self.cloud {
            Some(cloud) if !force_local => cloud,
            _ => {
                return match &self.local {
                    Some(local) => self.analyze_local(Arc::clone(local), summary).await,
                    None => Err(RouterError::ProviderUnavailable),
                };
            }
        };

        match self.analyze_cloud(cloud.as_ref(), summary, media_path).await {
            Ok(routed) => Ok(routed),
            Err(e) if e.is_cloud_call_failure() => match &self.local {
                Some(local) => {
                    warn!(error = %e, "Cloud analysis failed, falling back to local model");
                    self.analyze_local(Arc::clone(local), summary).await
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn analyze_cloud(
        &self,
        cloud: &dyn CloudProvider,
        summary: &FeatureSummary,
        media_path: &Path,
    ) -> RouterResult<RoutedAnalysis> {
        let handle = cloud.upload(media_path).await?;
        self.await_ready(cloud, &handle).await?;

        let prompt = prompt::analysis_prompt(summary);
        let completion = cloud.generate(Some(&handle), &prompt).await?;

        let parsed = parse_analysis(&completion.text);
        info!(
            model = cloud.model(),
            tokens = completion.tokens,
            degraded = parsed.degraded,
            "Cloud analysis complete"
        );

        Ok(RoutedAnalysis {
            analysis: parsed.result,
            provider: Provider::Cloud,
            model: cloud.model().to_string(),
            tokens: completion.tokens,
            degraded: parsed.degraded,
        })
    }

    /// Poll until the uploaded media leaves its processing state.
    async fn await_ready(
        &self,
        cloud: &dyn CloudProvider,
        handle: &crate::provider::MediaHandle,
    ) -> RouterResult<()> {
        let deadline = Instant::now() + self.config.poll_deadline;
        loop {
            match cloud.status(handle).await? {
                FileState::Ready => return Ok(()),
                FileState::Failed => {
                    return Err(RouterError::cloud_call_failed(
                        "cloud media processing failed",
                    ))
                }
                FileState::Processing => {
                    if Instant::now() >= deadline {
                        return Err(RouterError::PollDeadlineExceeded(
                            self.config.poll_deadline.as_secs(),
                        ));
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn analyze_local(
        &self,
        local: Arc<dyn LocalModel>,
        summary: &FeatureSummary,
    ) -> RouterResult<RoutedAnalysis> {
        let prompt = prompt::local_analysis_prompt(summary);
        let model = local.model().to_string();

        let completion = tokio::task::spawn_blocking(move || {
            local.complete(
                prompt::ANALYSIS_SYSTEM_MESSAGE,
                &prompt,
                LOCAL_ANALYSIS_MAX_TOKENS,
                LOCAL_TEMPERATURE,
            )
        })
        .await
        .map_err(|e| RouterError::internal(format!("local analysis task failed: {}", e)))??;

        let parsed = parse_analysis(&completion.text);
        info!(
            model = %model,
            tokens = completion.tokens,
            degraded = parsed.degraded,
            "Local analysis complete"
        );

        Ok(RoutedAnalysis {
            analysis: parsed.result,
            provider: Provider::Local,
            model,
            tokens: completion.tokens,
            degraded: parsed.degraded,
        })
    }

    /// Handle a chat request, optionally grounded on a prior analysis.
    pub async fn chat(
        &self,
        message: &str,
        context: Option<&Value>,
        use_local: bool,
    ) -> RouterResult<RoutedChat> {
        if use_local {
            if let Some(local) = &self.local {
                return self.chat_local(Arc::clone(local), message, context).await;
            }
        }

        match &self.cloud {
            Some(cloud) => {
                let prompt = prompt::chat_prompt(message, context);
                let completion = cloud.generate(None, &prompt).await?;
                Ok(RoutedChat {
                    text: completion.text,
                    provider: Provider::Cloud,
                    model: cloud.model().to_string(),
                    tokens: completion.tokens,
                })
            }
            None => Err(RouterError::ProviderUnavailable),
        }
    }

    async fn chat_local(
        &self,
        local: Arc<dyn LocalModel>,
        message: &str,
        context: Option<&Value>,
    ) -> RouterResult<RoutedChat> {
        let prompt = prompt::chat_prompt(message, context);
        let model = local.model().to_string();

        let completion = tokio::task::spawn_blocking(move || {
            local.complete(
                prompt::CHAT_SYSTEM_MESSAGE,
                &prompt,
                LOCAL_CHAT_MAX_TOKENS,
                LOCAL_TEMPERATURE,
            )
        })
        .await
        .map_err(|e| RouterError::internal(format!("local chat task failed: {}", e)))??;

        Ok(RoutedChat {
            text: completion.text,
            provider: Provider::Local,
            model,
            tokens: completion.tokens,
        })
    }

    /// Generate an image. Cloud-only; there is no local fallback.
    pub async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
    ) -> RouterResult<RoutedImage> {
        let cloud = self
            .cloud
            .as_ref()
            .ok_or(RouterError::ProviderUnavailable)?;

        let image = cloud.generate_image(prompt, aspect_ratio).await?;
        Ok(RoutedImage {
            image,
            provider: Provider::Cloud,
            model: cloud.image_model().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, MediaHandle};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const STRUCTURED_JSON: &str = r#"{
        "summary": {
            "storytelling": "cloud says",
            "editing": "e",
            "cinematography": "c",
            "musicIntegration": "m",
            "verdict": "v"
        },
        "timeline": []
    }"#;

    struct MockCloud {
        states: Mutex<Vec<FileState>>,
        generate_result: Result<String, String>,
        generate_calls: AtomicUsize,
    }

    impl MockCloud {
        fn ready(text: &str) -> Self {
            Self {
                states: Mutex::new(vec![FileState::Ready]),
                generate_result: Ok(text.to_string()),
                generate_calls: AtomicUsize::new(0),
            }
        }

        fn with_states(states: Vec<FileState>, text: &str) -> Self {
            Self {
                states: Mutex::new(states),
                generate_result: Ok(text.to_string()),
                generate_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                states: Mutex::new(vec![FileState::Ready]),
                generate_result: Err("upstream 500".to_string()),
                generate_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CloudProvider for MockCloud {
        fn model(&self) -> &str {
            "gemini-1.5-flash"
        }

        async fn upload(&self, _path: &Path) -> RouterResult<MediaHandle> {
            Ok(MediaHandle("files/test".to_string()))
        }

        async fn status(&self, _handle: &MediaHandle) -> RouterResult<FileState> {
            let mut states = self.states.lock().unwrap();
            if states.len() > 1 {
                Ok(states.remove(0))
            } else {
                Ok(states[0])
            }
        }

        async fn generate(
            &self,
            _media: Option<&MediaHandle>,
            _prompt: &str,
        ) -> RouterResult<Completion> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            match &self.generate_result {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    tokens: 1234,
                }),
                Err(msg) => Err(RouterError::cloud_call_failed(msg.clone())),
            }
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            _aspect_ratio: &str,
        ) -> RouterResult<GeneratedImage> {
            Ok(GeneratedImage {
                base64_data: "aGVsbG8=".to_string(),
                mime_type: "image/png".to_string(),
            })
        }
    }

    struct MockLocal;

    impl LocalModel for MockLocal {
        fn model(&self) -> &str {
            "llama-2-7b"
        }

        fn complete(
            &self,
            _system_message: &str,
            _user_message: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> RouterResult<Completion> {
            Ok(Completion {
                text: STRUCTURED_JSON.replace("cloud says", "local says"),
                tokens: 42,
            })
        }
    }

    fn summary() -> FeatureSummary {
        use cine_models::VideoMetadata;
        FeatureSummary {
            metadata: VideoMetadata::new(30.0, 900, 640, 480),
            frames: vec![],
            scenes: vec![],
            audio: None,
        }
    }

    fn fast_config() -> RouterConfig {
        RouterConfig {
            poll_interval: Duration::from_millis(1),
            poll_deadline: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_cloud_preferred_when_available() {
        let router = InferenceRouter::new(
            Some(Arc::new(MockCloud::ready(STRUCTURED_JSON))),
            Some(Arc::new(MockLocal)),
        );
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap();
        assert_eq!(routed.provider, Provider::Cloud);
        assert_eq!(routed.model, "gemini-1.5-flash");
        assert_eq!(routed.tokens, 1234);
        assert!(!routed.degraded);
        assert_eq!(routed.analysis.summary.storytelling, "cloud says");
    }

    #[tokio::test]
    async fn test_force_local_skips_cloud() {
        let cloud = Arc::new(MockCloud::ready(STRUCTURED_JSON));
        let router = InferenceRouter::new(Some(cloud.clone()), Some(Arc::new(MockLocal)));
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), true)
            .await
            .unwrap();
        assert_eq!(routed.provider, Provider::Local);
        assert_eq!(cloud.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cloud_failure_falls_back_to_local() {
        let router = InferenceRouter::new(
            Some(Arc::new(MockCloud::failing())),
            Some(Arc::new(MockLocal)),
        );
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap();
        assert_eq!(routed.provider, Provider::Local);
        assert_eq!(routed.analysis.summary.storytelling, "local says");
    }

    #[tokio::test]
    async fn test_cloud_failure_without_local_propagates() {
        let router = InferenceRouter::new(Some(Arc::new(MockCloud::failing())), None);
        let err = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap_err();
        assert!(err.is_cloud_call_failure());
    }

    #[tokio::test]
    async fn test_no_providers_is_unavailable() {
        let router = InferenceRouter::new(None, None);
        let err = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable));
        assert_eq!(err.to_string(), "No AI provider available");
    }

    #[tokio::test]
    async fn test_force_local_without_local_is_unavailable() {
        let router =
            InferenceRouter::new(Some(Arc::new(MockCloud::ready(STRUCTURED_JSON))), None);
        let err = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable));
    }

    #[tokio::test]
    async fn test_processing_then_ready_polls_through() {
        let cloud = MockCloud::with_states(
            vec![FileState::Processing, FileState::Processing, FileState::Ready],
            STRUCTURED_JSON,
        );
        let router = InferenceRouter::new(Some(Arc::new(cloud)), None)
            .with_config(fast_config());
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap();
        assert_eq!(routed.provider, Provider::Cloud);
    }

    #[tokio::test]
    async fn test_poll_deadline_falls_back_to_local() {
        let cloud = MockCloud::with_states(vec![FileState::Processing], STRUCTURED_JSON);
        let router = InferenceRouter::new(Some(Arc::new(cloud)), Some(Arc::new(MockLocal)))
            .with_config(fast_config());
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap();
        assert_eq!(routed.provider, Provider::Local);
    }

    #[tokio::test]
    async fn test_failed_file_state_falls_back() {
        let cloud = MockCloud::with_states(vec![FileState::Failed], STRUCTURED_JSON);
        let router = InferenceRouter::new(Some(Arc::new(cloud)), Some(Arc::new(MockLocal)))
            .with_config(fast_config());
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap();
        assert_eq!(routed.provider, Provider::Local);
    }

    #[tokio::test]
    async fn test_unstructured_cloud_text_is_degraded() {
        let router = InferenceRouter::new(
            Some(Arc::new(MockCloud::ready("just some prose, no json here"))),
            None,
        );
        let routed = router
            .analyze(&summary(), Path::new("/tmp/a.mp4"), false)
            .await
            .unwrap();
        assert!(routed.degraded);
        assert_eq!(routed.analysis.summary.editing, "See full analysis");
    }

    #[tokio::test]
    async fn test_chat_routes_cloud_by_default() {
        let router = InferenceRouter::new(
            Some(Arc::new(MockCloud::ready("sure, tighten the edit"))),
            Some(Arc::new(MockLocal)),
        );
        let chat = router.chat("what next?", None, false).await.unwrap();
        assert_eq!(chat.provider, Provider::Cloud);
        assert_eq!(chat.text, "sure, tighten the edit");
    }

    #[tokio::test]
    async fn test_chat_use_local() {
        let router = InferenceRouter::new(
            Some(Arc::new(MockCloud::ready("cloud reply"))),
            Some(Arc::new(MockLocal)),
        );
        let chat = router.chat("what next?", None, true).await.unwrap();
        assert_eq!(chat.provider, Provider::Local);
        assert_eq!(chat.tokens, 42);
    }

    #[tokio::test]
    async fn test_chat_use_local_without_local_uses_cloud() {
        let router =
            InferenceRouter::new(Some(Arc::new(MockCloud::ready("cloud reply"))), None);
        let chat = router.chat("hello", None, true).await.unwrap();
        assert_eq!(chat.provider, Provider::Cloud);
    }

    #[tokio::test]
    async fn test_image_generation_requires_cloud() {
        let router = InferenceRouter::new(None, Some(Arc::new(MockLocal)));
        let err = router.generate_image("a poster", "16:9").await.unwrap_err();
        assert!(matches!(err, RouterError::ProviderUnavailable));

        let router =
            InferenceRouter::new(Some(Arc::new(MockCloud::ready("unused"))), None);
        let image = router.generate_image("a poster", "16:9").await.unwrap();
        assert_eq!(image.provider, Provider::Cloud);
        assert_eq!(image.image.mime_type, "image/png");
    }
}
