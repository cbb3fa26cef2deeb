//! Analyze flow integration: identical uploads are served from the
//! cache, so the provider is called exactly once per distinct asset.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cine_cache::AnalysisCache;
use cine_models::{AnalysisResult, FeatureSummary, MediaFingerprint, VideoMetadata};
use cine_router::{
    CloudProvider, Completion, FileState, GeneratedImage, InferenceRouter, MediaHandle,
    RouterResult,
};

const STRUCTURED_JSON: &str = r#"{
    "summary": {
        "storytelling": "s",
        "editing": "e",
        "cinematography": "c",
        "musicIntegration": "m",
        "verdict": "v"
    },
    "timeline": []
}"#;

struct CountingCloud {
    generate_calls: AtomicUsize,
}

#[async_trait]
impl CloudProvider for CountingCloud {
    fn model(&self) -> &str {
        "gemini-1.5-flash"
    }

    async fn upload(&self, _path: &Path) -> RouterResult<MediaHandle> {
        Ok(MediaHandle("files/test".to_string()))
    }

    async fn status(&self, _handle: &MediaHandle) -> RouterResult<FileState> {
        Ok(FileState::Ready)
    }

    async fn generate(
        &self,
        _media: Option<&MediaHandle>,
        _prompt: &str,
    ) -> RouterResult<Completion> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion {
            text: STRUCTURED_JSON.to_string(),
            tokens: 100,
        })
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _aspect_ratio: &str,
    ) -> RouterResult<GeneratedImage> {
        unimplemented!("not exercised")
    }
}

fn summary() -> FeatureSummary {
    FeatureSummary {
        metadata: VideoMetadata::new(30.0, 900, 640, 480),
        frames: vec![],
        scenes: vec![],
        audio: None,
    }
}

/// The fingerprint -> cache -> route -> cache-set sequence the analyze
/// handler runs for one upload.
async fn analyze_once(
    cache: &AnalysisCache,
    router: &InferenceRouter,
    bytes: &[u8],
) -> (AnalysisResult, bool) {
    let fingerprint = MediaFingerprint::from_bytes(bytes);
    let key = fingerprint.cache_key();

    if let Some(analysis) = cache.get::<AnalysisResult>(&key).await {
        return (analysis, true);
    }

    let routed = router
        .analyze(&summary(), Path::new("/tmp/upload.mp4"), false)
        .await
        .unwrap();
    cache
        .set(&key, &routed.analysis, Some(Duration::from_secs(60)))
        .await;
    (routed.analysis, false)
}

#[tokio::test]
async fn test_identical_bytes_hit_cache_without_second_provider_call() {
    let dir = tempfile::TempDir::new().unwrap();
    let cache = AnalysisCache::open(dir.path()).await.unwrap();

    let cloud = Arc::new(CountingCloud {
        generate_calls: AtomicUsize::new(0),
    });
    let router = InferenceRouter::new(Some(cloud.clone() as Arc<dyn CloudProvider>), None);

    let upload = b"the very same media bytes";

    let (first, first_cached) = analyze_once(&cache, &router, upload).await;
    assert!(!first_cached);
    assert_eq!(cloud.generate_calls.load(Ordering::SeqCst), 1);

    let (second, second_cached) = analyze_once(&cache, &router, upload).await;
    assert!(second_cached);
    assert_eq!(second, first);
    // No additional provider call for the identical asset.
    assert_eq!(cloud.generate_calls.load(Ordering::SeqCst), 1);

    // Different bytes are a different asset and do go to the provider.
    let (_, third_cached) = analyze_once(&cache, &router, b"other media").await;
    assert!(!third_cached);
    assert_eq!(cloud.generate_calls.load(Ordering::SeqCst), 2);
}
