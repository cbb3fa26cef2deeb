//! Feature extraction pipeline.
//!
//! Extraction is CPU-bound, so it runs on the blocking pool behind a
//! bounded semaphore: concurrent requests queue for a worker slot instead
//! of starving the cooperative scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use cine_models::{AudioProfile, FeatureSummary};

use crate::audio;
use crate::error::{FeatureError, FeatureResult};
use crate::frames;
use crate::probe;

/// Default worker pool width.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default frame sampling interval.
pub const DEFAULT_FRAME_INTERVAL: u64 = 30;

/// Extraction flags.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Run the best-effort audio analysis
    pub extract_audio: bool,
    /// Compute per-frame metrics on the sampling grid
    pub sample_frames: bool,
    /// Sampling grid stride in frames
    pub frame_interval: u64,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            extract_audio: true,
            sample_frames: true,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}

/// Local feature extractor with a bounded worker pool.
pub struct FeatureExtractor {
    workers: Arc<Semaphore>,
}

impl FeatureExtractor {
    /// Create an extractor with the default pool width.
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_MAX_WORKERS)
    }

    /// Create an extractor with an explicit pool width.
    pub fn with_workers(max_workers: usize) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Whether the external decode tooling is present.
    pub fn is_healthy(&self) -> bool {
        which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
    }

    /// Extract a feature summary from a media file.
    ///
    /// Fatal only when the container cannot be opened; audio failures
    /// degrade the profile and decode hiccups shorten the scan.
    pub async fn extract(
        &self,
        path: impl Into<PathBuf>,
        options: ExtractionOptions,
    ) -> FeatureResult<FeatureSummary> {
        let path = path.into();

        let _permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FeatureError::internal("worker pool closed"))?;

        tokio::task::spawn_blocking(move || extract_sync(&path, &options))
            .await
            .map_err(|e| FeatureError::internal(format!("extraction task panicked: {}", e)))?
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous pipeline body; runs on a blocking worker.
fn extract_sync(path: &std::path::Path, options: &ExtractionOptions) -> FeatureResult<FeatureSummary> {
    let metadata = probe::probe_video(path)?;

    let scan = frames::scan_frames(
        path,
        metadata.width,
        metadata.height,
        metadata.fps,
        options.frame_interval,
        options.sample_frames,
    )?;

    let audio = if options.extract_audio {
        match audio::analyze_audio(path) {
            Ok(features) => Some(AudioProfile::Analyzed(features)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Audio analysis degraded");
                Some(AudioProfile::Degraded {
                    error: e.to_string(),
                })
            }
        }
    } else {
        None
    };

    info!(
        path = %path.display(),
        frames = scan.frames.len(),
        scenes = scan.scenes.len(),
        decoded = scan.decoded_frames,
        "Extracted features"
    );

    Ok(FeatureSummary {
        metadata,
        frames: scan.frames,
        scenes: scan.scenes,
        audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_missing_file_is_fatal() {
        let extractor = FeatureExtractor::new();
        let err = extractor
            .extract("/nonexistent/clip.mp4", ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FeatureError::FileNotFound(_)));
    }

    #[test]
    fn test_default_options() {
        let options = ExtractionOptions::default();
        assert!(options.extract_audio);
        assert!(options.sample_frames);
        assert_eq!(options.frame_interval, 30);
    }

    #[tokio::test]
    async fn test_pool_width_is_at_least_one() {
        let extractor = FeatureExtractor::with_workers(0);
        // A zero-width pool would deadlock the first request.
        assert_eq!(extractor.workers.available_permits(), 1);
    }
}
