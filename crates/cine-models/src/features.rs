//! Locally extracted feature summaries.
//!
//! A [`FeatureSummary`] is the structured output of the local
//! feature-extraction pipeline: container metadata, sampled frame metrics,
//! detected scene cuts, and a best-effort audio profile. It is produced
//! once per asset and consumed by the inference router to ground prompts;
//! it is not persisted independently.

use serde::{Deserialize, Serialize};

/// Container-level video metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Frame rate (fps)
    pub fps: f64,
    /// Total frame count
    pub frame_count: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds (`frame_count / fps`, 0 when fps is 0)
    pub duration: f64,
    /// Aspect ratio as "W:H"
    pub aspect_ratio: String,
}

impl VideoMetadata {
    /// Build metadata from probed values, deriving duration and aspect ratio.
    pub fn new(fps: f64, frame_count: u64, width: u32, height: u32) -> Self {
        let duration = if fps > 0.0 {
            frame_count as f64 / fps
        } else {
            0.0
        };
        Self {
            fps,
            frame_count,
            width,
            height,
            duration,
            aspect_ratio: format!("{}:{}", width, height),
        }
    }
}

/// Metrics for one sampled frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSample {
    /// Frame index in the source stream
    pub frame_index: u64,
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Mean luma on a 0-255 scale
    pub brightness: f64,
    /// Laplacian variance; low values indicate a blurred frame
    pub motion_blur: f64,
    /// Source resolution as "WxH"
    pub resolution: String,
}

/// A detected discontinuity between adjacent frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCut {
    /// Frame index where the cut lands
    pub frame_index: u64,
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Mean absolute luma difference against the previous frame
    pub intensity: f64,
}

/// Extracted audio characteristics, or the reason extraction failed.
///
/// Audio analysis is best-effort: any failure degrades the profile to an
/// error marker rather than failing the whole extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudioProfile {
    Analyzed(AudioFeatures),
    Degraded { error: String },
}

impl AudioProfile {
    /// Tempo in BPM when analysis succeeded.
    pub fn tempo(&self) -> Option<f64> {
        match self {
            Self::Analyzed(f) => Some(f.tempo),
            Self::Degraded { .. } => None,
        }
    }

    /// Average RMS energy when analysis succeeded.
    pub fn avg_energy(&self) -> Option<f64> {
        match self {
            Self::Analyzed(f) => Some(f.avg_energy),
            Self::Degraded { .. } => None,
        }
    }
}

/// Successfully computed audio metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Estimated tempo in BPM
    pub tempo: f64,
    /// Number of detected beats
    pub beat_count: u64,
    /// Average spectral centroid in Hz
    pub avg_spectral_centroid: f64,
    /// Fraction of samples at a zero crossing
    pub zero_crossing_rate: f64,
    /// Average RMS energy
    pub avg_energy: f64,
    /// Audio duration in seconds
    pub duration: f64,
}

/// Structured local analysis of one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub metadata: VideoMetadata,
    /// Sampled frame metrics, ordered by frame index
    pub frames: Vec<FrameSample>,
    /// Detected scene cuts, ordered by frame index
    pub scenes: Vec<SceneCut>,
    /// Audio profile; absent when audio extraction was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioProfile>,
}

impl FeatureSummary {
    /// Mean brightness over all sampled frames, if any were sampled.
    pub fn avg_brightness(&self) -> Option<f64> {
        if self.frames.is_empty() {
            return None;
        }
        let sum: f64 = self.frames.iter().map(|f| f.brightness).sum();
        Some(sum / self.frames.len() as f64)
    }
}
