//! Local feature extraction for media assets.
//!
//! Turns raw media into a structured [`cine_models::FeatureSummary`]:
//! container metadata via ffprobe, a single streaming pass over decoded
//! grayscale frames for brightness / motion-blur / scene-cut metrics, and
//! best-effort audio analysis (tempo, spectral centroid, zero-crossing
//! rate, RMS energy). No external provider is involved.

pub mod audio;
pub mod error;
pub mod extractor;
pub mod frames;
pub mod probe;

pub use audio::{AudioError, AudioResult};
pub use error::{FeatureError, FeatureResult};
pub use extractor::{ExtractionOptions, FeatureExtractor, DEFAULT_FRAME_INTERVAL, DEFAULT_MAX_WORKERS};
pub use frames::{SceneCutDetector, SCENE_CUT_THRESHOLD};
pub use probe::probe_video;
