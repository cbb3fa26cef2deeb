//! Shared data models for the CineCritique backend.
//!
//! This crate provides Serde-serializable types for:
//! - Content-derived media fingerprints (cache identity)
//! - Locally extracted feature summaries (metadata, frames, scenes, audio)
//! - Analysis results produced by the inference providers
//! - Provider and operation tags used by the cost ledger

pub mod analysis;
pub mod features;
pub mod fingerprint;
pub mod provider;

// Re-export common types
pub use analysis::{AnalysisResult, CritiqueSummary, TimelineMoment};
pub use features::{AudioFeatures, AudioProfile, FeatureSummary, FrameSample, SceneCut, VideoMetadata};
pub use fingerprint::MediaFingerprint;
pub use provider::{OperationKind, Provider};
