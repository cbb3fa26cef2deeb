//! Analysis result data models.
//!
//! An [`AnalysisResult`] is the final critique payload produced by exactly
//! one provider call: a structured summary plus an ordered timeline of
//! flagged moments. Results are cached keyed by fingerprint.

use serde::{Deserialize, Serialize};

/// Structured critique summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueSummary {
    pub storytelling: String,
    pub editing: String,
    pub cinematography: String,
    #[serde(rename = "musicIntegration")]
    pub music_integration: String,
    pub verdict: String,
}

/// One flagged moment on the critique timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineMoment {
    /// Timestamp as "MM:SS"
    pub timestamp: String,
    /// Timestamp in seconds
    pub seconds: f64,
    pub title: String,
    pub issue: String,
    pub reason: String,
    pub fix: String,
    /// Severity on a 0-10 scale
    #[serde(default)]
    pub severity: u8,
}

/// Final critique payload for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: CritiqueSummary,
    /// Flagged moments ordered by timestamp
    #[serde(default)]
    pub timeline: Vec<TimelineMoment>,
}

impl AnalysisResult {
    /// Minimal result substituted when a provider response lacked the
    /// expected structured payload. Carries the first 200 characters of
    /// the raw text so the caller still sees something useful.
    pub fn degraded(raw_text: &str) -> Self {
        let excerpt: String = raw_text.chars().take(200).collect();
        Self {
            summary: CritiqueSummary {
                storytelling: excerpt,
                editing: "See full analysis".to_string(),
                cinematography: "See full analysis".to_string(),
                music_integration: "See full analysis".to_string(),
                verdict: "Analysis completed".to_string(),
            },
            timeline: Vec::new(),
        }
    }
}
