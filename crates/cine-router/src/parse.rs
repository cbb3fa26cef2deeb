//! Provider response parsing.
//!
//! Model output is supposed to be a single JSON object but often arrives
//! wrapped in markdown code fences or surrounded by prose. Parsing first
//! strips fences, then extracts the outermost brace span, then attempts
//! strict deserialization. Anything that still fails degrades to a
//! minimal result carrying an excerpt of the raw text, with a marker so
//! callers can tell degraded output from a real critique.

use cine_models::AnalysisResult;
use tracing::warn;

/// A parsed analysis plus whether strict parsing had to be abandoned.
#[derive(Debug, Clone)]
pub struct ParsedAnalysis {
    pub result: AnalysisResult,
    /// True when the provider text lacked the expected structure and the
    /// result is a degraded placeholder.
    pub degraded: bool,
}

/// Parse provider text into an [`AnalysisResult`], degrading on failure.
pub fn parse_analysis(text: &str) -> ParsedAnalysis {
    if let Some(json_span) = extract_json(text) {
        match serde_json::from_str::<AnalysisResult>(json_span) {
            Ok(result) => {
                return ParsedAnalysis {
                    result,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "Provider JSON did not match the expected schema");
            }
        }
    } else {
        warn!("No JSON object found in provider response");
    }

    ParsedAnalysis {
        result: AnalysisResult::degraded(text),
        degraded: true,
    }
}

/// Strip markdown code fences around a payload, if present.
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Extract the outermost `{ ... }` span from free-form text.
fn extract_json(text: &str) -> Option<&str> {
    let text = strip_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}
