//! Inference routing between the cloud multimodal provider and the
//! offline local model.
//!
//! The router owns the provider cascade: cloud preferred when configured,
//! local as the forced or fallback path, and a uniform degraded-parse
//! policy for provider text that lacks the expected JSON structure.

pub mod error;
pub mod gemini;
pub mod local;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod router;

pub use error::{RouterError, RouterResult};
pub use gemini::{GeminiClient, DEFAULT_GEMINI_MODEL, DEFAULT_IMAGE_MODEL};
pub use local::{LlamaServerClient, DEFAULT_LOCAL_MODEL};
pub use parse::{parse_analysis, ParsedAnalysis};
pub use provider::{CloudProvider, Completion, FileState, GeneratedImage, LocalModel, MediaHandle};
pub use router::{
    InferenceRouter, RoutedAnalysis, RoutedChat, RoutedImage, RouterConfig,
    DEFAULT_POLL_DEADLINE, DEFAULT_POLL_INTERVAL,
};
