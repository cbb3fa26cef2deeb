//! Provider contracts.
//!
//! The concrete backends are opaque to the routing logic: the cloud side
//! exposes upload / status / generate, the local side a synchronous
//! completion call. The router only ever sees these traits.

use std::path::Path;

use async_trait::async_trait;

use crate::error::RouterResult;

/// Opaque reference to media uploaded to the cloud provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle(pub String);

/// Provider-side processing state of uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Processing,
    Ready,
    Failed,
}

/// A text completion with its metered token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens: u64,
}

/// A generated image (base64-encoded payload as returned by the provider).
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub base64_data: String,
    pub mime_type: String,
}

/// Cloud multimodal provider contract.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Model identifier used for cost accounting.
    fn model(&self) -> &str;

    /// Image model identifier used for cost accounting.
    fn image_model(&self) -> &str {
        self.model()
    }

    /// Upload raw media for later multimodal generation.
    async fn upload(&self, path: &Path) -> RouterResult<MediaHandle>;

    /// Poll the processing state of uploaded media.
    async fn status(&self, handle: &MediaHandle) -> RouterResult<FileState>;

    /// Generate text, optionally grounded on uploaded media.
    async fn generate(&self, media: Option<&MediaHandle>, prompt: &str) -> RouterResult<Completion>;

    /// Generate an image. No local fallback exists for this operation.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
    ) -> RouterResult<GeneratedImage>;
}

/// Offline local model contract.
///
/// Completion is a blocking native computation; the router runs it on the
/// blocking pool, never on the cooperative scheduler. The local model has
/// no multimodal capability and never receives raw media.
pub trait LocalModel: Send + Sync {
    /// Model identifier used for cost accounting.
    fn model(&self) -> &str;

    /// Synchronous chat-style completion.
    fn complete(
        &self,
        system_message: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> RouterResult<Completion>;
}
