//! Gemini API client.
//!
//! Implements the cloud provider contract against the Generative Language
//! REST API: resumable-style file upload, processing-state polling,
//! multimodal `generateContent`, and Imagen `predict` for image
//! generation. The base URL is injectable so tests can point the client
//! at a mock server.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RouterError, RouterResult};
use crate::provider::{CloudProvider, Completion, FileState, GeneratedImage, MediaHandle};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default text model. Flash keeps per-call cost low.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default image model. Imagen 3 instead of 4 for cost.
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-001";

/// Gemini REST client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    image_model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    file: FileInfo,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    name: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    state: String,
    uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImagenRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ImagenParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
struct ImagenPrediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
    #[serde(rename = "mimeType", default = "default_image_mime")]
    mime_type: String,
}

fn default_image_mime() -> String {
    "image/png".to_string()
}

impl GeminiClient {
    /// Create a client from `GEMINI_API_KEY`. Returns `None` when the key
    /// is not set, leaving the router cloud-less.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        Some(Self::new(api_key))
    }

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL. Used by tests to target a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn read_error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("{}: {}", status, body)
    }
}

#[async_trait]
impl CloudProvider for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn image_model(&self) -> &str {
        &self.image_model
    }

    async fn upload(&self, path: &Path) -> RouterResult<MediaHandle> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("read media for upload: {}", e)))?;

        debug!(size = bytes.len(), "Uploading media to Gemini Files API");

        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.base_url, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", "video/mp4")
            .body(bytes)
            .send()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("file upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RouterError::cloud_call_failed(format!(
                "file upload returned {}",
                Self::read_error_body(response).await
            )));
        }

        let file: FileResponse = response
            .json()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("bad upload response: {}", e)))?;

        debug!(name = %file.file.name, state = %file.file.state, "Media uploaded");
        // The handle stores the resource name; the stable URI is looked
        // up at generate time, once the file is ACTIVE.
        Ok(MediaHandle(file.file.name))
    }

    async fn status(&self, handle: &MediaHandle) -> RouterResult<FileState> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, handle.0, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("status poll failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RouterError::cloud_call_failed(format!(
                "status poll returned {}",
                Self::read_error_body(response).await
            )));
        }

        let status: FileStatusResponse = response
            .json()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("bad status response: {}", e)))?;

        match status.state.as_str() {
            "PROCESSING" => Ok(FileState::Processing),
            "ACTIVE" => Ok(FileState::Ready),
            "FAILED" => Ok(FileState::Failed),
            other => {
                warn!(state = %other, "Unexpected file state from Gemini");
                Ok(FileState::Processing)
            }
        }
    }

    async fn generate(&self, media: Option<&MediaHandle>, prompt: &str) -> RouterResult<Completion> {
        let mut parts = Vec::new();
        if let Some(handle) = media {
            let file_uri = self.resolve_uri(handle).await?;
            parts.push(Part::FileData {
                file_data: FileData { file_uri },
            });
        }
        parts.push(Part::Text {
            text: prompt.to_string(),
        });

        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("generateContent failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RouterError::cloud_call_failed(format!(
                "generateContent returned {}",
                Self::read_error_body(response).await
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("bad generate response: {}", e)))?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| RouterError::cloud_call_failed("no content in response"))?;

        let tokens = body
            .usage_metadata
            .map(|u| u.total_token_count)
            .unwrap_or(0);

        Ok(Completion { text, tokens })
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
    ) -> RouterResult<GeneratedImage> {
        let request = ImagenRequest {
            instances: vec![ImagenInstance {
                prompt: prompt.to_string(),
            }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio: aspect_ratio.to_string(),
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:predict?key={}",
            self.base_url, self.image_model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("image predict failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RouterError::cloud_call_failed(format!(
                "image predict returned {}",
                Self::read_error_body(response).await
            )));
        }

        let body: ImagenResponse = response
            .json()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("bad predict response: {}", e)))?;

        let prediction = body
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| RouterError::cloud_call_failed("no image in response"))?;

        Ok(GeneratedImage {
            base64_data: prediction.bytes_base64_encoded,
            mime_type: prediction.mime_type,
        })
    }
}

impl GeminiClient {
    /// Fetch the stable file URI for an uploaded resource.
    async fn resolve_uri(&self, handle: &MediaHandle) -> RouterResult<String> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, handle.0, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("uri lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RouterError::cloud_call_failed(format!(
                "uri lookup returned {}",
                Self::read_error_body(response).await
            )));
        }

        let status: FileStatusResponse = response
            .json()
            .await
            .map_err(|e| RouterError::cloud_call_failed(format!("bad uri response: {}", e)))?;

        status
            .uri
            .ok_or_else(|| RouterError::cloud_call_failed("uploaded file has no URI"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key".to_string()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_upload_returns_resource_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": { "name": "files/abc123", "state": "PROCESSING" }
            })))
            .mount(&server)
            .await;

        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), b"fake media").unwrap();

        let handle = client_for(&server).upload(tmp.path()).await.unwrap();
        assert_eq!(handle.0, "files/abc123");
    }

    #[tokio::test]
    async fn test_status_maps_provider_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": "ACTIVE",
                "uri": "https://files.example/abc123"
            })))
            .mount(&server)
            .await;

        let handle = MediaHandle("files/abc123".to_string());
        let state = client_for(&server).status(&handle).await.unwrap();
        assert_eq!(state, FileState::Ready);
    }

    #[tokio::test]
    async fn test_generate_extracts_text_and_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "critique text" }] }
                }],
                "usageMetadata": { "totalTokenCount": 987 }
            })))
            .mount(&server)
            .await;

        let completion = client_for(&server).generate(None, "prompt").await.unwrap();
        assert_eq!(completion.text, "critique text");
        assert_eq!(completion.tokens, 987);
    }

    #[tokio::test]
    async fn test_generate_http_error_is_cloud_call_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate(None, "prompt")
            .await
            .unwrap_err();
        assert!(err.is_cloud_call_failure());
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_generate_image_decodes_prediction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/imagen-3.0-generate-001:predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{ "bytesBase64Encoded": "aGVsbG8=" }]
            })))
            .mount(&server)
            .await;

        let image = client_for(&server)
            .generate_image("a poster", "16:9")
            .await
            .unwrap();
        assert_eq!(image.base64_data, "aGVsbG8=");
        assert_eq!(image.mime_type, "image/png");
    }
}
