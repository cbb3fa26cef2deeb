//! Offline local model client.
//!
//! Talks to a llama.cpp-compatible server over its OpenAI-style
//! `/v1/chat/completions` endpoint using a blocking HTTP client. Callers
//! are expected to run [`LocalModel::complete`] on the blocking pool;
//! the router does this via `spawn_blocking`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RouterError, RouterResult};
use crate::provider::{Completion, LocalModel};

/// Default model label reported for cost accounting.
pub const DEFAULT_LOCAL_MODEL: &str = "llama-2-7b";

/// Blocking client for a local llama.cpp server.
pub struct LlamaServerClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

impl LlamaServerClient {
    /// Create a client from `LOCAL_LLM_URL`. Returns `None` when the
    /// variable is not set or the server does not answer a health probe,
    /// leaving the router without a local fallback.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("LOCAL_LLM_URL").ok()?;
        if base_url.is_empty() {
            return None;
        }
        let client = Self::new(base_url);
        if client.ping() {
            Some(client)
        } else {
            None
        }
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            model: DEFAULT_LOCAL_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Probe the server health endpoint. Blocking.
    pub fn ping(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

impl LocalModel for LlamaServerClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete(
        &self,
        system_message: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> RouterResult<Completion> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_message,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens,
            temperature,
        };

        debug!(max_tokens, temperature, "Calling local model");

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| RouterError::local_call_failed(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(RouterError::local_call_failed(format!(
                "server returned {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| RouterError::local_call_failed(format!("bad response: {}", e)))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RouterError::local_call_failed("no choices in response"))?;

        let tokens = body.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(Completion { text, tokens })
    }
}
