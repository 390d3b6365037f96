//! Reply generation: a `Generator` seam plus Gemini and Ollama clients.
//!
//! Handlers never see a generation error. `generate_or_fallback` swaps any failure for a
//! fixed in-character line so the conversation keeps going.

mod gemini;
mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use crate::config::{self, Config, LlmBackendKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Sent instead of a model reply when generation fails for any reason.
pub const FALLBACK_REPLY: &str = "Beta, the internet is loose. Can you hear me?";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("api key is not configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    #[error("llm returned no text")]
    Empty,
}

/// A model that can be listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

/// Prompt in, text out.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Models this backend can use for text generation.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;
}

/// Generate a trimmed reply, or `FALLBACK_REPLY` on any error or empty output.
pub async fn generate_or_fallback(generator: &dyn Generator, prompt: &str) -> String {
    match generator.generate(prompt).await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                log::warn!("{}: empty reply, using fallback", generator.backend());
                FALLBACK_REPLY.to_string()
            } else {
                text.to_string()
            }
        }
        Err(e) => {
            log::error!("{} error: {}", generator.backend(), e);
            FALLBACK_REPLY.to_string()
        }
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, LlmError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()?)
}

/// Build the configured backend. A missing Gemini key is not an error here; each call fails
/// with `MissingApiKey` and the caller falls back.
pub fn build_generator(config: &Config) -> Result<Arc<dyn Generator>, LlmError> {
    let llm = &config.llm;
    let model = llm
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let client = http_client(llm.timeout_secs)?;
    let generator: Arc<dyn Generator> = match llm.backend {
        LlmBackendKind::Gemini => {
            let key = config::resolve_gemini_key(config);
            if key.is_none() {
                log::error!("GEMINI_API_KEY not set; every reply will be the fallback line");
            }
            Arc::new(GeminiClient::new(llm.base_url.clone(), model, key, client))
        }
        LlmBackendKind::Ollama => Arc::new(OllamaClient::new(llm.base_url.clone(), model, client)),
    };
    Ok(generator)
}
