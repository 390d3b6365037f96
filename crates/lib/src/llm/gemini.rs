//! Gemini API client (https://generativelanguage.googleapis.com/v1beta by default).
//! Non-streaming `generateContent` and model listing.

use super::{Generator, LlmError, ModelInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-001";
const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_MODEL_PAGES: usize = 50;

/// Client for the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        base_url: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingApiKey)
    }

    /// Model path segment: accepts both `gemini-x` and `models/gemini-x`.
    fn model_path(&self) -> String {
        let m = self.model.trim_start_matches("models/");
        format!("models/{}", m)
    }

    /// POST /models/{model}:generateContent — one prompt, text of the first candidate.
    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        let key = self.key()?;
        let url = format!("{}/{}:generateContent", self.base_url, self.model_path());
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: GenerateResponse = res.json().await?;
        data.text().ok_or(LlmError::Empty)
    }

    /// GET /models — follows pagination, keeps models that support generateContent.
    /// Stops on a repeated page token or after MAX_MODEL_PAGES pages.
    async fn fetch_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let key = self.key()?;
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        for _ in 0..MAX_MODEL_PAGES {
            let mut req = self.client.get(&url).header(API_KEY_HEADER, key);
            if let Some(ref t) = page_token {
                req = req.query(&[("pageToken", t.as_str())]);
            }
            let res = req.send().await?;
            if !res.status().is_success() {
                let status = res.status();
                let body = res.text().await.unwrap_or_default();
                return Err(LlmError::Api(format!("{} {}", status, body)));
            }
            let data: ModelsResponse = res.json().await?;
            models.extend(
                data.models
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
                    .map(|m| ModelInfo { name: m.name }),
            );
            match data.next_page_token.filter(|t| !t.is_empty()) {
                Some(t) if seen_tokens.insert(t.clone()) => page_token = Some(t),
                Some(t) => {
                    log::warn!("gemini: model listing repeated page token {}, stopping", t);
                    break;
                }
                None => break,
            }
        }
        Ok(models)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn backend(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate_content(prompt).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        self.fetch_models().await
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate; None when there is no text at all.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsResponse {
    #[serde(default)]
    models: Option<Vec<GeminiModel>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
