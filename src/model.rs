//! External generative-text model client
//!
//! The semantic classifier talks to the model through the [`LanguageModel`]
//! trait: one prompt in, raw text out, a single request with no retry.
//! [`GeminiModel`] implements it against the Google Generative Language API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{DirectoryError, Result};

/// Default Gemini endpoint (model name and method are appended)
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default Gemini model
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-flash-latest";

/// A text-in, text-out generative model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs
    fn id(&self) -> &str;

    /// Send `prompt` and return the raw reply text
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Connection settings for the Gemini API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; the semantic classifier is unavailable without one
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model name, e.g. `gemini-flash-latest`
    pub model: String,
    /// Endpoint prefix, overridable for tests and proxies
    pub base_url: String,
    /// Request timeout (None waits for the service indefinitely)
    pub timeout: Option<Duration>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GEMINI_DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl GeminiConfig {
    /// Whether a usable API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Gemini `generateContent` client
pub struct GeminiModel {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiModel {
    /// Create a client from configuration
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return Err(DirectoryError::Config(
                    "Gemini API key is required".to_string(),
                ))
            }
        };

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DirectoryError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!("Sending generateContent request to model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                DirectoryError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error ({}): {}", status, body);
            return Err(DirectoryError::Classifier(format!(
                "Gemini API error: {}",
                status
            )));
        }

        let reply: GeminiResponse = response.json().await?;
        reply.text().ok_or_else(|| {
            DirectoryError::Classifier("No content in Gemini response".to_string())
        })
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
