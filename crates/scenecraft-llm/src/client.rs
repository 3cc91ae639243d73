//! Transport to the generative model provider. Treated as an opaque
//! request/response endpoint: the orchestration layer wraps calls in a
//! `CircuitBreaker`/`RetryPolicy`, this client only knows how to shape a
//! request and parse a response.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};
use crate::model_family::ModelFamily;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: std::time::Duration,
}

impl LlmConfig {
    pub fn from_env() -> LlmResult<Self> {
        let api_key = std::env::var("LLM_API_KEY").map_err(|_| LlmError::RequestFailed("LLM_API_KEY not set".into()))?;
        let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());
        let request_timeout = std::env::var("LLM_REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(std::time::Duration::from_secs)
            .unwrap_or(std::time::Duration::from_secs(120));
        Ok(Self { api_key, base_url, request_timeout })
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    candidates: Vec<Candidate>,
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

/// Thin client over a single generative-model provider. One instance is
/// shared across all model families; callers pick the model name from
/// [`ModelFamily::fallback_chain`].
pub struct LlmClient {
    config: LlmConfig,
    http: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build().map_err(|e| LlmError::RequestFailed(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Issues one generation call against `model`, requesting JSON output.
    /// Callers needing fallback across a model family's chain retry this
    /// call with successive model names themselves (or rely on
    /// `RetryPolicy` at the stage layer).
    pub async fn generate_json(&self, model: &str, prompt: &str) -> LlmResult<String> {
        let url = format!("{}/models/{}:generateContent?key={}", self.config.base_url, model, self.config.api_key);

        let request = GenerationRequest {
            contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
            generation_config: GenerationConfig { response_mime_type: "application/json".to_string() },
        };

        debug!(model, "issuing generation request");
        let response = self.http.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::RequestFailed(e.to_string())
            }
        })?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response.headers().get("retry-after").and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(model, %status, "generation request failed");
            return Err(LlmError::RequestFailed(format!("provider returned {status}: {body}")));
        }

        let parsed: GenerationResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| LlmError::InvalidResponse("no content in provider response".to_string()))?;

        Ok(strip_markdown_fence(text))
    }

    /// Calls each model in `family`'s fallback chain in order, returning
    /// on the first success.
    pub async fn generate_with_fallback(&self, family: ModelFamily, prompt: &str) -> LlmResult<String> {
        let mut last_error = None;
        for model in family.fallback_chain() {
            match self.generate_json(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(model, error = %e, "model in fallback chain failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| LlmError::RequestFailed("empty fallback chain".to_string())))
    }
}

fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let wrapped = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_markdown_fence(wrapped), "{\"a\":1}");
    }

    #[test]
    fn leaves_unfenced_text_untouched() {
        assert_eq!(strip_markdown_fence("{\"a\":1}"), "{\"a\":1}");
    }
}
