//! Google Gemini provider implementation

use super::types::{LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Sampling temperature attached to every request
pub const TEMPERATURE: f64 = 0.7;

/// Keys shorter than this are treated as malformed
const MIN_API_KEY_LEN: usize = 10;

/// Check the credential before any request is built.
pub fn validate_api_key(api_key: &str) -> Result<(), LlmError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(LlmError::configuration("The API key is missing."));
    }
    if key.len() < MIN_API_KEY_LEN {
        return Err(LlmError::configuration("The API key is incomplete."));
    }
    Ok(())
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    model_id: String,
    endpoint: String,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: &str) -> Self {
        let model_id = model.into();
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model_id
        );

        // No client-level timeout: a call runs until the server answers or the
        // connection fails.
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_id,
            endpoint,
        }
    }

    pub(crate) fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: Some(msg.text.clone()),
                }],
            })
            .collect();

        let system_instruction = request.system.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(text.clone()),
            }],
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
            },
        }
    }

    /// Serialized request body. Deterministic for equal requests.
    pub(crate) fn request_body(request: &LlmRequest) -> Result<Vec<u8>, LlmError> {
        serde_json::to_vec(&Self::translate_request(request))
            .map_err(|e| LlmError::transport(format!("Failed to encode request: {e}")))
    }

    pub(crate) fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                LlmError::empty_generation("The AI could not generate a text response.")
            })?;

        let usage = resp
            .usage_metadata
            .map(|meta| Usage {
                input_tokens: meta.prompt_token_count,
                output_tokens: meta.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(LlmResponse { text, usage })
    }

    fn parse_error_message(body: &str) -> Option<String> {
        serde_json::from_str::<GeminiErrorResponse>(body)
            .ok()
            .and_then(|resp| resp.error)
            .and_then(|err| err.message)
            .filter(|message| !message.is_empty())
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        validate_api_key(&self.api_key)?;

        let body = Self::request_body(request)?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.trim())])
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::transport(format!("Connection failed: {e}"))
                } else {
                    LlmError::transport(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = %status, "Gemini returned an error status");
            return Err(LlmError::service(Self::parse_error_message(&body)));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::transport(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    pub(crate) contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<GeminiContent>,
    pub(crate) generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
}

/// Non-text parts deserialize with `text: None`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiGenerationConfig {
    pub(crate) temperature: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: Option<String>,
}
