//! Google Gemini provider implementation.
//!
//! This module provides the [`GeminiProvider`] which implements the
//! [`CodeProvider`] trait for Google's Gemini API (<https://ai.google.dev/>).
//!
//! Unlike the chat-completion backends, Gemini receives the system prompt and
//! the user turn as a single text part, and the API key travels in the `key`
//! query parameter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::prompt::combined_prompt;

use super::{CodeProvider, ProviderKind, transport};

const PROVIDER_NAME: &str = "Gemini";

// Gemini API request structures
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

// Gemini API response structures
#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

/// Google Gemini provider.
///
/// # Example
///
/// ```rust,ignore
/// use lex_command::ai::{CodeProvider, GeminiProvider};
/// use lex_command::config::ProviderConfig;
/// use lex_command::ai::ProviderKind;
///
/// // Simple usage with defaults
/// let provider = GeminiProvider::new("your-api-key")?;
///
/// // With custom configuration
/// let config = ProviderConfig::builder(ProviderKind::Gemini)
///     .api_key("your-api-key")
///     .model("gemini-2.0-flash")
///     .build()?;
/// let provider = GeminiProvider::with_config(config)?;
/// ```
pub struct GeminiProvider {
    config: ProviderConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let mut config = ProviderConfig::defaults_for(ProviderKind::Gemini);
        config.api_key = Some(api_key.into());
        Self::with_config(config)
    }

    /// Create a new Gemini provider with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: ProviderConfig) -> Result<Self> {
        let client = transport::build_client(&config)?;
        Ok(Self { config, client })
    }

    fn build_request(&self, context: &str, instruction: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: combined_prompt(context, instruction),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        }
    }

    // {base_url}{model}:generateContent, key passed separately as a query parameter
    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{}/{}:generateContent", base, self.config.model)
    }
}

/// Pull the first candidate's first text part out of a response body.
fn extract_text(body: &str) -> std::result::Result<String, ProviderError> {
    let result: GeminiResponse = transport::parse_envelope(PROVIDER_NAME, body)?;

    let candidate = result
        .candidates
        .as_ref()
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider: PROVIDER_NAME,
            detail: "no candidates in response".to_string(),
        })?;

    // Responses stopped by Gemini's own safety filters carry no usable text
    if let Some(reason) = &candidate.finish_reason
        && (reason == "SAFETY" || reason == "BLOCKED")
    {
        warn!("Gemini blocked the response (finishReason: {})", reason);
        return Err(ProviderError::MalformedResponse {
            provider: PROVIDER_NAME,
            detail: format!("response blocked ({})", reason),
        });
    }

    candidate
        .content
        .as_ref()
        .and_then(|content| content.parts.as_ref())
        .and_then(|parts| parts.first())
        .map(|part| part.text.trim().to_string())
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider: PROVIDER_NAME,
            detail: "no content parts in first candidate".to_string(),
        })
}

#[async_trait]
impl CodeProvider for GeminiProvider {
    async fn generate(
        &self,
        context: &str,
        instruction: &str,
    ) -> std::result::Result<String, ProviderError> {
        let api_key = self.config.api_key().ok_or(ProviderError::NotConfigured {
            provider: PROVIDER_NAME,
        })?;

        debug!("Calling {} model {}", PROVIDER_NAME, self.config.model);

        let request = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&self.build_request(context, instruction));

        let body = transport::send(PROVIDER_NAME, self.config.timeout_secs, request).await?;
        extract_text(&body)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // -------------------------------------------------------------------------
    // Response parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_valid_response() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "df = df.dropna()\n"}]
                },
                "finishReason": "STOP"
            }]
        }"#;

        assert_eq!(extract_text(json).unwrap(), "df = df.dropna()");
    }

    #[test]
    fn test_extract_first_part_only() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "First part"}, {"text": "Second part"}]},
                "finishReason": "STOP"
            }]
        }"#;

        assert_eq!(extract_text(json).unwrap(), "First part");
    }

    #[test]
    fn test_extract_empty_or_null_candidates() {
        for json in [r#"{"candidates": []}"#, r#"{"candidates": null}"#, r#"{}"#] {
            let err = extract_text(json).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Gemini API response format error: no candidates in response"
            );
        }
    }

    #[test]
    fn test_extract_missing_content_or_parts() {
        for json in [
            r#"{"candidates": [{"content": null, "finishReason": "STOP"}]}"#,
            r#"{"candidates": [{"content": {"parts": null}, "finishReason": "STOP"}]}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
        ] {
            assert!(matches!(
                extract_text(json),
                Err(ProviderError::MalformedResponse { .. })
            ));
        }
    }

    #[test]
    fn test_extract_safety_blocked() {
        let json = r#"{"candidates": [{"content": null, "finishReason": "SAFETY"}]}"#;
        let err = extract_text(json).unwrap_err();
        assert!(err.to_string().contains("response blocked (SAFETY)"));
    }

    #[test]
    fn test_extract_malformed_json() {
        let json = r#"{"candidates": "not an array"}"#;
        assert!(matches!(
            extract_text(json),
            Err(ProviderError::MalformedResponse { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Request construction tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_request_uses_combined_prompt() {
        let provider = GeminiProvider::new("test-key").unwrap();
        let request = provider.build_request("Name | Age", "sort by Age");
        let json = serde_json::to_value(&request).unwrap();

        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("You are a pandas code generator."));
        assert!(text.ends_with("Context:\nName | Age\n\nInstruction: sort by Age"));
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 200);
    }

    #[test]
    fn test_endpoint_joins_model() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    // -------------------------------------------------------------------------
    // HTTP behaviour
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_generate_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"parts": [{"text": "df = df.rename(columns={'A': 'B'})"}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ProviderConfig::builder(ProviderKind::Gemini)
            .api_key("g-key")
            .model("gemini-test")
            .base_url(format!("{}/v1beta/models/", server.uri()))
            .build()
            .unwrap();
        let provider = GeminiProvider::with_config(config).unwrap();

        let text = provider.generate("A", "rename column A to B").await.unwrap();
        assert_eq!(text, "df = df.rename(columns={'A': 'B'})");
    }

    #[tokio::test]
    async fn test_error_status_includes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let config = ProviderConfig::builder(ProviderKind::Gemini)
            .api_key("g-key")
            .base_url(format!("{}/v1beta/models/", server.uri()))
            .build()
            .unwrap();
        let provider = GeminiProvider::with_config(config).unwrap();

        let err = provider.generate("A", "sort").await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini API error: 429 - quota exceeded");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider =
            GeminiProvider::with_config(ProviderConfig::defaults_for(ProviderKind::Gemini)).unwrap();
        let err = provider.generate("A", "sort").await.unwrap_err();
        assert_eq!(err, ProviderError::NotConfigured { provider: "Gemini" });
    }

    #[test]
    fn test_provider_model() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.model(), Some("gemini-2.5-flash-lite"));
    }
}
