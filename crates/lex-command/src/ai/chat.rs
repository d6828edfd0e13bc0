//! Chat-completions wire format.
//!
//! OpenAI, Groq and OpenRouter all speak the same request/response envelope;
//! only the endpoint, credentials and a few headers differ. The providers
//! build a [`ChatRequest`] here and hand the response body to
//! [`extract_completion`].

use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::prompt::{SYSTEM_PROMPT, user_message};

use super::transport::parse_envelope;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatRequest {
    /// System prompt plus one user turn carrying context and instruction.
    pub(crate) fn new(config: &ProviderConfig, context: &str, instruction: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.as_str().to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_message(context, instruction),
                },
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Pull `choices[0].message.content` out of a response body.
pub(crate) fn extract_completion(provider: &'static str, body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse = parse_envelope(provider, body)?;

    response
        .choices
        .as_ref()
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.message.as_ref())
        .and_then(|message| message.content.as_ref())
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider,
            detail: "no choices[0].message.content in response".to_string(),
        })
}
