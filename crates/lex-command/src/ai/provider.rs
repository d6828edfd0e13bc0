//! Provider trait and the closed set of supported backends.
//!
//! Every backend implements [`CodeProvider`]. Dispatch happens through
//! [`ProviderKind`], parsed from the wire name sent by the client, so an
//! unsupported name is rejected before any provider is touched.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CommandError, ProviderError};

/// Trait for LLM backends that turn an instruction into a code snippet.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one instance can serve
/// concurrent requests behind an `Arc`.
///
/// # Error Handling
///
/// Implementations never panic on remote failures. A missing credential is
/// reported as [`ProviderError::NotConfigured`] without any network call;
/// transport failures, non-success statuses and unexpected envelopes map to
/// the other [`ProviderError`] variants.
#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Ask the backend for a snippet.
    ///
    /// Returns the raw completion text, trimmed but otherwise untouched
    /// (it may still be wrapped in a code fence).
    async fn generate(&self, context: &str, instruction: &str) -> Result<String, ProviderError>;

    /// Get the provider name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the provider doesn't expose model information.
    fn model(&self) -> Option<&str> {
        None
    }
}

/// The supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Google Gemini generateContent
    Gemini,
    /// Groq's OpenAI-compatible chat completions
    Groq,
    /// OpenRouter chat completions (DeepSeek models by default)
    OpenRouter,
}

impl ProviderKind {
    /// All variants, in registration order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::Groq,
        ProviderKind::OpenRouter,
    ];

    /// Name used on the wire (`api_provider` field).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Groq => "Groq",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    /// Prefix of the environment variables configuring this provider.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Gemini => "GEMINI",
            ProviderKind::Groq => "GROQ",
            ProviderKind::OpenRouter => "OPENROUTER",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "groq" => Ok(ProviderKind::Groq),
            "openrouter" | "deepseek" => Ok(ProviderKind::OpenRouter),
            _ => Err(CommandError::UnsupportedProvider(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!(
            "openrouter".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trimmed() {
        assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("GEMINI".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
    }

    #[test]
    fn test_deepseek_alias() {
        assert_eq!(
            "deepseek".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn test_unknown_provider_keeps_raw_name() {
        let err = "unknown_llm".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, CommandError::UnsupportedProvider(ref name) if name == "unknown_llm"));
        assert_eq!(err.to_string(), "Unsupported API provider: unknown_llm");
    }

    #[test]
    fn test_wire_name_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
        let kind: ProviderKind = serde_json::from_str("\"groq\"").unwrap();
        assert_eq!(kind, ProviderKind::Groq);
    }
}
