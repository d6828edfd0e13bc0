//! LLM backends that turn an instruction into a dataframe snippet.
//!
//! This module provides a trait-based abstraction over code-generating
//! providers, so the generation pipeline can dispatch to any backend the
//! client names.
//!
//! # Architecture
//!
//! The module is built around the [`CodeProvider`] trait. Concrete
//! implementations are provided for:
//!
//! - [`OpenAiProvider`] - OpenAI chat completions
//! - [`GeminiProvider`] - Google Gemini generateContent
//! - [`GroqProvider`] - Groq (OpenAI-compatible)
//! - [`OpenRouterProvider`] - OpenRouter, DeepSeek models by default
//!
//! The three chat-completion backends share one wire format in `chat`;
//! HTTP sending and status mapping live in `transport`.
//!
//! # Adding a New Provider
//!
//! 1. Add a variant to [`ProviderKind`] with its wire name and defaults
//! 2. Create a new file implementing [`CodeProvider`]
//! 3. Wire it into [`build_provider`]
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_command::ai::{build_provider, ProviderKind};
//! use lex_command::config::ServiceConfig;
//!
//! let config = ServiceConfig::from_env()?;
//! let provider = build_provider(ProviderKind::Groq, config.provider(ProviderKind::Groq))?;
//! let raw = provider.generate("Name | Age", "sort by Age").await;
//! ```

use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::error::Result;

mod provider;
pub use provider::{CodeProvider, ProviderKind};

mod chat;
mod transport;

mod gemini;
mod groq;
mod openai;
mod openrouter;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;

// Providers are shared across request tasks behind an Arc
static_assertions::assert_impl_all!(OpenAiProvider: Send, Sync);
static_assertions::assert_impl_all!(GeminiProvider: Send, Sync);
static_assertions::assert_impl_all!(GroqProvider: Send, Sync);
static_assertions::assert_impl_all!(OpenRouterProvider: Send, Sync);

/// Construct the provider for `kind` from its settings.
///
/// A provider without an API key is still constructed; it reports
/// "not configured" when asked to generate.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn build_provider(kind: ProviderKind, config: ProviderConfig) -> Result<Arc<dyn CodeProvider>> {
    let provider: Arc<dyn CodeProvider> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::with_config(config)?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::with_config(config)?),
        ProviderKind::Groq => Arc::new(GroqProvider::with_config(config)?),
        ProviderKind::OpenRouter => Arc::new(OpenRouterProvider::with_config(config)?),
    };
    Ok(provider)
}
