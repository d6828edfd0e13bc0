//! OpenAI provider implementation.
//!
//! This module provides the [`OpenAiProvider`] which implements the
//! [`CodeProvider`] trait for OpenAI's chat completions API
//! (<https://platform.openai.com/docs/api-reference/chat>).

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};

use super::chat::{ChatRequest, extract_completion};
use super::{CodeProvider, ProviderKind, transport};

const PROVIDER_NAME: &str = "OpenAI";

/// OpenAI chat completions provider.
///
/// # Example
///
/// ```rust,ignore
/// use lex_command::ai::{CodeProvider, OpenAiProvider};
///
/// let provider = OpenAiProvider::new("sk-...")?;
/// let raw = provider.generate("Name | Age", "sort by Age").await?;
/// ```
pub struct OpenAiProvider {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let mut config = ProviderConfig::defaults_for(ProviderKind::OpenAi);
        config.api_key = Some(api_key.into());
        Self::with_config(config)
    }

    /// Create a new OpenAI provider with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: ProviderConfig) -> Result<Self> {
        let client = transport::build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl CodeProvider for OpenAiProvider {
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
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .json(&ChatRequest::new(&self.config, context, instruction));

        let body = transport::send(PROVIDER_NAME, self.config.timeout_secs, request).await?;
        extract_completion(PROVIDER_NAME, &body)
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}
