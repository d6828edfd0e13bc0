//! Configuration types for the code generation service.
//!
//! Configuration is assembled once at startup, validated, and then shared
//! read-only: each provider receives its own [`ProviderConfig`] at
//! construction time instead of looking credentials up globally.
//!
//! # Environment
//!
//! [`ServiceConfig::from_env`] reads a `.env` file (if present) and then:
//!
//! | Variable                 | Meaning                                   |
//! |--------------------------|-------------------------------------------|
//! | `HOST`, `PORT`           | Bind address (default `0.0.0.0:5000`)     |
//! | `DEFAULT_PROVIDER`       | Provider used when a request names none   |
//! | `PROVIDER_TIMEOUT_SECS`  | Timeout for every provider call           |
//! | `<P>_API_KEY`            | Credential for provider `<P>`             |
//! | `<P>_MODEL`              | Model override for provider `<P>`         |
//! | `<P>_BASE_URL`           | Endpoint override for provider `<P>`      |
//!
//! `<P>` is one of `OPENAI`, `GEMINI`, `GROQ`, `OPENROUTER`. The OpenRouter
//! key also falls back to `DEEPSEEK_API_KEY`. Blank values count as unset.

use std::collections::HashMap;

use crate::ai::ProviderKind;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default timeout for provider requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default temperature for model responses (low for deterministic outputs).
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default max tokens for responses.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Connection settings for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// API key. `None` means the provider answers with a configuration
    /// diagnostic and never touches the network.
    pub api_key: Option<String>,
    /// The model to use (e.g., "gpt-3.5-turbo", "gemini-2.5-flash-lite").
    pub model: String,
    /// Endpoint URL. For Gemini this is the models prefix the model name is
    /// appended to.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Temperature for response generation (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
}

impl ProviderConfig {
    /// Create a new configuration builder seeded with `kind`'s defaults.
    pub fn builder(kind: ProviderKind) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(kind)
    }

    /// Default settings for `kind`, without an API key.
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let (model, base_url) = match kind {
            ProviderKind::OpenAi => ("gpt-3.5-turbo", "https://api.openai.com/v1/chat/completions"),
            ProviderKind::Gemini => (
                "gemini-2.5-flash-lite",
                "https://generativelanguage.googleapis.com/v1beta/models/",
            ),
            ProviderKind::Groq => (
                "openai/gpt-oss-20b",
                "https://api.groq.com/openai/v1/chat/completions",
            ),
            ProviderKind::OpenRouter => (
                "deepseek/deepseek-r1:free",
                "https://openrouter.ai/api/v1/chat/completions",
            ),
        };

        Self {
            api_key: None,
            model: model.to_string(),
            base_url: base_url.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self, kind: ProviderKind) -> Result<(), ConfigValidationError> {
        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(kind));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigValidationError::InvalidTemperature {
                provider: kind,
                value: self.temperature,
            });
        }

        if self.max_tokens == 0 {
            return Err(ConfigValidationError::InvalidMaxTokens(kind));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField {
                provider: kind,
                field: "model",
            });
        }

        if self.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField {
                provider: kind,
                field: "base_url",
            });
        }

        Ok(())
    }
}

/// Builder for [`ProviderConfig`].
#[derive(Debug)]
pub struct ProviderConfigBuilder {
    kind: ProviderKind,
    config: ProviderConfig,
}

impl ProviderConfigBuilder {
    fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            config: ProviderConfig::defaults_for(kind),
        }
    }

    /// Set the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set the model to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set a custom base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the temperature (0.0 - 2.0).
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the maximum tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ProviderConfig, ConfigValidationError> {
        self.config.validate(self.kind)?;
        Ok(self.config)
    }
}

/// Configuration for the whole service.
///
/// Use [`ServiceConfig::builder()`] or [`ServiceConfig::from_env()`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Host to bind the HTTP server to.
    pub host: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Provider used when a request does not name one.
    pub default_provider: ProviderKind,
    providers: HashMap<ProviderKind, ProviderConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_provider: ProviderKind::OpenAi,
            providers: ProviderKind::ALL
                .into_iter()
                .map(|kind| (kind, ProviderConfig::defaults_for(kind)))
                .collect(),
        }
    }
}

impl ServiceConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Load configuration from the process environment and a `.env` file.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// This is the core of [`from_env`](Self::from_env); tests pass a map
    /// lookup instead of touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = ServiceConfig::builder();

        if let Some(host) = var("HOST") {
            builder = builder.host(host);
        }

        if let Some(port) = var("PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigValidationError::InvalidNumber {
                    variable: "PORT".to_string(),
                    value: port.clone(),
                })?;
            builder = builder.port(port);
        }

        if let Some(name) = var("DEFAULT_PROVIDER") {
            let kind = name
                .parse::<ProviderKind>()
                .map_err(|_| ConfigValidationError::UnknownProvider(name.clone()))?;
            builder = builder.default_provider(kind);
        }

        let timeout_secs = match var("PROVIDER_TIMEOUT_SECS") {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                ConfigValidationError::InvalidNumber {
                    variable: "PROVIDER_TIMEOUT_SECS".to_string(),
                    value: value.clone(),
                }
            })?),
            None => None,
        };

        for kind in ProviderKind::ALL {
            let prefix = kind.env_prefix();
            let mut provider = ProviderConfig::defaults_for(kind);

            provider.api_key = var(&format!("{prefix}_API_KEY"));
            if provider.api_key.is_none() && kind == ProviderKind::OpenRouter {
                provider.api_key = var("DEEPSEEK_API_KEY");
            }
            if let Some(model) = var(&format!("{prefix}_MODEL")) {
                provider.model = model;
            }
            if let Some(base_url) = var(&format!("{prefix}_BASE_URL")) {
                provider.base_url = base_url;
            }
            if let Some(timeout_secs) = timeout_secs {
                provider.timeout_secs = timeout_secs;
            }

            builder = builder.provider(kind, provider);
        }

        builder.build()
    }

    /// Settings for one provider.
    pub fn provider(&self, kind: ProviderKind) -> ProviderConfig {
        self.providers
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ProviderConfig::defaults_for(kind))
    }

    /// Providers that have an API key configured.
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| {
                self.providers
                    .get(kind)
                    .is_some_and(|config| config.api_key().is_some())
            })
            .collect()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.host.trim().is_empty() {
            return Err(ConfigValidationError::EmptyHost);
        }

        for (kind, provider) in &self.providers {
            provider.validate(*kind)?;
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid timeout for {0}: must be at least 1 second")]
    InvalidTimeout(ProviderKind),

    #[error("Invalid temperature for {provider}: {value} (must be between 0.0 and 2.0)")]
    InvalidTemperature { provider: ProviderKind, value: f32 },

    #[error("Invalid max tokens for {0}: must be at least 1")]
    InvalidMaxTokens(ProviderKind),

    #[error("Empty {field} for {provider}")]
    EmptyField {
        provider: ProviderKind,
        field: &'static str,
    },

    #[error("Host must not be empty")]
    EmptyHost,

    #[error("Invalid number in {variable}: '{value}'")]
    InvalidNumber { variable: String, value: String },

    #[error("Unknown default provider: '{0}'")]
    UnknownProvider(String),
}

/// Builder for [`ServiceConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    default_provider: Option<ProviderKind>,
    providers: HashMap<ProviderKind, ProviderConfig>,
}

impl ServiceConfigBuilder {
    /// Set the bind host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the bind port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the provider used when a request does not name one.
    pub fn default_provider(mut self, kind: ProviderKind) -> Self {
        self.default_provider = Some(kind);
        self
    }

    /// Replace the settings of one provider.
    pub fn provider(mut self, kind: ProviderKind, config: ProviderConfig) -> Self {
        self.providers.insert(kind, config);
        self
    }

    /// Build the configuration.
    ///
    /// Providers without explicit settings get their defaults (and no key).
    pub fn build(mut self) -> Result<ServiceConfig, ConfigValidationError> {
        for kind in ProviderKind::ALL {
            self.providers
                .entry(kind)
                .or_insert_with(|| ProviderConfig::defaults_for(kind));
        }

        let config = ServiceConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            default_provider: self.default_provider.unwrap_or(ProviderKind::OpenAi),
            providers: self.providers,
        };

        config.validate()?;
        Ok(config)
    }
}
