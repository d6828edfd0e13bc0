//! The generation pipeline: provider → normalizer → safety gate.
//!
//! [`CodeGenerator`] owns one [`CodeProvider`] per [`ProviderKind`] and turns
//! a [`GenerationRequest`] into a structured [`GenerationOutcome`]. The HTTP
//! layer and the CLI both project the outcome back to the flat `code` string
//! clients expect with [`GenerationOutcome::to_code`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::ai::{CodeProvider, ProviderKind, build_provider};
use crate::config::ServiceConfig;
use crate::error::{ProviderError, Result};
use crate::normalize::normalize;
use crate::safety::{self, CLARIFICATION_SENTINEL, NOT_POSSIBLE_SENTINEL, Verdict};

/// Diagnostic returned when the instruction is blank.
pub const NO_INSTRUCTION_MARKER: &str = "# No instruction provided";

/// Header line of the diagnostic wrapping rejected code.
pub const UNSAFE_MARKER: &str = "# Code failed safety validation:";

/// Characters of the instruction shown in request logs.
const INSTRUCTION_PREVIEW_CHARS: usize = 50;

/// One request to generate code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Description of the table the code will run against.
    pub context: String,
    /// What the user wants done, in natural language.
    pub instruction: String,
    /// Wire name of the provider, as sent by the client.
    pub provider: String,
}

impl GenerationRequest {
    pub fn new(
        context: impl Into<String>,
        instruction: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            instruction: instruction.into(),
            provider: provider.into(),
        }
    }
}

/// What the pipeline produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Normalized code that passed the safety gate.
    Code(String),
    /// The model asked for a clearer instruction.
    Clarification,
    /// The model declined the operation.
    NotPossible,
    /// The instruction was blank; no provider was contacted.
    NoInstruction,
    /// The requested provider name is not supported (raw name as sent).
    UnsupportedProvider(String),
    /// The provider call failed; validation was skipped.
    ProviderFailure(ProviderError),
    /// The generated code was rejected by the safety gate.
    Unsafe { code: String, verdict: Verdict },
}

impl GenerationOutcome {
    /// Classify a normalized snippet with the safety gate.
    pub fn from_code(code: String) -> Self {
        match safety::validate(&code) {
            Verdict::Sentinel => match code.trim() {
                CLARIFICATION_SENTINEL => GenerationOutcome::Clarification,
                NOT_POSSIBLE_SENTINEL => GenerationOutcome::NotPossible,
                _ => GenerationOutcome::Code(String::new()),
            },
            Verdict::Safe => GenerationOutcome::Code(code),
            verdict => {
                warn!("Generated code rejected ({}): {}", verdict, code);
                GenerationOutcome::Unsafe { code, verdict }
            }
        }
    }

    /// Snake-case tag naming the variant, as reported in HTTP responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationOutcome::Code(_) => "code",
            GenerationOutcome::Clarification => "clarification",
            GenerationOutcome::NotPossible => "not_possible",
            GenerationOutcome::NoInstruction => "no_instruction",
            GenerationOutcome::UnsupportedProvider(_) => "unsupported_provider",
            GenerationOutcome::ProviderFailure(_) => "provider_failure",
            GenerationOutcome::Unsafe { .. } => "unsafe",
        }
    }

    /// The provider failure behind this outcome, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            GenerationOutcome::ProviderFailure(error) => Some(error),
            _ => None,
        }
    }

    /// Whether the outcome carries code the client may execute.
    pub fn is_code(&self) -> bool {
        matches!(self, GenerationOutcome::Code(_))
    }

    /// Project to the flat `code` string returned to clients.
    ///
    /// Diagnostics are Python comments so a client that executes the string
    /// blindly does nothing.
    pub fn to_code(&self) -> String {
        match self {
            GenerationOutcome::Code(code) => code.clone(),
            GenerationOutcome::Clarification => CLARIFICATION_SENTINEL.to_string(),
            GenerationOutcome::NotPossible => NOT_POSSIBLE_SENTINEL.to_string(),
            GenerationOutcome::NoInstruction => NO_INSTRUCTION_MARKER.to_string(),
            GenerationOutcome::UnsupportedProvider(name) => {
                format!("# Unsupported API provider: {}", name)
            }
            GenerationOutcome::ProviderFailure(error) => comment_lines(&error.to_string()),
            GenerationOutcome::Unsafe { code, .. } => {
                format!("{}\n{}", UNSAFE_MARKER, comment_lines(code))
            }
        }
    }
}

impl fmt::Display for GenerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_code())
    }
}

/// Prefix every line with `# `.
fn comment_lines(text: &str) -> String {
    text.lines()
        .map(|line| format!("# {}", line).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(instruction: &str) -> String {
    let mut chars = instruction.chars();
    let head: String = chars.by_ref().take(INSTRUCTION_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Dispatches requests to providers and applies normalization and the
/// safety gate.
///
/// Holds no mutable state; one instance serves concurrent requests behind an
/// `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use lex_command::config::ServiceConfig;
/// use lex_command::generator::{CodeGenerator, GenerationRequest};
///
/// let generator = CodeGenerator::from_config(&ServiceConfig::from_env()?)?;
/// let outcome = generator
///     .generate(&GenerationRequest::new("Name | Age", "sort by Age", "groq"))
///     .await;
/// println!("{}", outcome.to_code());
/// ```
pub struct CodeGenerator {
    providers: HashMap<ProviderKind, Arc<dyn CodeProvider>>,
    default_provider: ProviderKind,
}

static_assertions::assert_impl_all!(CodeGenerator: Send, Sync);

impl CodeGenerator {
    /// Create a new generator builder.
    pub fn builder() -> CodeGeneratorBuilder {
        CodeGeneratorBuilder::default()
    }

    /// Build a generator with every provider constructed from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let mut builder = Self::builder().default_provider(config.default_provider);
        for kind in ProviderKind::ALL {
            builder = builder.provider(kind, build_provider(kind, config.provider(kind))?);
        }
        Ok(builder.build())
    }

    /// Provider used when a request does not name one.
    pub fn default_provider(&self) -> ProviderKind {
        self.default_provider
    }

    /// Run one request through the pipeline.
    ///
    /// Never fails: every failure mode is a [`GenerationOutcome`] variant.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let instruction = request.instruction.trim();
        if instruction.is_empty() {
            debug!("Empty instruction, skipping provider call");
            return GenerationOutcome::NoInstruction;
        }
        let context = request.context.trim();

        let provider = match request.provider.parse::<ProviderKind>() {
            Ok(kind) => self.providers.get(&kind),
            Err(_) => None,
        };
        let Some(provider) = provider else {
            warn!("Unsupported API provider requested: {}", request.provider);
            return GenerationOutcome::UnsupportedProvider(request.provider.clone());
        };

        info!(
            "Generating code with {} for instruction: {}",
            provider.name(),
            preview(instruction)
        );
        debug!("Context: {}", context);

        let raw = match provider.generate(context, instruction).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.is_configuration() {
                    warn!("{} is not usable: {}", e.provider(), e);
                } else {
                    error!("{} call failed [{}]: {}", e.provider(), e.error_code(), e);
                }
                return GenerationOutcome::ProviderFailure(e);
            }
        };

        let code = normalize(&raw);
        debug!("Generated code: {}", code);

        GenerationOutcome::from_code(code)
    }
}

/// Builder for [`CodeGenerator`].
#[derive(Default)]
pub struct CodeGeneratorBuilder {
    providers: HashMap<ProviderKind, Arc<dyn CodeProvider>>,
    default_provider: Option<ProviderKind>,
}

impl CodeGeneratorBuilder {
    /// Register the provider serving `kind`, replacing any previous one.
    pub fn provider(mut self, kind: ProviderKind, provider: Arc<dyn CodeProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Set the provider used when a request does not name one.
    pub fn default_provider(mut self, kind: ProviderKind) -> Self {
        self.default_provider = Some(kind);
        self
    }

    /// Build the generator. Kinds without a registered provider are
    /// reported as unsupported.
    pub fn build(self) -> CodeGenerator {
        CodeGenerator {
            providers: self.providers,
            default_provider: self.default_provider.unwrap_or(ProviderKind::OpenAi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning a canned reply and counting calls.
    struct FakeProvider {
        reply: std::result::Result<String, ProviderError>,
        calls: AtomicUsize,
        seen: std::sync::Mutex<Option<(String, String)>>,
    }

    impl FakeProvider {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                seen: std::sync::Mutex::new(None),
            })
        }

        fn failing(error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                calls: AtomicUsize::new(0),
                seen: std::sync::Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CodeProvider for FakeProvider {
        async fn generate(
            &self,
            context: &str,
            instruction: &str,
        ) -> std::result::Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some((context.to_string(), instruction.to_string()));
            self.reply.clone()
        }

        fn name(&self) -> &'static str {
            "Fake"
        }
    }

    fn generator_with(provider: Arc<FakeProvider>) -> CodeGenerator {
        CodeGenerator::builder()
            .provider(ProviderKind::OpenAi, provider)
            .build()
    }

    async fn run(provider: Arc<FakeProvider>, instruction: &str, name: &str) -> GenerationOutcome {
        generator_with(provider)
            .generate(&GenerationRequest::new("A | B", instruction, name))
            .await
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_fenced_safe_code() {
        let provider = FakeProvider::replying("```python\ndf = df.dropna()\n```");
        let outcome = run(provider.clone(), "remove null values", "openai").await;

        assert_eq!(outcome, GenerationOutcome::Code("df = df.dropna()".to_string()));
        assert_eq!(outcome.to_code(), "df = df.dropna()");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_instruction_skips_provider() {
        let provider = FakeProvider::replying("df = df.dropna()");
        for instruction in ["", "   ", "\n\t"] {
            let outcome = run(provider.clone(), instruction, "openai").await;
            assert_eq!(outcome, GenerationOutcome::NoInstruction);
            assert_eq!(outcome.to_code(), "# No instruction provided");
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider_skips_provider() {
        let provider = FakeProvider::replying("df = df.dropna()");
        let outcome = run(provider.clone(), "sort", "unknown_llm").await;

        assert_eq!(
            outcome,
            GenerationOutcome::UnsupportedProvider("unknown_llm".to_string())
        );
        assert_eq!(outcome.to_code(), "# Unsupported API provider: unknown_llm");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_unsupported() {
        let provider = FakeProvider::replying("df = df.dropna()");
        let outcome = run(provider, "sort", "gemini").await;
        assert_eq!(outcome.to_code(), "# Unsupported API provider: gemini");
    }

    #[tokio::test]
    async fn test_provider_name_is_case_insensitive() {
        let provider = FakeProvider::replying("df = df.dropna()");
        let outcome = run(provider.clone(), "drop nulls", " OpenAI ").await;
        assert!(outcome.is_code());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_inputs_are_trimmed() {
        let provider = FakeProvider::replying("df = df.dropna()");
        generator_with(provider.clone())
            .generate(&GenerationRequest::new("  A | B\n", "  drop nulls \n", "openai"))
            .await;

        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen, Some(("A | B".to_string(), "drop nulls".to_string())));
    }

    #[tokio::test]
    async fn test_unsafe_code_is_wrapped() {
        let provider = FakeProvider::replying("df.to_csv('out.csv')");
        let outcome = run(provider, "save it", "openai").await;

        assert!(matches!(outcome, GenerationOutcome::Unsafe { .. }));
        assert_eq!(
            outcome.to_code(),
            "# Code failed safety validation:\n# df.to_csv('out.csv')"
        );
    }

    #[tokio::test]
    async fn test_multiline_unsafe_code_fully_commented() {
        let provider = FakeProvider::replying("import os\nos.remove('x')");
        let code = run(provider, "delete", "openai").await.to_code();

        assert_eq!(
            code,
            "# Code failed safety validation:\n# import os\n# os.remove('x')"
        );
        assert!(code.lines().all(|line| line.starts_with('#')));
    }

    #[tokio::test]
    async fn test_unrecognized_code_is_unsafe() {
        let provider = FakeProvider::replying("x = 1 + 1");
        let outcome = run(provider, "add", "openai").await;
        assert_eq!(
            outcome,
            GenerationOutcome::Unsafe {
                code: "x = 1 + 1".to_string(),
                verdict: Verdict::NoRecognizedTransform,
            }
        );
    }

    #[tokio::test]
    async fn test_sentinels() {
        let clarify = run(FakeProvider::replying("Can you elaborate?"), "do it", "openai").await;
        assert_eq!(clarify, GenerationOutcome::Clarification);
        assert_eq!(clarify.to_code(), "Can you elaborate?");

        let refuse = run(
            FakeProvider::replying("```\nThis operation is not possible\n```"),
            "delete the disk",
            "openai",
        )
        .await;
        assert_eq!(refuse, GenerationOutcome::NotPossible);
        assert_eq!(refuse.to_code(), "This operation is not possible");
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let outcome = run(FakeProvider::replying("```\n```"), "sort", "openai").await;
        assert_eq!(outcome, GenerationOutcome::Code(String::new()));
    }

    #[tokio::test]
    async fn test_provider_failure_bypasses_validation() {
        let provider = FakeProvider::failing(ProviderError::NotConfigured { provider: "OpenAI" });
        let outcome = run(provider, "sort", "openai").await;

        assert_eq!(outcome.kind(), "provider_failure");
        assert_eq!(outcome.to_code(), "# OpenAI API key not configured");
        assert_eq!(
            outcome.provider_error(),
            Some(&ProviderError::NotConfigured { provider: "OpenAI" })
        );
    }

    #[test]
    fn test_provider_error_only_on_failure() {
        assert_eq!(GenerationOutcome::NotPossible.provider_error(), None);
        assert_eq!(GenerationOutcome::Code("df = df.T".to_string()).provider_error(), None);
    }

    // -------------------------------------------------------------------------
    // Projection helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_multiline_failure_detail_commented() {
        let outcome = GenerationOutcome::ProviderFailure(ProviderError::Status {
            provider: "Groq",
            status: 500,
            body: "line one\n\nline two".to_string(),
        });
        assert_eq!(
            outcome.to_code(),
            "# Groq API error: 500 - line one\n#\n# line two"
        );
    }

    #[test]
    fn test_outcome_kinds() {
        assert_eq!(GenerationOutcome::Code(String::new()).kind(), "code");
        assert_eq!(GenerationOutcome::NotPossible.kind(), "not_possible");
        assert_eq!(GenerationOutcome::NoInstruction.kind(), "no_instruction");
        assert_eq!(
            GenerationOutcome::UnsupportedProvider("x".to_string()).kind(),
            "unsupported_provider"
        );
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "a".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn test_from_config_registers_all_providers() {
        let generator = CodeGenerator::from_config(&ServiceConfig::default()).unwrap();
        assert_eq!(generator.providers.len(), ProviderKind::ALL.len());
        assert_eq!(generator.default_provider(), ProviderKind::OpenAi);
    }
}
