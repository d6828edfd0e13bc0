//! Natural-language to dataframe code service.
//!
//! A client sends a short description of a table plus an instruction such as
//! "remove null values". The service asks one of several interchangeable LLM
//! providers for a single pandas statement, strips Markdown decoration from
//! the reply, and runs it through a static safety gate before handing it
//! back. Generated code is never executed here.
//!
//! # Overview
//!
//! - **Providers** ([`ai`]): OpenAI, Gemini, Groq and OpenRouter behind the
//!   [`ai::CodeProvider`] trait, dispatched through the closed
//!   [`ai::ProviderKind`] enum
//! - **Normalizer** ([`normalize`]): removes code fences, idempotent
//! - **Safety gate** ([`safety`]): block list, then allow list, with the two
//!   sentinel replies always accepted
//! - **Pipeline** ([`generator`]): ties the above together and yields a
//!   structured [`GenerationOutcome`]
//! - **HTTP** ([`server`]): `POST /ai-command` and `GET /health` on axum
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_command::{CodeGenerator, GenerationRequest, ServiceConfig};
//!
//! let config = ServiceConfig::from_env()?;
//! let generator = CodeGenerator::from_config(&config)?;
//!
//! let outcome = generator
//!     .generate(&GenerationRequest::new("Name | Age\nAnn | 31", "sort by Age", "openai"))
//!     .await;
//!
//! println!("{}", outcome.to_code());
//! ```
//!
//! # Configuration
//!
//! [`ServiceConfig::from_env`] reads `HOST`, `PORT`, `DEFAULT_PROVIDER`,
//! `PROVIDER_TIMEOUT_SECS` and per-provider `<P>_API_KEY`, `<P>_MODEL`,
//! `<P>_BASE_URL` (from the environment or a `.env` file).

pub mod ai;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod normalize;
pub mod prompt;
pub mod safety;
pub mod server;

// Re-export main types at crate root
pub use config::{ConfigValidationError, ProviderConfig, ServiceConfig};
pub use context::TableContext;
pub use error::{CommandError, ProviderError, Result};
pub use generator::{CodeGenerator, GenerationOutcome, GenerationRequest};
pub use safety::Verdict;
