//! CLI entry point for the code generation service.

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use lex_command::server::{self, AiCommandResponse};
use lex_command::{CodeGenerator, GenerationRequest, ServiceConfig, TableContext, safety};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Natural-language to dataframe code service",
    long_about = "Turns an instruction plus a table preview into one safe pandas statement.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENAI_API_KEY        API key for OpenAI\n  \
                  GEMINI_API_KEY        API key for Gemini\n  \
                  GROQ_API_KEY          API key for Groq\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (DEEPSEEK_API_KEY also accepted)\n  \
                  DEFAULT_PROVIDER      Provider used when a request names none (default: openai)\n\n\
                  EXAMPLES:\n  \
                  # Run the HTTP service\n  \
                  lex-command serve --port 5000\n\n  \
                  # Generate once against a CSV preview\n  \
                  lex-command generate --csv data.csv -i \"remove null values\" --provider groq\n\n  \
                  # Check a snippet\n  \
                  echo \"df = df.dropna()\" | lex-command check"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one instruction through the pipeline and print the result
    Generate {
        /// What to do with the table
        #[arg(short, long)]
        instruction: String,

        /// Provider name (openai, gemini, groq, openrouter)
        #[arg(short, long)]
        provider: Option<String>,

        /// Table preview text sent as context
        #[arg(short, long, conflicts_with = "csv")]
        context: Option<String>,

        /// CSV file whose first rows are sent as context
        #[arg(long)]
        csv: Option<String>,

        /// Print the HTTP response body as JSON instead of the bare code
        ///
        /// Disables all logs so stdout only contains the JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a snippet with the safety gate
    ///
    /// Exits with status 0 when the snippet is safe and 1 otherwise.
    Check {
        /// Snippet to classify; read from stdin when omitted
        #[arg(short, long)]
        code: Option<String>,

        /// Print the verdict as JSON, including the matching block rule
        #[arg(long)]
        json: bool,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let json_output = matches!(
        args.command,
        Command::Generate { json: true, .. } | Command::Check { json: true, .. }
    );
    init_logging(&args.log_level, args.quiet, json_output);

    match args.command {
        Command::Serve { host, port } => {
            let mut config = ServiceConfig::from_env()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;

            info!("Starting service on {}:{}", config.host, config.port);
            server::serve(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate {
            instruction,
            provider,
            context,
            csv,
            json,
        } => {
            let config = ServiceConfig::from_env()?;
            let generator = CodeGenerator::from_config(&config)?;

            let context = match (context, csv) {
                (Some(text), _) => text,
                (None, Some(path)) => TableContext::from_csv_path(&path)
                    .with_context(|| format!("Failed to load context from {}", path))?
                    .render(),
                (None, None) => String::new(),
            };
            debug!("Context:\n{}", context);

            let api_used = provider.unwrap_or_else(|| config.default_provider.as_str().to_string());
            let request = GenerationRequest::new(context, instruction, api_used.clone());
            let outcome = generator.generate(&request).await;

            if json {
                let response = AiCommandResponse::from_outcome(&outcome, api_used);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", outcome.to_code());
            }

            Ok(if outcome.is_code() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Check { code, json } => {
            let code = match code {
                Some(code) => code,
                None => read_stdin()?,
            };

            let verdict = safety::validate(&code);
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                println!("{}", verdict);
            }

            Ok(if verdict.is_safe() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow!("Failed to read snippet from stdin: {}", e))?;
    Ok(buffer)
}
