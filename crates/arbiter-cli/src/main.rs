//! Command-line interface for arbiter.
//!
//! ```sh
//! arbiter extract grader-output.txt
//! echo '{"score": 4, "feedback": "ok"}' | arbiter extract
//! arbiter validate request.yaml
//! arbiter evaluate requests.json --grader-response canned.txt
//! arbiter evaluate requests.json --config arbiter.yaml
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`, default `info`).

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use arbiter_core::{extract_score, passes, EvaluateRequest, HistoryQuery, RequestError};
use arbiter_runtime::providers::ProviderRegistry;
use arbiter_runtime::{
    EvaluationOrchestrator, FixedResponseGrader, Grader, HistoryService, InMemoryStore, LlmGrader,
    RuntimeConfig,
};

#[derive(Parser, Debug)]
#[command(name = "arbiter")]
#[command(about = "Score AI outputs from workflow automation platforms")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print single-line JSON
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Extract a score from grader text (file or stdin)
    Extract {
        /// File holding the grader response; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Validate an evaluation request (JSON or YAML)
    Validate {
        request: PathBuf,
    },
    /// Run requests through the pipeline on an in-memory store
    Evaluate {
        /// JSON file holding one request or an array of requests
        requests: PathBuf,

        /// Runtime configuration (YAML); defaults plus ARBITER_* overrides otherwise
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Use this file's contents as every grader response instead of calling a provider
        #[arg(long)]
        grader_response: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run_cli(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            tracing::error!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

/// Dispatch a command. `Ok(false)` means the command ran but reported failure.
async fn run_cli(cli: Cli) -> anyhow::Result<bool> {
    let (output, ok) = match cli.command {
        Commands::Extract { file } => (extract(file.as_deref())?, true),
        Commands::Validate { request } => validate(&request),
        Commands::Evaluate {
            requests,
            config,
            grader_response,
        } => evaluate(&requests, config.as_deref(), grader_response.as_deref()).await?,
    };

    let rendered = if cli.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{}", rendered);
    Ok(ok)
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn extract(file: Option<&Path>) -> anyhow::Result<Value> {
    let raw = read_input(file)?;
    // Editors and shells append a newline; it is not part of the grader text.
    let extracted = extract_score(raw.trim_end_matches(['\r', '\n']));
    Ok(json!({
        "score": extracted.score,
        "pass": passes(extracted.score),
        "feedback": extracted.feedback,
        "tier": extracted.tier,
    }))
}

fn validate(path: &Path) -> (Value, bool) {
    match EvaluateRequest::from_file(path) {
        Ok(request) => (
            json!({
                "valid": true,
                "platform": request.platform,
                "executionId": request.external_execution_id,
                "task": request.task,
            }),
            true,
        ),
        Err(e) => (json!({ "valid": false, "errors": request_errors(&e) }), false),
    }
}

fn request_errors(error: &RequestError) -> Vec<String> {
    match error {
        RequestError::SchemaViolations(violations) => violations.clone(),
        other => vec![other.to_string()],
    }
}

/// Decode one request or an array of them. Per-request failures are kept
/// so the rest of the batch still runs.
fn load_requests(path: &Path) -> anyhow::Result<Vec<Result<EvaluateRequest, RequestError>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    Ok(match value {
        Value::Array(items) => items.into_iter().map(EvaluateRequest::from_value).collect(),
        single @ Value::Object(_) => vec![EvaluateRequest::from_value(single)],
        _ => bail!("{} must hold a request object or an array of requests", path.display()),
    })
}

fn build_grader(
    config: &RuntimeConfig,
    grader_response: Option<&Path>,
) -> anyhow::Result<Arc<dyn Grader>> {
    if let Some(path) = grader_response {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(Arc::new(FixedResponseGrader::new(text.trim_end_matches(['\r', '\n']))));
    }

    let registry = ProviderRegistry::with_defaults();
    let grader = LlmGrader::from_config(&config.grader, &registry)
        .context("cannot build grader; pass --grader-response to run offline")?;
    Ok(Arc::new(grader))
}

async fn evaluate(
    requests: &Path,
    config: Option<&Path>,
    grader_response: Option<&Path>,
) -> anyhow::Result<(Value, bool)> {
    let config = match config {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RuntimeConfig::from_env().context("invalid ARBITER_* environment")?,
    };

    let store = Arc::new(InMemoryStore::new());
    let orchestrator = EvaluationOrchestrator::builder()
        .store(store.clone())
        .grader(build_grader(&config, grader_response)?)
        .config(config)
        .build()?;

    let mut results = Vec::new();
    let mut all_ok = true;

    for decoded in load_requests(requests)? {
        let request = match decoded {
            Ok(request) => request,
            Err(e) => {
                all_ok = false;
                results.push(json!({ "errors": request_errors(&e), "clientError": true }));
                continue;
            }
        };

        match orchestrator.evaluate(&request).await {
            Ok(outcome) => {
                let notification = match outcome.notification {
                    Some(handle) => Some(handle.await.context("notification task panicked")?),
                    None => None,
                };
                results.push(json!({
                    "executionId": request.external_execution_id,
                    "response": outcome.response,
                    "tier": outcome.tier,
                    "events": outcome.events,
                    "notification": notification,
                }));
            }
            Err(e) => {
                all_ok = false;
                results.push(json!({
                    "executionId": request.external_execution_id,
                    "errors": [e.to_string()],
                    "clientError": e.is_client_error(),
                }));
            }
        }
    }

    let statistics = HistoryService::new(store)
        .statistics(&HistoryQuery::new().limit(usize::MAX))
        .await?;

    Ok((json!({ "results": results, "statistics": statistics }), all_ok))
}
