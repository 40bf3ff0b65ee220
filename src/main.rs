//! CLI entry point for the sops secrets provider.
//!
//! With no subcommand (as when started as a Lambda bootstrap) it serves
//! custom-resource invocations from the Lambda Runtime API. `handle` runs one
//! event from a file or stdin, and `resolve` previews mappings against an
//! already-decrypted document.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sops_secrets_provider::config::{HandlerConfig, default_sops_binary};
use sops_secrets_provider::event::CustomResourceEvent;
use sops_secrets_provider::handler::Provider;
use sops_secrets_provider::infra::{S3ObjectStore, SecretsManagerStore, SopsDecryptor};
use sops_secrets_provider::mapping::{parse_mappings, resolve_mappings};
use sops_secrets_provider::runtime::{self, RuntimeClient};
use std::ffi::OsStr;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type AwsProvider = Provider<S3ObjectStore, SopsDecryptor, SecretsManagerStore>;

#[derive(Parser)]
#[command(name = "sops_secrets_provider")]
#[command(about = "Syncs sops-encrypted files from S3 into Secrets Manager")]
#[command(long_about = None)]
struct Cli {
    /// Path to the sops executable (defaults to `sops` next to this binary, then PATH)
    #[arg(long, env = "SOPS_BINARY", global = true)]
    sops_binary: Option<PathBuf>,

    /// Fail Create/Update when the sync fails instead of reporting success
    #[arg(long, env = "FAIL_ON_SYNC_ERROR", global = true)]
    fail_on_sync_error: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve invocations from the Lambda Runtime API (default)
    Serve,
    /// Handle a single custom-resource event and print the response
    Handle {
        /// Event JSON file; reads stdin when omitted
        #[arg(short, long, value_name = "FILE")]
        event: Option<PathBuf>,
    },
    /// Resolve mappings against a decrypted JSON document and print the result
    Resolve {
        /// Decrypted document (JSON)
        #[arg(short, long, value_name = "FILE")]
        document: PathBuf,

        /// Mapping set (JSON object of `{ "path": [...], "encoding": ... }`)
        #[arg(short, long, value_name = "FILE")]
        mappings: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();

    let cli = Cli::parse();
    let config = HandlerConfig {
        sops_binary: cli.sops_binary.unwrap_or_else(default_sops_binary),
        fail_on_sync_error: cli.fail_on_sync_error,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await?,
        Commands::Handle { event } => {
            let raw = read_input(event.as_deref())?;
            let event: CustomResourceEvent =
                serde_json::from_str(&raw).context("event is not valid JSON")?;

            let provider = build_provider(config).await;
            let response = provider.on_event(&event).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Resolve { document, mappings } => {
            let raw_document = read_input(Some(document.as_path()))?;
            let document: serde_json::Value = serde_json::from_str(&raw_document)
                .context("document is not valid JSON")?;
            let raw_mappings = read_input(Some(mappings.as_path()))?;
            let mappings = parse_mappings(&raw_mappings)
                .context("mappings are not a JSON object")?;

            let resolved = resolve_mappings(&document, &mappings);
            info!(
                fields = resolved.len(),
                unresolved = resolved.values().filter(|v| v.is_none()).count(),
                "Mappings resolved"
            );
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}

/// Logging setup: stderr (text, or JSON with `LOG_FORMAT=json`) plus an
/// optional JSON rolling log file when `LOG_FILE_PATH` is set.
fn init_tracing() -> Option<WorkerGuard> {
    let stderr_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let stderr_layer = if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .with_filter(stderr_filter)
            .boxed()
    };

    let (json_layer, file_guard) = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let log_dir = Path::new(&log_file_path)
                .parent()
                .unwrap_or(Path::new("logs"));
            let log_file_name = Path::new(&log_file_path)
                .file_name()
                .unwrap_or(OsStr::new("sops_secrets_provider.log"));

            let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking_file)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::DEBUG.into())
                        .with_env_var("RUST_LOG_JSON")
                        .from_env_lossy(),
                );
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

async fn build_provider(config: HandlerConfig) -> AwsProvider {
    let aws = aws_config::load_from_env().await;
    Provider::new(
        S3ObjectStore::new(&aws),
        SopsDecryptor::new(config.sops_binary.clone()),
        SecretsManagerStore::new(&aws),
        config,
    )
}

/// Runs the Lambda Runtime API loop, reporting setup problems as init errors.
#[tracing::instrument(skip_all, fields(sops_binary = %config.sops_binary.display()))]
async fn serve(config: HandlerConfig) -> Result<()> {
    let client = RuntimeClient::from_env()?;

    if let Err(e) = config.check_sops_binary() {
        client
            .post_init_error("Runtime.InitError", &format!("{e:#}"))
            .await?;
        return Err(e);
    }

    let provider = build_provider(config).await;
    runtime::run(&client, &provider).await
}

/// Reads a file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
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
