use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tidings_common::observability::{LogConfig, init_logging};
use tidings_config::{TidingsConfig, TidingsConfigLoader};
use tidings_entity::{EntityError, Message, Pipeline};
use tokio::io::AsyncReadExt;

/// Extract URLs, mentions and hashtags from a message and enrich the URLs.
#[derive(Parser, Debug)]
#[command(name = "tidings", author, version, about, long_about = None)]
struct Args {
    /// Path to a configuration file (YAML); merged over the default one
    #[arg(short, long, env = "TIDINGS_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the HEAD probe (and with it, Open Graph)
    #[arg(long)]
    no_probe: bool,

    /// Skip fetching Open Graph metadata
    #[arg(long)]
    no_open_graph: bool,

    /// Maximum requests in flight per stage
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Message text; read from stdin when absent
    text: Option<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    message: &'a Message,
    errors: Vec<ErrorLine<'a>>,
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    url: &'a str,
    error: String,
}

impl<'a> From<&'a EntityError> for ErrorLine<'a> {
    fn from(e: &'a EntityError) -> Self {
        Self {
            url: e.url(),
            error: e.to_string(),
        }
    }
}

fn load_config(args: &Args) -> Result<TidingsConfig> {
    let mut loader = TidingsConfigLoader::new().with_default_file();
    if let Some(path) = &args.config {
        loader = loader.with_file(path);
    }
    let mut cfg = loader.load().context("failed to load configuration")?;
    apply_overrides(args, &mut cfg);
    Ok(cfg)
}

fn apply_overrides(args: &Args, cfg: &mut TidingsConfig) {
    if args.no_probe {
        cfg.enrich.probe = false;
    }
    if args.no_open_graph {
        cfg.enrich.open_graph = false;
    }
    if let Some(n) = args.concurrency {
        cfg.enrich.concurrency = n;
    }
    if let Some(secs) = args.timeout_secs {
        cfg.http.timeout_secs = secs;
    }
}

async fn read_text(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("failed to read message from stdin")?;
            Ok(text)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = load_config(&args)?;

    let log_path = init_logging(LogConfig {
        app_name: "tidings",
        log_dir: cfg.log.dir.clone(),
        emit_stderr: cfg.log.stderr,
        format: cfg.log.format,
        default_filter: cfg.log.filter.clone(),
    })?;
    tracing::debug!(path = %log_path.display(), "logging.ready");

    let pipeline = Pipeline::from_config(&cfg)?;
    let mut message = Message::new(read_text(args.text).await?);
    let errors = pipeline.run(&mut message).await;

    let report = Report {
        message: &message,
        errors: errors.iter().map(ErrorLine::from).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
