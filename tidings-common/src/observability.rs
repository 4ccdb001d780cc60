//! Logging for the `tidings` CLI and the crates' integration tests.
//!
//! Both callers build a [`LogConfig`] and hand it to [`init_logging`]. The
//! CLI fills it from the `log:` section of `tidings.yaml`; the tests use a
//! temp directory, a `debug` filter and stderr so `cargo test -- --nocapture`
//! shows the `http.*`, `probe.*` and `ogp.*` events inline. Events always go
//! to `<dir>/<app>.log.<YYYY-MM-DD>`, rolled daily.
//!
//! The first call installs the global subscriber. Later calls (every test in
//! a binary calls it) leave it in place and return the same path.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// How events are encoded, both in the file and on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Prefix of the log file name and of the fallback data directory.
    pub app_name: &'static str,
    /// `None` means `TIDINGS_LOG_DIR`, then the platform data dir.
    pub log_dir: Option<PathBuf>,
    /// Also print events on stderr (stdout carries the CLI's JSON).
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "tidings",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let file_prefix = format!("{}.log", config.app_name);
    let path = dir.join(dated_file_name(&file_prefix, &Local::now().date_naive()));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_prefix));
    let _ = LOG_GUARD.set(guard);

    let mut sinks = vec![file_layer(config.format, writer)];
    if config.emit_stderr {
        sinks.push(stderr_layer(config.format));
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(sinks)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn file_layer(format: LogFormat, writer: NonBlocking) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn stderr_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    }
}

// Matches the name `rolling::daily` gives the current file.
fn dated_file_name(prefix: &str, day: &chrono::NaiveDate) -> String {
    format!("{prefix}.{}", day.format("%Y-%m-%d"))
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return expand_home(dir);
    }
    if let Ok(env_dir) = std::env::var("TIDINGS_LOG_DIR") {
        return expand_home(Path::new(&env_dir));
    }
    dirs::data_local_dir()
        .map(|d| d.join(app_name))
        .unwrap_or_else(|| PathBuf::from(".").join(app_name))
}

/// `~/logs` from YAML reaches us unexpanded.
fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
