//! Loader for `tidings.yaml` with environment overlays.
//!
//! Sources merge in the order they are added, later ones winning, with
//! `TIDINGS__SECTION__KEY` environment variables applied on top
//! (`TIDINGS__HTTP__TIMEOUT_SECS=3`). String values may reference other
//! environment variables as `$VAR` or `${VAR}`; those are expanded after
//! merging. Every field has a default, so an empty file is a valid config.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use tidings_common::LogFormat;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "TIDINGS";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TidingsConfig {
    pub version: Option<String>,
    pub http: HttpSettings,
    pub enrich: EnrichSettings,
    pub log: LogSettings,
}

/// Settings for the shared HTTP client used by both enrichment stages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// `None` keeps the client's built-in `tidings/<version>` agent.
    pub user_agent: Option<String>,
    pub connect_timeout_secs: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Cap on Open Graph page bodies.
    pub max_body_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            connect_timeout_secs: 5,
            timeout_secs: 10,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnrichSettings {
    /// Run the `HEAD` probe stage.
    pub probe: bool,
    /// Run the Open Graph stage on URLs probed as HTML.
    pub open_graph: bool,
    pub concurrency: usize,
    /// Budget for each stage; unlimited when absent.
    pub deadline_secs: Option<u64>,
}

impl Default for EnrichSettings {
    fn default() -> Self {
        Self {
            probe: true,
            open_graph: true,
            concurrency: 4,
            deadline_secs: None,
        }
    }
}

impl EnrichSettings {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
    pub dir: Option<PathBuf>,
    pub stderr: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
            dir: None,
            stderr: false,
        }
    }
}

/// `$XDG_CONFIG_HOME/tidings/tidings.yaml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tidings").join("tidings.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate: files and YAML snippets, then env.
pub struct TidingsConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TidingsConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TidingsConfigLoader {
    /// An empty loader; on its own it yields [`TidingsConfig::default`]
    /// plus any `TIDINGS__*` overrides.
    ///
    /// ```
    /// use tidings_config::TidingsConfigLoader;
    ///
    /// let config = TidingsConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nenrich:\n  concurrency: 8")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.enrich.concurrency, 8);
    /// assert!(config.enrich.probe);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format follows the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Attach [`default_config_path`] if the platform has a config dir.
    pub fn with_default_file(self) -> Self {
        match default_config_path() {
            Some(path) => self.with_optional_file(path),
            None => self,
        }
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge everything, apply env overrides, expand `${VAR}` references and
    /// deserialize.
    ///
    /// ```
    /// use tidings_config::TidingsConfigLoader;
    ///
    /// unsafe { std::env::set_var("TIDINGS_DOC_AGENT", "doc-bot/1.0"); }
    ///
    /// let config = TidingsConfigLoader::new()
    ///     .with_yaml_str("http:\n  user_agent: \"${TIDINGS_DOC_AGENT}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.http.user_agent.as_deref(), Some("doc-bot/1.0"));
    /// assert_eq!(config.http.timeout_secs, 10);
    ///
    /// unsafe { std::env::remove_var("TIDINGS_DOC_AGENT"); }
    /// ```
    pub fn load(self) -> Result<TidingsConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("TIDINGS_T_FOO", Some("bar"), || {
            let mut v = json!("prefix-${TIDINGS_T_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_nested_values() {
        temp_env::with_vars(
            [("TIDINGS_T_HOST", Some("example.com")), ("TIDINGS_T_INNER", Some("${TIDINGS_T_HOST}"))],
            || {
                let mut v = json!(["agent-$TIDINGS_T_HOST", { "ua": "x/${TIDINGS_T_INNER}" }, 3, null]);
                expand_env_in_value(&mut v);
                assert_eq!(v, json!(["agent-example.com", { "ua": "x/example.com" }, 3, null]));
            },
        );
    }

    #[test]
    fn cycles_terminate() {
        temp_env::with_vars([("TIDINGS_T_A", Some("${TIDINGS_T_B}")), ("TIDINGS_T_B", Some("${TIDINGS_T_A}"))], || {
            let mut v = json!("x=${TIDINGS_T_A}");
            expand_env_in_value(&mut v);
            assert!(v.as_str().unwrap().contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${TIDINGS_T_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${TIDINGS_T_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_when_empty() {
        let cfg: TidingsConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cfg, TidingsConfig::default());
        assert_eq!(cfg.http.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.enrich.deadline(), None);
        assert_eq!(cfg.log.format, LogFormat::Text);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: TidingsConfig = serde_json::from_value(json!({
            "enrich": { "open_graph": false, "deadline_secs": 30 },
            "log": { "format": "json" }
        }))
        .unwrap();
        assert!(cfg.enrich.probe);
        assert!(!cfg.enrich.open_graph);
        assert_eq!(cfg.enrich.concurrency, 4);
        assert_eq!(cfg.enrich.deadline(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.log.filter, "info");
    }
}
