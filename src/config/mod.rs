//! Service configuration
//!
//! Configuration is read once at startup from a YAML or TOML file, then
//! environment overrides (`WORDFLOW_*`) are applied and endpoint templates are
//! expanded. Business logic only ever sees the resolved [`AppConfig`].
//!
//! Endpoint templates may reference `{project}` and `{region}`:
//!
//! ```yaml
//! project: acme
//! region: europe-west1
//! storage:
//!   backend: http
//!   endpoint: https://{region}-storage.example.com/storage/v1
//! sink:
//!   backend: http
//!   endpoint: https://tables.example.com/bigquery/v2
//!   dataset: analytics
//!   table: file_stats
//! ```

pub mod loader;

pub use loader::{load_config, parse_config_str, ConfigFormat};

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::analyzer::{AnalyzerConfig, TotalWordsMode, DEFAULT_TOP_K};
use crate::error::{ErrorCode, Result, WordflowError};
use crate::retry::RetryPolicy;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1";
pub const DEFAULT_TABLE_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Get the default directory for the step journal
pub fn default_state_dir() -> PathBuf {
    ProjectDirs::from("dev", "wordflow", "wordflow")
        .map(|dirs| dirs.data_dir().join("journal"))
        .unwrap_or_else(|| PathBuf::from(".wordflow/journal"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Substituted for `{project}` in endpoint templates
    #[serde(default)]
    pub project: Option<String>,

    /// Substituted for `{region}` in endpoint templates
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sink: SinkConfig,

    /// Default retry policy for every external call
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Per-request timeout for HTTP collaborators
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Where the step journal is kept
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Workflow definition file; the built-in workflow is used when unset
    #[serde(default)]
    pub workflow: Option<PathBuf>,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project: None,
            region: None,
            server: ServerConfig::default(),
            analyzer: AnalyzerConfig::default(),
            storage: StorageConfig::default(),
            sink: SinkConfig::default(),
            retry: RetryPolicy::default(),
            request_timeout: default_request_timeout(),
            state_dir: default_state_dir(),
            workflow: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|e| {
            WordflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("invalid server.bind '{}'", self.bind),
            )
            .with_source(e)
        })
    }
}

/// Object storage backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Http {
        #[serde(default = "default_storage_endpoint")]
        endpoint: String,
    },
    Local {
        root: PathBuf,
    },
}

fn default_storage_endpoint() -> String {
    DEFAULT_STORAGE_ENDPOINT.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            root: PathBuf::from("data"),
        }
    }
}

/// Table sink backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum SinkConfig {
    Http {
        #[serde(default = "default_table_endpoint")]
        endpoint: String,
        dataset: String,
        table: String,
    },
    Jsonl {
        path: PathBuf,
    },
}

fn default_table_endpoint() -> String {
    DEFAULT_TABLE_ENDPOINT.to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Jsonl {
            path: PathBuf::from("wordflow-rows.jsonl"),
        }
    }
}

impl AppConfig {
    /// Apply `WORDFLOW_*` overrides from the process environment
    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using a custom variable lookup
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project) = lookup("WORDFLOW_PROJECT") {
            self.project = Some(project);
        }
        if let Some(region) = lookup("WORDFLOW_REGION") {
            self.region = Some(region);
        }
        if let Some(bind) = lookup("WORDFLOW_BIND") {
            self.server.bind = bind;
        }
        if let Some(dir) = lookup("WORDFLOW_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(workflow) = lookup("WORDFLOW_WORKFLOW") {
            self.workflow = Some(PathBuf::from(workflow));
        }
        if let Some(top_k) = lookup("WORDFLOW_TOP_K") {
            self.analyzer.top_k = top_k.trim().parse().map_err(|e| {
                WordflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("WORDFLOW_TOP_K must be an integer from 1 to 10, got '{top_k}'"),
                )
                .with_source(e)
            })?;
        }
        if let Some(mode) = lookup("WORDFLOW_TOTAL_WORDS") {
            self.analyzer.total_words = match mode.trim() {
                "tokens" => TotalWordsMode::Tokens,
                "whitespace" => TotalWordsMode::Whitespace,
                other => {
                    return Err(WordflowError::config_with_code(
                        ErrorCode::CONFIG_INVALID_VALUE,
                        format!(
                            "WORDFLOW_TOTAL_WORDS must be 'tokens' or 'whitespace', got '{other}'"
                        ),
                    ))
                }
            };
        }
        Ok(())
    }

    /// Expand endpoint templates and check every value
    pub fn resolve(mut self) -> Result<Self> {
        let vars = [
            ("project", self.project.clone()),
            ("region", self.region.clone()),
        ];

        if let StorageConfig::Http { endpoint } = &mut self.storage {
            *endpoint = expand_template(endpoint, &vars)?;
        }
        if let SinkConfig::Http { endpoint, .. } = &mut self.sink {
            *endpoint = expand_template(endpoint, &vars)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.analyzer.top_k == 0 || self.analyzer.top_k > DEFAULT_TOP_K {
            return Err(WordflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!(
                    "analyzer.top_k must be between 1 and {DEFAULT_TOP_K}, got {}",
                    self.analyzer.top_k
                ),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(WordflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "server.max_body_bytes must be greater than 0",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(WordflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "request_timeout must be greater than 0",
            ));
        }
        self.server.socket_addr()?;
        self.retry.validate()?;
        if let SinkConfig::Http { dataset, table, .. } = &self.sink {
            if self.project.is_none() {
                return Err(WordflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    "sink backend 'http' requires `project`",
                ));
            }
            if dataset.trim().is_empty() || table.trim().is_empty() {
                return Err(WordflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    "sink dataset and table must not be empty",
                ));
            }
        }
        Ok(())
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is a valid regex"));

/// Replace `{name}` placeholders; unknown or unset placeholders are errors
pub fn expand_template(template: &str, vars: &[(&str, Option<String>)]) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        output.push_str(literal(template, &template[last..whole.start()])?);
        last = whole.end();

        let name = name.as_str();
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, Some(value))) => output.push_str(value),
            Some((_, None)) => {
                return Err(WordflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("'{template}' uses {{{name}}} but `{name}` is not set"),
                ))
            }
            None => {
                return Err(WordflowError::config_with_code(
                    ErrorCode::CONFIG_UNKNOWN_PLACEHOLDER,
                    format!("unknown placeholder {{{name}}} in '{template}'"),
                ))
            }
        }
    }
    output.push_str(literal(template, &template[last..])?);
    Ok(output)
}

/// Text between placeholders must not contain stray braces
fn literal<'a>(template: &str, text: &'a str) -> Result<&'a str> {
    if text.contains(['{', '}']) {
        return Err(WordflowError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("malformed placeholder in '{template}'"),
        ));
    }
    Ok(text)
}
