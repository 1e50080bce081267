use std::path::Path;
use tracing::{debug, info};

use super::AppConfig;
use crate::error::{ErrorCode, ErrorExt, Result, WordflowError};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(WordflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!(
                    "cannot tell the format of {}; use a .yaml, .yml or .toml file",
                    path.display()
                ),
            )),
        }
    }
}

/// Parse configuration text without applying environment overrides
pub fn parse_config_str(content: &str, format: ConfigFormat) -> Result<AppConfig> {
    match format {
        ConfigFormat::Yaml => {
            if content.trim().is_empty() {
                return Ok(AppConfig::default());
            }
            serde_yaml::from_str(content).to_config_error("Invalid YAML configuration")
        }
        ConfigFormat::Toml => toml::from_str(content).to_config_error("Invalid TOML configuration"),
    }
}

/// Load configuration from `path` (or defaults), apply the environment, resolve templates
pub async fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                let code = if e.kind() == std::io::ErrorKind::NotFound {
                    ErrorCode::CONFIG_NOT_FOUND
                } else {
                    ErrorCode::CONFIG_GENERIC
                };
                WordflowError::config_with_code(
                    code,
                    format!("Failed to read configuration file {}", path.display()),
                )
                .with_source(e)
            })?;
            let config = parse_config_str(&content, ConfigFormat::from_path(path)?)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => {
            debug!("No configuration file given, using defaults");
            AppConfig::default()
        }
    };

    config.merge_env_vars()?;
    config.resolve()
}
