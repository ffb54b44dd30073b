//! DW-003: docweave.yaml parsing and validation.
//!
//! Validates structural constraints:
//! - content_root and file_name must not be empty
//! - language must be a plain fence tag (ASCII alphanumerics, `-`, `_`, `+`)
//! - loop_limit, when set, must be positive

use super::error::{WeaveError, WeaveResult};
use super::types::WeaveConfig;
use std::path::Path;

/// Default config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "docweave.yaml";

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a docweave.yaml file from disk.
pub fn parse_config_file(path: &Path) -> WeaveResult<WeaveConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WeaveError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Parse a docweave.yaml from a string. An empty file yields the defaults.
pub fn parse_config(yaml: &str) -> WeaveResult<WeaveConfig> {
    if yaml.trim().is_empty() {
        return Ok(WeaveConfig::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| WeaveError::Config(format!("YAML parse error: {}", e)))
}

/// Load the config for a run: an explicit path must exist, the default file is optional.
pub fn load_config(explicit: Option<&Path>) -> WeaveResult<WeaveConfig> {
    let config = match explicit {
        Some(path) => parse_config_file(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                parse_config_file(default)?
            } else {
                WeaveConfig::default()
            }
        }
    };
    Ok(config)
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &WeaveConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.content_root.as_os_str().is_empty() {
        errors.push(ValidationError {
            message: "content_root must not be empty".to_string(),
        });
    }

    if config.file_name.is_empty() {
        errors.push(ValidationError {
            message: "file_name must not be empty".to_string(),
        });
    }

    if config.language.is_empty() {
        errors.push(ValidationError {
            message: "language must not be empty".to_string(),
        });
    } else if !config
        .language
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
    {
        errors.push(ValidationError {
            message: format!("language '{}' is not a plain fence tag", config.language),
        });
    }

    if config.loop_limit == Some(0) {
        errors.push(ValidationError {
            message: "loop_limit must be positive".to_string(),
        });
    }

    errors
}

/// Validate and fold all errors into one [`WeaveError::Config`].
pub fn ensure_valid(config: &WeaveConfig) -> WeaveResult<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    Err(WeaveError::Config(joined))
}
