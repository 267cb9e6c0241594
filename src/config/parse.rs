use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, ENV_VAR_PATTERN};
use crate::event::Subscription;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Loggly API token required")]
    MissingToken,

    #[error("Loggly subdomain required")]
    MissingSubdomain,

    #[error("\"{0}\" events are not supported by Loggly")]
    UnsupportedEvent(String),

    #[error("incompatible event source: {0}")]
    IncompatibleSource(String),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate a config from YAML text, expanding `$env{VAR}` first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    if let Some(path) = &config.input.path {
        config.input.path = Some(expand_tilde(path));
    }

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(ENV_VAR_PATTERN).unwrap();
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .map(|cap| cap[1].to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with the actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

/// Check the settings a reporter cannot run without.
///
/// Token and subdomain come first and fail with their own error so callers
/// can tell them apart. Remaining problems are collected into one list.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !is_present(&config.token) {
        return Err(ConfigError::MissingToken);
    }
    if !is_present(&config.subdomain) {
        return Err(ConfigError::MissingSubdomain);
    }

    Subscription::new(config.events.as_deref())?;

    if config.input.format == InputFormat::Text {
        return Err(ConfigError::IncompatibleSource(
            "input format 'text' yields raw lines; records must be JSON objects".to_string(),
        ));
    }

    let mut errors = Vec::new();

    if !(config.endpoint.starts_with("http://") || config.endpoint.starts_with("https://")) {
        errors.push(format!(
            "endpoint '{}' must be an http:// or https:// URL",
            config.endpoint
        ));
    }

    if config.max_in_flight == 0 {
        errors.push("max_in_flight must be at least 1".to_string());
    }

    for (i, tag) in config.tags.iter().enumerate() {
        if tag.trim().is_empty() {
            errors.push(format!("tags[{}]: tag cannot be empty", i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
