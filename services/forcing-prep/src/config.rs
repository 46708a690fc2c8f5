//! Run configuration for forcing-prep
//!
//! Loads and validates the YAML run configuration:
//! - Logging level and format
//! - Provider mapping document (builtin when absent)
//! - Parallel job count
//!
//! Supports environment variable substitution using ${VAR} syntax.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Run Configuration (forcing-prep.yaml)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub logging: LoggingConfig,
    /// Provider mapping document; the shipped one is used when unset
    pub providers: Option<PathBuf>,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Files processed concurrently; 1 runs sequentially and stops at the
    /// first failure
    pub jobs: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and parse a run configuration with environment variable substitution
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read run config from {:?}", path.as_ref()))?;

    parse_run_config(&content)
}

fn parse_run_config(content: &str) -> Result<RunConfig> {
    let expanded = expand_env_vars(content)?;

    let config: RunConfig =
        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse run config YAML")?;

    validate_run_config(&config)?;

    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // consume '{'

        let mut var_expr = String::new();
        let mut depth = 1;
        loop {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    var_expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    var_expr.push('}');
                }
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }

        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}

// ============================================================================
// Validation
// ============================================================================

pub const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const VALID_FORMATS: [&str; 2] = ["json", "pretty"];

fn validate_run_config(config: &RunConfig) -> Result<()> {
    anyhow::ensure!(
        VALID_LEVELS.contains(&config.logging.level.as_str()),
        "Invalid log level: {}. Must be one of: {:?}",
        config.logging.level,
        VALID_LEVELS
    );

    anyhow::ensure!(
        VALID_FORMATS.contains(&config.logging.format.as_str()),
        "Invalid log format: {}. Must be one of: {:?}",
        config.logging.format,
        VALID_FORMATS
    );

    anyhow::ensure!(
        config.processing.jobs > 0,
        "processing.jobs must be at least 1"
    );

    if let Some(path) = &config.providers {
        anyhow::ensure!(
            !path.as_os_str().is_empty(),
            "providers path cannot be empty"
        );
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_simple() {
        std::env::set_var("FORCING_TEST_VAR", "test_value");
        let result = expand_env_vars("prefix_${FORCING_TEST_VAR}_suffix").unwrap();
        assert_eq!(result, "prefix_test_value_suffix");
    }

    #[test]
    fn test_expand_env_vars_with_default() {
        std::env::remove_var("FORCING_NONEXISTENT_VAR");
        let result = expand_env_vars("jobs: ${FORCING_NONEXISTENT_VAR:-4}").unwrap();
        assert_eq!(result, "jobs: 4");
    }

    #[test]
    fn test_expand_env_vars_missing_required() {
        std::env::remove_var("FORCING_REQUIRED_VAR");
        assert!(expand_env_vars("${FORCING_REQUIRED_VAR}").is_err());
    }

    #[test]
    fn test_expand_env_vars_unclosed() {
        assert!(expand_env_vars("level: ${LOG_LEVEL").is_err());
    }

    #[test]
    fn test_resolve_var_expr_override_default() {
        std::env::set_var("FORCING_SET_VAR", "debug");
        let result = resolve_var_expr("FORCING_SET_VAR:-info").unwrap();
        assert_eq!(result, "debug");
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = parse_run_config("{}").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.processing.jobs, 1);
        assert!(config.providers.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
logging:
  level: debug
  format: pretty
providers: /etc/forcing/providers.yaml
processing:
  jobs: 8
"#;
        let config = parse_run_config(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(
            config.providers,
            Some(PathBuf::from("/etc/forcing/providers.yaml"))
        );
        assert_eq!(config.processing.jobs, 8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse_run_config("logging:\n  level: loud\n").is_err());
        assert!(parse_run_config("logging:\n  format: xml\n").is_err());
        assert!(parse_run_config("processing:\n  jobs: 0\n").is_err());
    }

    #[test]
    fn test_load_shipped_example() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/forcing-prep.yaml");
        let config = load_run_config(path).unwrap();
        assert!(VALID_LEVELS.contains(&config.logging.level.as_str()));
        assert!(config.processing.jobs >= 1);
    }
}
