//! Configuration loader for the ocean ingester
//!
//! Loads and validates the YAML configuration file describing the storage
//! root and the ingest pipelines.
//!
//! Supports environment variable substitution using ${VAR} syntax.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::IngesterConfig;

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and parse the ingester config with environment variable substitution
pub fn load_ingester_config<P: AsRef<Path>>(path: P) -> Result<IngesterConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read ingester config from {:?}", path.as_ref()))?;

    parse_ingester_config(&content)
        .with_context(|| format!("Invalid ingester config {:?}", path.as_ref()))
}

/// Parse and validate config text
pub fn parse_ingester_config(content: &str) -> Result<IngesterConfig> {
    let expanded = expand_env_vars(content)?;

    let config: IngesterConfig =
        serde_yaml::from_str(&expanded).with_context(|| "Failed to parse ingester config YAML")?;

    config.validate()?;

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
        while depth > 0 {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    var_expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth > 0 {
                        var_expr.push('}');
                    }
                }
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }

        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((var_name, default)) => match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr.trim())),
    }
}

// ============================================================================
// Tests
// ============================================================================
