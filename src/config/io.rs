//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;
use std::time::Duration;

use humantime_serde::re::humantime;
use tracing::warn;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    // Apply environment variable overrides (highest precedence)
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        // Parse as JSON5 (more lenient than strict JSON)
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set `FALLBACK_RUNNER_*` variables.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring invalid value {:?} for {}", raw, key);
    }
    parsed
}

fn duration_or_warn(key: &str, raw: &str) -> Option<Duration> {
    match humantime::parse_duration(raw.trim()) {
        Ok(duration) => Some(duration),
        Err(e) => {
            warn!("Ignoring invalid duration {:?} for {}: {}", raw, key, e);
            None
        }
    }
}

/// Overlay values from `lookup` (normally the process environment).
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    // Executor overrides
    if let Some(v) = lookup("FALLBACK_RUNNER_TIMEOUT") {
        if let Some(secs) = parse_or_warn("FALLBACK_RUNNER_TIMEOUT", &v) {
            config.executor.default_timeout_secs = secs;
        }
    }
    if let Some(v) = lookup("FALLBACK_RUNNER_MEMORY_DELAY_CAP") {
        if let Some(cap) = duration_or_warn("FALLBACK_RUNNER_MEMORY_DELAY_CAP", &v) {
            config.executor.memory_delay_cap = cap;
        }
    }
    if let Some(v) = lookup("FALLBACK_RUNNER_LOOP_DELAY_CAP") {
        if let Some(cap) = duration_or_warn("FALLBACK_RUNNER_LOOP_DELAY_CAP", &v) {
            config.executor.loop_delay_cap = cap;
        }
    }
    if let Some(v) = lookup("FALLBACK_RUNNER_MAX_OUTPUT") {
        if let Some(bytes) = parse_or_warn("FALLBACK_RUNNER_MAX_OUTPUT", &v) {
            config.executor.max_output_bytes = bytes;
        }
    }

    // Interpreter overrides
    if let Some(v) = lookup("FALLBACK_RUNNER_MAX_CALL_DEPTH") {
        if let Some(depth) = parse_or_warn("FALLBACK_RUNNER_MAX_CALL_DEPTH", &v) {
            config.interpreter.max_call_depth = depth;
        }
    }
    if let Some(v) = lookup("FALLBACK_RUNNER_MAX_NESTING") {
        if let Some(nesting) = parse_or_warn("FALLBACK_RUNNER_MAX_NESTING", &v) {
            config.interpreter.max_nesting = nesting;
        }
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}
