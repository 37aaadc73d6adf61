//! Configuration paths

use std::path::PathBuf;

/// Get the configuration directory
pub fn config_dir() -> PathBuf {
    // Check for explicit override
    if let Ok(dir) = std::env::var("FALLBACK_RUNNER_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|d| d.join("fallback-runner"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config").join("fallback-runner"))
                .unwrap_or_else(|| PathBuf::from(".fallback-runner"))
        })
}

/// Get the main configuration file path
pub fn config_path() -> PathBuf {
    // Check for explicit override
    if let Ok(path) = std::env::var("FALLBACK_RUNNER_CONFIG") {
        return PathBuf::from(path);
    }

    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_inside_config_dir() {
        if std::env::var("FALLBACK_RUNNER_CONFIG").is_err() {
            assert!(config_path().starts_with(config_dir()));
            assert!(config_path().ends_with("config.toml"));
        }
    }
}
