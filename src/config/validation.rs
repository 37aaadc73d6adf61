//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_executor_config(config, result);
    result = validate_interpreter_config(config, result);

    result
}

fn validate_executor_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let executor = &config.executor;

    if !executor.default_timeout_secs.is_finite() || executor.default_timeout_secs <= 0.0 {
        result = result.with_error(
            ValidationIssue::new(
                "executor.default_timeout_secs",
                format!("Timeout must be a positive number of seconds, got {}", executor.default_timeout_secs),
            )
            .with_suggestion("Use the default of 30 seconds"),
        );
    }

    if executor.max_output_bytes == 0 {
        result = result.with_error(
            ValidationIssue::new("executor.max_output_bytes", "Output limit of 0 bytes discards all output")
                .with_suggestion("Set a limit of at least a few kilobytes"),
        );
    }

    let timeout = executor.default_timeout_secs;
    for (path, cap) in [
        ("executor.memory_delay_cap", executor.memory_delay_cap),
        ("executor.loop_delay_cap", executor.loop_delay_cap),
    ] {
        if timeout.is_finite() && cap.as_secs_f64() > timeout {
            result = result.with_warning(ValidationIssue::new(
                path,
                format!(
                    "Delay cap of {:?} exceeds the default timeout; the timeout will bound it",
                    cap
                ),
            ));
        }
    }

    result
}

fn validate_interpreter_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.interpreter.max_call_depth == 0 {
        result = result.with_error(
            ValidationIssue::new(
                "interpreter.max_call_depth",
                "Call depth of 0 makes every user function call fail",
            )
            .with_suggestion("Use the default of 64"),
        );
    }

    if config.interpreter.max_nesting == 0 {
        result = result.with_error(
            ValidationIssue::new(
                "interpreter.max_nesting",
                "Nesting limit of 0 rejects every expression",
            )
            .with_suggestion("Use the default of 200"),
        );
    }

    result
}
