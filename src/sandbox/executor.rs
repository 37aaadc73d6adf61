//! Common executor trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analysis::Diagnostic;
use crate::error::Result;

/// Languages with a simulated backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
}

impl std::str::FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "python" => Ok(Language::Python),
            _ => Err(crate::Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
        }
    }
}

/// Request to execute code
///
/// The language stays a free-form string so an unknown language reaches the
/// executor and is answered with a result instead of a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The code to execute
    pub code: String,
    /// Declared language
    #[serde(default = "default_language")]
    pub language: String,
    /// Timeout budget in seconds
    #[serde(default = "default_timeout", alias = "timeoutSeconds")]
    pub timeout_seconds: f64,
}

fn default_language() -> String {
    Language::Python.to_string()
}

fn default_timeout() -> f64 {
    30.0
}

impl ExecutionRequest {
    /// Create a new execution request
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        ExecutionRequest {
            code: code.into(),
            language: language.into(),
            timeout_seconds: default_timeout(),
        }
    }

    /// Shorthand for a Python request
    pub fn python(code: impl Into<String>) -> Self {
        Self::new(code, Language::Python.to_string())
    }

    /// Set timeout in seconds
    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_timeout_secs(timeout.as_secs_f64())
    }

    /// Timeout budget as a duration; negative or non-finite budgets become zero
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Result of code execution
///
/// At most one of `syntax_error`, `memory_exceeded` and `timeout` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured standard output
    pub output: String,
    /// Unsupported language or a failure inside the interpreter
    pub error: Option<String>,
    /// Was execution terminated due to timeout?
    pub timeout: bool,
    pub timeout_message: Option<String>,
    /// Did the submission request an oversized allocation?
    pub memory_exceeded: bool,
    pub memory_error_message: Option<String>,
    /// Was the submission rejected before running?
    pub syntax_error: bool,
    pub syntax_error_info: Option<Diagnostic>,
    /// Wall-clock time in milliseconds
    pub execution_time_ms: u64,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(output: String, execution_time: Duration) -> Self {
        ExecutionResult {
            output,
            execution_time_ms: millis(execution_time),
            ..Default::default()
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>, execution_time: Duration) -> Self {
        ExecutionResult {
            error: Some(message.into()),
            execution_time_ms: millis(execution_time),
            ..Default::default()
        }
    }

    /// Create a timeout result
    pub fn timeout(message: impl Into<String>, execution_time: Duration) -> Self {
        ExecutionResult {
            timeout: true,
            timeout_message: Some(message.into()),
            execution_time_ms: millis(execution_time),
            ..Default::default()
        }
    }

    /// Create a memory overuse result
    pub fn memory(message: impl Into<String>, execution_time: Duration) -> Self {
        ExecutionResult {
            memory_exceeded: true,
            memory_error_message: Some(message.into()),
            execution_time_ms: millis(execution_time),
            ..Default::default()
        }
    }

    /// Create a syntax error result
    pub fn syntax(diagnostic: Diagnostic) -> Self {
        ExecutionResult {
            syntax_error: true,
            syntax_error_info: Some(diagnostic),
            ..Default::default()
        }
    }

    /// True when no failure flag or error is set
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.timeout && !self.memory_exceeded && !self.syntax_error
    }

    /// Number of failure flags set; never more than one
    pub fn failure_count(&self) -> usize {
        [self.syntax_error, self.memory_exceeded, self.timeout]
            .iter()
            .filter(|flag| **flag)
            .count()
    }
}

/// Trait for code execution backends
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Get the executor name
    fn name(&self) -> &str;

    /// Check if a language is supported
    fn supports_language(&self, language: Language) -> bool;

    /// Execute code. Expected failures are reported inside the result.
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult>;
}
