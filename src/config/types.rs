//! Configuration types
//!
//! Limits for the simulated executor and interpreter. Every field has a
//! default so a partial config file is always valid input.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Timeout race and artificial delays
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Interpreter limits
    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout used when a request does not carry one
    #[serde(default = "default_timeout")]
    pub default_timeout_secs: f64,
    /// Longest pause before reporting a memory overuse finding
    #[serde(default = "default_memory_delay", with = "humantime_serde")]
    pub memory_delay_cap: Duration,
    /// Longest pause before reporting an infinite loop finding
    #[serde(default = "default_loop_delay", with = "humantime_serde")]
    pub loop_delay_cap: Duration,
    /// Maximum captured output size in bytes
    #[serde(default = "default_max_output")]
    pub max_output_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            default_timeout_secs: default_timeout(),
            memory_delay_cap: default_memory_delay(),
            loop_delay_cap: default_loop_delay(),
            max_output_bytes: default_max_output(),
        }
    }
}

fn default_timeout() -> f64 {
    30.0
}

fn default_memory_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_loop_delay() -> Duration {
    Duration::from_millis(3000)
}

fn default_max_output() -> usize {
    1024 * 1024 // 1MB
}

/// Interpreter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Deepest chain of nested user function calls
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Deepest nesting of sub-expressions (parentheses, lists, calls)
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_call_depth: default_max_call_depth(),
            max_nesting: default_max_nesting(),
        }
    }
}

fn default_max_call_depth() -> usize {
    64
}

fn default_max_nesting() -> usize {
    200
}
