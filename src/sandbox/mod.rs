//! Sandbox module - Simulated code execution
//!
//! Nothing submitted here is run for real. The simulated executor
//! classifies a submission with the static analysis stages and only then
//! hands it to the mini interpreter under a timeout.

mod executor;
mod simulated;

pub use executor::{CodeExecutor, ExecutionRequest, ExecutionResult, Language};
pub use simulated::{Interpreter, SimulatedExecutor};

use crate::config::Config;

/// Create an executor based on the configuration
pub fn create_executor(config: &Config) -> Box<dyn CodeExecutor> {
    Box::new(SimulatedExecutor::new(config))
}
