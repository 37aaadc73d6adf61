//! # Fallback Runner
//!
//! A sandbox-free analyzer and simulator for short Python submissions, used
//! when no real interpreter is available.
//!
//! ## Pipeline
//!
//! - **Syntax:** an ordered rule catalog, then whole-file bracket balance
//! - **Memory:** oversized literal allocations
//! - **Loops:** always-true loops with no `break`
//! - **Interpreter:** a tiny Python subset run under a timeout
//!
//! The first stage that reports a problem decides the result.

pub mod analysis;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod sandbox;

pub use analysis::{analyze, AnalysisReport, Diagnostic};
pub use config::Config;
pub use error::{Error, Result};
pub use sandbox::{CodeExecutor, ExecutionRequest, ExecutionResult, SimulatedExecutor};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
