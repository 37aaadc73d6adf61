//! Configuration module
//!
//! - types.rs: Configuration types (Config, ExecutorConfig, InterpreterConfig)
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{Config, ExecutorConfig, InterpreterConfig};

pub use io::{apply_env_overrides, apply_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
