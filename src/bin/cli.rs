//! Fallback Runner CLI
//!
//! Command-line front end for running and checking submissions.

use clap::{Parser, Subcommand};
use console::style;
use fallback_runner::config::{config_path, load_config, validate_config, Config};
use fallback_runner::sandbox::{create_executor, ExecutionRequest, ExecutionResult};
use fallback_runner::{analyze, Error, Result, VERSION};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fallback-runner",
    version = VERSION,
    about = "Fallback Runner - analyze and simulate short Python submissions",
    long_about = None
)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a submission through the full pipeline
    Run {
        /// Code to execute (reads --file or stdin when omitted)
        code: Option<String>,
        /// Read the code from a file
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// Declared language
        #[arg(short, long, default_value = "python")]
        language: String,
        /// Timeout in seconds (defaults to the configured timeout)
        #[arg(short, long, env = "FALLBACK_RUNNER_TIMEOUT")]
        timeout: Option<f64>,
        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the static analysis stages only and print the report
    Check {
        /// Code to check (reads --file or stdin when omitted)
        code: Option<String>,
        /// Read the code from a file
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Validate instead of printing
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Commands::Run {
            code,
            file,
            language,
            timeout,
            json,
        } => {
            let code = read_code(code, file)?;
            run_code(code, language, timeout, json).await
        }
        Commands::Check { code, file } => {
            let code = read_code(code, file)?;
            println!("{}", serde_json::to_string_pretty(&analyze(&code))?);
            Ok(())
        }
        Commands::Config { validate } => show_config(validate),
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fallback_runner=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Code from the argument, the file, or stdin, in that order
fn read_code(code: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(code) = code {
        return Ok(code);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .map_err(|e| Error::InvalidInput(format!("Failed to read {}: {}", path.display(), e)));
    }
    let mut code = String::new();
    std::io::stdin().read_to_string(&mut code)?;
    Ok(code)
}

async fn run_code(code: String, language: String, timeout: Option<f64>, json: bool) -> Result<()> {
    let config = load_config()?;
    let executor = create_executor(&config);

    let timeout = timeout.unwrap_or(config.executor.default_timeout_secs);
    let request = ExecutionRequest::new(code, language).with_timeout_secs(timeout);
    let result = executor.execute(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    if let Some(diagnostic) = &result.syntax_error_info {
        println!("{}", style(format!("✗ {}", diagnostic.kind)).red().bold());
        println!("{}", diagnostic.render());
    } else if let Some(message) = &result.memory_error_message {
        println!("{} {}", style("✗ Memory").red().bold(), message);
    } else if let Some(message) = &result.timeout_message {
        println!("{} {}", style("✗ Timeout").yellow().bold(), message);
    } else if let Some(error) = &result.error {
        println!("{} {}", style("✗ Error").red().bold(), error);
    } else if !result.output.is_empty() {
        println!("{}", result.output);
    }

    println!("{}", style(format!("Time: {} ms", result.execution_time_ms)).dim());
}

fn show_config(validate: bool) -> Result<()> {
    let config: Config = load_config()?;

    if !validate {
        println!("{}", style(format!("# {}", config_path().display())).dim());
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    let result = validate_config(&config);
    for issue in &result.errors {
        println!("{} {}", style("✗").red(), issue);
    }
    for issue in &result.warnings {
        println!("{} {}", style("⚠").yellow(), issue);
    }
    if result.valid {
        println!("{} Configuration is valid", style("✓").green());
        Ok(())
    } else {
        Err(Error::Config(format!("{} validation error(s)", result.errors.len())))
    }
}
