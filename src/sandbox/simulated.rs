//! Simulated executor
//!
//! Runs the static analysis stages and, when they all pass, the mini
//! interpreter on a dedicated worker thread raced against the request's
//! timeout. A timed-out worker is told to stop through a shared flag.

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::executor::{CodeExecutor, ExecutionRequest, ExecutionResult, Language};
use crate::analysis::{self, SourceText, Verdict};
use crate::config::{Config, ExecutorConfig};
use crate::error::{Error, Result};
use crate::interpreter;

/// The function that turns a submission into captured output. It should
/// return soon after the flag is set.
pub type Interpreter = Arc<dyn Fn(&str, &AtomicBool) -> Result<String> + Send + Sync>;

/// Stack size of the interpreter worker thread
const WORKER_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Executor that never runs real code
pub struct SimulatedExecutor {
    config: ExecutorConfig,
    interpreter: Interpreter,
}

impl SimulatedExecutor {
    /// Create an executor backed by the mini interpreter
    pub fn new(config: &Config) -> Self {
        let limits = config.interpreter.clone();
        SimulatedExecutor {
            config: config.executor.clone(),
            interpreter: Arc::new(move |code: &str, cancel: &AtomicBool| {
                interpreter::run_cancellable(code, &limits, cancel)
            }),
        }
    }

    /// Replace the interpreter stage
    pub fn with_interpreter<F>(mut self, interpreter: F) -> Self
    where
        F: Fn(&str, &AtomicBool) -> Result<String> + Send + Sync + 'static,
    {
        self.interpreter = Arc::new(interpreter);
        self
    }

    /// Executor configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    async fn run(&self, request: ExecutionRequest) -> ExecutionResult {
        let start = Instant::now();

        let language = match request.language.parse::<Language>() {
            Ok(language) if self.supports_language(language) => language,
            Ok(_) => {
                let e = Error::UnsupportedLanguage(request.language.clone());
                info!("Rejecting request: {}", e);
                return ExecutionResult::error(e.to_string(), start.elapsed());
            }
            Err(e) => {
                info!("Rejecting request: {}", e);
                return ExecutionResult::error(e.to_string(), start.elapsed());
            }
        };
        debug!(%language, timeout_secs = request.timeout_seconds, "Analyzing submission");

        let timeout = request.timeout();
        let source = SourceText::new(&request.code);

        match analysis::classify(&source) {
            Verdict::Syntax(diagnostic) => {
                info!(line = diagnostic.line, "Syntax error: {}", diagnostic.message);
                ExecutionResult::syntax(diagnostic)
            }
            Verdict::Memory(finding) => {
                let delay = self.config.memory_delay_cap.min(timeout);
                info!(line = ?finding.line, "Memory overuse detected");
                tokio::time::sleep(delay).await;
                ExecutionResult::memory(finding.message, delay)
            }
            Verdict::InfiniteLoop(finding) => {
                let delay = self.config.loop_delay_cap.min(timeout);
                info!(line = ?finding.line, "Infinite loop detected");
                tokio::time::sleep(delay).await;
                ExecutionResult::timeout(finding.message, delay)
            }
            Verdict::Clear => self.interpret(request.code, request.timeout_seconds, timeout, start).await,
        }
    }

    async fn interpret(&self, code: String, timeout_secs: f64, timeout: Duration, start: Instant) -> ExecutionResult {
        let interpreter = self.interpreter.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = cancel.clone();
        let (tx, rx) = oneshot::channel();

        let spawned = std::thread::Builder::new()
            .name("interpreter".to_string())
            .stack_size(WORKER_STACK_BYTES)
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| (*interpreter)(code.as_str(), &*worker_cancel)));
                // The receiver is gone once the race is lost.
                let _ = tx.send(outcome.map_err(panic_message));
            });
        if let Err(e) = spawned {
            let e = Error::Internal(format!("Failed to start interpreter thread: {}", e));
            warn!("{}", e);
            return ExecutionResult::error(e.to_string(), start.elapsed());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(Ok(output)))) => {
                let elapsed = start.elapsed();
                debug!(elapsed_ms = elapsed.as_millis() as u64, "Interpreter finished");
                ExecutionResult::success(truncate_output(output, self.config.max_output_bytes), elapsed)
            }
            Ok(Ok(Ok(Err(e)))) => {
                info!("Interpreter error: {}", e);
                ExecutionResult::error(e.to_string(), start.elapsed())
            }
            Ok(Ok(Err(message))) => {
                let e = Error::Internal(format!("Interpreter panicked: {}", message));
                warn!("{}", e);
                ExecutionResult::error(e.to_string(), start.elapsed())
            }
            Ok(Err(e)) => {
                let e = Error::Internal(format!("Interpreter worker vanished: {}", e));
                warn!("{}", e);
                ExecutionResult::error(e.to_string(), start.elapsed())
            }
            Err(_) => {
                // Whatever the worker still produces is dropped.
                cancel.store(true, Ordering::Relaxed);
                warn!("Execution timed out after {:?}", timeout);
                ExecutionResult::timeout(
                    format!(
                        "TimeoutError: execution exceeded the time limit of {} seconds",
                        timeout_secs
                    ),
                    timeout,
                )
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Cut `output` to at most `limit` bytes on a char boundary, marking the cut.
fn truncate_output(mut output: String, limit: usize) -> String {
    if output.len() <= limit {
        return output;
    }
    let total = output.len();
    let mut cut = limit;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    output.truncate(cut);
    output.push_str(&format!("\n... output truncated ({} of {} bytes shown)", cut, total));
    output
}

#[async_trait]
impl CodeExecutor for SimulatedExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn supports_language(&self, language: Language) -> bool {
        matches!(language, Language::Python)
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        let span = info_span!(
            "execute",
            id = %Uuid::new_v4(),
            executor = self.name(),
            language = %request.language
        );
        Ok(self.run(request).instrument(span).await)
    }
}
