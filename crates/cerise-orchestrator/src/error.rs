//! Error types for workflow execution.

use std::time::Duration;

use cerise_capability::InvokeError;
use thiserror::Error;

/// Errors that end a workflow execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// A step kept failing after exhausting its retries.
  #[error("step '{step}' failed after {attempts} attempt(s): {source}")]
  StepInvocationFailure {
    step: String,
    attempts: u32,
    #[source]
    source: InvokeError,
  },

  /// No transition matched the step's output.
  #[error("no transition of step '{step}' matches its output")]
  NoMatchingEdge { step: String },

  /// An input or output path did not resolve against the payload.
  #[error("path '{path}' not found in payload of step '{step}'")]
  PathNotFound { step: String, path: String },

  /// The workflow-level time limit elapsed while `step` was running.
  #[error("workflow timed out after {limit:?}")]
  Timeout { step: Option<String>, limit: Duration },

  /// Workflow execution was cancelled.
  #[error("workflow execution cancelled")]
  Cancelled,
}

#[derive(Debug, Error)]
pub enum RunnerError {
  #[error("workflow runner channel closed")]
  Closed,
}
