use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use cerise_config::InvocationMode;
use thiserror::Error;

/// One invocation of an external action.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
  pub execution_id: String,
  pub step: String,
  pub target: String,
  pub payload: serde_json::Value,
  pub env: HashMap<String, String>,
  pub mode: InvocationMode,
  pub memory_mb: u32,
  /// Hard limit for a single attempt.
  pub timeout: Duration,
}

/// Errors that can occur while invoking an action.
#[derive(Debug, Error)]
pub enum InvokeError {
  #[error("failed to start target '{target}': {source}")]
  Spawn {
    target: String,
    #[source]
    source: std::io::Error,
  },

  #[error("i/o with target failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("action exited with {status}: {stderr}")]
  Exited { status: String, stderr: String },

  #[error("invalid action output: {message}")]
  InvalidOutput { message: String },

  #[error("invocation timed out after {0:?}")]
  TimedOut(Duration),

  #[error("action failed: {message}")]
  Action { message: String },
}

/// Runs the external action behind a step.
#[async_trait]
pub trait Invoker: Send + Sync {
  /// Run the action and return its output payload.
  async fn invoke(&self, request: InvocationRequest) -> Result<serde_json::Value, InvokeError>;
}
