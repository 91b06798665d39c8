//! Workflow execution results.

use std::time::Duration;

use cerise_workflow::InvocationMode;
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// Why an execution ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
  StepFailed {
    step: String,
    attempts: u32,
    error: String,
  },
  NoMatchingEdge {
    step: String,
  },
  PathNotFound {
    step: String,
    path: String,
  },
  Timeout {
    step: Option<String>,
    limit_ms: u64,
  },
  Cancelled,
  /// A transition led to the `Failed` terminal marker.
  ExplicitFail {
    step: String,
  },
}

impl FailureReason {
  /// The step the failure is attributed to, if any.
  pub fn step(&self) -> Option<&str> {
    match self {
      FailureReason::StepFailed { step, .. }
      | FailureReason::NoMatchingEdge { step }
      | FailureReason::PathNotFound { step, .. }
      | FailureReason::ExplicitFail { step } => Some(step),
      FailureReason::Timeout { step, .. } => step.as_deref(),
      FailureReason::Cancelled => None,
    }
  }
}

impl From<&ExecutionError> for FailureReason {
  fn from(error: &ExecutionError) -> Self {
    match error {
      ExecutionError::StepInvocationFailure {
        step,
        attempts,
        source,
      } => FailureReason::StepFailed {
        step: step.clone(),
        attempts: *attempts,
        error: source.to_string(),
      },
      ExecutionError::NoMatchingEdge { step } => FailureReason::NoMatchingEdge { step: step.clone() },
      ExecutionError::PathNotFound { step, path } => FailureReason::PathNotFound {
        step: step.clone(),
        path: path.clone(),
      },
      ExecutionError::Timeout { step, limit } => FailureReason::Timeout {
        step: step.clone(),
        limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
      },
      ExecutionError::Cancelled => FailureReason::Cancelled,
    }
  }
}

/// Terminal state of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
  Succeeded,
  Failed { reason: FailureReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
  Completed,
  Dispatched,
  Failed,
}

/// One visit of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
  pub step: String,
  pub mode: InvocationMode,
  pub attempts: u32,
  pub outcome: StepOutcome,
}

/// Result of a complete workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
  /// Unique execution ID.
  pub execution_id: String,
  pub workflow: String,
  pub outcome: Outcome,
  /// The payload when the execution stopped.
  pub output: serde_json::Value,
  /// Step visits in order.
  pub steps: Vec<StepRecord>,
  pub elapsed: Duration,
  /// Whether a failure record reached the notification channel.
  pub failure_published: bool,
}

impl ExecutionResult {
  pub fn is_succeeded(&self) -> bool {
    matches!(self.outcome, Outcome::Succeeded)
  }

  pub fn failure(&self) -> Option<&FailureReason> {
    match &self.outcome {
      Outcome::Failed { reason } => Some(reason),
      Outcome::Succeeded => None,
    }
  }

  /// Names of the visited steps, in order.
  pub fn visited(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.step.as_str()).collect()
  }
}
