//! Mutable state of a single execution.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::result::{FailureReason, StepOutcome, StepRecord};
use cerise_workflow::InvocationMode;

/// Where an execution currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
  Pending,
  Running(String),
  Succeeded,
  Failed(FailureReason),
}

impl ExecutionStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, ExecutionStatus::Succeeded | ExecutionStatus::Failed(_))
  }
}

/// Per-execution state.
///
/// Owned by exactly one execution, so it needs no synchronization.
#[derive(Debug)]
pub struct ExecutionState {
  execution_id: String,
  status: ExecutionStatus,
  payload: Value,
  started_at: Instant,
  attempts: HashMap<String, u32>,
  history: Vec<StepRecord>,
}

impl ExecutionState {
  pub fn new(execution_id: impl Into<String>, input: Value) -> Self {
    Self {
      execution_id: execution_id.into(),
      status: ExecutionStatus::Pending,
      payload: input,
      started_at: Instant::now(),
      attempts: HashMap::new(),
      history: Vec::new(),
    }
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn status(&self) -> &ExecutionStatus {
    &self.status
  }

  pub fn payload(&self) -> &Value {
    &self.payload
  }

  pub fn elapsed(&self) -> Duration {
    self.started_at.elapsed()
  }

  /// Total attempts made against `step` in this execution.
  pub fn attempts(&self, step: &str) -> u32 {
    self.attempts.get(step).copied().unwrap_or(0)
  }

  pub fn history(&self) -> &[StepRecord] {
    &self.history
  }

  pub(crate) fn enter(&mut self, step: &str) {
    self.status = ExecutionStatus::Running(step.to_string());
  }

  pub(crate) fn record_attempt(&mut self, step: &str) {
    *self.attempts.entry(step.to_string()).or_insert(0) += 1;
  }

  pub(crate) fn set_payload(&mut self, payload: Value) {
    self.payload = payload;
  }

  pub(crate) fn record_visit(
    &mut self,
    step: &str,
    mode: InvocationMode,
    attempts: u32,
    outcome: StepOutcome,
  ) {
    self.history.push(StepRecord {
      step: step.to_string(),
      mode,
      attempts,
      outcome,
    });
  }

  pub(crate) fn finish(&mut self, status: ExecutionStatus) {
    self.status = status;
  }

  pub(crate) fn into_parts(self) -> (Value, Vec<StepRecord>, Duration) {
    let elapsed = self.started_at.elapsed();
    (self.payload, self.history, elapsed)
  }
}
