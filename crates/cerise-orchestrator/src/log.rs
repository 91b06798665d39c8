//! Execution history logging gated by the workflow's logging settings.

use std::time::Duration;

use cerise_workflow::{LogLevel, LoggingConfig};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::result::FailureReason;

/// Writes the execution history of one run.
///
/// `All` logs every step event, `Error` logs retries and failures, `Fatal`
/// only logs the terminal failure, `Off` logs nothing.
pub(crate) struct ExecutionLog<'a> {
  config: LoggingConfig,
  execution_id: &'a str,
}

impl<'a> ExecutionLog<'a> {
  pub(crate) fn new(config: LoggingConfig, execution_id: &'a str) -> Self {
    Self {
      config,
      execution_id,
    }
  }

  fn enabled(&self, level: LogLevel) -> bool {
    self.config.level >= level
  }

  pub(crate) fn workflow_started(&self, workflow: &str, input: &Value) {
    if !self.enabled(LogLevel::All) {
      return;
    }
    if self.config.include_execution_data {
      info!(execution_id = %self.execution_id, workflow, input = %input, "workflow_started");
    } else {
      info!(execution_id = %self.execution_id, workflow, "workflow_started");
    }
  }

  pub(crate) fn step_started(&self, step: &str, attempt: u32) {
    if self.enabled(LogLevel::All) {
      info!(execution_id = %self.execution_id, step, attempt, "step_started");
    }
  }

  pub(crate) fn step_completed(&self, step: &str, output: &Value) {
    if !self.enabled(LogLevel::All) {
      return;
    }
    if self.config.include_execution_data {
      info!(execution_id = %self.execution_id, step, output = %output, "step_completed");
    } else {
      info!(execution_id = %self.execution_id, step, "step_completed");
    }
  }

  pub(crate) fn step_dispatched(&self, step: &str) {
    if self.enabled(LogLevel::All) {
      info!(execution_id = %self.execution_id, step, "step_dispatched");
    }
  }

  pub(crate) fn step_retrying(&self, step: &str, attempt: u32, delay: Duration, error: &str) {
    if self.enabled(LogLevel::Error) {
      warn!(
        execution_id = %self.execution_id,
        step,
        attempt,
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        error,
        "step_retrying"
      );
    }
  }

  pub(crate) fn step_failed(&self, step: &str, attempts: u32, error: &str) {
    if self.enabled(LogLevel::Error) {
      error!(execution_id = %self.execution_id, step, attempts, error, "step_failed");
    }
  }

  pub(crate) fn workflow_succeeded(&self, output: &Value) {
    if !self.enabled(LogLevel::All) {
      return;
    }
    if self.config.include_execution_data {
      info!(execution_id = %self.execution_id, output = %output, "workflow_succeeded");
    } else {
      info!(execution_id = %self.execution_id, "workflow_succeeded");
    }
  }

  pub(crate) fn workflow_failed(&self, reason: &FailureReason) {
    if self.enabled(LogLevel::Fatal) {
      error!(execution_id = %self.execution_id, reason = ?reason, "workflow_failed");
    }
  }
}
