use std::time::Duration;

use cerise_config::{LogLevel, RetryBackoff};

/// Workflow-level execution bound when none is configured.
pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Delay between attempts of a failing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub backoff: RetryBackoff,
  pub initial_delay: Duration,
  pub max_delay: Duration,
}

impl RetryPolicy {
  /// Delay before retry number `attempt` (1-based).
  pub fn delay(&self, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let delay = match self.backoff {
      RetryBackoff::Constant => Some(self.initial_delay),
      RetryBackoff::Linear => self.initial_delay.checked_mul(attempt),
      RetryBackoff::Exponential => 2u32
        .checked_pow(attempt - 1)
        .and_then(|factor| self.initial_delay.checked_mul(factor)),
    };
    delay.unwrap_or(self.max_delay).min(self.max_delay)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      backoff: RetryBackoff::Exponential,
      initial_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(60),
    }
  }
}

/// Execution history logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
  pub level: LogLevel,
  /// Whether payloads are written alongside step events.
  pub include_execution_data: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: LogLevel::All,
      include_execution_data: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
  pub timeout: Duration,
  /// Receives failure records and dead-lettered event invocations.
  pub failure_topic: Option<String>,
  pub retry: RetryPolicy,
  pub logging: LoggingConfig,
}

impl Default for WorkflowSettings {
  fn default() -> Self {
    Self {
      timeout: DEFAULT_WORKFLOW_TIMEOUT,
      failure_topic: None,
      retry: RetryPolicy::default(),
      logging: LoggingConfig::default(),
    }
  }
}
