//! Workflow runner with channel-based triggering.
//!
//! The `WorkflowRunner` owns an mpsc channel of trigger payloads and starts
//! one independent execution per payload.

use std::sync::Arc;

use cerise_workflow::WorkflowDefinition;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::RunnerError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::executor::WorkflowExecutor;
use crate::result::{ExecutionResult, FailureReason};

/// Counts of executions started by a runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerSummary {
  pub succeeded: usize,
  pub failed: usize,
  pub cancelled: usize,
}

impl RunnerSummary {
  pub fn total(&self) -> usize {
    self.succeeded + self.failed + self.cancelled
  }

  fn record(&mut self, result: &ExecutionResult) {
    match result.failure() {
      None => self.succeeded += 1,
      Some(FailureReason::Cancelled) => self.cancelled += 1,
      Some(_) => self.failed += 1,
    }
  }
}

/// Executes a workflow in response to trigger payloads.
///
/// # Usage
///
/// ```ignore
/// let runner = WorkflowRunner::new(executor, definition);
///
/// // Hand senders to whatever triggers executions
/// let sender = runner.sender();
///
/// let cancel = CancellationToken::new();
/// let summary = runner.start(cancel).await;
/// ```
pub struct WorkflowRunner<N: ExecutionNotifier + 'static = NoopNotifier> {
  sender: mpsc::Sender<serde_json::Value>,
  receiver: mpsc::Receiver<serde_json::Value>,
  executor: Arc<WorkflowExecutor<N>>,
  definition: Arc<WorkflowDefinition>,
}

impl<N: ExecutionNotifier + 'static> WorkflowRunner<N> {
  pub fn new(executor: Arc<WorkflowExecutor<N>>, definition: Arc<WorkflowDefinition>) -> Self {
    Self::with_buffer_size(executor, definition, 100)
  }

  pub fn with_buffer_size(
    executor: Arc<WorkflowExecutor<N>>,
    definition: Arc<WorkflowDefinition>,
    buffer_size: usize,
  ) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      executor,
      definition,
    }
  }

  /// Get a sender handle for triggering executions.
  pub fn sender(&self) -> mpsc::Sender<serde_json::Value> {
    self.sender.clone()
  }

  pub fn definition(&self) -> &WorkflowDefinition {
    &self.definition
  }

  /// Queue an execution with the given payload.
  pub async fn run(&self, payload: serde_json::Value) -> Result<(), RunnerError> {
    self
      .sender
      .send(payload)
      .await
      .map_err(|_| RunnerError::Closed)
  }

  /// Start the execution loop.
  ///
  /// Runs until `cancel` fires or every sender has been dropped, then waits
  /// for in-flight executions and their dispatched event steps. Cancelling
  /// also cancels the executions.
  pub async fn start(self, cancel: CancellationToken) -> RunnerSummary {
    let Self {
      sender,
      mut receiver,
      executor,
      definition,
    } = self;
    // Only external senders keep the channel open.
    drop(sender);

    info!(workflow = %definition.name(), "workflow_runner_started");

    let mut executions = JoinSet::new();
    let mut summary = RunnerSummary::default();

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(workflow = %definition.name(), "workflow_runner_cancelled");
          break;
        }
        Some(joined) = executions.join_next(), if !executions.is_empty() => {
          collect(&mut summary, joined);
        }
        payload = receiver.recv() => {
          let Some(payload) = payload else {
            info!(workflow = %definition.name(), "workflow_runner_channel_closed");
            break;
          };

          let exec_cancel = cancel.child_token();
          let executor = executor.clone();
          let definition = definition.clone();
          executions.spawn(async move {
            executor.run_with_cancel(&definition, payload, exec_cancel).await
          });
        }
      }
    }

    while let Some(joined) = executions.join_next().await {
      collect(&mut summary, joined);
    }
    executor.wait_dispatched().await;

    info!(
      workflow = %definition.name(),
      succeeded = summary.succeeded,
      failed = summary.failed,
      cancelled = summary.cancelled,
      "workflow_runner_stopped"
    );
    summary
  }

  /// Execute a single run without the loop.
  pub async fn execute_once(
    &self,
    payload: serde_json::Value,
    cancel: CancellationToken,
  ) -> ExecutionResult {
    self
      .executor
      .run_with_cancel(&self.definition, payload, cancel)
      .await
  }
}

fn collect(summary: &mut RunnerSummary, joined: Result<ExecutionResult, tokio::task::JoinError>) {
  match joined {
    Ok(result) => {
      info!(
        execution_id = %result.execution_id,
        succeeded = result.is_succeeded(),
        "workflow_execution_finished"
      );
      summary.record(&result);
    }
    Err(e) => {
      error!(error = %e, "workflow_execution_panicked");
      summary.failed += 1;
    }
  }
}
