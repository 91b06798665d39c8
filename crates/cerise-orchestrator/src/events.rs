//! Execution events and notifiers for observability.
//!
//! Events are emitted while a workflow executes so consumers can follow
//! progress, persist history or stream it elsewhere.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::FailureReason;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// Workflow execution has started.
  WorkflowStarted {
    execution_id: String,
    workflow: String,
  },

  /// A step attempt has started.
  StepStarted {
    execution_id: String,
    step: String,
    attempt: u32,
  },

  /// A request-response step returned an output.
  StepCompleted {
    execution_id: String,
    step: String,
    output: serde_json::Value,
  },

  /// An event step was handed off without waiting for it.
  StepDispatched { execution_id: String, step: String },

  /// A step attempt failed and will be retried after `delay_ms`.
  StepRetrying {
    execution_id: String,
    step: String,
    attempt: u32,
    delay_ms: u64,
    error: String,
  },

  /// A step failed for good.
  StepFailed {
    execution_id: String,
    step: String,
    error: String,
  },

  /// Workflow execution has completed successfully.
  WorkflowSucceeded { execution_id: String },

  /// Workflow execution has failed.
  WorkflowFailed {
    execution_id: String,
    reason: FailureReason,
  },
}

/// Trait for receiving execution events.
///
/// The executor calls `notify` for each event. Implementations decide what
/// to do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls an execution.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
