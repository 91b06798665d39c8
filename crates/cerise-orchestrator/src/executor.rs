//! Workflow executor.
//!
//! Walks a frozen definition from its entry step. Request-response steps
//! are awaited and their output becomes the next payload. Event steps are
//! dispatched and the execution moves on with the payload unchanged.

use std::sync::Arc;

use cerise_capability::{
  DeadLetter, InvocationRequest, InvokeError, Invoker, Publisher, dispatch,
};
use cerise_workflow::{InvocationMode, PayloadPath, Step, Target, WorkflowDefinition};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::instrument;

use crate::error::ExecutionError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::failure::{FailureRecord, FailureRouter};
use crate::log::ExecutionLog;
use crate::result::{ExecutionResult, FailureReason, Outcome, StepOutcome};
use crate::state::{ExecutionState, ExecutionStatus};

/// How the step loop ended without an error.
enum Finish {
  Succeeded,
  /// A transition of `step` led to the failure marker.
  Failed { step: String },
}

/// Executes workflow definitions.
///
/// One executor can run any number of executions concurrently; all
/// per-execution state lives in [`ExecutionState`].
///
/// Event steps keep running after their execution has finished. Call
/// [`WorkflowExecutor::wait_dispatched`] before shutting the runtime down so
/// they are not dropped.
pub struct WorkflowExecutor<N: ExecutionNotifier = NoopNotifier> {
  invoker: Arc<dyn Invoker>,
  router: FailureRouter,
  notifier: N,
  dispatched: TaskTracker,
}

impl WorkflowExecutor<NoopNotifier> {
  pub fn new(invoker: Arc<dyn Invoker>, publisher: Arc<dyn Publisher>) -> Self {
    Self::with_notifier(invoker, publisher, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> WorkflowExecutor<N> {
  pub fn with_notifier(invoker: Arc<dyn Invoker>, publisher: Arc<dyn Publisher>, notifier: N) -> Self {
    Self {
      invoker,
      router: FailureRouter::new(publisher),
      notifier,
      dispatched: TaskTracker::new(),
    }
  }

  /// Number of dispatched event invocations still running.
  pub fn dispatched_in_flight(&self) -> usize {
    self.dispatched.len()
  }

  /// Wait until every dispatched event invocation has finished.
  ///
  /// Each one is bounded by its step's time limit. Executions may still be
  /// started afterwards.
  pub async fn wait_dispatched(&self) {
    self.dispatched.close();
    self.dispatched.wait().await;
    self.dispatched.reopen();
  }

  pub fn notifier(&self) -> &N {
    &self.notifier
  }

  /// Execute `definition` once with `input` as the initial payload.
  pub async fn run(&self, definition: &WorkflowDefinition, input: Value) -> ExecutionResult {
    self
      .run_with_cancel(definition, input, CancellationToken::new())
      .await
  }

  /// Execute `definition` until it reaches a terminal state, times out or
  /// `cancel` fires.
  #[instrument(skip_all, fields(workflow = %definition.name()))]
  pub async fn run_with_cancel(
    &self,
    definition: &WorkflowDefinition,
    input: Value,
    cancel: CancellationToken,
  ) -> ExecutionResult {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let settings = definition.settings();
    let log = ExecutionLog::new(settings.logging, &execution_id);

    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow: definition.name().to_string(),
    });
    log.workflow_started(definition.name(), &input);

    let mut state = ExecutionState::new(execution_id.clone(), input);

    // The state lives outside the timed future so the last payload survives a timeout.
    let timed =
      tokio::time::timeout(settings.timeout, self.drive(definition, &mut state, &cancel, &log)).await;
    let result = match timed {
      Ok(result) => result,
      Err(_) => Err(ExecutionError::Timeout {
        step: match state.status() {
          ExecutionStatus::Running(step) => Some(step.clone()),
          _ => None,
        },
        limit: settings.timeout,
      }),
    };

    let outcome = match result {
      Ok(Finish::Succeeded) => Outcome::Succeeded,
      Ok(Finish::Failed { step }) => Outcome::Failed {
        reason: FailureReason::ExplicitFail { step },
      },
      Err(e) => Outcome::Failed {
        reason: FailureReason::from(&e),
      },
    };

    let mut failure_published = false;
    match &outcome {
      Outcome::Succeeded => {
        state.finish(ExecutionStatus::Succeeded);
        log.workflow_succeeded(state.payload());
        self.notifier.notify(ExecutionEvent::WorkflowSucceeded {
          execution_id: execution_id.clone(),
        });
      }
      Outcome::Failed { reason } => {
        state.finish(ExecutionStatus::Failed(reason.clone()));
        log.workflow_failed(reason);
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id: execution_id.clone(),
          reason: reason.clone(),
        });

        // Operator cancellation is not a failure to report.
        if *reason != FailureReason::Cancelled {
          let record = FailureRecord::new(
            definition.name(),
            execution_id.clone(),
            state.payload().clone(),
            reason.clone(),
          );
          failure_published = self
            .router
            .route(settings.failure_topic.as_deref(), &record)
            .await;
        }
      }
    }

    let (output, steps, elapsed) = state.into_parts();
    ExecutionResult {
      execution_id,
      workflow: definition.name().to_string(),
      outcome,
      output,
      steps,
      elapsed,
      failure_published,
    }
  }

  async fn drive(
    &self,
    definition: &WorkflowDefinition,
    state: &mut ExecutionState,
    cancel: &CancellationToken,
    log: &ExecutionLog<'_>,
  ) -> Result<Finish, ExecutionError> {
    let mut current = definition.entry();

    loop {
      if cancel.is_cancelled() {
        return Err(ExecutionError::Cancelled);
      }
      state.enter(current.name());

      let input = select_path(current, current.input_path(), state.payload())?;

      match current.mode() {
        InvocationMode::RequestResponse => {
          let output = self
            .invoke_with_retry(definition, current, input, state, cancel, log)
            .await?;
          let output = select_path(current, current.output_path(), &output)?;
          log.step_completed(current.name(), &output);
          self.notifier.notify(ExecutionEvent::StepCompleted {
            execution_id: state.execution_id().to_string(),
            step: current.name().to_string(),
            output: output.clone(),
          });
          state.set_payload(output);
        }
        InvocationMode::Event => {
          state.record_attempt(current.name());
          let request = self.request(state.execution_id(), current, input);
          let dead_letter = current.dead_letter_topic().map(|topic| DeadLetter {
            publisher: self.router.publisher().clone(),
            topic: topic.to_string(),
          });
          dispatch(&self.dispatched, self.invoker.clone(), request, dead_letter);

          log.step_dispatched(current.name());
          self.notifier.notify(ExecutionEvent::StepDispatched {
            execution_id: state.execution_id().to_string(),
            step: current.name().to_string(),
          });
          state.record_visit(current.name(), current.mode(), 1, StepOutcome::Dispatched);
        }
      }

      let next = definition
        .next(current.name(), state.payload())
        .ok_or_else(|| ExecutionError::NoMatchingEdge {
          step: current.name().to_string(),
        })?;

      current = match next {
        Target::Succeeded => return Ok(Finish::Succeeded),
        Target::Failed => {
          return Ok(Finish::Failed {
            step: current.name().to_string(),
          });
        }
        Target::Step(name) => definition
          .step(name)
          .ok_or_else(|| ExecutionError::NoMatchingEdge {
            step: current.name().to_string(),
          })?,
      };
    }
  }

  /// Invoke a request-response step, retrying failed attempts.
  ///
  /// Each attempt is bounded by the step's own time limit. A step with
  /// `max_retry_attempts = n` is attempted at most `n + 1` times per visit.
  async fn invoke_with_retry(
    &self,
    definition: &WorkflowDefinition,
    step: &Step,
    input: Value,
    state: &mut ExecutionState,
    cancel: &CancellationToken,
    log: &ExecutionLog<'_>,
  ) -> Result<Value, ExecutionError> {
    let limit = step.budget().timeout;
    let mut attempt = 0u32;

    loop {
      attempt += 1;
      state.record_attempt(step.name());
      log.step_started(step.name(), attempt);
      self.notifier.notify(ExecutionEvent::StepStarted {
        execution_id: state.execution_id().to_string(),
        step: step.name().to_string(),
        attempt,
      });

      let request = self.request(state.execution_id(), step, input.clone());
      let result = tokio::select! {
        _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
        result = tokio::time::timeout(limit, self.invoker.invoke(request)) => {
          result.unwrap_or(Err(InvokeError::TimedOut(limit)))
        }
      };

      let error = match result {
        Ok(output) => {
          state.record_visit(step.name(), step.mode(), attempt, StepOutcome::Completed);
          return Ok(output);
        }
        Err(e) => e,
      };

      if attempt > step.max_retry_attempts() {
        let message = error.to_string();
        log.step_failed(step.name(), attempt, &message);
        self.notifier.notify(ExecutionEvent::StepFailed {
          execution_id: state.execution_id().to_string(),
          step: step.name().to_string(),
          error: message,
        });
        state.record_visit(step.name(), step.mode(), attempt, StepOutcome::Failed);
        return Err(ExecutionError::StepInvocationFailure {
          step: step.name().to_string(),
          attempts: attempt,
          source: error,
        });
      }

      let delay = definition.settings().retry.delay(attempt);
      let message = error.to_string();
      log.step_retrying(step.name(), attempt, delay, &message);
      self.notifier.notify(ExecutionEvent::StepRetrying {
        execution_id: state.execution_id().to_string(),
        step: step.name().to_string(),
        attempt,
        delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        error: message,
      });

      tokio::select! {
        _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
        _ = tokio::time::sleep(delay) => {}
      }
    }
  }

  fn request(&self, execution_id: &str, step: &Step, payload: Value) -> InvocationRequest {
    let budget = step.budget();
    InvocationRequest {
      execution_id: execution_id.to_string(),
      step: step.name().to_string(),
      target: step.target().to_string(),
      payload,
      env: step.env().clone(),
      mode: step.mode(),
      memory_mb: budget.memory_mb,
      timeout: budget.timeout,
    }
  }
}

/// Apply an optional payload path. No path passes the payload through.
fn select_path(
  step: &Step,
  path: Option<&PayloadPath>,
  payload: &Value,
) -> Result<Value, ExecutionError> {
  let Some(path) = path else {
    return Ok(payload.clone());
  };
  path
    .select(payload)
    .cloned()
    .ok_or_else(|| ExecutionError::PathNotFound {
      step: step.name().to_string(),
      path: path.to_string(),
    })
}
