//! Fire-and-forget invocation.

use std::sync::Arc;

use serde_json::json;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::invoke::{InvocationRequest, InvokeError, Invoker};
use crate::publish::Publisher;

/// Where a detached invocation reports its failure.
#[derive(Clone)]
pub struct DeadLetter {
  pub publisher: Arc<dyn Publisher>,
  pub topic: String,
}

/// Hand an invocation off and return immediately.
///
/// The invocation runs on its own task and nothing is handed back to the
/// caller, so its outcome can never feed into the caller's control flow. If it
/// fails (or outlives its time limit) and a dead letter is given, a failure
/// message is published there.
///
/// The task is registered with `tracker` so a process can wait for detached
/// work before shutting down. Each task ends within the request's time limit
/// plus one dead-letter publish.
pub fn dispatch(
  tracker: &TaskTracker,
  invoker: Arc<dyn Invoker>,
  request: InvocationRequest,
  dead_letter: Option<DeadLetter>,
) {
  tracker.spawn(async move {
    let step = request.step.clone();
    let target = request.target.clone();
    let execution_id = request.execution_id.clone();
    let payload = request.payload.clone();
    let limit = request.timeout;

    let result = match tokio::time::timeout(limit, invoker.invoke(request)).await {
      Ok(result) => result,
      Err(_) => Err(InvokeError::TimedOut(limit)),
    };

    let e = match result {
      Ok(_) => {
        debug!(execution_id = %execution_id, step = %step, "dispatched_step_completed");
        return;
      }
      Err(e) => e,
    };

    warn!(
      execution_id = %execution_id,
      step = %step,
      error = %e,
      "dispatched_step_failed"
    );

    let Some(dead_letter) = dead_letter else {
      return;
    };

    let message = json!({
      "execution_id": execution_id,
      "step": step,
      "target": target,
      "payload": payload,
      "error": e.to_string(),
    })
    .to_string();

    if let Err(publish_error) = dead_letter.publisher.publish(&dead_letter.topic, &message).await {
      error!(
        execution_id = %execution_id,
        step = %step,
        topic = %dead_letter.topic,
        error = %publish_error,
        "dead_letter_publish_failed"
      );
    }
  });
}
