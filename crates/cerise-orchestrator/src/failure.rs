//! Routes terminal failures to the workflow's notification topic.

use std::sync::Arc;
use std::time::Duration;

use cerise_capability::Publisher;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::result::FailureReason;

/// Upper bound on a single failure publish.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// The message published when an execution fails.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
  pub workflow: String,
  pub execution_id: String,
  pub step: Option<String>,
  pub payload: Value,
  pub reason: FailureReason,
  pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
  pub fn new(
    workflow: impl Into<String>,
    execution_id: impl Into<String>,
    payload: Value,
    reason: FailureReason,
  ) -> Self {
    Self {
      workflow: workflow.into(),
      execution_id: execution_id.into(),
      step: reason.step().map(str::to_string),
      payload,
      reason,
      timestamp: Utc::now(),
    }
  }
}

/// Publishes failure records.
///
/// Publishing is best-effort: errors are logged and never change the
/// execution's outcome.
#[derive(Clone)]
pub struct FailureRouter {
  publisher: Arc<dyn Publisher>,
}

impl FailureRouter {
  pub fn new(publisher: Arc<dyn Publisher>) -> Self {
    Self { publisher }
  }

  pub(crate) fn publisher(&self) -> &Arc<dyn Publisher> {
    &self.publisher
  }

  /// Publish `record` to `topic`. Returns whether it was delivered.
  pub async fn route(&self, topic: Option<&str>, record: &FailureRecord) -> bool {
    let Some(topic) = topic else {
      debug!(
        execution_id = %record.execution_id,
        "failure_not_routed_no_topic"
      );
      return false;
    };

    let message = match serde_json::to_string(record) {
      Ok(message) => message,
      Err(e) => {
        error!(execution_id = %record.execution_id, error = %e, "failure_record_serialize_failed");
        return false;
      }
    };

    match tokio::time::timeout(PUBLISH_TIMEOUT, self.publisher.publish(topic, &message)).await {
      Ok(Ok(())) => {
        debug!(execution_id = %record.execution_id, topic, "failure_routed");
        true
      }
      Ok(Err(e)) => {
        error!(
          execution_id = %record.execution_id,
          topic,
          error = %e,
          "failure_publish_failed"
        );
        false
      }
      Err(_) => {
        error!(execution_id = %record.execution_id, topic, "failure_publish_timed_out");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cerise_capability::ChannelPublisher;
  use serde_json::json;

  fn record() -> FailureRecord {
    FailureRecord::new(
      "orders",
      "exec-1",
      json!({"state": "No"}),
      FailureReason::NoMatchingEdge {
        step: "check".to_string(),
      },
    )
  }

  #[test]
  fn test_record_takes_step_from_reason() {
    let record = record();
    assert_eq!(record.step.as_deref(), Some("check"));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["workflow"], "orders");
    assert_eq!(json["reason"]["kind"], "no_matching_edge");
    assert!(json["timestamp"].is_string());
  }

  #[tokio::test]
  async fn test_route_publishes_record() {
    let (publisher, mut receiver) = ChannelPublisher::channel();
    let router = FailureRouter::new(Arc::new(publisher));

    assert!(router.route(Some("alerts"), &record()).await);

    let notification = receiver.recv().await.unwrap();
    assert_eq!(notification.topic, "alerts");
    let body: Value = serde_json::from_str(&notification.message).unwrap();
    assert_eq!(body["execution_id"], "exec-1");
  }

  #[tokio::test]
  async fn test_route_without_topic_is_skipped() {
    let (publisher, mut receiver) = ChannelPublisher::channel();
    let router = FailureRouter::new(Arc::new(publisher));

    assert!(!router.route(None, &record()).await);
    assert!(receiver.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_route_swallows_publish_errors() {
    let (publisher, receiver) = ChannelPublisher::channel();
    drop(receiver);
    let router = FailureRouter::new(Arc::new(publisher));

    assert!(!router.route(Some("alerts"), &record()).await);
  }
}
