use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::publish::{PublishError, Publisher};

/// Delivers notifications by POSTing them to a per-topic HTTP endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebhookPublisher {
  client: reqwest::Client,
  endpoints: HashMap<String, Url>,
}

impl WebhookPublisher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Route `topic` to `endpoint`. Only http and https endpoints are accepted.
  pub fn with_topic(mut self, topic: impl Into<String>, endpoint: &str) -> Result<Self, PublishError> {
    let topic = topic.into();
    let url = Url::parse(endpoint).map_err(|e| PublishError::InvalidEndpoint {
      topic: topic.clone(),
      message: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
      return Err(PublishError::InvalidEndpoint {
        topic,
        message: format!("unsupported scheme '{}'", url.scheme()),
      });
    }

    self.endpoints.insert(topic, url);
    Ok(self)
  }

  pub fn endpoint(&self, topic: &str) -> Option<&Url> {
    self.endpoints.get(topic)
  }
}

#[async_trait]
impl Publisher for WebhookPublisher {
  async fn publish(&self, topic: &str, message: &str) -> Result<(), PublishError> {
    let url = self
      .endpoints
      .get(topic)
      .ok_or_else(|| PublishError::UnknownTopic(topic.to_string()))?;

    let response = self
      .client
      .post(url.clone())
      .header(CONTENT_TYPE, "application/json")
      .body(message.to_string())
      .send()
      .await?;
    response.error_for_status()?;

    debug!(topic = %topic, endpoint = %url, "webhook notification delivered");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rejects_non_http_endpoints() {
    let result = WebhookPublisher::new().with_topic("alerts", "ftp://example.com/hook");
    assert!(matches!(result, Err(PublishError::InvalidEndpoint { .. })));

    let result = WebhookPublisher::new().with_topic("alerts", "not a url");
    assert!(matches!(result, Err(PublishError::InvalidEndpoint { .. })));
  }

  #[tokio::test]
  async fn test_unknown_topic() {
    let publisher = WebhookPublisher::new()
      .with_topic("alerts", "http://127.0.0.1:9/hook")
      .unwrap();
    assert!(publisher.endpoint("alerts").is_some());
    assert!(matches!(
      publisher.publish("other", "{}").await,
      Err(PublishError::UnknownTopic(_))
    ));
  }

  #[tokio::test]
  async fn test_unreachable_endpoint_is_an_error() {
    // Port 9 (discard) is not expected to accept HTTP on a test host.
    let publisher = WebhookPublisher::new()
      .with_topic("alerts", "http://127.0.0.1:9/hook")
      .unwrap();
    assert!(publisher.publish("alerts", "{}").await.is_err());
  }
}
