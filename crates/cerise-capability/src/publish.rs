use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("no endpoint configured for topic '{0}'")]
  UnknownTopic(String),

  #[error("notification channel closed")]
  ChannelClosed,

  #[error("invalid endpoint for topic '{topic}': {message}")]
  InvalidEndpoint { topic: String, message: String },

  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),
}

/// Publishes messages to a named topic.
#[async_trait]
pub trait Publisher: Send + Sync {
  async fn publish(&self, topic: &str, message: &str) -> Result<(), PublishError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
  async fn publish(&self, topic: &str, message: &str) -> Result<(), PublishError> {
    info!(topic = %topic, message = %message, "notification_published");
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub topic: String,
  pub message: String,
}

/// Sends notifications to an unbounded channel.
///
/// Use this when notifications are consumed in-process (tests, bridges to
/// another transport). Publishing fails once the receiver is dropped.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
  sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelPublisher {
  pub fn new(sender: mpsc::UnboundedSender<Notification>) -> Self {
    Self { sender }
  }

  /// Create a publisher together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

#[async_trait]
impl Publisher for ChannelPublisher {
  async fn publish(&self, topic: &str, message: &str) -> Result<(), PublishError> {
    self
      .sender
      .send(Notification {
        topic: topic.to_string(),
        message: message.to_string(),
      })
      .map_err(|_| PublishError::ChannelClosed)
  }
}
