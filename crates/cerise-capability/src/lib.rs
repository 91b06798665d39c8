//! Capabilities handed to the cerise orchestrator.
//!
//! Steps never run in-process. Each one names a target that an [`Invoker`]
//! knows how to run, and failures leave the system through a [`Publisher`].
//! Both are capability handles without client-side mutable state, so a single
//! instance can be shared across concurrent executions.

mod command;
mod dispatch;
mod invoke;
mod publish;
mod webhook;

pub use command::{CommandInvoker, MEMORY_LIMIT_ENV};
pub use dispatch::{DeadLetter, dispatch};
pub use invoke::{InvocationRequest, InvokeError, Invoker};
pub use publish::{ChannelPublisher, LogPublisher, Notification, PublishError, Publisher};
pub use webhook::WebhookPublisher;

pub use cerise_config::InvocationMode;
