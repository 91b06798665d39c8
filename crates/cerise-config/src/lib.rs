//! Cerise Config
//!
//! This crate contains the serializable workflow configuration types for cerise.
//! These types describe a state machine before it is resolved into an immutable
//! `WorkflowDefinition` by `cerise-resolver`.
//!
//! Configuration is loaded from JSON files (via CLI with `cerise run workflow.json`).
//! Nothing here is validated; the resolver and the workflow builder reject
//! invalid graphs.

mod condition;
mod enums;
mod step;
mod transition;
mod workflow;

pub use condition::Condition;
pub use enums::{InvocationMode, LogLevel, RetryBackoff};
pub use step::StepDef;
pub use transition::{TargetDef, TransitionDef, TransitionKind};
pub use workflow::{LoggingDef, WorkflowDef};
