//! Cerise Workflow
//!
//! This crate provides the validated workflow representation for cerise.
//! Steps are registered and wired together through a [`WorkflowBuilder`];
//! [`WorkflowBuilder::freeze`] validates the graph and hands back an immutable
//! [`WorkflowDefinition`] that the orchestrator interprets.
//!
//! Guarantees of a frozen definition:
//! - Step names are unique and every resource budget is within the ceilings
//! - Every step has an outgoing transition, and every choice step an otherwise
//! - Every step is reachable from the entry point
//! - No cycle exists without an output-dependent escape

mod builder;
mod condition;
mod definition;
mod edge;
mod error;
mod graph;
mod path;
mod registry;
mod settings;
mod step;

pub use builder::WorkflowBuilder;
pub use condition::compile_condition;
pub use definition::WorkflowDefinition;
pub use edge::{Branch, Edge, EdgeKind, Predicate, Target, Transitions};
pub use error::DefinitionError;
pub use graph::Graph;
pub use path::PayloadPath;
pub use registry::StepRegistry;
pub use settings::{LoggingConfig, RetryPolicy, WorkflowSettings};
pub use step::{
  DEFAULT_MEMORY_MB, DEFAULT_STEP_TIMEOUT, Grant, MAX_MEMORY_MB, MAX_STEP_TIMEOUT, ResourceBudget,
  Step, StepSpec,
};

pub use cerise_config::{InvocationMode, LogLevel, RetryBackoff};
