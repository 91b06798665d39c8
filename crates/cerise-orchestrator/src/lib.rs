//! Cerise Workflow Orchestrator
//!
//! Interprets a frozen [`cerise_workflow::WorkflowDefinition`] as a state
//! machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                         │
//! │  - owns mpsc channel of trigger payloads                    │
//! │  - one independent execution per payload                    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    WorkflowExecutor                         │
//! │  - run(definition, input) → ExecutionResult                 │
//! │  - step loop, choice evaluation, retries, workflow timeout  │
//! │  - FailureRouter publishes failure records                  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Invoker / Publisher capabilities              │
//! │  - request-response invocations are awaited                 │
//! │  - event invocations are dispatched and forgotten           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod error;
mod events;
mod executor;
mod failure;
mod log;
mod result;
mod runner;
mod state;

pub use error::{ExecutionError, RunnerError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::WorkflowExecutor;
pub use failure::{FailureRecord, FailureRouter};
pub use result::{ExecutionResult, FailureReason, Outcome, StepOutcome, StepRecord};
pub use runner::{RunnerSummary, WorkflowRunner};
pub use state::{ExecutionState, ExecutionStatus};
