use thiserror::Error;

/// Errors raised while building or validating a workflow definition.
///
/// All of these are construction-time failures; a definition that freezes
/// successfully never produces one at run time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
  #[error("duplicate step name: {0}")]
  DuplicateStepName(String),

  #[error("invalid resource budget for step '{step}': {message}")]
  InvalidResourceBudget { step: String, message: String },

  #[error("unknown step: {0}")]
  UnknownStep(String),

  #[error("transition from '{from}' targets unknown step '{to}'")]
  UnknownTarget { from: String, to: String },

  #[error("cycle detected in workflow graph: {}", .cycle.join(" -> "))]
  CyclicGraph { cycle: Vec<String> },

  #[error("step '{0}' is unreachable from the entry point")]
  UnreachableStep(String),

  #[error("step '{0}' has choices but no otherwise transition")]
  MissingOtherwise(String),

  #[error("workflow definition is frozen")]
  DefinitionFrozen,

  #[error("step '{0}' cannot mix an unconditional transition with other transitions")]
  ConflictingTransition(String),

  #[error("step '{0}' already has an otherwise transition")]
  DuplicateOtherwise(String),

  #[error("choice added to step '{0}' after its otherwise transition")]
  ChoiceAfterOtherwise(String),

  #[error("step '{0}' has no outgoing transition")]
  MissingTransition(String),

  #[error("workflow has no steps")]
  NoEntryPoint,

  #[error("workflow timeout must be positive")]
  ZeroWorkflowTimeout,

  #[error("invalid payload path '{path}': {message}")]
  InvalidPath { path: String, message: String },
}
