use cerise_workflow::DefinitionError;
use thiserror::Error;

/// Errors that can occur while resolving a workflow configuration.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The configured graph or a step in it is invalid.
  #[error(transparent)]
  Definition(#[from] DefinitionError),

  /// A step references an action the catalog does not know.
  #[error("step '{step}' references unknown target '{target}'")]
  TargetNotFound { step: String, target: String },
}
