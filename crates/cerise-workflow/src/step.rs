use std::collections::HashMap;
use std::time::Duration;

use cerise_config::InvocationMode;

use crate::error::DefinitionError;
use crate::path::PayloadPath;

/// Memory ceiling enforced by the external executor.
pub const MAX_MEMORY_MB: u32 = 10_240;
/// Time limit ceiling enforced by the external executor.
pub const MAX_STEP_TIMEOUT: Duration = Duration::from_secs(15 * 60);

pub const DEFAULT_MEMORY_MB: u32 = 1024;
pub const DEFAULT_STEP_TIMEOUT: Duration = MAX_STEP_TIMEOUT;

/// Memory and time limits for a single invocation of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudget {
  pub memory_mb: u32,
  pub timeout: Duration,
}

impl ResourceBudget {
  pub fn new(memory_mb: u32, timeout: Duration) -> Self {
    Self { memory_mb, timeout }
  }

  fn validate(&self, step: &str) -> Result<(), DefinitionError> {
    let invalid = |message: String| DefinitionError::InvalidResourceBudget {
      step: step.to_string(),
      message,
    };

    if self.memory_mb == 0 {
      return Err(invalid("memory must be positive".to_string()));
    }
    if self.memory_mb > MAX_MEMORY_MB {
      return Err(invalid(format!(
        "memory {} MB exceeds ceiling of {} MB",
        self.memory_mb, MAX_MEMORY_MB
      )));
    }
    if self.timeout.is_zero() {
      return Err(invalid("time limit must be positive".to_string()));
    }
    if self.timeout > MAX_STEP_TIMEOUT {
      return Err(invalid(format!(
        "time limit {:?} exceeds ceiling of {:?}",
        self.timeout, MAX_STEP_TIMEOUT
      )));
    }
    Ok(())
  }
}

impl Default for ResourceBudget {
  fn default() -> Self {
    Self::new(DEFAULT_MEMORY_MB, DEFAULT_STEP_TIMEOUT)
  }
}

/// A capability held by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
  /// May invoke the named action.
  Invoke { target: String },
  /// May publish to the workflow's failure topic.
  Publish { topic: String },
}

/// Everything needed to register a step.
#[derive(Debug, Clone)]
pub struct StepSpec {
  pub name: String,
  pub target: String,
  pub env: HashMap<String, String>,
  pub budget: ResourceBudget,
  pub mode: InvocationMode,
  pub max_retry_attempts: u32,
  pub comment: Option<String>,
  pub input_path: Option<String>,
  pub output_path: Option<String>,
}

impl StepSpec {
  pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      target: target.into(),
      env: HashMap::new(),
      budget: ResourceBudget::default(),
      mode: InvocationMode::RequestResponse,
      max_retry_attempts: 0,
      comment: None,
      input_path: None,
      output_path: None,
    }
  }

  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn with_budget(mut self, budget: ResourceBudget) -> Self {
    self.budget = budget;
    self
  }

  pub fn with_mode(mut self, mode: InvocationMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_retries(mut self, max_retry_attempts: u32) -> Self {
    self.max_retry_attempts = max_retry_attempts;
    self
  }

  pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
    self.comment = Some(comment.into());
    self
  }

  pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
    self.input_path = Some(path.into());
    self
  }

  pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
    self.output_path = Some(path.into());
    self
  }
}

/// A named unit of workflow work. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
  name: String,
  target: String,
  env: HashMap<String, String>,
  budget: ResourceBudget,
  mode: InvocationMode,
  max_retry_attempts: u32,
  comment: Option<String>,
  input_path: Option<PayloadPath>,
  output_path: Option<PayloadPath>,
  grants: Vec<Grant>,
}

impl Step {
  /// Validate a spec and build the step with its minimal grants.
  pub(crate) fn from_spec(
    spec: StepSpec,
    failure_topic: Option<&str>,
  ) -> Result<Self, DefinitionError> {
    spec.budget.validate(&spec.name)?;
    let input_path = spec.input_path.as_deref().map(PayloadPath::parse).transpose()?;
    let output_path = spec.output_path.as_deref().map(PayloadPath::parse).transpose()?;

    let mut grants = vec![Grant::Invoke {
      target: spec.target.clone(),
    }];
    if let Some(topic) = failure_topic {
      grants.push(Grant::Publish {
        topic: topic.to_string(),
      });
    }

    Ok(Self {
      name: spec.name,
      target: spec.target,
      env: spec.env,
      budget: spec.budget,
      mode: spec.mode,
      max_retry_attempts: spec.max_retry_attempts,
      comment: spec.comment,
      input_path,
      output_path,
      grants,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn target(&self) -> &str {
    &self.target
  }

  pub fn env(&self) -> &HashMap<String, String> {
    &self.env
  }

  pub fn budget(&self) -> ResourceBudget {
    self.budget
  }

  pub fn mode(&self) -> InvocationMode {
    self.mode
  }

  pub fn max_retry_attempts(&self) -> u32 {
    self.max_retry_attempts
  }

  pub fn comment(&self) -> Option<&str> {
    self.comment.as_deref()
  }

  pub fn input_path(&self) -> Option<&PayloadPath> {
    self.input_path.as_ref()
  }

  pub fn output_path(&self) -> Option<&PayloadPath> {
    self.output_path.as_ref()
  }

  pub fn grants(&self) -> &[Grant] {
    &self.grants
  }

  pub fn can_invoke(&self, target: &str) -> bool {
    self
      .grants
      .iter()
      .any(|g| matches!(g, Grant::Invoke { target: t } if t == target))
  }

  /// Topic this step may publish dead-lettered failures to.
  pub fn dead_letter_topic(&self) -> Option<&str> {
    self.grants.iter().find_map(|g| match g {
      Grant::Publish { topic } => Some(topic.as_str()),
      _ => None,
    })
  }
}

impl AsRef<str> for Step {
  fn as_ref(&self) -> &str {
    &self.name
  }
}
