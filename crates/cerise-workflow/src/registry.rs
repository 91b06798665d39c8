use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::step::{Step, StepSpec};

/// Holds the steps of one workflow, in registration order.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
  steps: Vec<Step>,
  index: HashMap<String, usize>,
  failure_topic: Option<String>,
}

impl StepRegistry {
  /// Create a registry whose steps are granted publish on `failure_topic`.
  pub fn new(failure_topic: Option<String>) -> Self {
    Self {
      steps: Vec::new(),
      index: HashMap::new(),
      failure_topic,
    }
  }

  /// Register a step. Nothing is inserted when validation fails.
  pub fn define_step(&mut self, spec: StepSpec) -> Result<Step, DefinitionError> {
    if self.index.contains_key(&spec.name) {
      return Err(DefinitionError::DuplicateStepName(spec.name));
    }

    let step = Step::from_spec(spec, self.failure_topic.as_deref())?;
    self.index.insert(step.name().to_string(), self.steps.len());
    self.steps.push(step.clone());
    Ok(step)
  }

  pub fn get(&self, name: &str) -> Option<&Step> {
    self.index.get(name).map(|&i| &self.steps[i])
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}
