use std::collections::HashMap;

use crate::definition::WorkflowDefinition;
use crate::edge::{Branch, Predicate, Target, Transitions};
use crate::error::DefinitionError;
use crate::graph::Graph;
use crate::registry::StepRegistry;
use crate::settings::WorkflowSettings;
use crate::step::{Step, StepSpec};

/// Assembles steps and transitions into a [`WorkflowDefinition`].
///
/// # Usage
///
/// ```
/// use cerise_workflow::{Predicate, StepSpec, Target, WorkflowBuilder};
///
/// let mut builder = WorkflowBuilder::new("approvals");
/// let check = builder.define_step(StepSpec::new("check", "bin/check")).unwrap();
/// let notify = builder.define_step(StepSpec::new("notify", "bin/notify")).unwrap();
///
/// let approved = Predicate::new("approved", |out| out["approved"] == true);
/// builder.add_choice(&check, approved, Target::Succeeded).unwrap();
/// builder.add_otherwise(&check, &notify).unwrap();
/// builder.add_transition(&notify, Target::Failed).unwrap();
///
/// let definition = builder.freeze().unwrap();
/// assert_eq!(definition.entry().name(), "check");
/// ```
#[derive(Debug)]
pub struct WorkflowBuilder {
  name: String,
  settings: WorkflowSettings,
  registry: StepRegistry,
  entry: Option<String>,
  transitions: HashMap<String, Transitions>,
  frozen: bool,
}

impl WorkflowBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self::with_settings(name, WorkflowSettings::default())
  }

  pub fn with_settings(name: impl Into<String>, settings: WorkflowSettings) -> Self {
    Self {
      name: name.into(),
      registry: StepRegistry::new(settings.failure_topic.clone()),
      settings,
      entry: None,
      transitions: HashMap::new(),
      frozen: false,
    }
  }

  pub fn is_frozen(&self) -> bool {
    self.frozen
  }

  pub fn registry(&self) -> &StepRegistry {
    &self.registry
  }

  fn ensure_mutable(&self) -> Result<(), DefinitionError> {
    if self.frozen {
      return Err(DefinitionError::DefinitionFrozen);
    }
    Ok(())
  }

  fn ensure_source(&self, from: &str) -> Result<(), DefinitionError> {
    self.ensure_mutable()?;
    if !self.registry.contains(from) {
      return Err(DefinitionError::UnknownStep(from.to_string()));
    }
    Ok(())
  }

  /// Register a step.
  pub fn define_step(&mut self, spec: StepSpec) -> Result<Step, DefinitionError> {
    self.ensure_mutable()?;
    self.registry.define_step(spec)
  }

  /// Override the entry point. Defaults to the first defined step.
  pub fn set_entry(&mut self, step: impl AsRef<str>) -> Result<(), DefinitionError> {
    let step = step.as_ref();
    self.ensure_source(step)?;
    self.entry = Some(step.to_string());
    Ok(())
  }

  /// Add the single unconditional edge of `from`.
  pub fn add_transition(
    &mut self,
    from: impl AsRef<str>,
    to: impl Into<Target>,
  ) -> Result<(), DefinitionError> {
    let from = from.as_ref();
    self.ensure_source(from)?;
    if self.transitions.contains_key(from) {
      return Err(DefinitionError::ConflictingTransition(from.to_string()));
    }
    self
      .transitions
      .insert(from.to_string(), Transitions::Next(to.into()));
    Ok(())
  }

  /// Append a conditional edge. Choices are evaluated in the order added.
  pub fn add_choice(
    &mut self,
    from: impl AsRef<str>,
    predicate: Predicate,
    to: impl Into<Target>,
  ) -> Result<(), DefinitionError> {
    let from = from.as_ref();
    self.ensure_source(from)?;
    let branch = Branch {
      predicate,
      target: to.into(),
    };

    match self.transitions.get_mut(from) {
      None => {
        self.transitions.insert(
          from.to_string(),
          Transitions::Choice {
            branches: vec![branch],
            otherwise: None,
          },
        );
      }
      Some(Transitions::Next(_)) => {
        return Err(DefinitionError::ConflictingTransition(from.to_string()));
      }
      Some(Transitions::Choice {
        otherwise: Some(_), ..
      }) => {
        return Err(DefinitionError::ChoiceAfterOtherwise(from.to_string()));
      }
      Some(Transitions::Choice { branches, .. }) => branches.push(branch),
    }
    Ok(())
  }

  /// Set the default edge taken when no choice of `from` matches.
  pub fn add_otherwise(
    &mut self,
    from: impl AsRef<str>,
    to: impl Into<Target>,
  ) -> Result<(), DefinitionError> {
    let from = from.as_ref();
    self.ensure_source(from)?;

    match self.transitions.get_mut(from) {
      None => {
        self.transitions.insert(
          from.to_string(),
          Transitions::Choice {
            branches: Vec::new(),
            otherwise: Some(to.into()),
          },
        );
      }
      Some(Transitions::Next(_)) => {
        return Err(DefinitionError::ConflictingTransition(from.to_string()));
      }
      Some(Transitions::Choice {
        otherwise: Some(_), ..
      }) => {
        return Err(DefinitionError::DuplicateOtherwise(from.to_string()));
      }
      Some(Transitions::Choice { otherwise, .. }) => *otherwise = Some(to.into()),
    }
    Ok(())
  }

  fn entry_name(&self) -> Result<&str, DefinitionError> {
    match &self.entry {
      Some(entry) => Ok(entry),
      None => self
        .registry
        .steps()
        .first()
        .map(|s| s.name())
        .ok_or(DefinitionError::NoEntryPoint),
    }
  }

  /// Check the graph without freezing it.
  pub fn validate(&self) -> Result<(), DefinitionError> {
    if self.settings.timeout.is_zero() {
      return Err(DefinitionError::ZeroWorkflowTimeout);
    }
    let entry = self.entry_name()?;
    let names: Vec<String> = self
      .registry
      .steps()
      .iter()
      .map(|s| s.name().to_string())
      .collect();

    let mut all_edges = Vec::new();
    // Edges whose selection does not depend on output; a cycle made only of
    // these can never be left.
    let mut unguarded_edges = Vec::new();

    for name in &names {
      let transitions = self
        .transitions
        .get(name)
        .ok_or_else(|| DefinitionError::MissingTransition(name.clone()))?;

      if matches!(
        transitions,
        Transitions::Choice { branches, otherwise: None } if !branches.is_empty()
      ) {
        return Err(DefinitionError::MissingOtherwise(name.clone()));
      }

      for edge in transitions.edges(name) {
        let Some(to) = edge.to.step_name() else {
          continue;
        };
        if !self.registry.contains(to) {
          return Err(DefinitionError::UnknownTarget {
            from: name.clone(),
            to: to.to_string(),
          });
        }
        all_edges.push((name.clone(), to.to_string()));
        if !transitions.is_conditional() {
          unguarded_edges.push((name.clone(), to.to_string()));
        }
      }
    }

    if let Some(cycle) = Graph::new(&names, &unguarded_edges).find_cycle() {
      return Err(DefinitionError::CyclicGraph { cycle });
    }

    let reachable = Graph::new(&names, &all_edges).reachable_from(entry);
    if let Some(unreachable) = names.iter().find(|n| !reachable.contains(*n)) {
      return Err(DefinitionError::UnreachableStep(unreachable.clone()));
    }

    Ok(())
  }

  /// Validate and produce the immutable definition. Every later mutation
  /// attempt on this builder fails with [`DefinitionError::DefinitionFrozen`].
  pub fn freeze(&mut self) -> Result<WorkflowDefinition, DefinitionError> {
    self.ensure_mutable()?;
    self.validate()?;
    let entry = self.entry_name()?.to_string();
    self.frozen = true;

    Ok(WorkflowDefinition::new(
      self.name.clone(),
      &entry,
      self.registry.steps().to_vec(),
      self.transitions.clone(),
      self.settings.clone(),
    ))
  }
}
