use std::time::Duration;

use cerise_config::{LoggingDef, StepDef, TargetDef, TransitionKind, WorkflowDef};
use cerise_workflow::{
  LoggingConfig, ResourceBudget, RetryPolicy, StepSpec, Target, WorkflowBuilder,
  WorkflowDefinition, WorkflowSettings, compile_condition,
};
use tracing::debug;

use crate::catalog::{AnyTarget, TargetCatalog};
use crate::error::ResolveError;

/// Resolver transforms a [`WorkflowDef`] into a frozen [`WorkflowDefinition`].
pub trait Resolver: Send + Sync {
  /// Resolve a workflow configuration.
  ///
  /// This process:
  /// 1. Checks every step target against the catalog
  /// 2. Registers steps and compiles choice conditions
  /// 3. Validates and freezes the graph
  fn resolve(&self, def: WorkflowDef) -> Result<WorkflowDefinition, ResolveError>;
}

/// Standard resolver implementation that checks targets against a catalog.
pub struct StandardResolver<C: TargetCatalog = AnyTarget> {
  catalog: C,
}

impl StandardResolver<AnyTarget> {
  pub fn permissive() -> Self {
    Self { catalog: AnyTarget }
  }
}

impl<C: TargetCatalog> StandardResolver<C> {
  /// Create a new resolver with the given target catalog.
  pub fn new(catalog: C) -> Self {
    Self { catalog }
  }

  fn settings(def: &WorkflowDef) -> WorkflowSettings {
    let defaults = WorkflowSettings::default();
    let retry = RetryPolicy {
      backoff: def.retry_backoff.unwrap_or(defaults.retry.backoff),
      initial_delay: def
        .retry_initial_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.retry.initial_delay),
      ..defaults.retry
    };
    let logging = def
      .logging
      .as_ref()
      .map(|LoggingDef { level, include_execution_data }| LoggingConfig {
        level: *level,
        include_execution_data: *include_execution_data,
      })
      .unwrap_or(defaults.logging);

    WorkflowSettings {
      timeout: def
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.timeout),
      failure_topic: def.failure_topic.clone(),
      retry,
      logging,
    }
  }

  /// Convert a step definition into a spec, checking its target.
  fn step_spec(&self, step: StepDef) -> Result<StepSpec, ResolveError> {
    if !self.catalog.contains(&step.target) {
      return Err(ResolveError::TargetNotFound {
        step: step.name,
        target: step.target,
      });
    }

    let defaults = ResourceBudget::default();
    let budget = ResourceBudget::new(
      step.memory_mb.unwrap_or(defaults.memory_mb),
      step
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.timeout),
    );

    Ok(StepSpec {
      name: step.name,
      target: step.target,
      env: step.env,
      budget,
      mode: step.invocation_mode,
      max_retry_attempts: step.max_retry_attempts.unwrap_or(0),
      comment: step.comment,
      input_path: step.input_path,
      output_path: step.output_path,
    })
  }
}

fn target(def: TargetDef) -> Target {
  match def {
    TargetDef::Step(name) => Target::Step(name),
    TargetDef::Succeed => Target::Succeeded,
    TargetDef::Fail => Target::Failed,
  }
}

impl<C: TargetCatalog> Resolver for StandardResolver<C> {
  fn resolve(&self, def: WorkflowDef) -> Result<WorkflowDefinition, ResolveError> {
    let settings = Self::settings(&def);
    let mut builder = WorkflowBuilder::with_settings(def.name, settings);

    for step in def.steps {
      builder.define_step(self.step_spec(step)?)?;
    }

    if let Some(entry) = &def.entry {
      builder.set_entry(entry)?;
    }

    for transition in def.transitions {
      let to = target(transition.to);
      match transition.kind {
        TransitionKind::Next => builder.add_transition(&transition.from, to)?,
        TransitionKind::Choice { condition } => {
          let predicate = compile_condition(&condition)?;
          builder.add_choice(&transition.from, predicate, to)?
        }
        TransitionKind::Otherwise => builder.add_otherwise(&transition.from, to)?,
      }
    }

    let definition = builder.freeze()?;
    debug!(
      workflow_id = %def.workflow_id,
      steps = definition.steps().len(),
      edges = definition.edges().len(),
      "workflow resolved"
    );
    Ok(definition)
  }
}
