use std::collections::HashMap;

use serde_json::Value;

use crate::edge::{Edge, Target, Transitions};
use crate::graph::Graph;
use crate::settings::WorkflowSettings;
use crate::step::Step;

/// A validated workflow, ready for execution.
///
/// Only [`crate::WorkflowBuilder::freeze`] creates one, so every instance
/// satisfies the builder's checks. There is no way to mutate it afterwards.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
  name: String,
  entry: usize,
  steps: Vec<Step>,
  index: HashMap<String, usize>,
  transitions: HashMap<String, Transitions>,
  settings: WorkflowSettings,
}

impl WorkflowDefinition {
  pub(crate) fn new(
    name: String,
    entry: &str,
    steps: Vec<Step>,
    transitions: HashMap<String, Transitions>,
    settings: WorkflowSettings,
  ) -> Self {
    let index: HashMap<String, usize> = steps
      .iter()
      .enumerate()
      .map(|(i, s)| (s.name().to_string(), i))
      .collect();
    let entry = index.get(entry).copied().unwrap_or_default();

    Self {
      name,
      entry,
      steps,
      index,
      transitions,
      settings,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The step every execution starts at.
  pub fn entry(&self) -> &Step {
    &self.steps[self.entry]
  }

  pub fn step(&self, name: &str) -> Option<&Step> {
    self.index.get(name).map(|&i| &self.steps[i])
  }

  /// Steps in registration order.
  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn transitions(&self, step: &str) -> Option<&Transitions> {
    self.transitions.get(step)
  }

  /// Select the next step or terminal marker for a step's output.
  pub fn next(&self, step: &str, output: &Value) -> Option<&Target> {
    self.transitions.get(step)?.select(output)
  }

  /// All edges, grouped by source step in registration order.
  pub fn edges(&self) -> Vec<Edge<'_>> {
    self
      .steps
      .iter()
      .filter_map(|s| self.transitions.get(s.name()).map(|t| t.edges(s.name())))
      .flatten()
      .collect()
  }

  /// Build the step graph for traversal.
  pub fn graph(&self) -> Graph {
    let nodes: Vec<String> = self.steps.iter().map(|s| s.name().to_string()).collect();
    let edges: Vec<(String, String)> = self
      .edges()
      .iter()
      .filter_map(|e| e.to.step_name().map(|to| (e.from.to_string(), to.to_string())))
      .collect();
    Graph::new(&nodes, &edges)
  }

  pub fn settings(&self) -> &WorkflowSettings {
    &self.settings
  }
}
