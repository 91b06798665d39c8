use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::step::Step;

/// Where a transition leads: another step or a terminal marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
  Step(String),
  Succeeded,
  Failed,
}

impl Target {
  pub fn step(name: impl Into<String>) -> Self {
    Target::Step(name.into())
  }

  pub fn step_name(&self) -> Option<&str> {
    match self {
      Target::Step(name) => Some(name),
      _ => None,
    }
  }
}

impl From<&Step> for Target {
  fn from(step: &Step) -> Self {
    Target::Step(step.name().to_string())
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Target::Step(name) => f.write_str(name),
      Target::Succeeded => f.write_str("<succeeded>"),
      Target::Failed => f.write_str("<failed>"),
    }
  }
}

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A named predicate over a step's output.
#[derive(Clone)]
pub struct Predicate {
  label: String,
  check: Arc<PredicateFn>,
}

impl Predicate {
  pub fn new(label: impl Into<String>, check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
    Self {
      label: label.into(),
      check: Arc::new(check),
    }
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn matches(&self, output: &Value) -> bool {
    (self.check)(output)
  }
}

impl fmt::Debug for Predicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Predicate")
      .field("label", &self.label)
      .finish_non_exhaustive()
  }
}

/// A conditional edge.
#[derive(Debug, Clone)]
pub struct Branch {
  pub predicate: Predicate,
  pub target: Target,
}

/// The outgoing transitions of one step.
#[derive(Debug, Clone)]
pub enum Transitions {
  /// A single unconditional edge.
  Next(Target),
  /// Ordered conditional edges plus the default edge.
  Choice {
    branches: Vec<Branch>,
    otherwise: Option<Target>,
  },
}

impl Transitions {
  /// Pick the edge for an output. The first matching branch wins.
  pub fn select(&self, output: &Value) -> Option<&Target> {
    match self {
      Transitions::Next(target) => Some(target),
      Transitions::Choice {
        branches,
        otherwise,
      } => branches
        .iter()
        .find(|b| b.predicate.matches(output))
        .map(|b| &b.target)
        .or(otherwise.as_ref()),
    }
  }

  /// Whether the chosen edge depends on the step's output.
  pub fn is_conditional(&self) -> bool {
    matches!(self, Transitions::Choice { branches, .. } if !branches.is_empty())
  }

  pub(crate) fn edges<'a>(&'a self, from: &'a str) -> Vec<Edge<'a>> {
    match self {
      Transitions::Next(to) => vec![Edge {
        from,
        kind: EdgeKind::Unconditional,
        to,
      }],
      Transitions::Choice {
        branches,
        otherwise,
      } => branches
        .iter()
        .map(|b| Edge {
          from,
          kind: EdgeKind::Choice(b.predicate.label()),
          to: &b.target,
        })
        .chain(otherwise.iter().map(|to| Edge {
          from,
          kind: EdgeKind::Otherwise,
          to,
        }))
        .collect(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind<'a> {
  Unconditional,
  Choice(&'a str),
  Otherwise,
}

/// A borrowed view of one edge, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<'a> {
  pub from: &'a str,
  pub kind: EdgeKind<'a>,
  pub to: &'a Target,
}

impl fmt::Display for Edge<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      EdgeKind::Unconditional => write!(f, "{} -> {}", self.from, self.to),
      EdgeKind::Choice(label) => write!(f, "{} -[{}]-> {}", self.from, label, self.to),
      EdgeKind::Otherwise => write!(f, "{} -[otherwise]-> {}", self.from, self.to),
    }
  }
}
