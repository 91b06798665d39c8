use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Where a transition leads.
///
/// Serialized as `"succeed"`, `"fail"` or `{ "step": "step2" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDef {
  Step(String),
  Succeed,
  Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionKind {
  /// Unconditional edge.
  Next,
  /// Conditional edge, evaluated in declaration order.
  Choice { condition: Condition },
  /// Default edge taken when no choice matches.
  Otherwise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDef {
  pub from: String,
  #[serde(flatten)]
  pub kind: TransitionKind,
  pub to: TargetDef,
}
