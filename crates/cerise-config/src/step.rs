use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::enums::InvocationMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  /// Unique within the workflow.
  pub name: String,
  /// Opaque reference to the external action, e.g. a command path.
  pub target: String,
  #[serde(default)]
  pub env: HashMap<String, String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub memory_mb: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  #[serde(default)]
  pub invocation_mode: InvocationMode,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retry_attempts: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  /// Path selecting the part of the payload handed to the action.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub input_path: Option<String>,
  /// Path selecting the part of the action's result kept as the payload.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output_path: Option<String>,
}
