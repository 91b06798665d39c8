use serde::{Deserialize, Serialize};

use crate::enums::{LogLevel, RetryBackoff};
use crate::step::StepDef;
use crate::transition::TransitionDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingDef {
  #[serde(default)]
  pub level: LogLevel,
  #[serde(default = "default_include_execution_data")]
  pub include_execution_data: bool,
}

impl Default for LoggingDef {
  fn default() -> Self {
    Self {
      level: LogLevel::default(),
      include_execution_data: default_include_execution_data(),
    }
  }
}

fn default_include_execution_data() -> bool {
  true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  /// Entry step; the first step when absent.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub entry: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Topic receiving failure records and dead-lettered event invocations.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure_topic: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_backoff: Option<RetryBackoff>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_initial_delay_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub logging: Option<LoggingDef>,
  pub steps: Vec<StepDef>,
  #[serde(default)]
  pub transitions: Vec<TransitionDef>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Condition, InvocationMode, TargetDef, TransitionKind};

  #[test]
  fn test_parse_workflow_def() {
    let json = r#"{
      "workflow_id": "wf",
      "name": "Workflow",
      "failure_topic": "alerts",
      "steps": [
        { "name": "step1", "target": "bin/step1", "env": { "TABLE_NAME": "TableName" } },
        { "name": "step3", "target": "bin/step3", "invocation_mode": "event", "memory_mb": 6144 }
      ],
      "transitions": [
        { "from": "step1", "kind": "choice",
          "condition": { "string_equals": { "variable": "$.state", "value": "Yes" } },
          "to": "succeed" },
        { "from": "step1", "kind": "otherwise", "to": { "step": "step3" } },
        { "from": "step3", "kind": "next", "to": "succeed" }
      ]
    }"#;

    let def: WorkflowDef = serde_json::from_str(json).unwrap();
    assert_eq!(def.steps.len(), 2);
    assert_eq!(def.steps[0].invocation_mode, InvocationMode::RequestResponse);
    assert_eq!(def.steps[1].invocation_mode, InvocationMode::Event);
    assert_eq!(def.steps[1].memory_mb, Some(6144));
    assert_eq!(def.failure_topic.as_deref(), Some("alerts"));

    assert_eq!(
      def.transitions[0].kind,
      TransitionKind::Choice {
        condition: Condition::StringEquals {
          variable: "$.state".to_string(),
          value: "Yes".to_string(),
        },
      }
    );
    assert_eq!(def.transitions[0].to, TargetDef::Succeed);
    assert_eq!(def.transitions[1].to, TargetDef::Step("step3".to_string()));
    assert_eq!(def.transitions[2].kind, TransitionKind::Next);
  }

  #[test]
  fn test_logging_defaults() {
    let logging: LoggingDef = serde_json::from_str("{}").unwrap();
    assert_eq!(logging.level, LogLevel::All);
    assert!(logging.include_execution_data);
  }
}
