//! Declarative choice conditions.
//!
//! Each leaf condition names a `variable`, a path into the payload produced by
//! the source step:
//!
//! ```json
//! { "string_equals": { "variable": "$.state", "value": "Yes" } }
//! { "and": [
//!     { "is_present": { "variable": "$.order.id" } },
//!     { "numeric_greater_than": { "variable": "$.order.total", "value": 100 } }
//! ] }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
  StringEquals { variable: String, value: String },
  NumericEquals { variable: String, value: f64 },
  NumericGreaterThan { variable: String, value: f64 },
  NumericLessThan { variable: String, value: f64 },
  BooleanEquals { variable: String, value: bool },
  IsPresent { variable: String },
  And(Vec<Condition>),
  Or(Vec<Condition>),
  Not(Box<Condition>),
}
