//! Payload paths.
//!
//! A path is `$` (the whole payload) followed by dot-separated segments.
//! Segments index objects by key and arrays by position: `$.order.items.0`.

use std::fmt;

use serde_json::Value;

use crate::error::DefinitionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPath {
  raw: String,
  segments: Vec<String>,
}

impl PayloadPath {
  pub fn parse(raw: &str) -> Result<Self, DefinitionError> {
    let invalid = |message: &str| DefinitionError::InvalidPath {
      path: raw.to_string(),
      message: message.to_string(),
    };

    let rest = raw.strip_prefix('$').ok_or_else(|| invalid("must start with '$'"))?;
    if rest.is_empty() {
      return Ok(Self {
        raw: raw.to_string(),
        segments: Vec::new(),
      });
    }

    let rest = rest
      .strip_prefix('.')
      .ok_or_else(|| invalid("expected '.' after '$'"))?;
    let segments: Vec<String> = rest.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
      return Err(invalid("empty segment"));
    }

    Ok(Self {
      raw: raw.to_string(),
      segments,
    })
  }

  /// The root path `$`.
  pub fn root() -> Self {
    Self {
      raw: "$".to_string(),
      segments: Vec::new(),
    }
  }

  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  /// Select the value at this path, if present.
  pub fn select<'a>(&self, value: &'a Value) -> Option<&'a Value> {
    self
      .segments
      .iter()
      .try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
      })
  }
}

impl fmt::Display for PayloadPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.raw)
  }
}
