//! Compiles declarative [`Condition`]s into [`Predicate`]s.

use cerise_config::Condition;
use serde_json::Value;

use crate::edge::Predicate;
use crate::error::DefinitionError;
use crate::path::PayloadPath;

enum Compiled {
  StringEquals(PayloadPath, String),
  NumericEquals(PayloadPath, f64),
  NumericGreaterThan(PayloadPath, f64),
  NumericLessThan(PayloadPath, f64),
  BooleanEquals(PayloadPath, bool),
  IsPresent(PayloadPath),
  And(Vec<Compiled>),
  Or(Vec<Compiled>),
  Not(Box<Compiled>),
}

impl Compiled {
  fn evaluate(&self, output: &Value) -> bool {
    let number = |path: &PayloadPath| path.select(output).and_then(Value::as_f64);
    match self {
      Compiled::StringEquals(path, expected) => {
        path.select(output).and_then(Value::as_str) == Some(expected.as_str())
      }
      Compiled::NumericEquals(path, expected) => number(path) == Some(*expected),
      Compiled::NumericGreaterThan(path, bound) => number(path).is_some_and(|n| n > *bound),
      Compiled::NumericLessThan(path, bound) => number(path).is_some_and(|n| n < *bound),
      Compiled::BooleanEquals(path, expected) => {
        path.select(output).and_then(Value::as_bool) == Some(*expected)
      }
      Compiled::IsPresent(path) => path.select(output).is_some_and(|v| !v.is_null()),
      Compiled::And(all) => all.iter().all(|c| c.evaluate(output)),
      Compiled::Or(any) => any.iter().any(|c| c.evaluate(output)),
      Compiled::Not(inner) => !inner.evaluate(output),
    }
  }
}

fn compile(condition: &Condition) -> Result<Compiled, DefinitionError> {
  let compiled = match condition {
    Condition::StringEquals { variable, value } => {
      Compiled::StringEquals(PayloadPath::parse(variable)?, value.clone())
    }
    Condition::NumericEquals { variable, value } => {
      Compiled::NumericEquals(PayloadPath::parse(variable)?, *value)
    }
    Condition::NumericGreaterThan { variable, value } => {
      Compiled::NumericGreaterThan(PayloadPath::parse(variable)?, *value)
    }
    Condition::NumericLessThan { variable, value } => {
      Compiled::NumericLessThan(PayloadPath::parse(variable)?, *value)
    }
    Condition::BooleanEquals { variable, value } => {
      Compiled::BooleanEquals(PayloadPath::parse(variable)?, *value)
    }
    Condition::IsPresent { variable } => Compiled::IsPresent(PayloadPath::parse(variable)?),
    Condition::And(all) => Compiled::And(all.iter().map(compile).collect::<Result<_, _>>()?),
    Condition::Or(any) => Compiled::Or(any.iter().map(compile).collect::<Result<_, _>>()?),
    Condition::Not(inner) => Compiled::Not(Box::new(compile(inner)?)),
  };
  Ok(compiled)
}

fn describe(condition: &Condition) -> String {
  let join = |parts: &[Condition], op: &str| {
    parts
      .iter()
      .map(describe)
      .collect::<Vec<_>>()
      .join(&format!(" {op} "))
  };
  match condition {
    Condition::StringEquals { variable, value } => format!("{variable} == {value:?}"),
    Condition::NumericEquals { variable, value } => format!("{variable} == {value}"),
    Condition::NumericGreaterThan { variable, value } => format!("{variable} > {value}"),
    Condition::NumericLessThan { variable, value } => format!("{variable} < {value}"),
    Condition::BooleanEquals { variable, value } => format!("{variable} == {value}"),
    Condition::IsPresent { variable } => format!("present({variable})"),
    Condition::And(all) => format!("({})", join(all.as_slice(), "&&")),
    Condition::Or(any) => format!("({})", join(any.as_slice(), "||")),
    Condition::Not(inner) => format!("!{}", describe(inner)),
  }
}

/// Compile a declarative condition, rejecting malformed paths up front.
pub fn compile_condition(condition: &Condition) -> Result<Predicate, DefinitionError> {
  let compiled = compile(condition)?;
  Ok(Predicate::new(describe(condition), move |output| {
    compiled.evaluate(output)
  }))
}
