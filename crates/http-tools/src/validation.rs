//! Argument validation against a tool's declared parameters.
//!
//! Validation never touches the network. It either produces a [`ValidatedArgs`] with defaults
//! applied, or a [`ValidationError`] listing every violation found.

use crate::descriptor::ToolDescriptor;
use serde_json::{Map, Value};
use std::fmt;

/// Arguments that passed validation, keyed by tool-facing parameter name.
///
/// Optional parameters without a default are simply absent. Unknown fields supplied by the
/// caller are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NotAnObject { found: &'static str },
    Missing { field: String },
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "arguments must be an object, got {found}"),
            Self::Missing { field } => write!(f, "missing required field '{field}'"),
            Self::WrongType {
                field,
                expected,
                found,
            } => write!(f, "field '{field}' must be {expected}, got {found}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Validate raw call arguments for `tool`.
///
/// `null` (or a missing `arguments` member, which callers pass as `null`) is treated as an empty
/// object. An explicit `null` on an optional field counts as absent.
///
/// # Errors
///
/// Returns every violation found: a non-object payload, missing required fields, or fields of
/// the wrong JSON type.
pub fn validate_arguments(
    tool: &ToolDescriptor,
    arguments: &Value,
) -> Result<ValidatedArgs, ValidationError> {
    let empty = Map::new();
    let supplied = match arguments {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ValidationError {
                violations: vec![Violation::NotAnObject {
                    found: json_type_name(other),
                }],
            });
        }
    };

    let mut out = Map::new();
    let mut violations = Vec::new();

    for param in &tool.params {
        match supplied.get(&param.name) {
            Some(Value::Null) | None => {
                if let Some(default) = &param.default {
                    out.insert(param.name.clone(), default.clone());
                } else if param.required {
                    violations.push(Violation::Missing {
                        field: param.name.clone(),
                    });
                }
            }
            Some(value) if param.kind.accepts(value) => {
                out.insert(param.name.clone(), value.clone());
            }
            Some(value) => violations.push(Violation::WrongType {
                field: param.name.clone(),
                expected: param.kind.label(),
                found: json_type_name(value),
            }),
        }
    }

    if violations.is_empty() {
        Ok(ValidatedArgs(out))
    } else {
        Err(ValidationError { violations })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
