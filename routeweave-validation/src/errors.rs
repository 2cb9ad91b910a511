// Validation errors

use std::fmt;
use thiserror::Error;

/// A single schema mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending value; `value` for the root
    pub path: String,

    /// Human readable message, e.g. `"name" is required`
    pub message: String,

    /// Rule that failed, e.g. `any.required` or `string.min`
    pub constraint: String,

    /// Offending value rendered as JSON, when there was one
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            constraint: "custom".to_string(),
            value: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// All mismatches found for one value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    pub fn get_path_errors(&self, path: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.path == path).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "errors": self.errors.iter().map(|e| {
                serde_json::json!({
                    "path": e.path,
                    "message": e.message,
                    "constraint": e.constraint,
                    "value": e.value,
                })
            }).collect::<Vec<_>>()
        })
    }
}

/// Messages joined with `". "`, matching how a single-line error reads.
impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str(". ")?;
            }
            first = false;
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}

/// A schema description could not be turned into a [`Schema`](crate::Schema).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("unknown schema type '{0}'")]
    UnknownType(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidRule { key: String, reason: String },
}
