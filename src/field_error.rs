//! Field Errors - Path-Annotated Validation Reports
//!
//! Checks return zero or more errors. Reports merge by concatenation.
//! Nested checks scope their paths with `via_field` / `via_index`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FieldError {
    pub fn new(message: impl Into<String>, paths: &[&str]) -> Self {
        Self {
            message: message.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn missing_field(paths: &[&str]) -> Self {
        Self::new("missing field(s)", paths)
    }

    pub fn invalid_value(value: &str, path: &str) -> Self {
        Self::new(format!("invalid value: {}", value), &[path])
    }

    /// A map key that is not allowed at `path`
    pub fn invalid_key_name(key: &str, path: &str, details: &str) -> Self {
        Self::new(format!("invalid key name {:?}", key), &[path]).with_details(details)
    }

    pub fn generic(message: impl Into<String>, paths: &[&str]) -> Self {
        Self::new(message, paths)
    }

    pub fn missing_one_of(paths: &[&str]) -> Self {
        Self::new("expected exactly one, got neither", paths)
    }

    pub fn multiple_one_of(paths: &[&str]) -> Self {
        Self::new("expected exactly one, got both", paths)
    }

    fn map_paths(mut self, f: impl Fn(&str) -> String) -> Self {
        self.paths = self.paths.iter().map(|p| f(p.as_str())).collect();
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.paths.join(", "))?;
        if let Some(details) = &self.details {
            write!(f, "\n{}", details)?;
        }
        Ok(())
    }
}

/// Ordered list of field errors. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Append another report after this one
    pub fn also(mut self, other: impl Into<FieldErrors>) -> Self {
        self.0.extend(other.into().0);
        self
    }

    /// Scope every path under field `name`
    pub fn via_field(self, name: &str) -> Self {
        self.map_paths(|p| join_field(name, p))
    }

    /// Scope every path under sequence index `index`
    pub fn via_index(self, index: usize) -> Self {
        self.map_paths(|p| join_index(index, p))
    }

    pub fn via_field_index(self, name: &str, index: usize) -> Self {
        self.via_index(index).via_field(name)
    }

    /// All paths across all errors, in report order
    pub fn paths(&self) -> Vec<&str> {
        self.0
            .iter()
            .flat_map(|e| e.paths.iter().map(String::as_str))
            .collect()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn map_paths(self, f: impl Fn(&str) -> String) -> Self {
        Self(self.0.into_iter().map(|e| e.map_paths(&f)).collect())
    }
}

fn join_field(name: &str, path: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else if path.starts_with('[') {
        format!("{}{}", name, path)
    } else {
        format!("{}.{}", name, path)
    }
}

fn join_index(index: usize, path: &str) -> String {
    if path.is_empty() {
        format!("[{}]", index)
    } else if path.starts_with('[') {
        format!("[{}]{}", index, path)
    } else {
        format!("[{}].{}", index, path)
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}
