//! Structural Diff - Field Tree Comparison
//!
//! Both sides are serialized to a JSON value tree and walked together.
//! Sequences compare by index, mappings by key set. Any field added to the
//! model takes part without changes here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to serialize {side} value: {source}")]
    Serialize {
        side: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// One difference between the two trees. `None` means absent on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: Vec<PathSegment>,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl Change {
    /// Dotted display path, e.g. `tags[1]` or `nodeSelector["kubernetes.io/os"]`
    pub fn display_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) if is_plain_identifier(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Field(name) => out.push_str(&format!("[{:?}]", name)),
                PathSegment::Index(i) => out.push_str(&format!("[{}]", i)),
            }
        }
        if out.is_empty() {
            out.push('.');
        }
        out
    }

    /// RFC 6901 pointer, e.g. `/spec/tags/1`
    pub fn pointer(&self) -> String {
        self.path
            .iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => format!("/{}", name.replace('~', "~0").replace('/', "~1")),
                PathSegment::Index(i) => format!("/{}", i),
            })
            .collect()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.display_path())?;
        writeln!(f, "\t-: {}", render_side(&self.old))?;
        writeln!(f, "\t+: {}", render_side(&self.new))
    }
}

fn render_side(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<absent>".to_string(),
    }
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Compute every difference between `old` and `new`
pub fn diff<T: Serialize + ?Sized>(old: &T, new: &T) -> Result<Vec<Change>, DiffError> {
    let old = serde_json::to_value(old).map_err(|source| DiffError::Serialize { side: "old", source })?;
    let new = serde_json::to_value(new).map_err(|source| DiffError::Serialize { side: "new", source })?;
    Ok(diff_values(&old, &new))
}

pub fn diff_values(old: &Value, new: &Value) -> Vec<Change> {
    let mut changes = vec![];
    walk(&mut Vec::new(), old, new, &mut changes);
    changes
}

/// Human-readable diff, `-` old and `+` new. Empty when equal.
pub fn short_diff<T: Serialize + ?Sized>(old: &T, new: &T) -> Result<String, DiffError> {
    Ok(render(&diff(old, new)?))
}

pub fn render(changes: &[Change]) -> String {
    changes.iter().map(|c| c.to_string()).collect()
}

fn walk(path: &mut Vec<PathSegment>, old: &Value, new: &Value, out: &mut Vec<Change>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                path.push(PathSegment::Field(key.clone()));
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => walk(path, x, y, out),
                    (x, y) => out.push(Change {
                        path: path.clone(),
                        old: x.cloned(),
                        new: y.cloned(),
                    }),
                }
                path.pop();
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let common = a.len().min(b.len());
            for i in 0..common {
                path.push(PathSegment::Index(i));
                walk(path, &a[i], &b[i], out);
                path.pop();
            }
            for (i, added) in b.iter().enumerate().skip(common) {
                path.push(PathSegment::Index(i));
                out.push(Change { path: path.clone(), old: None, new: Some(added.clone()) });
                path.pop();
            }
            // Highest index first so removals apply cleanly as a patch
            for i in (common..a.len()).rev() {
                path.push(PathSegment::Index(i));
                out.push(Change { path: path.clone(), old: Some(a[i].clone()), new: None });
                path.pop();
            }
        }
        _ => out.push(Change {
            path: path.clone(),
            old: Some(old.clone()),
            new: Some(new.clone()),
        }),
    }
}

/// A single RFC 6902 operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Express changes as a JSON patch that turns the old tree into the new one
pub fn json_patch(changes: &[Change]) -> Vec<PatchOperation> {
    changes
        .iter()
        .map(|change| {
            let op = match (&change.old, &change.new) {
                (None, _) => "add",
                (Some(_), None) => "remove",
                (Some(_), Some(_)) => "replace",
            };
            PatchOperation {
                op: op.to_string(),
                path: change.pointer(),
                value: change.new.clone(),
            }
        })
        .collect()
}
