//! Admission Flow - Default, Validate, Decide
//!
//! The single entry point callers use. Pure checks live in `validation`;
//! this layer resolves the operation, records the defaulting patch and
//! logs the decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::build::Build;
use crate::diff::{self, DiffError, PatchOperation};
use crate::field_error::FieldErrors;
use crate::hashing::spec_fingerprint;
use crate::validation::{Operation, Validate};

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("{0} request has no object")]
    MissingObject(OperationKind),

    #[error("UPDATE request has no oldObject to compare against")]
    MissingBaseline,

    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationKind::Create => "CREATE",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    #[serde(default)]
    pub uid: Option<String>,
    pub operation: OperationKind,
    #[serde(default)]
    pub object: Option<Build>,
    #[serde(default)]
    pub old_object: Option<Build>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDecision {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "FieldErrors::is_empty")]
    pub errors: FieldErrors,
    /// Base64 RFC 6902 patch produced by defaulting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// A build after defaulting, with the patch that produced it
#[derive(Debug, Clone)]
pub struct Defaulted {
    pub build: Build,
    pub patch: Vec<PatchOperation>,
}

/// Apply defaults to a copy of `build` and record what changed
pub fn apply_defaults(build: &Build) -> Result<Defaulted, AdmissionError> {
    let mut defaulted = build.clone();
    defaulted.set_defaults();
    let changes = diff::diff(build, &defaulted)?;
    Ok(Defaulted {
        build: defaulted,
        patch: diff::json_patch(&changes),
    })
}

/// Run the full admission flow for one request
pub fn admit(request: &AdmissionRequest) -> Result<AdmissionDecision, AdmissionError> {
    let uid = request
        .uid
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if request.operation == OperationKind::Delete {
        debug!(%uid, "delete admitted without checks");
        return Ok(AdmissionDecision {
            uid,
            allowed: true,
            errors: FieldErrors::new(),
            patch: None,
            patch_type: None,
            spec_hash: None,
            decided_at: Utc::now(),
        });
    }

    let object = request
        .object
        .as_ref()
        .ok_or(AdmissionError::MissingObject(request.operation))?;

    let op = match request.operation {
        OperationKind::Update => Operation::Update {
            baseline: request.old_object.as_ref().ok_or(AdmissionError::MissingBaseline)?,
        },
        _ => Operation::Create,
    };

    let defaulted = apply_defaults(object)?;
    debug!(%uid, operations = defaulted.patch.len(), "defaults applied");

    let errors = defaulted.build.validate(&op);
    let allowed = errors.is_empty();

    let (patch, patch_type) = if defaulted.patch.is_empty() {
        (None, None)
    } else {
        let bytes = serde_json::to_vec(&defaulted.patch)?;
        (
            Some(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)),
            Some("JSONPatch".to_string()),
        )
    };

    let spec_hash = if allowed {
        Some(spec_fingerprint(&defaulted.build.spec)?)
    } else {
        None
    };

    if allowed {
        info!(%uid, operation = %request.operation, name = %object.metadata.name, "build admitted");
    } else {
        warn!(
            %uid,
            operation = %request.operation,
            name = %object.metadata.name,
            errors = errors.len(),
            "build rejected"
        );
    }

    Ok(AdmissionDecision {
        uid,
        allowed,
        errors,
        patch,
        patch_type,
        spec_hash,
        decided_at: Utc::now(),
    })
}
