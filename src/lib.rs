//! Buildgate Core - Build Configuration Admission
//!
//! # Admission Rules
//! 1. Defaults are applied before validation
//! 2. Every check runs; all failures are reported together
//! 3. Errors carry the exact field path they apply to
//! 4. An admitted spec never changes

pub mod build;
pub mod field_error;
pub mod reference;
pub mod validation;
pub mod diff;
pub mod hashing;
pub mod admission;
pub mod manifest;

pub use build::{Build, BuildSpec, CacheConfig, LastBuild, DEFAULT_SERVICE_ACCOUNT, OS_LABEL};
pub use field_error::{FieldError, FieldErrors};
pub use reference::{validate_image_reference, validate_tag_syntax, ReferenceError};
pub use validation::{Operation, Validate};
pub use diff::{short_diff, DiffError};
pub use hashing::spec_fingerprint;
pub use admission::{admit, apply_defaults, AdmissionDecision, AdmissionError, AdmissionRequest, OperationKind};
pub use manifest::{load_build, LoadError};
