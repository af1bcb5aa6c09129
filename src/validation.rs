//! Validation System - Aggregating Field Checks
//!
//! Every check runs. Each returns zero or more path-scoped errors and the
//! results are appended in a fixed order. An empty report means valid.

use std::collections::BTreeMap;

use crate::build::{
    BlobSource, Binding, Bindings, Build, BuildSpec, BuilderRef, CacheConfig, GitSource, LastBuild,
    RegistrySource, SourceConfig, OS_LABEL,
};
use crate::diff;
use crate::field_error::{FieldError, FieldErrors};
use crate::reference;

/// The admission operation being validated.
///
/// Updates carry the previously admitted object they are compared against.
/// Deletes never reach validation; the admission layer allows them outright.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Create,
    Update { baseline: &'a Build },
}

impl<'a> Operation<'a> {
    pub fn is_update(&self) -> bool {
        matches!(self, Operation::Update { .. })
    }

    pub fn baseline(&self) -> Option<&'a Build> {
        match self {
            Operation::Update { baseline } => Some(*baseline),
            Operation::Create => None,
        }
    }
}

/// Validation contract shared by every section of a build
pub trait Validate {
    fn validate(&self, op: &Operation<'_>) -> FieldErrors;
}

/// Absent sections are valid
impl<T: Validate> Validate for Option<T> {
    fn validate(&self, op: &Operation<'_>) -> FieldErrors {
        match self {
            Some(inner) => inner.validate(op),
            None => FieldErrors::new(),
        }
    }
}

impl Validate for Build {
    fn validate(&self, op: &Operation<'_>) -> FieldErrors {
        self.spec.validate(op).via_field("spec")
    }
}

impl Validate for BuildSpec {
    fn validate(&self, op: &Operation<'_>) -> FieldErrors {
        list_not_empty(&self.tags, "tags")
            .also(tags(&self.tags))
            .also(self.cache.validate(op).via_field("cache"))
            .also(self.builder.validate(op).via_field("builder"))
            .also(self.source.validate(op).via_field("source"))
            .also(self.bindings.validate(op).via_field("bindings"))
            .also(self.last_build.validate(op).via_field("lastBuild"))
            .also(self.validate_immutable_fields(op))
            .also(validate_node_selector(&self.node_selector))
    }
}

impl BuildSpec {
    fn validate_immutable_fields(&self, op: &Operation<'_>) -> FieldErrors {
        let Some(baseline) = op.baseline() else {
            return FieldErrors::new();
        };

        match diff::short_diff(&baseline.spec, self) {
            Err(e) => FieldError::generic("Failed to diff Build", &[""])
                .with_details(e.to_string())
                .into(),
            Ok(changes) if !changes.is_empty() => {
                FieldError::generic("Immutable fields changed (-old +new)", &[""])
                    .with_details(changes)
                    .into()
            }
            Ok(_) => FieldErrors::new(),
        }
    }
}

fn validate_node_selector(node_selector: &BTreeMap<String, String>) -> FieldErrors {
    if node_selector.contains_key(OS_LABEL) {
        return FieldError::invalid_key_name(OS_LABEL, "nodeSelector", "os is determined automatically").into();
    }
    FieldErrors::new()
}

pub fn list_not_empty<T>(list: &[T], field: &str) -> FieldErrors {
    if list.is_empty() {
        return FieldError::missing_field(&[field]).into();
    }
    FieldErrors::new()
}

/// Each tag must be a valid tag reference; violations are index-scoped
pub fn tags(tags: &[String]) -> FieldErrors {
    tags.iter()
        .enumerate()
        .filter_map(|(i, tag)| {
            reference::validate_tag_syntax(tag).err().map(|e| {
                FieldErrors::from(FieldError::invalid_value(tag, "").with_details(e.to_string()))
                    .via_field_index("tags", i)
            })
        })
        .fold(FieldErrors::new(), |acc, errs| acc.also(errs))
}

/// Required image reference at field `image`
pub fn image(value: &str) -> FieldErrors {
    if value.is_empty() {
        return FieldError::missing_field(&["image"]).into();
    }
    match reference::validate_image_reference(value) {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldError::invalid_value(value, "image")
            .with_details(e.to_string())
            .into(),
    }
}

impl Validate for CacheConfig {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        if self.volume.is_some() && self.registry.is_some() {
            return FieldError::generic("only one type of cache can be specified", &["volume", "registry"]).into();
        }
        FieldErrors::new()
    }
}

impl Validate for LastBuild {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        // No build has happened yet
        if self.image.is_empty() {
            return FieldErrors::new();
        }
        image(&self.image)
    }
}

impl Validate for BuilderRef {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        image(&self.image)
    }
}

impl Validate for SourceConfig {
    fn validate(&self, op: &Operation<'_>) -> FieldErrors {
        let mut set = vec![];
        if self.git.is_some() {
            set.push("git");
        }
        if self.blob.is_some() {
            set.push("blob");
        }
        if self.registry.is_some() {
            set.push("registry");
        }

        match set.len() {
            0 => FieldError::missing_one_of(&["git", "blob", "registry"]).into(),
            1 => self
                .git
                .validate(op)
                .via_field("git")
                .also(self.blob.validate(op).via_field("blob"))
                .also(self.registry.validate(op).via_field("registry")),
            _ => FieldError::multiple_one_of(&set).into(),
        }
    }
}

impl Validate for GitSource {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.url.is_empty() {
            errors.push(FieldError::missing_field(&["url"]));
        }
        if self.revision.is_empty() {
            errors.push(FieldError::missing_field(&["revision"]));
        }
        errors
    }
}

impl Validate for BlobSource {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        if self.url.is_empty() {
            return FieldError::missing_field(&["url"]).into();
        }
        FieldErrors::new()
    }
}

impl Validate for RegistrySource {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        image(&self.image)
    }
}

impl Validate for Bindings {
    fn validate(&self, op: &Operation<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

        for (i, binding) in self.iter().enumerate() {
            if !binding.name.is_empty() {
                if let Some(first) = seen.insert(binding.name.as_str(), i) {
                    let first_path = format!("[{}].name", first);
                    let dup_path = format!("[{}].name", i);
                    errors.push(FieldError::generic(
                        format!("duplicate binding name {:?}", binding.name),
                        &[first_path.as_str(), dup_path.as_str()],
                    ));
                }
            }
            errors = errors.also(binding.validate(op).via_index(i));
        }
        errors
    }
}

impl Validate for Binding {
    fn validate(&self, _op: &Operation<'_>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.name.is_empty() {
            errors.push(FieldError::missing_field(&["name"]));
        }
        match &self.metadata_ref {
            None => errors.push(FieldError::missing_field(&["metadataRef"])),
            Some(r) if r.name.is_empty() => errors.push(FieldError::missing_field(&["metadataRef.name"])),
            Some(_) => {}
        }
        if matches!(&self.secret_ref, Some(r) if r.name.is_empty()) {
            errors.push(FieldError::missing_field(&["secretRef.name"]));
        }
        errors
    }
}
