//! Image Reference Syntax
//!
//! Grammar: `[registry[:port]/]repo/path[:tag][@algorithm:hex]`.
//! The registry is optional. Tag references must not carry a digest.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Limit on registry plus repository, excluding tag and digest
const MAX_NAME_LEN: usize = 255;

lazy_static! {
    static ref HOST_PORT_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*(?::[0-9]+)?$"
    ).unwrap();
    static ref PATH_COMPONENT_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").unwrap();
    static ref TAG_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").unwrap();
    static ref DIGEST_REGEX: Regex = Regex::new(r"^(?:sha256:[a-f0-9]{64}|sha512:[a-f0-9]{128})$").unwrap();
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("reference is empty")]
    Empty,

    #[error("invalid registry {0:?}")]
    InvalidRegistry(String),

    #[error("invalid repository {0:?}")]
    InvalidRepository(String),

    #[error("repository name is {0} characters, limit is 255")]
    NameTooLong(usize),

    #[error("invalid tag {0:?}")]
    InvalidTag(String),

    #[error("invalid digest {0:?}")]
    InvalidDigest(String),

    #[error("digest is not allowed in a tag reference")]
    DigestNotAllowed,
}

/// Parsed pieces of a reference, borrowed from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub registry: Option<&'a str>,
    pub repository: &'a str,
    pub tag: Option<&'a str>,
    pub digest: Option<&'a str>,
}

/// Validate a tag reference (no digest allowed)
pub fn validate_tag_syntax(tag: &str) -> Result<(), ReferenceError> {
    let reference = parse(tag)?;
    if reference.digest.is_some() {
        return Err(ReferenceError::DigestNotAllowed);
    }
    Ok(())
}

/// Validate an image reference (tag and/or digest allowed)
pub fn validate_image_reference(image: &str) -> Result<(), ReferenceError> {
    parse(image).map(|_| ())
}

pub fn parse(input: &str) -> Result<Reference<'_>, ReferenceError> {
    if input.is_empty() {
        return Err(ReferenceError::Empty);
    }

    let (name, digest) = match input.split_once('@') {
        Some((name, digest)) => {
            if !DIGEST_REGEX.is_match(digest) {
                return Err(ReferenceError::InvalidDigest(digest.to_string()));
            }
            (name, Some(digest))
        }
        None => (input, None),
    };

    // A ':' after the last '/' separates the tag; earlier ones belong to a registry port
    let last_slash = name.rfind('/').map_or(0, |i| i + 1);
    let (name, tag) = match name[last_slash..].rfind(':') {
        Some(i) => {
            let split = last_slash + i;
            let tag = &name[split + 1..];
            if !TAG_REGEX.is_match(tag) {
                return Err(ReferenceError::InvalidTag(tag.to_string()));
            }
            (&name[..split], Some(tag))
        }
        None => (name, None),
    };

    if name.len() > MAX_NAME_LEN {
        return Err(ReferenceError::NameTooLong(name.len()));
    }

    let (registry, repository) = match name.split_once('/') {
        Some((first, rest)) if looks_like_registry(first) => {
            if !HOST_PORT_REGEX.is_match(first) {
                return Err(ReferenceError::InvalidRegistry(first.to_string()));
            }
            (Some(first), rest)
        }
        _ => (None, name),
    };

    if repository.is_empty() || !repository.split('/').all(|c| PATH_COMPONENT_REGEX.is_match(c)) {
        return Err(ReferenceError::InvalidRepository(repository.to_string()));
    }

    Ok(Reference {
        registry,
        repository,
        tag,
        digest,
    })
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}
