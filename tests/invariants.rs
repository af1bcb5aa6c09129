//! Contract Invariant Tests
//!
//! These tests verify the admission guarantees on builds.

use std::collections::BTreeMap;

use buildgate_core::{
    build::{BuilderRef, CacheConfig, GitSource, LastBuild, RegistryCache, SourceConfig, VolumeCache},
    Build, BuildSpec, FieldError, Operation, Validate, DEFAULT_SERVICE_ACCOUNT, OS_LABEL,
};

fn create_test_spec() -> BuildSpec {
    BuildSpec {
        tags: vec!["gcr.io/project/app".to_string()],
        builder: BuilderRef {
            image: "gcr.io/project/builder:base".to_string(),
            ..Default::default()
        },
        service_account_name: "builder-sa".to_string(),
        source: SourceConfig {
            git: Some(GitSource {
                url: "https://github.com/example/app".to_string(),
                revision: "main".to_string(),
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn create_test_build() -> Build {
    Build::new("app-build-1", create_test_spec())
}

fn errors_with_message<'a>(errs: &'a buildgate_core::FieldErrors, prefix: &str) -> Vec<&'a FieldError> {
    errs.iter().filter(|e| e.message.starts_with(prefix)).collect()
}

#[test]
fn invariant_valid_build_has_no_errors() {
    let build = create_test_build();
    let errs = build.validate(&Operation::Create);
    assert!(errs.is_empty(), "unexpected errors: {}", errs);
}

#[test]
fn invariant_empty_tags_missing_field() {
    let mut build = create_test_build();
    build.spec.tags.clear();

    let errs = build.validate(&Operation::Create);

    // Exactly the missing tags error, nothing spurious
    assert_eq!(errs.len(), 1);
    let err = errs.iter().next().unwrap();
    assert_eq!(err.message, "missing field(s)");
    assert_eq!(err.paths, vec!["spec.tags"]);
}

#[test]
fn invariant_bad_tag_reported_at_index() {
    let mut build = create_test_build();
    build.spec.tags.push("Not A Tag".to_string());

    let errs = build.validate(&Operation::Create);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs.paths(), vec!["spec.tags[1]"]);
    assert_eq!(errs.iter().next().unwrap().message, "invalid value: Not A Tag");
}

#[test]
fn invariant_both_cache_variants_one_error() {
    let mut build = create_test_build();
    build.spec.cache = Some(CacheConfig {
        volume: Some(VolumeCache { claim_name: "cache-pvc".to_string() }),
        registry: Some(RegistryCache { tag: "gcr.io/project/cache".to_string() }),
    });

    let errs = build.validate(&Operation::Create);
    assert_eq!(errs.len(), 1);
    let err = errs.iter().next().unwrap();
    assert_eq!(err.message, "only one type of cache can be specified");
    assert_eq!(err.paths, vec!["spec.cache.volume", "spec.cache.registry"]);
}

#[test]
fn invariant_single_or_no_cache_valid() {
    let mut build = create_test_build();
    for cache in [
        None,
        Some(CacheConfig::default()),
        Some(CacheConfig {
            volume: Some(VolumeCache { claim_name: "cache-pvc".to_string() }),
            registry: None,
        }),
        Some(CacheConfig {
            volume: None,
            registry: Some(RegistryCache { tag: "gcr.io/project/cache".to_string() }),
        }),
    ] {
        build.spec.cache = cache;
        assert!(build.validate(&Operation::Create).is_empty());
    }
}

#[test]
fn invariant_last_build_image_checked_when_present() {
    let mut build = create_test_build();
    build.spec.last_build = Some(LastBuild::default());
    assert!(build.validate(&Operation::Create).is_empty());

    build.spec.last_build = Some(LastBuild {
        image: "gcr.io/project/app@sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            .to_string(),
        ..Default::default()
    });
    assert!(build.validate(&Operation::Create).is_empty());

    build.spec.last_build = Some(LastBuild {
        image: "gcr.io/project/app@sha256:short".to_string(),
        ..Default::default()
    });
    let errs = build.validate(&Operation::Create);
    assert_eq!(errs.paths(), vec!["spec.lastBuild.image"]);
}

#[test]
fn invariant_update_unchanged_is_allowed() {
    let baseline = create_test_build();
    let candidate = baseline.clone();

    let errs = candidate.validate(&Operation::Update { baseline: &baseline });
    assert!(errors_with_message(&errs, "Immutable").is_empty());
    assert!(errs.is_empty());
}

#[test]
fn invariant_update_added_tag_is_immutable_violation() {
    let mut baseline = create_test_build();
    baseline.spec.tags = vec!["a".to_string()];
    let mut candidate = baseline.clone();
    candidate.spec.tags = vec!["a".to_string(), "b".to_string()];

    let errs = candidate.validate(&Operation::Update { baseline: &baseline });
    let immutable = errors_with_message(&errs, "Immutable fields changed");
    assert_eq!(immutable.len(), 1);
    assert_eq!(errs.len(), 1);

    let err = immutable[0];
    assert_eq!(err.message, "Immutable fields changed (-old +new)");
    assert_eq!(err.paths, vec!["spec"]);
    let details = err.details.as_deref().unwrap();
    assert!(details.contains("tags[1]"));
    assert!(details.contains("-: <absent>"));
    assert!(details.contains("+: \"b\""));
}

#[test]
fn invariant_any_changed_field_shows_old_and_new() {
    let baseline = create_test_build();

    let mut changed_sa = baseline.clone();
    changed_sa.spec.service_account_name = "other-sa".to_string();

    let mut changed_builder = baseline.clone();
    changed_builder.spec.builder.image = "gcr.io/project/builder:full".to_string();

    let mut changed_selector = baseline.clone();
    changed_selector
        .spec
        .node_selector
        .insert("disktype".to_string(), "ssd".to_string());

    for (candidate, old, new) in [
        (changed_sa, "\"builder-sa\"", "\"other-sa\""),
        (changed_builder, "builder:base", "builder:full"),
        (changed_selector, "<absent>", "\"ssd\""),
    ] {
        let errs = candidate.validate(&Operation::Update { baseline: &baseline });
        let immutable = errors_with_message(&errs, "Immutable fields changed");
        assert_eq!(immutable.len(), 1);
        let details = immutable[0].details.as_deref().unwrap();
        assert!(details.contains(&format!("-: {}", old)) || details.contains(old), "{}", details);
        assert!(details.contains(new), "{}", details);
    }
}

#[test]
fn invariant_create_skips_immutability() {
    let mut build = create_test_build();
    build.spec.tags.push("gcr.io/project/app:v2".to_string());
    assert!(build.validate(&Operation::Create).is_empty());
}

#[test]
fn invariant_os_node_selector_rejected() {
    let mut build = create_test_build();
    build.spec.node_selector = BTreeMap::from([
        (OS_LABEL.to_string(), "linux".to_string()),
        ("disktype".to_string(), "ssd".to_string()),
    ]);

    let errs = build.validate(&Operation::Create);
    assert_eq!(errs.len(), 1);
    let err = errs.iter().next().unwrap();
    assert_eq!(err.message, "invalid key name \"kubernetes.io/os\"");
    assert_eq!(err.paths, vec!["spec.nodeSelector"]);
    assert_eq!(err.details.as_deref(), Some("os is determined automatically"));

    build.spec.node_selector.remove(OS_LABEL);
    assert!(build.validate(&Operation::Create).is_empty());
}

#[test]
fn invariant_defaults_idempotent() {
    let mut build = create_test_build();
    build.spec.service_account_name.clear();

    build.set_defaults();
    let once = build.clone();
    build.set_defaults();

    assert_eq!(build, once);
    assert_eq!(build.spec.service_account_name, DEFAULT_SERVICE_ACCOUNT);
}

#[test]
fn invariant_defaulted_build_validates_cleanly() {
    let mut build = create_test_build();
    build.spec.service_account_name = String::new();

    build.set_defaults();
    assert_eq!(build.spec.service_account_name, "default");
    assert!(build.validate(&Operation::Create).is_empty());
}

#[test]
fn invariant_all_checks_run() {
    let mut build = create_test_build();
    build.spec.tags.clear();
    build.spec.builder.image.clear();
    build.spec.source = SourceConfig::default();
    build.spec.cache = Some(CacheConfig {
        volume: Some(VolumeCache::default()),
        registry: Some(RegistryCache::default()),
    });
    build.spec.node_selector.insert(OS_LABEL.to_string(), "windows".to_string());

    let errs = build.validate(&Operation::Create);

    // Fixed order: tags, cache, builder, source, node selector
    assert_eq!(
        errs.paths(),
        vec![
            "spec.tags",
            "spec.cache.volume",
            "spec.cache.registry",
            "spec.builder.image",
            "spec.source.git",
            "spec.source.blob",
            "spec.source.registry",
            "spec.nodeSelector",
        ]
    );
}
