//! Integration tests for the `DocumentMeta` derive.
//!
//! These live in guidebook-core because proc-macro crates can't have
//! integration tests that use their own macros.

#![allow(dead_code)]

use guidebook_core::DocumentMeta;
use pretty_assertions::assert_eq;
use serde::Deserialize;

#[derive(Debug, Deserialize, DocumentMeta)]
struct GuideMeta {
    #[validate(non_empty, max_len = 16)]
    pub title: String,
    #[validate(range(min = 1, max = 5))]
    pub weight: u8,
    #[validate(min_len = 1)]
    pub tags: Vec<String>,
    #[validate(min_len = 3)]
    pub summary: Option<String>,
    pub notes: Option<String>,
}

fn valid() -> GuideMeta {
    GuideMeta {
        title: "Buttons".to_string(),
        weight: 3,
        tags: vec!["ui".to_string()],
        summary: None,
        notes: None,
    }
}

#[test]
fn test_validate_all_valid() {
    assert_eq!(valid().validate(), Ok(()));
}

#[test]
fn test_validate_empty_title() {
    let meta = GuideMeta {
        title: String::new(),
        ..valid()
    };
    assert_eq!(meta.validate(), Err(vec!["title: must not be empty".to_string()]));
}

#[test]
fn test_validate_range_bounds() {
    let low = GuideMeta { weight: 0, ..valid() };
    assert_eq!(low.validate(), Err(vec!["weight: must be at least 1".to_string()]));

    let high = GuideMeta { weight: 6, ..valid() };
    assert_eq!(high.validate(), Err(vec!["weight: must be at most 5".to_string()]));

    let edge = GuideMeta { weight: 5, ..valid() };
    assert!(edge.validate().is_ok());
}

#[test]
fn test_validate_lengths() {
    let meta = GuideMeta {
        title: "A title far too long".to_string(),
        tags: Vec::new(),
        ..valid()
    };
    assert_eq!(
        meta.validate(),
        Err(vec![
            "title: length must be at most 16".to_string(),
            "tags: length must be at least 1".to_string(),
        ])
    );
}

#[test]
fn test_optional_fields_checked_only_when_present() {
    let short = GuideMeta {
        summary: Some("ok".to_string()),
        ..valid()
    };
    assert_eq!(short.validate(), Err(vec!["summary: length must be at least 3".to_string()]));

    let fine = GuideMeta {
        summary: Some("fine".to_string()),
        ..valid()
    };
    assert!(fine.validate().is_ok());
}

#[test]
fn test_all_violations_reported() {
    let meta = GuideMeta {
        title: String::new(),
        weight: 9,
        tags: Vec::new(),
        summary: Some(String::new()),
        notes: None,
    };
    assert_eq!(meta.validate().unwrap_err().len(), 4);
}

#[derive(Debug, Deserialize, DocumentMeta)]
struct Unconstrained {
    pub anything: Option<String>,
}

#[test]
fn test_no_rules_always_valid() {
    assert!(Unconstrained { anything: None }.validate().is_ok());
}
