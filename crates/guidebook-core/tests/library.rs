//! End-to-end matching over document trees on disk.

use std::sync::Arc;

use guidebook_core::query::{ConfigSchema, Query, QueryEngine};
use guidebook_core::{BasicMeta, DocumentLoader, DocumentMatcher, DocumentMeta, EntryFilter, LoadError, MatchError};
use guidebook_test_utils::{TestLibrary, document};
use pretty_assertions::assert_eq;
use serde::Deserialize;

fn ids<M>(entries: &[Arc<guidebook_core::Entry<M>>]) -> Vec<&str> {
    entries.iter().map(|e| e.id.as_str()).collect()
}

async fn nested_library() -> TestLibrary {
    TestLibrary::with_files(&[
        ("nested/level1/level1.md", &document("query:\n  never: true", "Level one")),
        ("nested/level1/pattern1.md", &document("query:\n  contains: test1", "Pattern one")),
        ("nested/pattern2.md", &document("query:\n  contains: test2", "Pattern two")),
        ("ember/0.ember.md", &document("query:\n  contains: ember", "Ember section")),
        ("ember/template/1.loops.rule.md", &document("query:\n  contains: \"{{#each\"", "Prefer each")),
        ("ember/template/0.buttons.md", &document("query:\n  glob: \"*<button*\"", "")),
        ("README.md", "No header at all"),
        ("notes.txt", "not a document"),
    ])
    .await
}

#[test_log::test(tokio::test)]
async fn test_never_ancestor_excludes_subtree() {
    let library = nested_library().await;
    let matcher = library.text_matcher();

    let matched = matcher.match_one("test1 test2", EntryFilter::all()).await.unwrap();
    assert_eq!(ids(&matched), vec!["nested/pattern2"]);
}

#[tokio::test]
async fn test_ancestor_queries_are_conjoined() {
    let library = nested_library().await;
    let matcher = library.text_matcher();

    let plain = matcher.match_one("{{#each items}}", EntryFilter::all()).await.unwrap();
    assert!(plain.is_empty());

    let ember = matcher
        .match_one("ember app: {{#each items}}", EntryFilter::all())
        .await
        .unwrap();
    assert_eq!(ids(&ember), vec!["ember", "ember/template/loops"]);
    assert_eq!(ember[1].kind.as_deref(), Some("rule"));
}

#[tokio::test]
async fn test_skip_empty_drops_blank_bodies() {
    let library = nested_library().await;
    let matcher = library.text_matcher();
    let input = "ember <button>";

    let all = matcher.match_one(input, EntryFilter::all()).await.unwrap();
    assert_eq!(ids(&all), vec!["ember", "ember/template/buttons"]);

    let non_empty = matcher.match_one(input, EntryFilter::non_empty()).await.unwrap();
    assert_eq!(ids(&non_empty), vec!["ember"]);
    assert_eq!(all[1].content, None);
}

#[tokio::test]
async fn test_match_any_unions_inputs() {
    let library = nested_library().await;
    let matcher = library.text_matcher();

    let matched = matcher
        .match_any(&["test2", "ember {{#each}}", "test2 ember"], EntryFilter::non_empty())
        .await
        .unwrap();
    assert_eq!(ids(&matched), vec!["ember", "ember/template/loops", "nested/pattern2"]);

    let sources: Vec<String> = matched.iter().map(|e| e.source.display().to_string()).collect();
    let mut sorted = sources.clone();
    sorted.sort();
    assert_eq!(sources, sorted);
}

#[tokio::test]
async fn test_match_any_sorts_by_path_string() {
    let library = TestLibrary::with_files(&[
        ("a/b.md", &document("query:\n  always: true", "B")),
        ("a-b/x.md", &document("query:\n  always: true", "X")),
    ])
    .await;
    let matcher = library.text_matcher();

    let one = matcher.match_one("anything", EntryFilter::all()).await.unwrap();
    let any = matcher.match_any(&["anything", "else"], EntryFilter::all()).await.unwrap();
    assert_eq!(ids(&one), vec!["a-b/x", "a/b"]);
    assert_eq!(ids(&any), ids(&one));
}

#[tokio::test]
async fn test_document_without_header_never_matches() {
    let library = nested_library().await;
    let matcher = library.text_matcher();

    let readme = matcher.get_one_by_id("README").await.unwrap().unwrap();
    assert_eq!(readme.query, Query::Never);
    assert_eq!(readme.content.as_deref(), Some("No header at all"));

    let entries = matcher.entries().await.unwrap();
    assert_eq!(entries.len(), 7);
}

#[tokio::test]
async fn test_parents_by_id() {
    let library = nested_library().await;
    let matcher = library.text_matcher();

    let chain = matcher.get_parents_by_id("ember/template/loops").await.unwrap();
    assert_eq!(ids(&chain), vec!["ember", "ember/template/loops"]);
}

#[tokio::test]
async fn test_concurrent_loads_read_once() {
    guidebook_test_utils::init_test_tracing();
    let library = nested_library().await;
    let source = library.counting_source();
    let engine = QueryEngine::with_text_predicates().unwrap();
    let matcher: DocumentMatcher<str, BasicMeta> =
        DocumentMatcher::new(DocumentLoader::with_source(source.clone(), engine));

    let (a, b) = tokio::join!(matcher.entries(), matcher.entries());
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(source.lists(), 1);
    assert_eq!(source.reads(), 7);

    matcher.match_any(&["x", "y"], EntryFilter::all()).await.unwrap();
    assert_eq!(source.lists(), 1);
}

#[test_log::test(tokio::test)]
async fn test_refresh_picks_up_changes() {
    let library = nested_library().await;
    let matcher = library.text_matcher();

    assert!(matcher.match_one("fresh", EntryFilter::all()).await.unwrap().is_empty());

    library
        .write("fresh.md", &document("query:\n  contains: fresh", "New guide"))
        .await;
    assert!(matcher.match_one("fresh", EntryFilter::all()).await.unwrap().is_empty());

    matcher.refresh();
    let matched = matcher.match_one("fresh", EntryFilter::all()).await.unwrap();
    assert_eq!(ids(&matched), vec!["fresh"]);
}

#[tokio::test]
async fn test_one_bad_document_fails_the_load() {
    let library = nested_library().await;
    library
        .write("broken.md", &document("query:\n  and:\n    - always: true", "Broken"))
        .await;
    let matcher = library.text_matcher();

    let MatchError::Load(err) = matcher.match_one("anything", EntryFilter::all()).await.unwrap_err();
    let LoadError::InvalidQuery { path, source } = err.as_ref() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(path, &library.root().join("broken.md"));
    assert_eq!(source.violations[0].path, "/query/and");

    library.remove("broken.md").await;
    matcher.refresh();
    assert!(matcher.entries().await.is_ok());
}

#[derive(Debug, Deserialize, guidebook_core::DocumentMeta)]
struct OwnedMeta {
    #[validate(non_empty)]
    owner: String,
    #[validate(range(min = 1, max = 5))]
    priority: Option<u8>,
}

#[tokio::test]
async fn test_custom_metadata() {
    let library = TestLibrary::with_files(&[
        ("a.md", &document("query:\n  always: true\nowner: docs\npriority: 2", "A")),
        ("b.md", &document("owner: docs", "B")),
    ])
    .await;
    let matcher: DocumentMatcher<str, OwnedMeta> = library.matcher(QueryEngine::new());

    let entries = matcher.entries().await.unwrap();
    assert_eq!(entries[0].meta.owner, "docs");
    assert_eq!(entries[0].meta.priority, Some(2));
    assert_eq!(entries[1].meta.priority, None);
    assert!(entries.iter().all(|e| e.meta.validate().is_ok()));
}

#[tokio::test]
async fn test_custom_metadata_violations() {
    let library = TestLibrary::with_files(&[("a.md", &document("owner: docs\npriority: 9", "A"))]).await;
    let matcher: DocumentMatcher<str, OwnedMeta> = library.matcher(QueryEngine::new());

    let MatchError::Load(err) = matcher.entries().await.unwrap_err();
    assert!(err.to_string().contains("priority: must be at most 5"), "{err}");
}

#[tokio::test]
async fn test_missing_required_frontmatter() {
    let library = TestLibrary::with_files(&[("plain.md", "Just a body")]).await;
    let matcher: DocumentMatcher<str, OwnedMeta> = library.matcher(QueryEngine::new());

    let MatchError::Load(err) = matcher.entries().await.unwrap_err();
    assert!(matches!(err.as_ref(), LoadError::MissingFrontmatter { .. }), "{err}");
}

#[derive(Debug, Deserialize, guidebook_core::DocumentMeta)]
struct DefaultedOwner {
    #[serde(default)]
    #[validate(non_empty)]
    owner: String,
}

#[tokio::test]
async fn test_missing_frontmatter_with_defaulted_fields() {
    let library = TestLibrary::with_files(&[("plain.md", "Just a body")]).await;
    let matcher: DocumentMatcher<str, DefaultedOwner> = library.matcher(QueryEngine::new());

    let MatchError::Load(err) = matcher.entries().await.unwrap_err();
    let LoadError::MissingFrontmatter { path, reason } = err.as_ref() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(path, &library.root().join("plain.md"));
    assert_eq!(reason, "owner: must not be empty");
}

#[tokio::test]
async fn test_structured_input() {
    struct Project {
        files: Vec<String>,
        framework: String,
    }

    let engine = QueryEngine::<Project>::new()
        .add_predicate("framework", ConfigSchema::string(), |name: &String, p: &Project| {
            &p.framework == name
        })
        .unwrap()
        .add_predicate("has_file", ConfigSchema::string(), |file: &String, p: &Project| {
            p.files.iter().any(|f| f == file)
        })
        .unwrap();

    let library = TestLibrary::with_files(&[
        ("ember/ember.md", &document("query:\n  framework: ember", "Ember")),
        (
            "ember/typescript.md",
            &document("query:\n  has_file: tsconfig.json", "Typed Ember"),
        ),
        ("react.md", &document("query:\n  framework: react", "React")),
    ])
    .await;
    let matcher: DocumentMatcher<Project, BasicMeta> = library.matcher(engine);

    let project = Project {
        files: vec!["tsconfig.json".to_string()],
        framework: "ember".to_string(),
    };
    let matched = matcher.match_one(&project, EntryFilter::all()).await.unwrap();
    assert_eq!(ids(&matched), vec!["ember", "ember/typescript"]);
}
