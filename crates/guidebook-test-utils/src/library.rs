//! Temporary document libraries.
//!
//! [`TestLibrary`] owns a temp directory populated with documents; the
//! directory is deleted when the value is dropped, even on panic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use guidebook_core::{
    BasicMeta, BoxFuture, DocumentFile, DocumentLoader, DocumentMatcher, DocumentMeta, DocumentSource,
    FsSource, LoadError, LoaderOptions,
};
use guidebook_query::QueryEngine;
use tempfile::TempDir;

/// Render a document with a YAML header.
///
/// ```ignore
/// document("query:\n  contains: test1", "Body text")
/// ```
pub fn document(header: &str, body: &str) -> String {
    format!("---\n{header}\n---\n{body}")
}

/// A document tree in a temp directory.
pub struct TestLibrary {
    root: PathBuf,
    _temp_dir: TempDir,
}

impl TestLibrary {
    /// An empty library.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self {
            root: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        }
    }

    /// A library containing `files`, given as `(relative path, contents)`.
    pub async fn with_files(files: &[(&str, &str)]) -> Self {
        let library = Self::new();
        for (relative, contents) in files {
            library.write(relative, contents).await;
        }
        library
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write (or overwrite) a file, creating parent directories.
    pub async fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .expect("failed to create document directory");
        }
        tokio::fs::write(&path, contents)
            .await
            .expect("failed to write document");
    }

    pub async fn remove(&self, relative: &str) {
        tokio::fs::remove_file(self.root.join(relative))
            .await
            .expect("failed to remove document");
    }

    pub fn options(&self) -> LoaderOptions {
        LoaderOptions::new(&self.root)
    }

    /// A filesystem source over this library, wrapped to count calls.
    pub fn counting_source(&self) -> Arc<CountingSource<FsSource>> {
        let source = FsSource::new(&self.root, &[], true).expect("base patterns are valid");
        Arc::new(CountingSource::new(source))
    }

    /// A matcher over this library with the given engine.
    pub fn matcher<I: ?Sized + 'static, M: DocumentMeta>(&self, engine: QueryEngine<I>) -> DocumentMatcher<I, M> {
        let loader = DocumentLoader::new(&self.options(), engine).expect("base patterns are valid");
        DocumentMatcher::new(loader)
    }

    /// A `str` matcher with the built-in text predicates and [`BasicMeta`].
    pub fn text_matcher(&self) -> DocumentMatcher<str, BasicMeta> {
        let engine = QueryEngine::with_text_predicates().expect("built-in predicates register");
        self.matcher(engine)
    }
}

impl Default for TestLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a [`DocumentSource`] and counts listings and reads.
pub struct CountingSource<S> {
    inner: S,
    lists: AtomicUsize,
    reads: AtomicUsize,
}

impl<S: DocumentSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lists: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl<S: DocumentSource> DocumentSource for CountingSource<S> {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<DocumentFile>, LoadError>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list()
    }

    fn read_text<'a>(&'a self, file: &'a DocumentFile) -> BoxFuture<'a, Result<String, LoadError>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_text(file)
    }
}
