//! Document sources: where document files come from.
//!
//! [`FsSource`] walks a directory tree and keeps files whose root-relative
//! path matches one of its glob patterns. The markdown patterns in
//! [`BASE_PATTERNS`] are always included.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::BoxFuture;
use crate::loader::LoadError;

/// Patterns every source includes.
pub const BASE_PATTERNS: [&str; 2] = ["**/*.md", "**/*.markdown"];

/// A document file found by a source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentFile {
    path: PathBuf,
    relative: String,
}

impl DocumentFile {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative = relative_string(path.strip_prefix(root).unwrap_or(&path));
        Self { path, relative }
    }

    /// Full path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `/`-separated path relative to the source root.
    pub fn relative_path(&self) -> &str {
        &self.relative
    }
}

fn relative_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Enumerates and reads document files.
pub trait DocumentSource: Send + Sync {
    /// Directory ids are computed against.
    fn root(&self) -> &Path;

    /// All matching files, sorted by relative path.
    fn list(&self) -> BoxFuture<'_, Result<Vec<DocumentFile>, LoadError>>;

    /// Read a file as UTF-8 text.
    fn read_text<'a>(&'a self, file: &'a DocumentFile) -> BoxFuture<'a, Result<String, LoadError>>;
}

/// Filesystem-backed [`DocumentSource`].
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    patterns: Vec<Pattern>,
    exclude_hidden: bool,
}

impl FsSource {
    /// Create a source rooted at `root` that also includes `extra_patterns`.
    pub fn new(root: impl Into<PathBuf>, extra_patterns: &[String], exclude_hidden: bool) -> Result<Self, LoadError> {
        let patterns = BASE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(extra_patterns.iter().cloned())
            .map(|p| {
                Pattern::new(&p).map_err(|source| LoadError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: root.into(),
            patterns,
            exclude_hidden,
        })
    }

    fn is_included(&self, relative: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns.iter().any(|p| p.matches_with(relative, options))
    }

    fn walk(&self) -> Result<Vec<DocumentFile>, LoadError> {
        let exclude_hidden = self.exclude_hidden;
        let walker = walkdir::WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0 || !exclude_hidden || !entry.file_name().to_string_lossy().starts_with('.')
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = DocumentFile::new(&self.root, entry.into_path());
            if self.is_included(file.relative_path()) {
                files.push(file);
            }
        }
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }
}

impl DocumentSource for FsSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<DocumentFile>, LoadError>> {
        Box::pin(async move {
            let exists = tokio::fs::try_exists(&self.root).await.map_err(|source| LoadError::Io {
                path: self.root.clone(),
                source,
            })?;
            if !exists {
                return Err(LoadError::MissingRoot(self.root.clone()));
            }
            let source = self.clone();
            let files = tokio::task::spawn_blocking(move || source.walk()).await??;
            debug!(root = %self.root.display(), count = files.len(), "Enumerated document files");
            Ok(files)
        })
    }

    fn read_text<'a>(&'a self, file: &'a DocumentFile) -> BoxFuture<'a, Result<String, LoadError>> {
        Box::pin(async move {
            tokio::fs::read_to_string(file.path())
                .await
                .map_err(|source| LoadError::Io {
                    path: file.path().to_path_buf(),
                    source,
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "body").unwrap();
    }

    #[tokio::test]
    async fn test_lists_markdown_sorted() {
        let tmp = TempDir::new().unwrap();
        for rel in ["b.md", "a/z.md", "a/b/c.markdown", "notes.txt", "a/image.png"] {
            write(tmp.path(), rel);
        }

        let source = FsSource::new(tmp.path(), &[], true).unwrap();
        let files = source.list().await.unwrap();
        let relative: Vec<&str> = files.iter().map(|f| f.relative_path()).collect();
        assert_eq!(relative, vec!["a/b/c.markdown", "a/z.md", "b.md"]);
    }

    #[tokio::test]
    async fn test_extra_patterns() {
        let tmp = TempDir::new().unwrap();
        for rel in ["a.md", "rules/x.txt", "other/y.txt"] {
            write(tmp.path(), rel);
        }

        let source = FsSource::new(tmp.path(), &["rules/*.txt".to_string()], true).unwrap();
        let files = source.list().await.unwrap();
        let relative: Vec<&str> = files.iter().map(|f| f.relative_path()).collect();
        assert_eq!(relative, vec!["a.md", "rules/x.txt"]);
    }

    #[tokio::test]
    async fn test_hidden_entries_skipped() {
        let tmp = TempDir::new().unwrap();
        for rel in [".drafts/a.md", ".hidden.md", "shown.md"] {
            write(tmp.path(), rel);
        }

        let hidden_out = FsSource::new(tmp.path(), &[], true).unwrap().list().await.unwrap();
        assert_eq!(hidden_out.len(), 1);

        let hidden_in = FsSource::new(tmp.path(), &[], false).unwrap().list().await.unwrap();
        assert_eq!(hidden_in.len(), 3);
    }

    #[test]
    fn test_bad_pattern() {
        let err = FsSource::new("/tmp", &["a[".to_string()], true).unwrap_err();
        assert!(matches!(err, LoadError::Pattern { .. }));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let source = FsSource::new("/nonexistent/guidebook/root", &[], true).unwrap();
        assert!(matches!(source.list().await, Err(LoadError::MissingRoot(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_root_is_io_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md");
        let root = tmp.path().join("a.md").join("guides");

        let source = FsSource::new(&root, &[], true).unwrap();
        let err = source.list().await.unwrap_err();
        let LoadError::Io { path, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(path, &root);
    }

    #[tokio::test]
    async fn test_read_text() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md");
        let source = FsSource::new(tmp.path(), &[], true).unwrap();
        let file = DocumentFile::new(tmp.path(), tmp.path().join("a.md"));
        assert_eq!(source.read_text(&file).await.unwrap(), "body");
        assert_eq!(file.relative_path(), "a.md");
    }
}
