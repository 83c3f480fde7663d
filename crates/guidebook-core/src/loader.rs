//! Document loader: turns document files into validated [`Entry`] values.
//!
//! Each file's header is split from its body, the `query` field is validated
//! against the engine's [`QuerySchema`](guidebook_query::QuerySchema), and
//! the remaining fields are deserialized into the metadata type `M`. One bad
//! document fails the whole load.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use guidebook_query::{Query, QueryEngine, ValidationError};
use serde_json::{Map, Value};
use tracing::debug;

use crate::entry::{DocumentMeta, Entry, compute_entry_id};
use crate::frontmatter;
use crate::source::{DocumentFile, DocumentSource, FsSource};

/// Errors from enumerating or loading documents.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("document root does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("invalid include pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to walk document tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("document listing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed front matter in {}: {source}", path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid query in {}: {source}", path.display())]
    InvalidQuery {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("invalid front matter in {}: {reason}", path.display())]
    InvalidMetadata { path: PathBuf, reason: String },

    #[error("missing required front matter in {}: {reason}", path.display())]
    MissingFrontmatter { path: PathBuf, reason: String },
}

impl LoadError {
    /// The document this error concerns, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Frontmatter { path, .. }
            | LoadError::InvalidQuery { path, .. }
            | LoadError::InvalidMetadata { path, .. }
            | LoadError::MissingFrontmatter { path, .. } => Some(path),
            LoadError::MissingRoot(path) => Some(path),
            _ => None,
        }
    }
}

/// Where and what to load.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub root: PathBuf,
    /// Globs in addition to the base markdown patterns.
    pub include: Vec<String>,
    pub exclude_hidden: bool,
}

impl LoaderOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: Vec::new(),
            exclude_hidden: true,
        }
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.exclude_hidden = !include_hidden;
        self
    }
}

/// Loads documents from a [`DocumentSource`] into entries with metadata `M`,
/// validating queries with an engine over inputs `I`.
pub struct DocumentLoader<I: ?Sized, M> {
    source: Arc<dyn DocumentSource>,
    engine: QueryEngine<I>,
    _meta: PhantomData<fn() -> M>,
}

impl<I: ?Sized + 'static, M: DocumentMeta> DocumentLoader<I, M> {
    /// A loader reading from the filesystem.
    pub fn new(options: &LoaderOptions, engine: QueryEngine<I>) -> Result<Self, LoadError> {
        let source = FsSource::new(&options.root, &options.include, options.exclude_hidden)?;
        Ok(Self::with_source(Arc::new(source), engine))
    }

    pub fn with_source(source: Arc<dyn DocumentSource>, engine: QueryEngine<I>) -> Self {
        Self {
            source,
            engine,
            _meta: PhantomData,
        }
    }

    pub fn engine(&self) -> &QueryEngine<I> {
        &self.engine
    }

    pub fn source(&self) -> &Arc<dyn DocumentSource> {
        &self.source
    }

    /// Load every document, concurrently, in relative path order.
    pub async fn load_all(&self) -> Result<Vec<Entry<M>>, LoadError> {
        let files = self.source.list().await?;
        let loads: Vec<_> = files.iter().map(|file| self.file_to_entry(file)).collect();
        futures::future::try_join_all(loads).await
    }

    /// Read and parse a single document.
    pub async fn file_to_entry(&self, file: &DocumentFile) -> Result<Entry<M>, LoadError> {
        let text = self.source.read_text(file).await?;
        let entry = self.parse_entry(file, &text)?;
        debug!(id = %entry.id, path = %file.relative_path(), "Loaded document");
        Ok(entry)
    }

    /// Build an entry from a document's text.
    pub fn parse_entry(&self, file: &DocumentFile, text: &str) -> Result<Entry<M>, LoadError> {
        let path = file.path().to_path_buf();

        let header = frontmatter::header_data(text).map_err(|source| LoadError::Frontmatter {
            path: path.clone(),
            source,
        })?;
        let has_header = header.is_some();
        let mut fields = match header {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(fields)) => fields,
            Some(other) => {
                return Err(LoadError::InvalidMetadata {
                    path,
                    reason: format!(
                        "expected a mapping, found {}",
                        guidebook_query::error::describe(&other)
                    ),
                });
            }
        };

        let query = match fields.remove("query") {
            None => Query::Never,
            Some(raw) => self
                .engine
                .schema()
                .parse(&raw)
                .map_err(|e| LoadError::InvalidQuery {
                    path: path.clone(),
                    source: e.nested_under("/query"),
                })?,
        };

        let meta: M = match serde_json::from_value(Value::Object(fields)) {
            Ok(meta) => meta,
            Err(e) if !has_header => {
                return Err(LoadError::MissingFrontmatter {
                    path,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                return Err(LoadError::InvalidMetadata {
                    path,
                    reason: e.to_string(),
                });
            }
        };
        if let Err(errors) = meta.validate() {
            let reason = errors.join("; ");
            return Err(if has_header {
                LoadError::InvalidMetadata { path, reason }
            } else {
                LoadError::MissingFrontmatter { path, reason }
            });
        }

        let id = compute_entry_id(self.source.root(), file.path());
        let body = frontmatter::body(text).trim();

        Ok(Entry {
            id: id.name,
            kind: id.kind,
            content: (!body.is_empty()).then(|| body.to_string()),
            source: path,
            query,
            meta,
        })
    }
}
