#![deny(unsafe_code)]

//! Guidebook document library.
//!
//! Loads a tree of markdown documents, each carrying a query in its front
//! matter, and answers which documents apply to a given input. A document's
//! effective query is its own query conjoined with the queries of every
//! ancestor in its id path.

// Lets `#[derive(DocumentMeta)]` refer to `::guidebook_core` inside this crate.
extern crate self as guidebook_core;

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, for trait methods that must
/// stay object-safe (`dyn DocumentSource`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Loaded documents, metadata, and id derivation.
pub mod entry;
/// Front-matter header and body splitting.
pub mod frontmatter;
/// Parsing document files into entries.
pub mod loader;
/// Hierarchy-aware matching with single-flight caching.
pub mod matcher;
/// Where document files come from.
pub mod source;

pub use entry::{BasicMeta, DocumentMeta, Entry, EntryId, compute_entry_id};
pub use guidebook_macros::DocumentMeta;
pub use loader::{DocumentLoader, LoadError, LoaderOptions};
pub use matcher::{DocumentMatcher, EntryFilter, MatchError};
pub use source::{DocumentFile, DocumentSource, FsSource};

pub use guidebook_query as query;
