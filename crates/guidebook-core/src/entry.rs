//! Loaded documents and their hierarchical ids.

use std::path::{Component, Path, PathBuf};

use guidebook_query::Query;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Header fields of a document beyond its `query`.
///
/// Deserialized from the remaining header fields, then checked with
/// [`validate`](DocumentMeta::validate). Usually implemented with
/// `#[derive(DocumentMeta)]`.
pub trait DocumentMeta: DeserializeOwned + Send + Sync + 'static {
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }
}

impl DocumentMeta for serde_json::Value {}

/// Common optional header fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, guidebook_macros::DocumentMeta)]
#[serde(default)]
pub struct BasicMeta {
    #[validate(non_empty)]
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// One loaded document.
#[derive(Debug, Clone, Serialize)]
pub struct Entry<M> {
    /// `/`-separated hierarchical id derived from the file location.
    pub id: String,
    /// Type tag from the file name (`buttons.my-type.md` → `my-type`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Trimmed body, `None` when empty.
    pub content: Option<String>,
    /// Path of the source file.
    pub source: PathBuf,
    /// The document's own query. Defaults to [`Query::Never`].
    pub query: Query,
    pub meta: M,
}

impl<M> Entry<M> {
    /// Whether the body is missing or whitespace only.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(|c| c.trim().is_empty())
    }

    /// Ids of every path prefix of this entry, root first, self last.
    pub fn id_prefixes(&self) -> Vec<&str> {
        id_prefixes(&self.id)
    }
}

/// Ids of every path prefix of `id`, root first, `id` itself last.
pub fn id_prefixes(id: &str) -> Vec<&str> {
    let mut prefixes: Vec<&str> = id.match_indices('/').map(|(i, _)| &id[..i]).collect();
    prefixes.push(id);
    prefixes
}

/// An entry's identity, derived from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryId {
    pub name: String,
    pub kind: Option<String>,
}

/// Strip a leading `<digits>.` ordering prefix.
fn strip_order_prefix(stem: &str) -> &str {
    match stem.split_once('.') {
        Some((digits, rest)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => rest,
        _ => stem,
    }
}

/// Derive the id of the document at `path`, relative to `root`.
///
/// - the extension is dropped, as is a leading numeric ordering prefix
///   (`0.buttons.md` → `buttons`);
/// - text after the last remaining `.` is the type tag
///   (`buttons.with.dot.my-type.md` → `buttons.with.dot`, `my-type`);
/// - a file named like its directory collapses into it
///   (`buttons/buttons.md` → `buttons`).
pub fn compute_entry_id(root: &Path, path: &Path) -> EntryId {
    let relative = path.strip_prefix(root).unwrap_or(path);

    let mut segments: Vec<String> = relative
        .parent()
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = strip_order_prefix(&stem);

    let (base, kind) = match stem.rsplit_once('.') {
        Some((base, kind)) if !base.is_empty() && !kind.is_empty() => (base, Some(kind.to_string())),
        _ => (stem, None),
    };

    if segments.last().is_some_and(|last| last == base) {
        segments.pop();
    }
    segments.push(base.to_string());

    let name = segments
        .iter()
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("/");

    EntryId { name, kind }
}
