//! Hierarchy matcher.
//!
//! Entries form an implicit tree through their ids: the entry `a/b/c` sits
//! below `a/b` and `a` when those exist. An entry matches an input only when
//! its own query and every ancestor's query match, so an ancestor whose query
//! is `never` hides its whole subtree.
//!
//! Loading is lazy and single-flight. The first caller in a generation starts
//! the load and stores the pending future; concurrent callers await the same
//! future. [`DocumentMatcher::refresh`] drops the generation so the next call
//! reloads from the source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use futures::future::Shared;
use guidebook_query::{EvalCache, Query, QueryEngine};
use tracing::{debug, info, warn};

use crate::BoxFuture;
use crate::entry::{DocumentMeta, Entry};
use crate::loader::{DocumentLoader, LoadError};

/// Entries in source order.
pub type Entries<M> = Arc<Vec<Arc<Entry<M>>>>;
/// Entries keyed by id.
pub type EntriesById<M> = Arc<HashMap<String, Arc<Entry<M>>>>;
/// Ancestor chain of every entry, root first, the entry itself last.
pub type ParentsMap<M> = Arc<HashMap<String, Vec<Arc<Entry<M>>>>>;

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, Arc<LoadError>>>>;

/// Errors from matching.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MatchError {
    /// The document library failed to load. Shared by every caller of the
    /// failed generation.
    #[error(transparent)]
    Load(#[from] Arc<LoadError>),
}

/// Which matched entries to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryFilter {
    /// Drop entries whose body is missing or blank.
    pub skip_empty: bool,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self { skip_empty: false }
    }

    pub fn non_empty() -> Self {
        Self { skip_empty: true }
    }

    fn admits<M>(&self, entry: &Entry<M>) -> bool {
        !(self.skip_empty && entry.is_empty())
    }
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self::non_empty()
    }
}

/// One load cycle. The derived indexes chain off the entries future, so all
/// three are created together before anything is awaited.
struct Generation<M> {
    number: u64,
    entries: SharedLoad<Entries<M>>,
    by_id: SharedLoad<EntriesById<M>>,
    parents: SharedLoad<ParentsMap<M>>,
}

impl<M: DocumentMeta> Generation<M> {
    fn start<I: ?Sized + 'static>(loader: Arc<DocumentLoader<I, M>>, number: u64) -> Self {
        let load: BoxFuture<'static, Result<Entries<M>, Arc<LoadError>>> = Box::pin(async move {
            let started = Instant::now();
            match loader.load_all().await {
                Ok(entries) => {
                    info!(
                        generation = number,
                        count = entries.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Loaded document library"
                    );
                    Ok(Arc::new(entries.into_iter().map(Arc::new).collect()))
                }
                Err(e) => {
                    warn!(generation = number, error = %e, "Document library failed to load");
                    Err(Arc::new(e))
                }
            }
        });
        let entries = load.shared();

        let by_id = entries
            .clone()
            .map(|loaded| loaded.map(|entries| Arc::new(index_by_id(&entries))))
            .boxed()
            .shared();

        let parents = by_id
            .clone()
            .map(|loaded| loaded.map(|by_id| Arc::new(ancestor_chains(&by_id))))
            .boxed()
            .shared();

        Self {
            number,
            entries,
            by_id,
            parents,
        }
    }
}

fn index_by_id<M>(entries: &[Arc<Entry<M>>]) -> HashMap<String, Arc<Entry<M>>> {
    entries
        .iter()
        .map(|entry| (entry.id.clone(), Arc::clone(entry)))
        .collect()
}

fn ancestor_chains<M>(by_id: &HashMap<String, Arc<Entry<M>>>) -> HashMap<String, Vec<Arc<Entry<M>>>> {
    by_id
        .iter()
        .map(|(id, entry)| {
            let chain = entry
                .id_prefixes()
                .into_iter()
                .filter_map(|prefix| by_id.get(prefix).cloned())
                .collect();
            (id.clone(), chain)
        })
        .collect()
}

/// The query an entry must satisfy: its own query conjoined with every
/// ancestor's, root first.
///
/// `chain` is the entry's ancestor chain including the entry itself.
pub fn effective_query<M>(entry: &Entry<M>, chain: &[Arc<Entry<M>>]) -> Query {
    let ancestors: Vec<Query> = chain
        .iter()
        .filter(|ancestor| ancestor.id != entry.id)
        .map(|ancestor| ancestor.query.clone())
        .collect();
    if ancestors.is_empty() {
        return entry.query.clone();
    }
    Query::and(ancestors.into_iter().chain(std::iter::once(entry.query.clone())))
}

/// Matches inputs against a hierarchically organised document library.
pub struct DocumentMatcher<I: ?Sized, M> {
    loader: Arc<DocumentLoader<I, M>>,
    current: Mutex<Option<Arc<Generation<M>>>>,
    generations: AtomicU64,
}

impl<I: ?Sized + 'static, M: DocumentMeta> DocumentMatcher<I, M> {
    pub fn new(loader: DocumentLoader<I, M>) -> Self {
        Self {
            loader: Arc::new(loader),
            current: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    pub fn loader(&self) -> &DocumentLoader<I, M> {
        &self.loader
    }

    pub fn engine(&self) -> &QueryEngine<I> {
        self.loader.engine()
    }

    /// Number of generations started so far.
    pub fn generations_started(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    /// The current generation, starting one if none is cached.
    fn generation(&self) -> Arc<Generation<M>> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(generation) = current.as_ref() {
            debug!(generation = generation.number, "Reusing cached document library");
            return Arc::clone(generation);
        }
        let number = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let generation = Arc::new(Generation::start(Arc::clone(&self.loader), number));
        *current = Some(Arc::clone(&generation));
        generation
    }

    /// Drop cached entries and indexes; the next call reloads.
    ///
    /// Calls already in flight keep the generation they started with.
    pub fn refresh(&self) {
        let previous = self.current.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(generation) = previous {
            debug!(generation = generation.number, "Discarded cached document library");
        }
    }

    /// Every entry, in source path order.
    pub async fn entries(&self) -> Result<Entries<M>, MatchError> {
        Ok(self.generation().entries.clone().await?)
    }

    pub async fn entries_by_id(&self) -> Result<EntriesById<M>, MatchError> {
        Ok(self.generation().by_id.clone().await?)
    }

    /// Ancestor chain of every entry, root first and self-inclusive.
    /// Prefixes with no entry of their own are skipped.
    pub async fn parents_map(&self) -> Result<ParentsMap<M>, MatchError> {
        Ok(self.generation().parents.clone().await?)
    }

    pub async fn get_one_by_id(&self, id: &str) -> Result<Option<Arc<Entry<M>>>, MatchError> {
        Ok(self.entries_by_id().await?.get(id).cloned())
    }

    /// Ancestor chain of `id`, empty when there is no such entry.
    pub async fn get_parents_by_id(&self, id: &str) -> Result<Vec<Arc<Entry<M>>>, MatchError> {
        Ok(self.parents_map().await?.get(id).cloned().unwrap_or_default())
    }

    /// Entries whose effective query matches `input`, in source path order.
    ///
    /// Queries were validated at load time and are evaluated directly.
    /// Predicate results are cached for the duration of the call.
    pub async fn match_one(&self, input: &I, filter: EntryFilter) -> Result<Vec<Arc<Entry<M>>>, MatchError> {
        let generation = self.generation();
        let entries = generation.entries.clone().await?;
        let parents = generation.parents.clone().await?;

        let engine = self.loader.engine();
        let mut cache = EvalCache::new();
        let matched: Vec<Arc<Entry<M>>> = entries
            .iter()
            .filter(|entry| filter.admits(entry))
            .filter(|entry| {
                let chain = parents.get(&entry.id).map(Vec::as_slice).unwrap_or_default();
                engine.evaluate_cached(&effective_query(entry, chain), input, &mut cache)
            })
            .cloned()
            .collect();

        debug!(
            generation = generation.number,
            matched = matched.len(),
            cache_hits = cache.hits(),
            "Matched input"
        );
        Ok(matched)
    }

    /// Entries matching any of `inputs`, each at most once, sorted by source
    /// path.
    pub async fn match_any(&self, inputs: &[&I], filter: EntryFilter) -> Result<Vec<Arc<Entry<M>>>, MatchError> {
        let matches: Vec<_> = inputs.iter().map(|input| self.match_one(input, filter)).collect();
        let results = futures::future::join_all(matches).await;

        let mut unique: HashMap<String, Arc<Entry<M>>> = HashMap::new();
        for result in results {
            for entry in result? {
                unique.insert(entry.id.clone(), entry);
            }
        }

        let mut matched: Vec<Arc<Entry<M>>> = unique.into_values().filter(|entry| filter.admits(entry)).collect();
        matched.sort_by(|a, b| a.source.as_os_str().cmp(b.source.as_os_str()));
        Ok(matched)
    }
}
