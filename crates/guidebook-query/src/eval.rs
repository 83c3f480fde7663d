//! Query evaluation.

use std::collections::HashMap;

use crate::predicate::PredicateRegistry;
use crate::query::Query;

/// Memoized predicate results for a single input.
///
/// Only predicates registered with a cache key participate. A cache must not
/// be shared between different inputs.
#[derive(Debug, Default)]
pub struct EvalCache {
    results: HashMap<(String, String), bool>,
    hits: usize,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Recursive interpreter for [`Query`] trees.
pub(crate) struct Evaluator<'a, I: ?Sized> {
    registry: &'a PredicateRegistry<I>,
    cache: Option<&'a mut EvalCache>,
}

impl<'a, I: ?Sized> Evaluator<'a, I> {
    pub(crate) fn new(registry: &'a PredicateRegistry<I>, cache: Option<&'a mut EvalCache>) -> Self {
        Self { registry, cache }
    }

    pub(crate) fn apply(&mut self, query: &Query, input: &I) -> bool {
        match query {
            Query::Always => true,
            Query::Never => false,
            // Empty connectives are rejected by the schema; reaching one here
            // means validation was skipped.
            Query::And(children) if children.is_empty() => false,
            Query::And(children) => children.iter().all(|child| self.apply(child, input)),
            Query::Or(children) if children.is_empty() => false,
            Query::Or(children) => children.iter().any(|child| self.apply(child, input)),
            Query::Not(inner) => !self.apply(inner, input),
            Query::Predicate { name, config } => {
                let Some(predicate) = self.registry.get(name) else {
                    tracing::warn!(predicate = %name, "Unregistered predicate in query, treating as no match");
                    return false;
                };

                let Some(cache) = self.cache.as_deref_mut() else {
                    return predicate.test(config, input);
                };
                let Some(key) = predicate.cache_key(config, input) else {
                    return predicate.test(config, input);
                };

                let slot = (name.clone(), key);
                if let Some(hit) = cache.results.get(&slot) {
                    cache.hits += 1;
                    return *hit;
                }
                let result = predicate.test(config, input);
                cache.results.insert(slot, result);
                result
            }
        }
    }
}
