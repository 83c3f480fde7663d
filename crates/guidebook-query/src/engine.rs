//! The query engine facade.
//!
//! A [`QueryEngine`] bundles a predicate registry, the schema derived from
//! it, and the evaluator. Engines are values: registering a predicate
//! returns a new engine and leaves the receiver unchanged.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::QueryError;
use crate::eval::{EvalCache, Evaluator};
use crate::predicate::{ConfigSchema, Predicate, PredicateRegistry};
use crate::query::Query;
use crate::schema::QuerySchema;

/// Options for [`QueryEngine::matches`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Trust the query instead of validating it first. Unknown keys and
    /// malformed connectives then evaluate to "no match" instead of failing.
    pub skip_query_validation: bool,
}

impl MatchOptions {
    pub fn trusted() -> Self {
        Self {
            skip_query_validation: true,
        }
    }
}

/// Registry, schema, and evaluator for queries over inputs of type `I`.
pub struct QueryEngine<I: ?Sized> {
    registry: PredicateRegistry<I>,
    schema: QuerySchema,
}

impl<I: ?Sized + 'static> QueryEngine<I> {
    /// An engine with no predicates; only connectives and constants are valid.
    pub fn new() -> Self {
        Self::from_registry(PredicateRegistry::new())
    }

    pub fn from_registry(registry: PredicateRegistry<I>) -> Self {
        let schema = QuerySchema::build(&registry);
        Self { registry, schema }
    }

    /// Return a new engine with an extra predicate.
    ///
    /// `handler` is called with the deserialized config and the input.
    pub fn add_predicate<C, F>(
        &self,
        name: impl Into<String>,
        config_schema: ConfigSchema,
        handler: F,
    ) -> Result<Self, QueryError>
    where
        C: DeserializeOwned + 'static,
        F: Fn(&C, &I) -> bool + Send + Sync + 'static,
    {
        self.with_predicate(Predicate::new(name, config_schema, handler))
    }

    /// Like [`add_predicate`](Self::add_predicate), memoizing results under
    /// `cache_key(config, input)` when evaluated with an [`EvalCache`].
    pub fn add_predicate_with_cache_key<C, F, K>(
        &self,
        name: impl Into<String>,
        config_schema: ConfigSchema,
        handler: F,
        cache_key: K,
    ) -> Result<Self, QueryError>
    where
        C: DeserializeOwned + 'static,
        F: Fn(&C, &I) -> bool + Send + Sync + 'static,
        K: Fn(&C, &I) -> String + Send + Sync + 'static,
    {
        self.with_predicate(Predicate::new(name, config_schema, handler).with_cache_key(cache_key))
    }

    /// Return a new engine with a pre-built predicate appended.
    pub fn with_predicate(&self, predicate: Predicate<I>) -> Result<Self, QueryError> {
        let registry = self.registry.with(predicate)?;
        tracing::debug!(predicates = ?registry.names(), "Query engine extended");
        Ok(Self::from_registry(registry))
    }
}

impl<I: ?Sized> QueryEngine<I> {
    /// The validator for this engine's query grammar.
    pub fn schema(&self) -> &QuerySchema {
        &self.schema
    }

    pub fn registry(&self) -> &PredicateRegistry<I> {
        &self.registry
    }

    pub fn predicate_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Validate a raw query value into a [`Query`].
    pub fn parse(&self, value: &Value) -> Result<Query, QueryError> {
        Ok(self.schema.parse(value)?)
    }

    /// Decide whether `query` matches `input`.
    ///
    /// A missing query never matches, and is not validated. Otherwise the
    /// query is validated first unless `options.skip_query_validation` is set.
    pub fn matches(&self, query: Option<&Value>, input: &I, options: MatchOptions) -> Result<bool, QueryError> {
        let Some(value) = query else {
            return Ok(false);
        };
        let query = if options.skip_query_validation {
            self.schema.lenient(value)
        } else {
            self.schema.parse(value)?
        };
        Ok(self.evaluate(&query, input))
    }

    /// Evaluate an already-validated query.
    pub fn evaluate(&self, query: &Query, input: &I) -> bool {
        Evaluator::new(&self.registry, None).apply(query, input)
    }

    /// Evaluate an already-validated query, memoizing predicate results in
    /// `cache`. The cache must belong to this `input`.
    pub fn evaluate_cached(&self, query: &Query, input: &I, cache: &mut EvalCache) -> bool {
        Evaluator::new(&self.registry, Some(cache)).apply(query, input)
    }
}

impl<I: ?Sized + 'static> Default for QueryEngine<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized> Clone for QueryEngine<I> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl<I: ?Sized> fmt::Debug for QueryEngine<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryEngine")
            .field("predicates", &self.registry.names())
            .finish()
    }
}
