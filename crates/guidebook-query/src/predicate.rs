//! Predicate registry.
//!
//! A predicate is a named boolean test over an input `I`, parameterised by a
//! config value that is validated by a [`ConfigSchema`]. The
//! [`PredicateRegistry`] is an immutable, ordered list of predicates;
//! registering a predicate produces a new registry and leaves the old one
//! untouched.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::QueryError;
use crate::query::RESERVED_KEYS;

type CheckFn = dyn Fn(&Value) -> Result<(), String> + Send + Sync;
type HandlerFn<I> = dyn Fn(&Value, &I) -> bool + Send + Sync;
type CacheKeyFn<I> = dyn Fn(&Value, &I) -> Option<String> + Send + Sync;

/// Validator for a predicate's config value.
#[derive(Clone)]
pub struct ConfigSchema {
    expected: String,
    check: Arc<CheckFn>,
    json_schema: Value,
}

impl ConfigSchema {
    /// Accept any value that deserializes into `C`.
    pub fn of<C: DeserializeOwned>() -> Self {
        Self {
            expected: std::any::type_name::<C>().to_string(),
            check: Arc::new(|value| C::deserialize(value).map(|_| ()).map_err(|e| e.to_string())),
            json_schema: json!({}),
        }
    }

    /// A config validated by an arbitrary check function.
    pub fn custom(
        expected: impl Into<String>,
        json_schema: Value,
        check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            expected: expected.into(),
            check: Arc::new(check),
            json_schema,
        }
    }

    pub fn string() -> Self {
        Self::of::<String>()
            .expecting("a string")
            .with_json_schema(json!({ "type": "string" }))
    }

    pub fn string_list() -> Self {
        Self::of::<Vec<String>>()
            .expecting("an array of strings")
            .with_json_schema(json!({ "type": "array", "items": { "type": "string" } }))
    }

    pub fn boolean() -> Self {
        Self::of::<bool>()
            .expecting("a boolean")
            .with_json_schema(json!({ "type": "boolean" }))
    }

    /// Replace the human-readable description used in violations.
    pub fn expecting(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    /// Attach the JSON Schema fragment exported for this config.
    pub fn with_json_schema(mut self, json_schema: Value) -> Self {
        self.json_schema = json_schema;
        self
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    pub fn validate(&self, value: &Value) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for ConfigSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSchema")
            .field("expected", &self.expected)
            .field("json_schema", &self.json_schema)
            .finish()
    }
}

/// A registered predicate over inputs of type `I`.
pub struct Predicate<I: ?Sized> {
    name: String,
    schema: ConfigSchema,
    handler: Arc<HandlerFn<I>>,
    cache_key: Option<Arc<CacheKeyFn<I>>>,
}

impl<I: ?Sized + 'static> Predicate<I> {
    /// Build a predicate from a typed handler.
    ///
    /// The handler receives the config already deserialized into `C`. If the
    /// config does not deserialize (possible when validation was skipped),
    /// the predicate does not match.
    pub fn new<C, F>(name: impl Into<String>, schema: ConfigSchema, handler: F) -> Self
    where
        C: DeserializeOwned + 'static,
        F: Fn(&C, &I) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let pred_name = name.clone();
        let handler = move |config: &Value, input: &I| match C::deserialize(config) {
            Ok(config) => handler(&config, input),
            Err(e) => {
                tracing::warn!(predicate = %pred_name, error = %e, "Unusable predicate config, treating as no match");
                false
            }
        };
        Self {
            name,
            schema,
            handler: Arc::new(handler),
            cache_key: None,
        }
    }

    /// Attach a cache key function. Results of this predicate are memoized
    /// in an [`EvalCache`](crate::EvalCache) under `(name, key)`.
    pub fn with_cache_key<C, K>(mut self, cache_key: K) -> Self
    where
        C: DeserializeOwned + 'static,
        K: Fn(&C, &I) -> String + Send + Sync + 'static,
    {
        self.cache_key = Some(Arc::new(move |config: &Value, input: &I| {
            C::deserialize(config).ok().map(|config| cache_key(&config, input))
        }));
        self
    }
}

impl<I: ?Sized> Predicate<I> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    pub fn test(&self, config: &Value, input: &I) -> bool {
        (self.handler)(config, input)
    }

    pub fn cache_key(&self, config: &Value, input: &I) -> Option<String> {
        self.cache_key.as_ref().and_then(|key| key(config, input))
    }
}

impl<I: ?Sized> Clone for Predicate<I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            handler: Arc::clone(&self.handler),
            cache_key: self.cache_key.clone(),
        }
    }
}

impl<I: ?Sized> fmt::Debug for Predicate<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("cached", &self.cache_key.is_some())
            .finish()
    }
}

/// Ordered, immutable set of predicates.
pub struct PredicateRegistry<I: ?Sized> {
    predicates: Arc<[Predicate<I>]>,
}

impl<I: ?Sized> PredicateRegistry<I> {
    pub fn new() -> Self {
        Self {
            predicates: Arc::from(Vec::new()),
        }
    }

    /// Return a new registry with `predicate` appended.
    ///
    /// Names must be unique and may not shadow a connective key.
    pub fn with(&self, predicate: Predicate<I>) -> Result<Self, QueryError> {
        let name = predicate.name();
        if name.is_empty() || RESERVED_KEYS.contains(&name) {
            return Err(QueryError::ReservedName(name.to_string()));
        }
        if self.get(name).is_some() {
            return Err(QueryError::DuplicatePredicate(name.to_string()));
        }

        let mut predicates = self.predicates.to_vec();
        predicates.push(predicate);
        Ok(Self {
            predicates: Arc::from(predicates),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Predicate<I>> {
        self.predicates.iter().find(|p| p.name == name)
    }

    /// Predicates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Predicate<I>> {
        self.predicates.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl<I: ?Sized> Default for PredicateRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized> Clone for PredicateRegistry<I> {
    fn clone(&self) -> Self {
        Self {
            predicates: Arc::clone(&self.predicates),
        }
    }
}

impl<I: ?Sized> fmt::Debug for PredicateRegistry<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.predicates.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contains() -> Predicate<str> {
        Predicate::new("contains", ConfigSchema::string(), |needle: &String, input: &str| {
            input.contains(needle.as_str())
        })
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let empty = PredicateRegistry::<str>::new();
        let one = empty.with(contains()).unwrap();

        assert!(empty.is_empty());
        assert_eq!(one.names(), vec!["contains"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = PredicateRegistry::new().with(contains()).unwrap();
        let err = registry.with(contains()).unwrap_err();
        assert_eq!(err, QueryError::DuplicatePredicate("contains".to_string()));
    }

    #[test]
    fn test_reserved_names_rejected() {
        for name in RESERVED_KEYS.iter().chain(&[""]) {
            let pred = Predicate::new(*name, ConfigSchema::boolean(), |_: &bool, _: &str| true);
            let err = PredicateRegistry::new().with(pred).unwrap_err();
            assert_eq!(err, QueryError::ReservedName(name.to_string()));
        }
    }

    #[test]
    fn test_registration_order_preserved() {
        let registry = PredicateRegistry::new()
            .with(contains())
            .unwrap()
            .with(Predicate::new("equals", ConfigSchema::string(), |s: &String, i: &str| s == i))
            .unwrap();
        assert_eq!(registry.names(), vec!["contains", "equals"]);
    }

    #[test]
    fn test_handler_rejects_bad_config() {
        let pred = contains();
        assert!(pred.test(&Value::from("ab"), "cab"));
        assert!(!pred.test(&Value::from(42), "42"));
    }

    #[test]
    fn test_config_schema_checks() {
        assert!(ConfigSchema::string().validate(&Value::from("x")).is_ok());
        assert!(ConfigSchema::string().validate(&Value::from(1)).is_err());
        assert!(ConfigSchema::string_list().validate(&serde_json::json!(["a", "b"])).is_ok());
        assert!(ConfigSchema::boolean().validate(&Value::Null).is_err());
    }

    #[test]
    fn test_cache_key() {
        let pred = contains().with_cache_key(|needle: &String, _: &str| needle.clone());
        assert_eq!(pred.cache_key(&Value::from("btn"), "x"), Some("btn".to_string()));
        assert_eq!(pred.cache_key(&Value::from(1), "x"), None);
    }
}
