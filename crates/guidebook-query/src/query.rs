//! The [`Query`] expression tree.
//!
//! A query is plain data. Its serialized form is a single-key JSON object:
//!
//! ```text
//! { "and": [Query, Query, ...] }   at least two children
//! { "or":  [Query, Query, ...] }   at least two children
//! { "not": Query }
//! { "always": true }
//! { "never": true }
//! { "<predicate>": <config> }
//! ```
//!
//! Deserializing a `Query` only checks this structure. Whether a predicate
//! name is registered, or whether its config is acceptable, is decided by
//! [`QuerySchema::parse`](crate::QuerySchema::parse).

use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Connective and constant keys. No predicate may use one of these names.
pub const RESERVED_KEYS: [&str; 5] = ["and", "or", "not", "always", "never"];

/// A boolean expression over named predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// All children must match.
    And(Vec<Query>),
    /// At least one child must match.
    Or(Vec<Query>),
    /// The inner query must not match.
    Not(Box<Query>),
    /// Matches every input.
    Always,
    /// Matches no input.
    Never,
    /// A registered predicate applied with its config value.
    Predicate { name: String, config: Value },
}

impl Query {
    pub fn and(children: impl IntoIterator<Item = Query>) -> Self {
        Query::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Query>) -> Self {
        Query::Or(children.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Query) -> Self {
        Query::Not(Box::new(inner))
    }

    pub fn always() -> Self {
        Query::Always
    }

    pub fn never() -> Self {
        Query::Never
    }

    pub fn predicate(name: impl Into<String>, config: impl Into<Value>) -> Self {
        Query::Predicate {
            name: name.into(),
            config: config.into(),
        }
    }

    /// The key this node serializes under.
    pub fn key(&self) -> &str {
        match self {
            Query::And(_) => "and",
            Query::Or(_) => "or",
            Query::Not(_) => "not",
            Query::Always => "always",
            Query::Never => "never",
            Query::Predicate { name, .. } => name,
        }
    }

    /// Convert to the plain JSON shape.
    pub fn to_value(&self) -> Value {
        // Serializing into a `Value` cannot fail for this type.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Structural conversion from the plain JSON shape, without a registry.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let map = value
            .as_object()
            .ok_or_else(|| format!("expected a query object, found {}", crate::error::describe(value)))?;
        let mut keys = map.iter();
        let (key, inner) = match (keys.next(), keys.next()) {
            (Some(pair), None) => pair,
            _ => {
                return Err(format!(
                    "expected exactly one key, found {}",
                    crate::error::describe(value)
                ));
            }
        };

        match key.as_str() {
            "and" | "or" => {
                let items = inner
                    .as_array()
                    .ok_or_else(|| format!("`{key}` must be an array"))?;
                if items.len() < 2 {
                    return Err(format!("`{key}` needs at least 2 children"));
                }
                let children = items.iter().map(Query::from_value).collect::<Result<Vec<_>, _>>()?;
                Ok(if key == "and" {
                    Query::And(children)
                } else {
                    Query::Or(children)
                })
            }
            "not" => Ok(Query::not(Query::from_value(inner)?)),
            "always" | "never" => {
                if inner != &Value::Bool(true) {
                    return Err(format!("`{key}` must be `true`"));
                }
                Ok(if key == "always" { Query::Always } else { Query::Never })
            }
            name => Ok(Query::predicate(name, inner.clone())),
        }
    }
}

impl Default for Query {
    /// Documents without a query match nothing until classified.
    fn default() -> Self {
        Query::Never
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Query::And(children) => map.serialize_entry("and", children)?,
            Query::Or(children) => map.serialize_entry("or", children)?,
            Query::Not(inner) => map.serialize_entry("not", inner)?,
            Query::Always => map.serialize_entry("always", &true)?,
            Query::Never => map.serialize_entry("never", &true)?,
            Query::Predicate { name, config } => map.serialize_entry(name, config)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Query::from_value(&value).map_err(de::Error::custom)
    }
}
