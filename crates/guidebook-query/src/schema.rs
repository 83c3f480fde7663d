//! The query schema: a validator for the recursive [`Query`] grammar.
//!
//! The schema is a tagged union of variants, one per accepted key. The
//! recursive positions (`and`, `or`, `not`) do not embed a copy of the
//! schema; they hold a [`Shape::SelfRef`] marker that is resolved against the
//! enclosing schema when a value is validated. Building a schema is therefore
//! linear in the number of predicates, and the same marker becomes a
//! `$ref` when the schema is exported as JSON Schema.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::error::{ValidationError, Violation, describe};
use crate::predicate::{ConfigSchema, PredicateRegistry};
use crate::query::Query;

/// Minimum number of children for `and` / `or`.
pub const MIN_CONNECTIVE_ARITY: usize = 2;

/// What a variant's value must look like.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A list of queries with a minimum length.
    List { min: usize },
    /// A single nested query, validated against this same schema.
    SelfRef,
    /// The literal `true`.
    LiteralTrue,
    /// A predicate config.
    Config(ConfigSchema),
}

/// One member of the tagged union.
#[derive(Debug, Clone)]
pub struct Variant {
    pub key: String,
    pub shape: Shape,
}

/// Validator for queries over a fixed set of predicates.
///
/// Cheap to clone; built once per [`QueryEngine`](crate::QueryEngine).
#[derive(Debug, Clone)]
pub struct QuerySchema {
    variants: Arc<[Variant]>,
}

impl QuerySchema {
    /// Build the schema for the predicates in `registry`.
    pub fn build<I: ?Sized>(registry: &PredicateRegistry<I>) -> Self {
        let mut variants = vec![
            Variant {
                key: "and".to_string(),
                shape: Shape::List {
                    min: MIN_CONNECTIVE_ARITY,
                },
            },
            Variant {
                key: "or".to_string(),
                shape: Shape::List {
                    min: MIN_CONNECTIVE_ARITY,
                },
            },
            Variant {
                key: "not".to_string(),
                shape: Shape::SelfRef,
            },
            Variant {
                key: "always".to_string(),
                shape: Shape::LiteralTrue,
            },
            Variant {
                key: "never".to_string(),
                shape: Shape::LiteralTrue,
            },
        ];
        variants.extend(registry.iter().map(|p| Variant {
            key: p.name().to_string(),
            shape: Shape::Config(p.schema().clone()),
        }));

        Self {
            variants: Arc::from(variants),
        }
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    fn variant(&self, key: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.key == key)
    }

    fn keys(&self) -> String {
        let keys: Vec<&str> = self.variants.iter().map(|v| v.key.as_str()).collect();
        keys.join(", ")
    }

    /// Validate `value` and convert it into a [`Query`].
    pub fn parse(&self, value: &Value) -> Result<Query, ValidationError> {
        let mut violations = Vec::new();
        match self.check(value, "", &mut violations) {
            Some(query) if violations.is_empty() => Ok(query),
            _ => Err(ValidationError::new(violations)),
        }
    }

    /// Like [`parse`](Self::parse) but only reports success.
    pub fn is_valid(&self, value: &Value) -> bool {
        self.parse(value).is_ok()
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) -> Option<Query> {
        let Some(map) = value.as_object() else {
            out.push(Violation::new(path, "a query object", describe(value)));
            return None;
        };

        let mut unknown = false;
        for key in map.keys() {
            if self.variant(key).is_none() {
                out.push(Violation::new(
                    format!("{path}/{key}"),
                    format!("one of the keys [{}]", self.keys()),
                    format!("unregistered key `{key}`"),
                ));
                unknown = true;
            }
        }
        if unknown {
            return None;
        }

        let mut entries = map.iter();
        let (key, inner) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            (None, _) => {
                out.push(Violation::new(path, "exactly one connective or predicate key", "empty object"));
                return None;
            }
            (Some(_), Some(_)) => {
                out.push(Violation::new(
                    path,
                    "exactly one connective or predicate key",
                    describe(value),
                ));
                return None;
            }
        };

        let variant = self.variant(key)?;
        let here = format!("{path}/{key}");
        match &variant.shape {
            Shape::List { min } => {
                let Some(items) = inner.as_array() else {
                    out.push(Violation::new(here, format!("an array of at least {min} queries"), describe(inner)));
                    return None;
                };
                if items.len() < *min {
                    out.push(Violation::new(&here, format!("an array of at least {min} queries"), describe(inner)));
                }
                let children: Vec<Option<Query>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.check(item, &format!("{here}/{i}"), out))
                    .collect();
                let children: Option<Vec<Query>> = children.into_iter().collect();
                let children = children?;
                Some(if key == "and" {
                    Query::And(children)
                } else {
                    Query::Or(children)
                })
            }
            Shape::SelfRef => self.check(inner, &here, out).map(Query::not),
            Shape::LiteralTrue => {
                if inner != &Value::Bool(true) {
                    out.push(Violation::new(here, "the literal `true`", describe(inner)));
                    return None;
                }
                Some(if key == "always" { Query::Always } else { Query::Never })
            }
            Shape::Config(schema) => match schema.validate(inner) {
                Ok(()) => Some(Query::predicate(key.as_str(), inner.clone())),
                Err(reason) => {
                    out.push(Violation::new(
                        here,
                        schema.expected(),
                        format!("{} ({reason})", describe(inner)),
                    ));
                    None
                }
            },
        }
    }

    /// Interpret `value` as a query without validating it.
    ///
    /// Keys are checked in a fixed order: `always`, `never`, `and`, `or`,
    /// `not`, then predicates in registration order. Anything that cannot be
    /// read as a query becomes [`Query::Never`], and a connective whose value
    /// is not an array becomes an empty connective, which never matches.
    pub fn lenient(&self, value: &Value) -> Query {
        let Some(map) = value.as_object() else {
            return Query::Never;
        };
        if map.contains_key("always") {
            return Query::Always;
        }
        if map.contains_key("never") {
            return Query::Never;
        }
        if let Some(inner) = map.get("and") {
            return Query::And(self.lenient_list(inner));
        }
        if let Some(inner) = map.get("or") {
            return Query::Or(self.lenient_list(inner));
        }
        if let Some(inner) = map.get("not") {
            return Query::not(self.lenient(inner));
        }
        self.variants
            .iter()
            .filter(|v| matches!(v.shape, Shape::Config(_)))
            .find_map(|v| map.get(&v.key).map(|config| Query::predicate(v.key.as_str(), config.clone())))
            .unwrap_or(Query::Never)
    }

    fn lenient_list(&self, value: &Value) -> Vec<Query> {
        value
            .as_array()
            .map(|items| items.iter().map(|item| self.lenient(item)).collect())
            .unwrap_or_default()
    }

    /// Export as a JSON Schema (draft 2020-12) document.
    pub fn to_json_schema(&self) -> Value {
        let one_of: Vec<Value> = self
            .variants
            .iter()
            .map(|variant| {
                let value_schema = match &variant.shape {
                    Shape::List { min } => json!({
                        "type": "array",
                        "minItems": min,
                        "items": { "$ref": "#/$defs/Query" }
                    }),
                    Shape::SelfRef => json!({ "$ref": "#/$defs/Query" }),
                    Shape::LiteralTrue => json!({ "const": true }),
                    Shape::Config(schema) => schema.json_schema().clone(),
                };
                let mut properties = Map::new();
                properties.insert(variant.key.clone(), value_schema);
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": [variant.key],
                    "additionalProperties": false
                })
            })
            .collect();

        json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$ref": "#/$defs/Query",
            "$defs": {
                "Query": { "oneOf": one_of }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Predicate;
    use pretty_assertions::assert_eq;

    fn schema() -> QuerySchema {
        let registry = PredicateRegistry::<str>::new()
            .with(Predicate::new("contains", ConfigSchema::string(), |n: &String, i: &str| {
                i.contains(n.as_str())
            }))
            .unwrap();
        QuerySchema::build(&registry)
    }

    #[test]
    fn test_parse_accepts_grammar() {
        let schema = schema();
        let value = json!({
            "and": [
                {"contains": "a"},
                {"or": [{"always": true}, {"not": {"never": true}}]}
            ]
        });
        let query = schema.parse(&value).unwrap();
        assert_eq!(query.to_value(), value);
    }

    #[test]
    fn test_parse_rejects_short_connectives() {
        let schema = schema();
        for value in [json!({"and": []}), json!({"and": [{"always": true}]}), json!({"or": []})] {
            let err = schema.parse(&value).unwrap_err();
            assert!(err.violations[0].expected.contains("at least 2"), "{err}");
        }
    }

    #[test]
    fn test_parse_rejects_unregistered_key() {
        let err = schema().parse(&json!({"regex": "a+"})).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "/regex");
        assert!(err.violations[0].found.contains("unregistered key"));
    }

    #[test]
    fn test_parse_rejects_dual_key_objects() {
        let err = schema()
            .parse(&json!({"and": [{"always": true}, {"never": true}], "contains": "x"}))
            .unwrap_err();
        assert_eq!(err.violations[0].path, "");
        assert_eq!(err.violations[0].expected, "exactly one connective or predicate key");
    }

    #[test]
    fn test_parse_rejects_bad_config() {
        let err = schema().parse(&json!({"not": {"contains": 3}})).unwrap_err();
        assert_eq!(err.violations[0].path, "/not/contains");
        assert_eq!(err.violations[0].expected, "a string");
    }

    #[test]
    fn test_parse_collects_all_violations() {
        let err = schema()
            .parse(&json!({"or": [{"contains": 1}, {"always": false}, 7]}))
            .unwrap_err();
        let paths: Vec<&str> = err.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["/or/0/contains", "/or/1/always", "/or/2"]);
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(!schema().is_valid(&json!("always")));
        assert!(!schema().is_valid(&json!({})));
    }

    #[test]
    fn test_lenient_key_order() {
        let schema = schema();
        assert_eq!(schema.lenient(&json!({"never": true, "always": true})), Query::Always);
        assert_eq!(
            schema.lenient(&json!({"contains": "x", "not": {"always": true}})),
            Query::not(Query::Always)
        );
        assert_eq!(schema.lenient(&json!({"and": "oops"})), Query::And(vec![]));
        assert_eq!(schema.lenient(&json!({"mystery": 1})), Query::Never);
        assert_eq!(schema.lenient(&json!({"contains": "x"})), Query::predicate("contains", "x"));
    }

    #[test]
    fn test_json_schema_is_self_referential() {
        let exported = schema().to_json_schema();
        let one_of = exported["$defs"]["Query"]["oneOf"].as_array().unwrap();
        assert_eq!(one_of.len(), 6);
        assert_eq!(one_of[0]["properties"]["and"]["items"]["$ref"], "#/$defs/Query");
        assert_eq!(one_of[0]["properties"]["and"]["minItems"], 2);
        assert_eq!(one_of[2]["properties"]["not"]["$ref"], "#/$defs/Query");
        assert_eq!(one_of[5]["properties"]["contains"]["type"], "string");
    }
}
