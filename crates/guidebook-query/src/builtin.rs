//! Built-in predicates over plain text input.

use serde_json::{Value, json};

use crate::engine::QueryEngine;
use crate::error::QueryError;
use crate::predicate::ConfigSchema;

fn glob_schema() -> ConfigSchema {
    ConfigSchema::custom(
        "a valid glob pattern",
        json!({ "type": "string", "minLength": 1 }),
        |value: &Value| {
            let pattern = value.as_str().ok_or("not a string")?;
            glob::Pattern::new(pattern).map(|_| ()).map_err(|e| e.to_string())
        },
    )
}

impl QueryEngine<str> {
    /// An engine over `str` input with `contains`, `contains_any`, `equals`
    /// and `glob` registered.
    pub fn with_text_predicates() -> Result<Self, QueryError> {
        QueryEngine::new()
            .add_predicate_with_cache_key(
                "contains",
                ConfigSchema::string(),
                |needle: &String, input: &str| input.contains(needle.as_str()),
                |needle: &String, _: &str| needle.clone(),
            )?
            .add_predicate_with_cache_key(
                "contains_any",
                ConfigSchema::string_list(),
                |needles: &Vec<String>, input: &str| needles.iter().any(|n| input.contains(n.as_str())),
                |needles: &Vec<String>, _: &str| serde_json::to_string(needles).unwrap_or_default(),
            )?
            .add_predicate_with_cache_key(
                "equals",
                ConfigSchema::string(),
                |expected: &String, input: &str| expected == input,
                |expected: &String, _: &str| expected.clone(),
            )?
            .add_predicate_with_cache_key(
                "glob",
                glob_schema(),
                |pattern: &String, input: &str| {
                    glob::Pattern::new(pattern)
                        .map(|p| p.matches(input))
                        .unwrap_or(false)
                },
                |pattern: &String, _: &str| pattern.clone(),
            )
    }
}
