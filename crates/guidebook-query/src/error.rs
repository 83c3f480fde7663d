//! Error types for query construction and validation.

use std::fmt;

use serde_json::Value;

/// Errors from building engines or validating queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    Validation(#[from] ValidationError),

    #[error("predicate `{0}` is already registered")]
    DuplicatePredicate(String),

    #[error("`{0}` is reserved and cannot be used as a predicate name")]
    ReservedName(String),
}

/// A query (or document header) failed schema validation.
///
/// Carries every violation found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Shift every violation path under `prefix` (e.g. `/query`).
    pub fn nested_under(mut self, prefix: &str) -> Self {
        for v in &mut self.violations {
            v.path = format!("{prefix}{}", v.path);
        }
        self
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer style location, `""` for the root value.
    pub path: String,
    /// What the schema accepts at this location.
    pub expected: String,
    /// What was actually there.
    pub found: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "at {at}: expected {}, found {}", self.expected, self.found)
    }
}

fn render_violations(violations: &[Violation]) -> String {
    match violations {
        [] => "no violations".to_string(),
        [one] => one.to_string(),
        many => {
            let lines: Vec<String> = many.iter().map(|v| format!("  - {v}")).collect();
            format!("{} violations:\n{}", many.len(), lines.join("\n"))
        }
    }
}

/// Short human-readable description of a JSON value, used in the `found`
/// half of a violation.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) if s.chars().count() > 40 => {
            let head: String = s.chars().take(40).collect();
            format!("string \"{head}…\"")
        }
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) if items.len() == 1 => "array of 1 item".to_string(),
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) if map.is_empty() => "empty object".to_string(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}
