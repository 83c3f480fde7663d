#![deny(unsafe_code)]

//! Guidebook query engine.
//!
//! Callers register named, typed predicates and combine them with `and`,
//! `or`, `not`, `always` and `never` into a [`Query`]. The [`QueryEngine`]
//! validates raw query values against a [`QuerySchema`] derived from its
//! registry, and evaluates validated queries against an input with
//! short-circuiting connectives.
//!
//! ```text
//! PredicateRegistry ──► QuerySchema ──► parse(Value) ──► Query
//!          │                                               │
//!          └──────────────► Evaluator ◄────────────────────┘
//! ```

/// Built-in predicates over `str` input.
pub mod builtin;
/// Query facade: registration, validation, and evaluation.
pub mod engine;
/// Validation errors and violation reporting.
pub mod error;
/// Recursive evaluator and per-input result cache.
pub mod eval;
/// Typed predicates and their config schemas.
pub mod predicate;
/// The `Query` expression tree.
pub mod query;
/// Self-referential query schema and JSON Schema export.
pub mod schema;

pub use engine::{MatchOptions, QueryEngine};
pub use error::{QueryError, ValidationError, Violation};
pub use eval::EvalCache;
pub use predicate::{ConfigSchema, Predicate, PredicateRegistry};
pub use query::Query;
pub use schema::QuerySchema;
