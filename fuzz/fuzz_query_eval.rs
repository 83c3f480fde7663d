//! Fuzz target for query validation and evaluation.
//!
//! Run with: cargo +nightly fuzz run fuzz_query_eval
//!
//! Input is `<query json> \0 <input text>`. Any JSON value is validated and
//! also read leniently; neither may panic. For queries that validate, the
//! validated, lenient, and cached evaluation paths must agree.

#![no_main]

use guidebook_query::{EvalCache, MatchOptions, QueryEngine};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (query, input) = match data.iter().position(|b| *b == 0) {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &[][..]),
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(query) else {
        return;
    };
    let input = String::from_utf8_lossy(input);
    let engine = QueryEngine::with_text_predicates().expect("built-in predicates register");

    let lenient = engine
        .matches(Some(&value), &input, MatchOptions::trusted())
        .expect("lenient matching does not fail");

    if let Ok(query) = engine.parse(&value) {
        let validated = engine.evaluate(&query, &input);
        let mut cache = EvalCache::new();
        let cached = engine.evaluate_cached(&query, &input, &mut cache);
        assert_eq!(validated, lenient);
        assert_eq!(validated, cached);
        assert_eq!(query.to_value(), value);
    }
});
