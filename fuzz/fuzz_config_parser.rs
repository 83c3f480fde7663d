//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`, which must never panic, and
//! checks that every accepted config survives a render and re-parse.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = guidebook_config::AppConfig::parse(s) {
        let rendered = config.to_toml().expect("valid config renders");
        let reparsed = guidebook_config::AppConfig::parse(&rendered).expect("rendered config parses");
        assert_eq!(config, reparsed);
    }
});
