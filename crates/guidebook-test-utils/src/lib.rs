#![deny(unsafe_code)]

//! Shared test utilities for the Guidebook workspace.
//!
//! Provides temporary document trees, config builders, and tracing helpers
//! so that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! guidebook-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod library;
pub mod tracing_setup;

pub use library::{CountingSource, TestLibrary, document};
pub use tracing_setup::init_test_tracing;
