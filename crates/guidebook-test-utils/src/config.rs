//! Configuration builders for tests.

use std::path::PathBuf;

use guidebook_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .root(library.root())
///     .include("rules/*.txt")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.library.root = root.into();
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.config.library.include.push(pattern.to_string());
        self
    }

    pub fn skip_empty(mut self, skip: bool) -> Self {
        self.config.library.skip_empty = skip;
        self
    }

    pub fn exclude_hidden(mut self, exclude: bool) -> Self {
        self.config.library.exclude_hidden = exclude;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
