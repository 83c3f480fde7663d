#![deny(unsafe_code)]

//! Configuration loading and validation for Guidebook.
//!
//! Loads `guidebook.toml` into an [`AppConfig`]. Every section and field is
//! optional; missing values take the defaults documented on each field.
//!
//! ```toml
//! [library]
//! root = "guides"
//! include = ["rules/**/*.txt"]
//! skip_empty = true
//! exclude_hidden = true
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "guidebook.toml";

/// Log levels accepted by `[logging] level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document library configuration.
    #[serde(default)]
    pub library: LibraryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where documents live and which ones are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Root directory of the document tree. Relative paths are resolved
    /// against the config file's directory.
    #[serde(default = "default_library_root")]
    pub root: PathBuf,

    /// Glob patterns to load in addition to markdown files.
    #[serde(default)]
    pub include: Vec<String>,

    /// Leave entries with an empty body out of match results.
    #[serde(default = "default_true")]
    pub skip_empty: bool,

    /// Skip files and directories whose name starts with a dot.
    #[serde(default = "default_true")]
    pub exclude_hidden: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_library_root(),
            include: Vec::new(),
            skip_empty: true,
            exclude_hidden: true,
        }
    }
}

fn default_library_root() -> PathBuf {
    PathBuf::from("guides")
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    ///
    /// A relative `library.root` is resolved against the file's directory.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut config = Self::parse(&content)?;
        if let Some(dir) = path.parent() {
            config.library.root = dir.join(&config.library.root);
        }
        tracing::debug!(path = %path.display(), root = %config.library.root.display(), "Loaded config");
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library.root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "library.root must not be empty".to_string(),
            ));
        }
        for (i, pattern) in self.library.include.iter().enumerate() {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::Validation(format!(
                    "library.include[{i}] is not a valid glob ({pattern:?}): {e}"
                )));
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                LOG_LEVELS, self.logging.level
            )));
        }
        Ok(())
    }
}
