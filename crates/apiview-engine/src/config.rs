//! Review configuration
//!
//! All knobs live in one [`ReviewConfig`] value, either built in code or
//! loaded from a TOML file:
//!
//! ```toml
//! language = "Go"
//! primary-suffixes = ["Client"]
//! max-alias-depth = 16
//!
//! [severity]
//! external-repo = "warning"
//!
//! [fetch]
//! cache-dir = "/tmp/apiview-cache"
//! fetchable-prefixes = ["github.com/Azure/azure-sdk-for-go/sdk/"]
//! ```

use crate::model::Level;
use apiview_deps::FetchConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Severity of each diagnostic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SeverityPolicy {
    /// One hop of a resolved alias chain
    pub alias_source: Level,
    /// Alias into a public package of a module that cannot be loaded
    pub external_repo: Level,
    /// Alias into an `internal` package of a module that cannot be loaded
    pub external_internal: Level,
    /// Alias target missing from a loaded package, cyclic or too deep
    pub not_found: Level,
    /// Fetchable module whose download failed
    pub acquisition: Level,
    /// Package directory that could not be indexed
    pub structural: Level,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            alias_source: Level::Info,
            external_repo: Level::Warning,
            external_internal: Level::Error,
            not_found: Level::Error,
            acquisition: Level::Warning,
            structural: Level::Error,
        }
    }
}

/// Configuration of one review run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReviewConfig {
    /// Language label written to the review document
    pub language: String,
    /// Type-name suffixes whose types are listed first
    pub primary_suffixes: Vec<String>,
    /// Longest alias chain followed before giving up
    pub max_alias_depth: usize,
    /// Directory names skipped in addition to the built-in exclusions
    pub skip_dirs: Vec<String>,
    pub severity: SeverityPolicy,
    pub fetch: FetchConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            language: "Go".to_string(),
            primary_suffixes: vec!["Client".to_string()],
            max_alias_depth: 16,
            skip_dirs: Vec::new(),
            severity: SeverityPolicy::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Whether a type name ends with one of the primary suffixes
    pub fn is_primary(&self, type_name: &str) -> bool {
        self.primary_suffixes
            .iter()
            .any(|s| !s.is_empty() && type_name.ends_with(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReviewConfig::default();
        assert_eq!(config.language, "Go");
        assert!(config.is_primary("WidgetClient"));
        assert!(!config.is_primary("Widget"));
        assert_eq!(config.severity.alias_source, Level::Info);
    }

    #[test]
    fn test_partial_toml() {
        let config = ReviewConfig::from_toml_str(
            r#"
primary-suffixes = ["Client", "Service"]
max-alias-depth = 4

[severity]
external-repo = "info"

[fetch]
cache-dir = "/tmp/apiview"
fetchable-prefixes = []
"#,
        )
        .unwrap();

        assert!(config.is_primary("BlobService"));
        assert_eq!(config.max_alias_depth, 4);
        assert_eq!(config.severity.external_repo, Level::Info);
        assert_eq!(config.severity.not_found, Level::Error);
        assert_eq!(config.fetch.cache_dir, Path::new("/tmp/apiview"));
        assert!(config.fetch.fetchable_prefixes.is_empty());
        assert_eq!(config.fetch.registry_url, apiview_deps::config::DEFAULT_REGISTRY);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ReviewConfig::from_toml_str("max-alias-depth = \"deep\""),
            Err(ConfigError::ParseError(_))
        ));
    }
}
