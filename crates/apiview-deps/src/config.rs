//! Fetch configuration
//!
//! Everything the fetcher needs is carried in an explicit `FetchConfig` value
//! so that tests can point each instance at its own temporary cache.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default module registry (Go module proxy protocol)
pub const DEFAULT_REGISTRY: &str = "https://proxy.golang.org";

/// Default bound for one archive download
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Module path prefixes fetched from the registry by default
pub const DEFAULT_FETCHABLE_PREFIXES: &[&str] = &["github.com/Azure/azure-sdk-for-go/sdk/"];

/// Configuration for the dependency cache and module fetcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Root of this system's own cache
    pub cache_dir: PathBuf,

    /// The package manager's module cache, consulted first and used in place
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_mod_cache: Option<PathBuf>,

    /// Registry base URL
    pub registry_url: String,

    /// Download timeout in seconds
    pub timeout_secs: u64,

    /// Only modules under these prefixes are fetched automatically
    pub fetchable_prefixes: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            local_mod_cache: None,
            registry_url: DEFAULT_REGISTRY.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fetchable_prefixes: DEFAULT_FETCHABLE_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl FetchConfig {
    /// Configuration using the given cache root and defaults elsewhere
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults refined by the Go toolchain's environment
    ///
    /// `GOMODCACHE` (or `GOPATH/pkg/mod`, or `~/go/pkg/mod`) becomes the local
    /// module cache and the first http(s) entry of `GOPROXY` the registry.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.local_mod_cache = env_mod_cache();
        if let Ok(proxy) = std::env::var("GOPROXY") {
            if let Some(url) = first_proxy_url(&proxy) {
                config.registry_url = url;
            }
        }
        config
    }

    /// Download timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether a module path may be fetched from the registry
    pub fn is_fetchable(&self, module_path: &str) -> bool {
        self.fetchable_prefixes
            .iter()
            .any(|prefix| module_path.starts_with(prefix.as_str()))
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("apiview-go"))
        .unwrap_or_else(|| PathBuf::from(".apiview-cache"))
}

fn env_mod_cache() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("GOMODCACHE") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    if let Ok(gopath) = std::env::var("GOPATH") {
        let first = std::env::split_paths(&gopath).next()?;
        return Some(first.join("pkg").join("mod"));
    }
    dirs::home_dir().map(|h| h.join("go").join("pkg").join("mod"))
}

/// First usable registry URL in a `GOPROXY` list
fn first_proxy_url(goproxy: &str) -> Option<String> {
    goproxy
        .split([',', '|'])
        .map(str::trim)
        .find(|entry| entry.starts_with("https://") || entry.starts_with("http://"))
        .map(|entry| entry.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.registry_url, DEFAULT_REGISTRY);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.is_fetchable("github.com/Azure/azure-sdk-for-go/sdk/azcore"));
        assert!(!config.is_fetchable("github.com/other/module"));
    }

    #[test]
    fn test_first_proxy_url() {
        assert_eq!(
            first_proxy_url("https://proxy.example.com/,direct"),
            Some("https://proxy.example.com".to_string())
        );
        assert_eq!(first_proxy_url("direct|off"), None);
        assert_eq!(
            first_proxy_url("off|http://local:3000"),
            Some("http://local:3000".to_string())
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FetchConfig = toml::from_str(
            r#"
            registry-url = "https://mirror.example.com"
            timeout-secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.registry_url, "https://mirror.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.fetchable_prefixes.len(), 1);
    }
}
