//! Module fetcher
//!
//! Resolves a module coordinate to a local directory:
//!
//! 1. the package manager's module cache, used in place;
//! 2. this system's own cache;
//! 3. a registry download, stored under `zips/` and unpacked into the cache.

use crate::cache::{CacheError, DependencyCache};
use crate::config::FetchConfig;
use crate::coord::{CoordError, ModuleRef};
use crate::registry::{ArchiveSource, RegistryClient, RegistryError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while acquiring a module
#[derive(Debug, Error)]
pub enum FetchError {
    /// Registry download failed
    #[error("Failed to download {module}: {source}")]
    Registry {
        module: String,
        #[source]
        source: RegistryError,
    },

    /// Cache operation failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Invalid coordinate
    #[error("Invalid module coordinate: {0}")]
    Coord(#[from] CoordError),

    /// Building the registry client failed
    #[error("Registry client error: {0}")]
    Client(#[from] RegistryError),
}

impl FetchError {
    /// Whether the same acquisition may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Registry { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Where an acquired module came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The package manager's module cache
    LocalModCache,
    /// Already present in this system's cache
    Cache,
    /// Downloaded during this call
    Registry,
}

/// An acquired module directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub dir: PathBuf,
    pub origin: Origin,
}

/// Module fetcher backed by a dependency cache and an archive source
pub struct ModuleFetcher {
    config: FetchConfig,
    cache: DependencyCache,
    source: Arc<dyn ArchiveSource>,
}

impl ModuleFetcher {
    /// Create a fetcher that downloads from the configured registry
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = RegistryClient::new(&config.registry_url, config.timeout())?;
        Self::with_source(config, Arc::new(client))
    }

    /// Create a fetcher with a custom archive source
    pub fn with_source(
        config: FetchConfig,
        source: Arc<dyn ArchiveSource>,
    ) -> Result<Self, FetchError> {
        let cache = DependencyCache::open(&config.cache_dir)?;
        Ok(Self {
            config,
            cache,
            source,
        })
    }

    /// Fetch configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Underlying cache
    pub fn cache(&self) -> &DependencyCache {
        &self.cache
    }

    /// Whether a module path may be downloaded automatically
    pub fn is_fetchable(&self, module_path: &str) -> bool {
        self.config.is_fetchable(module_path)
    }

    /// Resolve a coordinate to a local directory
    pub fn acquire(&self, module: &ModuleRef) -> Result<PathBuf, FetchError> {
        Ok(self.acquire_with_origin(module)?.dir)
    }

    /// Resolve a coordinate and report where it was found
    pub fn acquire_with_origin(&self, module: &ModuleRef) -> Result<Acquired, FetchError> {
        if let Some(dir) = self.local_mod_cache_dir(module)? {
            debug!(module = %module, dir = %dir.display(), "found in local module cache");
            return Ok(Acquired {
                dir,
                origin: Origin::LocalModCache,
            });
        }

        if let Some(dir) = self.cache.lookup(module)? {
            debug!(module = %module, "cache hit");
            return Ok(Acquired {
                dir,
                origin: Origin::Cache,
            });
        }

        // Serialize writers of this coordinate; whoever waited re-checks
        // the cache before downloading.
        let lock = self.cache.coordinate_lock(module);
        let result = {
            let _guard = lock.lock();
            self.populate(module)
        };
        drop(lock);
        self.cache.release_coordinate_lock(module);
        result
    }

    /// Fill the cache for a coordinate; the caller holds its lock
    fn populate(&self, module: &ModuleRef) -> Result<Acquired, FetchError> {
        if let Some(dir) = self.cache.lookup(module)? {
            debug!(module = %module, "populated while waiting");
            return Ok(Acquired {
                dir,
                origin: Origin::Cache,
            });
        }

        if self.cache.archive_path(module)?.is_file() {
            match self.cache.unpack(module) {
                Ok(dir) => {
                    return Ok(Acquired {
                        dir,
                        origin: Origin::Cache,
                    })
                }
                Err(e) => {
                    warn!(module = %module, error = %e, "discarding unusable cached archive");
                    self.cache.remove(module)?;
                }
            }
        }

        info!(module = %module, registry = %self.config.registry_url, "fetching module");
        let bytes = self
            .source
            .fetch_archive(module)
            .map_err(|source| FetchError::Registry {
                module: module.to_string(),
                source,
            })?;

        self.cache.store_archive(module, &bytes)?;
        match self.cache.unpack(module) {
            Ok(dir) => Ok(Acquired {
                dir,
                origin: Origin::Registry,
            }),
            Err(e) => {
                let _ = self.cache.remove(module);
                Err(e.into())
            }
        }
    }

    fn local_mod_cache_dir(&self, module: &ModuleRef) -> Result<Option<PathBuf>, FetchError> {
        let Some(root) = &self.config.local_mod_cache else {
            return Ok(None);
        };
        let dir = root.join(module.relative_dir()?);
        Ok(dir.is_dir().then_some(dir))
    }
}
