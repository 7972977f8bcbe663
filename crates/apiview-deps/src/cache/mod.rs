//! Dependency cache
//!
//! On-disk store of downloaded module sources, keyed by module path and
//! version.
//!
//! Directory structure:
//! ```text
//! <root>/
//! ├── <escaped-path>@<version>/      # unpacked module sources
//! ├── zips/
//! │   └── <escaped-path>@<version>.zip
//! └── tmp/                           # staging for writes and unpacking
//! ```
//!
//! Archives and unpacked sources live in disjoint trees because unpacking
//! requires an empty target directory.

mod unpack;

use crate::coord::{CoordError, ModuleRef};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid coordinate
    #[error("Invalid module coordinate: {0}")]
    Coord(#[from] CoordError),

    /// Archive could not be read
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Archive content does not look like a module archive
    #[error("Invalid module archive: {0}")]
    InvalidArchive(String),

    /// Unpack target already holds files
    #[error("Unpack target is not empty: {0}")]
    TargetNotEmpty(PathBuf),

    /// No archive stored for the coordinate
    #[error("Archive not found in cache: {0}")]
    ArchiveNotFound(String),
}

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk module cache
#[derive(Debug)]
pub struct DependencyCache {
    /// Cache root directory
    root: PathBuf,
    /// One lock per coordinate currently being written
    locks: DashMap<ModuleRef, Arc<Mutex<()>>>,
}

impl DependencyCache {
    /// Open (and create if needed) a cache rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("zips"))?;
        fs::create_dir_all(root.join("tmp"))?;

        Ok(Self {
            root,
            locks: DashMap::new(),
        })
    }

    /// Get the cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the unpacked sources of a coordinate
    pub fn module_dir(&self, module: &ModuleRef) -> Result<PathBuf, CacheError> {
        Ok(self.root.join(module.relative_dir()?))
    }

    /// Path of the raw archive of a coordinate
    pub fn archive_path(&self, module: &ModuleRef) -> Result<PathBuf, CacheError> {
        let mut path = self.root.join("zips").join(module.relative_dir()?);
        let mut file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        file_name.push(".zip");
        path.set_file_name(file_name);
        Ok(path)
    }

    /// Unpacked directory of a coordinate, if present
    pub fn lookup(&self, module: &ModuleRef) -> Result<Option<PathBuf>, CacheError> {
        let dir = self.module_dir(module)?;
        Ok(dir.is_dir().then_some(dir))
    }

    /// Check whether a coordinate is unpacked in the cache
    pub fn exists(&self, module: &ModuleRef) -> bool {
        matches!(self.lookup(module), Ok(Some(_)))
    }

    /// Lock guarding writes of one coordinate
    ///
    /// Holders of different coordinates never contend.
    pub fn coordinate_lock(&self, module: &ModuleRef) -> Arc<Mutex<()>> {
        self.locks
            .entry(module.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the lock of a coordinate once nobody else holds it
    ///
    /// Callers drop their own handle first.
    pub fn release_coordinate_lock(&self, module: &ModuleRef) {
        self.locks
            .remove_if(module, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of coordinate locks currently tracked
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// Store a downloaded archive
    ///
    /// The bytes go to a staging file first and are renamed into place so a
    /// reader never sees a truncated archive.
    pub fn store_archive(&self, module: &ModuleRef, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let final_path = self.archive_path(module)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.staging_path(module, "zip")?;
        let result = (|| -> Result<(), CacheError> {
            let mut tmp_file = fs::File::create(&tmp_path)?;
            tmp_file.write_all(bytes)?;
            tmp_file.sync_all()?;
            fs::rename(&tmp_path, &final_path)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result?;

        debug!(module = %module, path = %final_path.display(), "stored archive");
        Ok(final_path)
    }

    /// Unpack the stored archive of a coordinate into the cache
    ///
    /// Extraction happens in a fresh staging directory which is renamed into
    /// place only after every entry was written. On failure nothing is left
    /// behind that a later lookup would treat as a hit.
    pub fn unpack(&self, module: &ModuleRef) -> Result<PathBuf, CacheError> {
        let archive = self.archive_path(module)?;
        if !archive.is_file() {
            return Err(CacheError::ArchiveNotFound(module.to_string()));
        }
        let bytes = fs::read(&archive)?;

        let final_dir = self.module_dir(module)?;
        if final_dir.is_dir() {
            return Ok(final_dir);
        }

        let staging = self.staging_path(module, "src")?;
        let result = unpack::extract_module_zip(&bytes, &module.archive_prefix(), &staging)
            .and_then(|files| {
                if let Some(parent) = final_dir.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::rename(&staging, &final_dir)?;
                Ok(files)
            });

        match result {
            Ok(files) => {
                debug!(module = %module, files, "unpacked module");
                Ok(final_dir)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                Err(e)
            }
        }
    }

    /// Remove a coordinate's sources and archive
    pub fn remove(&self, module: &ModuleRef) -> Result<(), CacheError> {
        let dir = self.module_dir(module)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        let archive = self.archive_path(module)?;
        if archive.exists() {
            fs::remove_file(&archive)?;
        }
        Ok(())
    }

    /// Clear the entire cache
    ///
    /// **Warning:** This deletes all cached modules!
    pub fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        fs::create_dir_all(self.root.join("zips"))?;
        fs::create_dir_all(self.root.join("tmp"))?;
        Ok(())
    }

    /// Unique path under `tmp/` for one write
    fn staging_path(&self, module: &ModuleRef, suffix: &str) -> Result<PathBuf, CacheError> {
        let flat = module.escaped()?.replace('/', "_");
        let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .root
            .join("tmp")
            .join(format!("{}-{}-{}.{}", flat, std::process::id(), n, suffix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module() -> ModuleRef {
        ModuleRef::new("github.com/Azure/azcore", "v1.0.0").unwrap()
    }

    #[test]
    fn test_open_creates_layout() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path().join("cache")).unwrap();
        assert!(cache.root().join("zips").is_dir());
        assert!(cache.root().join("tmp").is_dir());
    }

    #[test]
    fn test_paths_are_disjoint() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path()).unwrap();
        let m = module();

        let dir = cache.module_dir(&m).unwrap();
        let archive = cache.archive_path(&m).unwrap();

        assert_eq!(
            dir,
            temp.path()
                .join("github.com")
                .join("!azure")
                .join("azcore@v1.0.0")
        );
        assert_eq!(
            archive,
            temp.path()
                .join("zips")
                .join("github.com")
                .join("!azure")
                .join("azcore@v1.0.0.zip")
        );
        assert!(!archive.starts_with(&dir));
    }

    #[test]
    fn test_lookup_miss() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path()).unwrap();
        assert_eq!(cache.lookup(&module()).unwrap(), None);
        assert!(!cache.exists(&module()));
    }

    #[test]
    fn test_unpack_without_archive() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path()).unwrap();
        assert!(matches!(
            cache.unpack(&module()),
            Err(CacheError::ArchiveNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_archive_leaves_no_entry() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path()).unwrap();
        let m = module();

        cache.store_archive(&m, b"not a zip").unwrap();
        assert!(cache.unpack(&m).is_err());

        assert!(!cache.exists(&m));
        let leftovers = fs::read_dir(cache.root().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_same_coordinate_shares_lock() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path()).unwrap();
        let a = cache.coordinate_lock(&module());
        let b = cache.coordinate_lock(&module());
        assert!(Arc::ptr_eq(&a, &b));

        let other = ModuleRef::new("example.com/other", "v0.1.0").unwrap();
        let c = cache.coordinate_lock(&other);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_lock_released_after_last_holder() {
        let temp = TempDir::new().unwrap();
        let cache = DependencyCache::open(temp.path()).unwrap();
        let a = cache.coordinate_lock(&module());
        let b = cache.coordinate_lock(&module());

        drop(a);
        cache.release_coordinate_lock(&module());
        assert_eq!(cache.tracked_locks(), 1);

        drop(b);
        cache.release_coordinate_lock(&module());
        assert_eq!(cache.tracked_locks(), 0);
    }
}
