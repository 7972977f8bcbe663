//! Integration tests for the dependency cache
//!
//! Tests archive storage, unpacking and the disjoint on-disk layout.

use apiview_deps::{CacheError, DependencyCache, ModuleRef};
use std::io::{Cursor, Write};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn module_zip(module: &ModuleRef, files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in files {
        let entry = format!("{}{}", module.archive_prefix(), name);
        writer.start_file(entry, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_store_and_unpack() {
    let temp = TempDir::new().unwrap();
    let cache = DependencyCache::open(temp.path()).unwrap();
    let module = ModuleRef::new("github.com/Azure/azcore", "v1.0.0").unwrap();

    let bytes = module_zip(
        &module,
        &[
            ("go.mod", "module github.com/Azure/azcore\n"),
            ("policy/policy.go", "package policy\n"),
        ],
    );

    let archive = cache.store_archive(&module, &bytes).unwrap();
    assert!(archive.is_file());
    assert!(archive.starts_with(temp.path().join("zips")));

    let dir = cache.unpack(&module).unwrap();
    assert_eq!(dir, cache.module_dir(&module).unwrap());
    assert!(dir.join("go.mod").is_file());
    assert!(dir.join("policy").join("policy.go").is_file());

    assert_eq!(cache.lookup(&module).unwrap(), Some(dir));
}

#[test]
fn test_unpack_twice_is_a_hit() {
    let temp = TempDir::new().unwrap();
    let cache = DependencyCache::open(temp.path()).unwrap();
    let module = ModuleRef::new("example.com/m", "v0.3.1").unwrap();

    cache
        .store_archive(&module, &module_zip(&module, &[("go.mod", "module example.com/m\n")]))
        .unwrap();

    let first = cache.unpack(&module).unwrap();
    let second = cache.unpack(&module).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_versions_are_separate_entries() {
    let temp = TempDir::new().unwrap();
    let cache = DependencyCache::open(temp.path()).unwrap();
    let v1 = ModuleRef::new("example.com/m", "v1.0.0").unwrap();
    let v2 = ModuleRef::new("example.com/m", "v1.1.0").unwrap();

    for module in [&v1, &v2] {
        cache
            .store_archive(module, &module_zip(module, &[("a.go", "package m\n")]))
            .unwrap();
        cache.unpack(module).unwrap();
    }

    assert_ne!(cache.module_dir(&v1).unwrap(), cache.module_dir(&v2).unwrap());
    assert!(cache.exists(&v1));
    assert!(cache.exists(&v2));
}

#[test]
fn test_remove_and_clear() {
    let temp = TempDir::new().unwrap();
    let cache = DependencyCache::open(temp.path()).unwrap();
    let module = ModuleRef::new("example.com/m", "v1.0.0").unwrap();

    cache
        .store_archive(&module, &module_zip(&module, &[("a.go", "package m\n")]))
        .unwrap();
    cache.unpack(&module).unwrap();

    cache.remove(&module).unwrap();
    assert!(!cache.exists(&module));
    assert!(!cache.archive_path(&module).unwrap().exists());

    cache
        .store_archive(&module, &module_zip(&module, &[("a.go", "package m\n")]))
        .unwrap();
    cache.unpack(&module).unwrap();
    cache.clear().unwrap();
    assert!(!cache.exists(&module));
    assert!(temp.path().join("zips").is_dir());
}

#[test]
fn test_path_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let cache = DependencyCache::open(temp.path().join("cache")).unwrap();
    let module = ModuleRef::new("example.com/m", "v1.0.0").unwrap();

    let bytes = module_zip(&module, &[("../../escape.go", "package evil\n")]);
    cache.store_archive(&module, &bytes).unwrap();

    let result = cache.unpack(&module);
    assert!(matches!(result, Err(CacheError::InvalidArchive(_))));
    assert!(!cache.exists(&module));
    assert!(!temp.path().join("escape.go").exists());
}
