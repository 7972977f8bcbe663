//! Alias resolution through the module fetcher
//!
//! A fake archive source stands in for the registry so requests can be
//! counted.

use apiview_deps::{ArchiveSource, FetchConfig, ModuleFetcher, ModuleRef, RegistryError};
use apiview_engine::{GoSourceParser, Level, Review, ReviewConfig, ReviewDocument};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const AZCORE: &str = "github.com/Azure/azure-sdk-for-go/sdk/azcore";

#[derive(Default)]
struct FakeRegistry {
    archives: HashMap<ModuleRef, Vec<u8>>,
    requests: AtomicUsize,
}

impl FakeRegistry {
    fn with_module(mut self, module: &ModuleRef, files: &[(&str, &str)]) -> Self {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in files {
            let entry = format!("{}{}", module.archive_prefix(), name);
            writer.start_file(entry, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        self.archives
            .insert(module.clone(), writer.finish().unwrap().into_inner());
        self
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ArchiveSource for FakeRegistry {
    fn fetch_archive(&self, module: &ModuleRef) -> Result<Vec<u8>, RegistryError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.archives
            .get(module)
            .cloned()
            .ok_or_else(|| RegistryError::HttpStatus {
                status: 404,
                url: module.to_string(),
                body: "not found".to_string(),
            })
    }
}

fn azcore() -> ModuleRef {
    ModuleRef::new(AZCORE, "v1.11.0").unwrap()
}

fn azcore_registry() -> FakeRegistry {
    FakeRegistry::default().with_module(
        &azcore(),
        &[
            ("go.mod", "module github.com/Azure/azure-sdk-for-go/sdk/azcore\n"),
            (
                "policy/policy.go",
                "package policy\n\ntype ClientOptions struct {\n\tRetries int\n}\n",
            ),
        ],
    )
}

fn write_app(root: &Path) {
    fs::write(
        root.join("go.mod"),
        format!("module example.com/app\n\nrequire {} v1.11.0\n", AZCORE),
    )
    .unwrap();
    fs::write(
        root.join("app.go"),
        format!(
            "package app\n\nimport \"{}/policy\"\n\ntype Options = policy.ClientOptions\n",
            AZCORE
        ),
    )
    .unwrap();
}

fn run(root: &Path, cache: &Path, registry: Arc<FakeRegistry>) -> ReviewDocument {
    let config = ReviewConfig {
        fetch: FetchConfig::with_cache_dir(cache),
        ..ReviewConfig::default()
    };
    let fetcher = ModuleFetcher::with_source(config.fetch.clone(), registry).unwrap();
    let parser = GoSourceParser::new();
    Review::new(&config, &parser, Some(&fetcher)).run(root).unwrap()
}

#[test]
fn test_alias_resolved_from_registry() {
    let module = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    write_app(module.path());
    let registry = Arc::new(azcore_registry());

    let doc = run(module.path(), cache.path(), registry.clone());

    assert!(doc.definition("Retries-app.Options").is_some());
    assert_eq!(registry.requests(), 1);
    assert_eq!(doc.diagnostics.len(), 1);
    assert_eq!(doc.diagnostics[0].level, Level::Info);
    assert_eq!(
        doc.diagnostics[0].text,
        format!("Options is an alias of {}/policy.ClientOptions", AZCORE)
    );
}

#[test]
fn test_cached_module_is_not_downloaded_again() {
    let module = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    write_app(module.path());
    let registry = Arc::new(azcore_registry());

    let first = run(module.path(), cache.path(), registry.clone());
    let second = run(module.path(), cache.path(), registry.clone());

    assert_eq!(registry.requests(), 1);
    assert_eq!(first, second);
}

#[test]
fn test_failed_download_leaves_alias_opaque() {
    let module = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    write_app(module.path());
    let registry = Arc::new(FakeRegistry::default());

    let doc = run(module.path(), cache.path(), registry.clone());

    assert_eq!(registry.requests(), 1);
    assert!(doc.definition("app.Options").is_some());
    assert!(doc.definition("Retries-app.Options").is_none());
    assert_eq!(doc.diagnostics.len(), 1);
    assert_eq!(doc.diagnostics[0].target_id, "app.Options");
    assert_eq!(doc.diagnostics[0].level, Level::Warning);
    assert!(doc.diagnostics[0].text.contains("failed to fetch"));
}

#[test]
fn test_module_outside_fetchable_prefixes_is_external() {
    let module = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    fs::write(
        module.path().join("go.mod"),
        "module example.com/app\n\nrequire github.com/elsewhere/lib v1.0.0\n",
    )
    .unwrap();
    fs::write(
        module.path().join("app.go"),
        "package app\n\nimport \"github.com/elsewhere/lib/internal/core\"\n\ntype Engine = core.Engine\n",
    )
    .unwrap();
    let registry = Arc::new(FakeRegistry::default());

    let doc = run(module.path(), cache.path(), registry.clone());

    assert_eq!(registry.requests(), 0);
    assert_eq!(doc.diagnostics.len(), 1);
    assert_eq!(doc.diagnostics[0].level, Level::Error);
    assert!(doc.diagnostics[0].text.contains("outside this repository"));
}
