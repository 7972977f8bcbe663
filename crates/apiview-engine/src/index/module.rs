//! Module indexer
//!
//! Walks a module root, indexes every package directory in parallel and
//! collects the packages into a [`Module`].

use super::package::PackageIndexer;
use super::IndexError;
use crate::ast::AstProvider;
use crate::model::{package_scope, Diagnostic, Level, Module};
use apiview_deps::GoMod;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names never treated as packages
const EXCLUDED_DIRS: &[&str] = &["testdata", "vendor"];

/// Indexes all packages of a module
pub struct ModuleIndexer<'a> {
    provider: &'a dyn AstProvider,
    skip_dirs: Vec<String>,
    structural_level: Level,
}

impl<'a> ModuleIndexer<'a> {
    pub fn new(provider: &'a dyn AstProvider) -> Self {
        Self {
            provider,
            skip_dirs: Vec::new(),
            structural_level: Level::Error,
        }
    }

    /// Additional directory names to skip
    pub fn with_skip_dirs(mut self, dirs: Vec<String>) -> Self {
        self.skip_dirs = dirs;
        self
    }

    /// Level of diagnostics for directories that fail to index
    pub fn with_structural_level(mut self, level: Level) -> Self {
        self.structural_level = level;
        self
    }

    /// Index the module rooted at `root`
    ///
    /// Directories that fail to index become module diagnostics; the rest of
    /// the module is still returned.
    pub fn index(&self, root: &Path) -> Result<Module, IndexError> {
        self.index_with_path(root, None)
    }

    /// Index a module whose packages are imported under `module_path`
    ///
    /// Used for replacement directories, whose own `go.mod` may declare a
    /// different path than the one importers use.
    pub fn index_as(&self, root: &Path, module_path: &str) -> Result<Module, IndexError> {
        self.index_with_path(root, Some(module_path))
    }

    fn index_with_path(&self, root: &Path, module_path: Option<&str>) -> Result<Module, IndexError> {
        if !root.is_dir() {
            return Err(IndexError::NotADirectory(root.to_path_buf()));
        }
        let gomod = GoMod::from_dir(root).map_err(|source| IndexError::GoMod {
            dir: root.to_path_buf(),
            source,
        })?;
        let module_path = module_path.unwrap_or(&gomod.module).to_string();

        let dirs = self.package_dirs(root)?;
        let indexer = PackageIndexer::new(self.provider);

        let results: Vec<_> = dirs
            .par_iter()
            .map(|(dir, rel)| {
                let import_path = if rel.is_empty() {
                    module_path.clone()
                } else {
                    format!("{}/{}", module_path, rel)
                };
                let scope = package_scope(&module_path, rel);
                (scope.clone(), indexer.index(dir, &import_path, &scope))
            })
            .collect();

        let mut module = Module::new(module_path, root, Some(gomod));
        for (scope, result) in results {
            match result {
                Ok(package) => module.add_package(package),
                Err(IndexError::NoSources(_)) => {}
                Err(e) => {
                    warn!(package = %scope, error = %e, "skipping package");
                    module.push_diagnostic(Diagnostic::new(
                        scope,
                        self.structural_level,
                        e.to_string(),
                    ));
                }
            }
        }

        if module.packages().is_empty() && module.diagnostics().is_empty() {
            return Err(IndexError::NoPackages(root.to_path_buf()));
        }

        info!(
            module = %module.path,
            packages = module.packages().len(),
            failed = module.diagnostics().len(),
            "indexed module"
        );
        Ok(module)
    }

    /// Candidate package directories with their slash-separated path
    /// relative to `root`
    fn package_dirs(&self, root: &Path) -> Result<Vec<(PathBuf, String)>, IndexError> {
        let mut dirs = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(|source| IndexError::Walk {
                dir: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            dirs.push((entry.path().to_path_buf(), rel));
        }
        Ok(dirs)
    }

    /// Excluded directories and nested modules
    fn is_skipped(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        let name: &str = &name;
        name.starts_with('.')
            || name.starts_with('_')
            || EXCLUDED_DIRS.contains(&name)
            || self.skip_dirs.iter().any(|d| d == name)
            || entry.path().join("go.mod").is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::GoSourceParser;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_index_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com/widgets\n\ngo 1.21\n");
        write(root, "widgets.go", "package widgets\n\nfunc New() {}\n");
        write(root, "sub/sub.go", "package sub\n\nconst X = 1\n");
        write(root, "testdata/t.go", "package testdata\n\nfunc T() {}\n");
        write(root, "vendor/v/v.go", "package v\n\nfunc V() {}\n");
        write(root, "_hidden/h.go", "package h\n\nfunc H() {}\n");
        write(root, ".git/g.go", "package g\n\nfunc G() {}\n");
        write(root, "nested/go.mod", "module example.com/widgets/nested\n");
        write(root, "nested/n.go", "package nested\n\nfunc N() {}\n");
        write(root, "only_test/x_test.go", "package only\n\nfunc TestX() {}\n");

        let parser = GoSourceParser::new();
        let module = ModuleIndexer::new(&parser).index(root).unwrap();

        assert_eq!(module.path, "example.com/widgets");
        let paths: Vec<_> = module.packages().keys().cloned().collect();
        assert_eq!(paths, vec!["example.com/widgets", "example.com/widgets/sub"]);
        assert!(module.diagnostics().is_empty());
        assert_eq!(module.packages()["example.com/widgets/sub"].scope, "widgets/sub");
    }

    #[test]
    fn test_broken_package_becomes_diagnostic() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "go.mod", "module example.com/m\n");
        write(root, "ok.go", "package m\n\nfunc Ok() {}\n");
        write(root, "mixed/a.go", "package a\n\nfunc A() {}\n");
        write(root, "mixed/b.go", "package b\n\nfunc B() {}\n");

        let parser = GoSourceParser::new();
        let module = ModuleIndexer::new(&parser).index(root).unwrap();

        assert_eq!(module.packages().len(), 1);
        assert_eq!(module.diagnostics().len(), 1);
        let diag = &module.diagnostics()[0];
        assert_eq!(diag.target_id, "m/mixed");
        assert_eq!(diag.level, Level::Error);
    }

    #[test]
    fn test_missing_go_mod() {
        let temp = TempDir::new().unwrap();
        let parser = GoSourceParser::new();
        let err = ModuleIndexer::new(&parser).index(temp.path()).unwrap_err();
        assert!(matches!(err, IndexError::GoMod { .. }));
    }

    #[test]
    fn test_module_without_packages() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module example.com/empty\n");
        let parser = GoSourceParser::new();
        let err = ModuleIndexer::new(&parser).index(temp.path()).unwrap_err();
        assert!(matches!(err, IndexError::NoPackages(_)));
    }
}
