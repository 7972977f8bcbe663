//! Locating the module that provides an import path
//!
//! Tried in order:
//! 1. a local `replace` directive of the reviewed module's `go.mod`;
//! 2. a sibling module in the same source tree, found by mapping the
//!    reviewed module path onto its root directory;
//! 3. a `require`d module under a fetchable prefix, acquired through the
//!    module fetcher.

use crate::model::Module;
use apiview_deps::{GoMod, ModuleFetcher, ModuleRef, ReplaceTarget};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A module directory able to provide an import path
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Located {
    /// Module path the import path is resolved against
    pub module_path: String,
    pub dir: PathBuf,
}

pub(crate) struct ModuleLocator<'a> {
    root: PathBuf,
    gomod: Option<GoMod>,
    /// Module path prefix shared by every module of the source tree
    repo_prefix: String,
    /// Directory corresponding to `repo_prefix`
    repo_root: PathBuf,
    fetcher: Option<&'a ModuleFetcher>,
}

impl<'a> ModuleLocator<'a> {
    pub fn new(reviewed: &Module, fetcher: Option<&'a ModuleFetcher>) -> Self {
        let root = reviewed
            .root
            .canonicalize()
            .unwrap_or_else(|_| reviewed.root.clone());
        let (repo_prefix, repo_root) = repo_mapping(&reviewed.path, &root);
        Self {
            root,
            gomod: reviewed.gomod.clone(),
            repo_prefix,
            repo_root,
            fetcher,
        }
    }

    /// Find a module directory for `import_path`
    ///
    /// `Ok(None)` means no strategy applies; `Err` carries the reason a
    /// fetchable module could not be acquired.
    pub fn locate(&self, import_path: &str) -> Result<Option<Located>, String> {
        if let Some(found) = self.local_replacement(import_path) {
            debug!(%import_path, dir = %found.dir.display(), "located through replace directive");
            return Ok(Some(found));
        }
        if let Some(found) = self.same_tree(import_path) {
            debug!(%import_path, dir = %found.dir.display(), "located in source tree");
            return Ok(Some(found));
        }
        self.fetch(import_path)
    }

    fn local_replacement(&self, import_path: &str) -> Option<Located> {
        let gomod = self.gomod.as_ref()?;
        gomod
            .local_replacements_for(import_path)
            .into_iter()
            .map(|(module_path, dir)| Located {
                module_path: module_path.to_string(),
                dir: self.root.join(dir),
            })
            .find(|l| l.dir.join("go.mod").is_file())
    }

    fn same_tree(&self, import_path: &str) -> Option<Located> {
        let rest = if import_path == self.repo_prefix {
            ""
        } else {
            import_path
                .strip_prefix(self.repo_prefix.as_str())?
                .strip_prefix('/')?
        };
        let elements: Vec<&str> = rest.split('/').filter(|e| !e.is_empty()).collect();

        // Deepest directory with a matching go.mod wins, like nested modules
        for depth in (0..=elements.len()).rev() {
            let mut dir = self.repo_root.clone();
            dir.extend(&elements[..depth]);
            let mut module_path = self.repo_prefix.clone();
            for e in &elements[..depth] {
                module_path.push('/');
                module_path.push_str(e);
            }

            let Ok(gomod) = GoMod::from_dir(&dir) else {
                continue;
            };
            if gomod.module == module_path {
                return Some(Located { module_path, dir });
            }
        }
        None
    }

    fn fetch(&self, import_path: &str) -> Result<Option<Located>, String> {
        let (Some(fetcher), Some(gomod)) = (self.fetcher, self.gomod.as_ref()) else {
            return Ok(None);
        };
        let Some(require) = gomod.module_for_package(import_path) else {
            return Ok(None);
        };
        if !fetcher.is_fetchable(&require.path) {
            return Ok(None);
        }

        let (path, version) = match gomod.replacement(&require.path, Some(&require.version)) {
            Some(replace) => match &replace.target {
                ReplaceTarget::Module { path, version } => (path.as_str(), version.as_str()),
                ReplaceTarget::Local(_) => return Ok(None),
            },
            None => (require.path.as_str(), require.version.as_str()),
        };

        let coordinate = ModuleRef::new(path, version).map_err(|e| e.to_string())?;
        let dir = fetcher
            .acquire(&coordinate)
            .map_err(|e| format!("failed to fetch {}: {}", coordinate, e))?;
        Ok(Some(Located {
            module_path: require.path.clone(),
            dir,
        }))
    }
}

/// Map a module path onto its root directory
///
/// Trailing module path elements that match trailing directory names are
/// peeled off together; what remains is the module path prefix of the
/// source tree and the directory it corresponds to. At least the first
/// module path element is always kept.
fn repo_mapping(module_path: &str, root: &Path) -> (String, PathBuf) {
    let elements: Vec<&str> = module_path.split('/').collect();
    let dirs: Vec<String> = root
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let mut matched = 0;
    while matched + 1 < elements.len()
        && matched < dirs.len()
        && elements[elements.len() - 1 - matched] == dirs[dirs.len() - 1 - matched]
    {
        matched += 1;
    }

    let prefix = elements[..elements.len() - matched].join("/");
    let mut repo_root = root.to_path_buf();
    for _ in 0..matched {
        repo_root.pop();
    }
    (prefix, repo_root)
}
