//! Packages, modules and alias references

use super::diagnostic::Diagnostic;
use super::symbols::SymbolTable;
use apiview_deps::GoMod;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A type named by import path: `example.com/m/other.Bar[int]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Import path of the declaring package
    pub package: String,
    pub name: String,
    pub type_args: Vec<String>,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            type_args: Vec::new(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)?;
        if !self.type_args.is_empty() {
            write!(f, "[{}]", self.type_args.join(", "))?;
        }
        Ok(())
    }
}

/// Why an alias could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasFailure {
    /// Target lives in a module that is neither local nor fetchable
    ExternalRepo,
    /// Target package was loaded but holds no such type, or the chain is
    /// cyclic or too deep
    NotFound,
    /// Target module should have been fetchable but acquisition failed
    Acquisition,
}

/// Resolution state of an alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasState {
    Unresolved,
    /// Definition was hoisted from `source`
    Resolved { source: QualifiedName },
    Failed(AliasFailure),
}

/// `type Foo = other.Bar` where the target is in another package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRef {
    /// Local name of the alias
    pub name: String,
    pub target: QualifiedName,
    /// Target as written in the source (`other.Bar`)
    pub target_text: String,
    state: AliasState,
}

impl AliasRef {
    pub fn new(name: impl Into<String>, target: QualifiedName, target_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target,
            target_text: target_text.into(),
            state: AliasState::Unresolved,
        }
    }

    pub fn state(&self) -> &AliasState {
        &self.state
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.state, AliasState::Unresolved)
    }

    /// Move the alias to a terminal state; an alias settles exactly once
    pub(crate) fn settle(&mut self, state: AliasState) {
        debug_assert!(self.is_unresolved(), "alias {} settled twice", self.name);
        debug_assert!(!matches!(state, AliasState::Unresolved));
        if self.is_unresolved() {
            self.state = state;
        }
    }
}

/// One Go package
#[derive(Debug, Clone)]
pub struct Package {
    /// Full import path
    pub import_path: String,
    /// Name from the package clause
    pub name: String,
    /// Prefix of every definition id in this package
    pub scope: String,
    pub dir: PathBuf,
    /// Import path contains an `internal` element
    pub internal: bool,
    symbols: SymbolTable,
    aliases: Vec<AliasRef>,
    /// Import qualifier → import path, across all files of the package
    imports: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl Package {
    pub fn new(
        import_path: impl Into<String>,
        name: impl Into<String>,
        scope: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        let import_path = import_path.into();
        let internal = is_internal_path(&import_path);
        Self {
            import_path,
            name: name.into(),
            scope: scope.into(),
            dir: dir.into(),
            internal,
            symbols: SymbolTable::new(),
            aliases: Vec::new(),
            imports: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn aliases(&self) -> &[AliasRef] {
        &self.aliases
    }

    pub(crate) fn aliases_mut(&mut self) -> &mut [AliasRef] {
        &mut self.aliases
    }

    pub fn alias(&self, name: &str) -> Option<&AliasRef> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// Record a cross-package alias; returns false for a duplicate name
    pub fn add_alias(&mut self, alias: AliasRef) -> bool {
        if self.alias(&alias.name).is_some() || self.symbols.has_type(&alias.name) {
            return false;
        }
        self.aliases.push(alias);
        true
    }

    pub fn imports(&self) -> &BTreeMap<String, String> {
        &self.imports
    }

    /// Import path a qualifier refers to in this package
    pub fn import_path_of(&self, qualifier: &str) -> Option<&str> {
        self.imports.get(qualifier).map(String::as_str)
    }

    /// Bind a qualifier to an import path unless it is already taken
    ///
    /// Returns whether `qualifier` now refers to `import_path`.
    pub fn bind_import(&mut self, qualifier: &str, import_path: &str) -> bool {
        self.imports
            .entry(qualifier.to_string())
            .or_insert_with(|| import_path.to_string())
            == import_path
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Definition id of a top-level declaration
    pub fn definition_id(&self, name: &str) -> String {
        format!("{}.{}", self.scope, name)
    }

    /// `main` packages are commands, not importable API
    pub fn is_command(&self) -> bool {
        self.name == "main"
    }

    /// Whether the package's API belongs in the review output
    pub fn is_public(&self) -> bool {
        !self.internal && !self.is_command()
    }
}

/// A module and its packages
#[derive(Debug, Clone)]
pub struct Module {
    /// Module path from `go.mod`
    pub path: String,
    pub root: PathBuf,
    pub gomod: Option<GoMod>,
    /// The module under review, as opposed to a dependency loaded for lookups
    pub reviewed: bool,
    packages: BTreeMap<String, Package>,
    diagnostics: Vec<Diagnostic>,
}

impl Module {
    pub fn new(path: impl Into<String>, root: impl Into<PathBuf>, gomod: Option<GoMod>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
            gomod,
            reviewed: false,
            packages: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Packages by import path
    pub fn packages(&self) -> &BTreeMap<String, Package> {
        &self.packages
    }

    pub fn package(&self, import_path: &str) -> Option<&Package> {
        self.packages.get(import_path)
    }

    pub(crate) fn package_mut(&mut self, import_path: &str) -> Option<&mut Package> {
        self.packages.get_mut(import_path)
    }

    pub fn add_package(&mut self, package: Package) {
        self.packages.insert(package.import_path.clone(), package);
    }

    /// Module-level diagnostics (directories that failed to index)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Whether an import path falls inside this module's path space
    pub fn contains_import_path(&self, import_path: &str) -> bool {
        apiview_deps::path_within(import_path, &self.path)
    }

    /// Scope of the package at `rel` (slash separated, empty for the root)
    pub fn scope_for(&self, rel: &str) -> String {
        package_scope(&self.path, rel)
    }
}

/// Definition-id prefix of a package
///
/// The last element of the module path (skipping a `/vN` major version
/// suffix) followed by the package's directory relative to the module root.
pub fn package_scope(module_path: &str, rel: &str) -> String {
    let mut elements = module_path.rsplit('/');
    let mut base = elements.next().unwrap_or(module_path);
    if is_major_version(base) {
        if let Some(prev) = elements.next() {
            base = prev;
        }
    }
    if rel.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, rel)
    }
}

fn is_major_version(element: &str) -> bool {
    element
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Whether an import path has an `internal` element
pub fn is_internal_path(import_path: &str) -> bool {
    import_path.split('/').any(|e| e == "internal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_scope() {
        assert_eq!(package_scope("github.com/Azure/sdk/azblob", ""), "azblob");
        assert_eq!(package_scope("github.com/Azure/sdk/azblob", "blob"), "azblob/blob");
        assert_eq!(package_scope("example.com/foo/v2", "bar"), "foo/bar");
        assert_eq!(package_scope("single", ""), "single");
    }

    #[test]
    fn test_internal_and_command_are_not_public() {
        let p = Package::new("example.com/m/internal/x", "x", "m/internal/x", "/tmp");
        assert!(p.internal);
        assert!(!p.is_public());

        let cmd = Package::new("example.com/m/cmd/tool", "main", "m/cmd/tool", "/tmp");
        assert!(!cmd.is_public());

        let lib = Package::new("example.com/m/internals", "internals", "m/internals", "/tmp");
        assert!(lib.is_public());
    }

    #[test]
    fn test_alias_settles_once() {
        let mut alias = AliasRef::new("Foo", QualifiedName::new("example.com/o", "Bar"), "o.Bar");
        assert!(alias.is_unresolved());
        alias.settle(AliasState::Failed(AliasFailure::ExternalRepo));
        assert_eq!(alias.state(), &AliasState::Failed(AliasFailure::ExternalRepo));
    }

    #[test]
    fn test_first_import_binding_wins() {
        let mut p = Package::new("example.com/m/c", "c", "m/c", "/tmp");
        assert!(p.bind_import("models", "example.com/m/b/models"));
        assert!(p.bind_import("models", "example.com/m/b/models"));
        assert!(!p.bind_import("models", "example.com/m/a/models"));
        assert_eq!(p.import_path_of("models"), Some("example.com/m/b/models"));
        assert_eq!(p.import_path_of("other"), None);
    }

    #[test]
    fn test_qualified_name_display() {
        let mut q = QualifiedName::new("example.com/o", "List");
        q.type_args = vec!["int".into()];
        assert_eq!(q.to_string(), "example.com/o.List[int]");
    }
}
