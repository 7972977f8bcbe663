//! Alias resolution
//!
//! Every cross-package alias of the reviewed module is followed to the
//! definition it names. Target packages are loaded on demand into the
//! [`WorkingSet`]; a found definition is hoisted into the alias's own
//! package under the alias name, together with its methods. Unreachable
//! targets leave the alias as an opaque reference with one diagnostic.

mod hoist;
mod locate;

use crate::ast::AstProvider;
use crate::config::ReviewConfig;
use crate::index::ModuleIndexer;
use crate::model::{
    is_exported, is_internal_path, AliasFailure, AliasState, Diagnostic, Func, Module, Package,
    QualifiedName, TypeDef,
};
use apiview_deps::ModuleFetcher;
use hoist::{Hoister, Origin};
use locate::ModuleLocator;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// The reviewed module plus every module loaded to resolve aliases
#[derive(Debug)]
pub struct WorkingSet {
    /// The reviewed module comes first
    modules: Vec<Module>,
    /// Import paths that could not be loaded, with the reason
    unreachable: HashMap<String, (AliasFailure, String)>,
}

impl WorkingSet {
    pub fn new(mut reviewed: Module) -> Self {
        reviewed.reviewed = true;
        Self {
            modules: vec![reviewed],
            unreachable: HashMap::new(),
        }
    }

    pub fn reviewed(&self) -> &Module {
        &self.modules[0]
    }

    fn reviewed_mut(&mut self) -> &mut Module {
        &mut self.modules[0]
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn into_reviewed(mut self) -> Module {
        self.modules.swap_remove(0)
    }

    /// Package by import path in any loaded module
    pub fn find_package(&self, import_path: &str) -> Option<&Package> {
        self.modules.iter().find_map(|m| m.package(import_path))
    }

    pub fn has_module(&self, module_path: &str) -> bool {
        self.modules.iter().any(|m| m.path == module_path)
    }

    fn add_module(&mut self, module: Module) {
        debug!(module = %module.path, packages = module.packages().len(), "loaded module");
        self.modules.push(module);
    }
}

/// Counts reported by one resolution pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub failed: usize,
}

/// Where following an alias chain ended
enum Outcome {
    Found {
        def: TypeDef,
        methods: Vec<Func>,
        origin: Origin,
        chain: Vec<QualifiedName>,
    },
    Failed {
        failure: AliasFailure,
        /// The unreachable target is an `internal` package
        internal: bool,
        reason: String,
    },
}

/// Resolves the aliases of the reviewed module
pub struct AliasResolver<'a> {
    config: &'a ReviewConfig,
    indexer: ModuleIndexer<'a>,
    fetcher: Option<&'a ModuleFetcher>,
}

impl<'a> AliasResolver<'a> {
    pub fn new(
        config: &'a ReviewConfig,
        provider: &'a dyn AstProvider,
        fetcher: Option<&'a ModuleFetcher>,
    ) -> Self {
        let indexer = ModuleIndexer::new(provider)
            .with_skip_dirs(config.skip_dirs.clone())
            .with_structural_level(config.severity.structural);
        Self {
            config,
            indexer,
            fetcher,
        }
    }

    /// Settle every unresolved alias of the reviewed module
    pub fn resolve(&self, ws: &mut WorkingSet) -> ResolveSummary {
        let locator = ModuleLocator::new(ws.reviewed(), self.fetcher);
        let pending: Vec<(String, usize)> = ws
            .reviewed()
            .packages()
            .values()
            .flat_map(|p| {
                p.aliases()
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.is_unresolved())
                    .map(|(i, _)| (p.import_path.clone(), i))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut summary = ResolveSummary::default();
        for (import_path, idx) in pending {
            let Some(target) = ws
                .reviewed()
                .package(&import_path)
                .map(|p| p.aliases()[idx].target.clone())
            else {
                continue;
            };
            let outcome = self.follow(ws, &locator, target);
            match &outcome {
                Outcome::Found { .. } => summary.resolved += 1,
                Outcome::Failed { .. } => summary.failed += 1,
            }
            self.apply(ws, &import_path, idx, outcome);
        }

        info!(
            resolved = summary.resolved,
            failed = summary.failed,
            modules = ws.modules().len(),
            "resolved aliases"
        );
        summary
    }

    /// Follow an alias chain to a concrete definition
    fn follow(&self, ws: &mut WorkingSet, locator: &ModuleLocator, start: QualifiedName) -> Outcome {
        let mut chain: Vec<QualifiedName> = Vec::new();
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut current = start;

        loop {
            if chain.len() >= self.config.max_alias_depth {
                return Outcome::Failed {
                    failure: AliasFailure::NotFound,
                    internal: false,
                    reason: format!(
                        "alias chain exceeds {} hops",
                        self.config.max_alias_depth
                    ),
                };
            }
            if !visited.insert((current.package.clone(), current.name.clone())) {
                return Outcome::Failed {
                    failure: AliasFailure::NotFound,
                    internal: false,
                    reason: format!("alias cycle through {}", current),
                };
            }
            chain.push(current.clone());

            if let Err((failure, reason)) = self.ensure_package(ws, locator, &current.package) {
                return Outcome::Failed {
                    failure,
                    internal: is_internal_path(&current.package),
                    reason,
                };
            }
            let Some(package) = ws.find_package(&current.package) else {
                return Outcome::Failed {
                    failure: AliasFailure::NotFound,
                    internal: false,
                    reason: format!("package {} is not loaded", current.package),
                };
            };

            // Hoisted aliases also hold a copied definition; follow the
            // reference so every hop is reported
            if let Some(next) = package.alias(&current.name) {
                current = next.target.clone();
                continue;
            }

            if let Some(def) = package.symbols().type_def(&current.name) {
                if let Some(next) = local_alias_target(package, &def) {
                    current = QualifiedName::new(package.import_path.clone(), next);
                    continue;
                }
                if let Some(hidden) = unexported_alias_target(&def) {
                    return Outcome::Failed {
                        failure: AliasFailure::NotFound,
                        internal: false,
                        reason: format!("{} aliases unexported type {}", current, hidden),
                    };
                }
                let methods = package.symbols().methods_of(&current.name).cloned().collect();
                return Outcome::Found {
                    def,
                    methods,
                    origin: Origin::of(package),
                    chain,
                };
            }

            return Outcome::Failed {
                failure: AliasFailure::NotFound,
                internal: false,
                reason: format!("{} is not declared in {}", current.name, current.package),
            };
        }
    }

    /// Make sure the package of `import_path` is in the working set
    fn ensure_package(
        &self,
        ws: &mut WorkingSet,
        locator: &ModuleLocator,
        import_path: &str,
    ) -> Result<(), (AliasFailure, String)> {
        if ws.find_package(import_path).is_some() {
            return Ok(());
        }
        if let Some(known) = ws.unreachable.get(import_path) {
            return Err(known.clone());
        }

        let result = self.load(ws, locator, import_path);
        if let Err(failure) = &result {
            ws.unreachable
                .insert(import_path.to_string(), failure.clone());
        }
        result
    }

    fn load(
        &self,
        ws: &mut WorkingSet,
        locator: &ModuleLocator,
        import_path: &str,
    ) -> Result<(), (AliasFailure, String)> {
        let located = match locator.locate(import_path) {
            Ok(Some(located)) => located,
            Ok(None) if ws.reviewed().contains_import_path(import_path) => {
                return Err((
                    AliasFailure::NotFound,
                    format!("package {} does not exist", import_path),
                ));
            }
            Ok(None) => {
                return Err((
                    AliasFailure::ExternalRepo,
                    format!("{} is defined outside this repository", import_path),
                ));
            }
            Err(reason) => {
                warn!(%import_path, %reason, "module acquisition failed");
                return Err((AliasFailure::Acquisition, reason));
            }
        };

        if !ws.has_module(&located.module_path) {
            match self.indexer.index_as(&located.dir, &located.module_path) {
                Ok(module) => ws.add_module(module),
                Err(e) => {
                    warn!(module = %located.module_path, error = %e, "failed to index module");
                    return Err((
                        AliasFailure::NotFound,
                        format!("module {} could not be indexed: {}", located.module_path, e),
                    ));
                }
            }
        }

        if ws.find_package(import_path).is_some() {
            Ok(())
        } else {
            Err((
                AliasFailure::NotFound,
                format!(
                    "package {} does not exist in module {}",
                    import_path, located.module_path
                ),
            ))
        }
    }

    /// Hoist or mark the alias at `idx` of package `import_path`
    fn apply(&self, ws: &mut WorkingSet, import_path: &str, idx: usize, outcome: Outcome) {
        let policy = self.config.severity;
        let Some(package) = ws.reviewed_mut().package_mut(import_path) else {
            return;
        };
        let alias = package.aliases()[idx].clone();
        let target_id = package.definition_id(&alias.name);

        match outcome {
            Outcome::Found {
                def,
                methods,
                origin,
                chain,
            } => {
                let args = &alias.target.type_args;
                let hoister = Hoister::new(&origin, package);
                let def = hoister.definition(def, &alias.name, args);
                let methods: Vec<_> = methods
                    .into_iter()
                    .map(|m| hoister.method(m, &alias.name, args))
                    .collect();

                if !package.symbols_mut().add_type(def) {
                    debug!(alias = %alias.name, "alias name already defined");
                }
                for method in methods {
                    package.symbols_mut().add_func(method);
                }

                let mut from = alias.name.clone();
                for hop in &chain {
                    package.push_diagnostic(Diagnostic::new(
                        target_id.clone(),
                        policy.alias_source,
                        format!("{} is an alias of {}", from, hop),
                    ));
                    from = hop.to_string();
                }

                let source = chain.last().cloned().unwrap_or_else(|| alias.target.clone());
                debug!(alias = %target_id, %source, hops = chain.len(), "hoisted alias");
                package.aliases_mut()[idx].settle(AliasState::Resolved { source });
            }
            Outcome::Failed {
                failure,
                internal,
                reason,
            } => {
                let level = match failure {
                    AliasFailure::ExternalRepo if internal => policy.external_internal,
                    AliasFailure::ExternalRepo => policy.external_repo,
                    AliasFailure::NotFound => policy.not_found,
                    AliasFailure::Acquisition => policy.acquisition,
                };
                package.push_diagnostic(Diagnostic::new(
                    target_id.clone(),
                    level,
                    format!(
                        "{} is an alias of {} whose definition cannot be shown: {}",
                        alias.name, alias.target, reason
                    ),
                ));
                debug!(alias = %target_id, ?failure, "alias left opaque");
                package.aliases_mut()[idx].settle(AliasState::Failed(failure));
            }
        }
    }
}

/// Predeclared identifiers that may appear as alias targets
const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32",
    "float64", "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr",
];

/// Target of `type Bar = baz` when `baz` is an unexported type of the
/// package, whose definition the symbol table does not hold
fn unexported_alias_target(def: &TypeDef) -> Option<&str> {
    let TypeDef::Simple(t) = def else {
        return None;
    };
    let target = t.underlying.as_str();
    let is_ident = target.starts_with(|c: char| c.is_alphabetic() || c == '_')
        && target.chars().all(|c| c.is_alphanumeric() || c == '_');
    (t.alias && is_ident && !is_exported(target) && !PREDECLARED_TYPES.contains(&target))
        .then_some(target)
}

/// Same-package alias (`type Bar = Baz`) that should be followed further
fn local_alias_target(package: &Package, def: &TypeDef) -> Option<String> {
    let TypeDef::Simple(t) = def else {
        return None;
    };
    let is_ident = !t.underlying.is_empty()
        && t.underlying
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_');
    let known = package.symbols().has_type(&t.underlying) || package.alias(&t.underlying).is_some();
    (t.alias && is_ident && known).then(|| t.underlying.clone())
}
