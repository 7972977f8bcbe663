//! Package indexer
//!
//! Builds the symbol table of one package directory from its parsed files.

use super::infer::{expand_consts, expand_vars, PackageFacts, TypeInference};
use super::IndexError;
use crate::ast::{AstProvider, Decl, SourceFile, TypeDecl, TypeSpec, ValueSpec};
use crate::model::{
    is_exported, AliasRef, Const, Func, Package, QualifiedName, SimpleType, TypeDef, Var,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Indexes a single package directory
pub struct PackageIndexer<'a> {
    provider: &'a dyn AstProvider,
}

impl<'a> PackageIndexer<'a> {
    pub fn new(provider: &'a dyn AstProvider) -> Self {
        Self { provider }
    }

    /// Non-test Go sources of a directory, sorted by name
    pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
        let io_err = |source| IndexError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(".go") && !name.ends_with("_test.go") && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse and index the package in `dir`
    pub fn index(&self, dir: &Path, import_path: &str, scope: &str) -> Result<Package, IndexError> {
        let paths = Self::source_files(dir)?;
        if paths.is_empty() {
            return Err(IndexError::NoSources(dir.to_path_buf()));
        }

        let files = paths
            .iter()
            .map(|p| self.provider.parse_file(p))
            .collect::<Result<Vec<_>, _>>()?;

        build_package(dir, import_path, scope, &files)
    }
}

/// Build a package from already parsed files
pub fn build_package(
    dir: &Path,
    import_path: &str,
    scope: &str,
    files: &[SourceFile],
) -> Result<Package, IndexError> {
    let names: BTreeSet<&str> = files.iter().map(|f| f.package.as_str()).collect();
    let name = match names.len() {
        0 => return Err(IndexError::NoSources(dir.to_path_buf())),
        1 => names.iter().next().copied().unwrap_or_default(),
        _ => {
            return Err(IndexError::MixedPackages {
                dir: dir.to_path_buf(),
                names: names.iter().map(|n| n.to_string()).collect(),
            })
        }
    };

    if files.iter().all(|f| f.decls.is_empty()) {
        return Err(IndexError::NoDeclarations(dir.to_path_buf()));
    }

    let mut package = Package::new(import_path, name, scope, dir);
    let facts = PackageFacts::collect(files);
    let mut const_groups: Vec<&[ValueSpec]> = Vec::new();
    let mut var_groups: Vec<&[ValueSpec]> = Vec::new();

    for file in files {
        for import in &file.imports {
            if let Some(qualifier) = import.local_name() {
                if !package.bind_import(&qualifier, &import.path) {
                    debug!(%qualifier, path = %import.path, "qualifier bound to another import");
                }
            }
        }
        for decl in &file.decls {
            match decl {
                Decl::Type(t) => add_type(&mut package, file, t),
                Decl::Func(f) => add_func(&mut package, f),
                Decl::Const(specs) => const_groups.push(specs),
                Decl::Var(specs) => var_groups.push(specs),
            }
        }
    }

    let mut inference = TypeInference::new(&facts);

    let consts: Vec<_> = const_groups.into_iter().flat_map(expand_consts).collect();
    let types = inference.resolve(&consts);
    for (decl, ty) in consts.into_iter().zip(types) {
        if !is_exported(&decl.name) {
            continue;
        }
        package.symbols_mut().add_const(Const {
            name: decl.name,
            ty,
            declared: decl.declared.is_some(),
            value: decl.value.filter(|_| !decl.implicit).map(|v| v.text),
        });
    }

    let vars: Vec<_> = var_groups.into_iter().flat_map(expand_vars).collect();
    let types = inference.resolve(&vars);
    for (decl, ty) in vars.into_iter().zip(types) {
        if !is_exported(&decl.name) {
            continue;
        }
        package.symbols_mut().add_var(Var {
            name: decl.name,
            ty,
            declared: decl.declared.is_some(),
            value: decl.value.map(|v| v.text),
        });
    }

    debug!(
        package = %import_path,
        files = files.len(),
        symbols = package.symbols().len(),
        aliases = package.aliases().len(),
        "indexed package"
    );
    Ok(package)
}

fn add_func(package: &mut Package, func: &Func) {
    if !is_exported(&func.name) {
        return;
    }
    if let Some(recv) = &func.receiver {
        if !is_exported(&recv.type_name) {
            trace!(method = %func.name, receiver = %recv.type_name, "skipping method of unexported type");
            return;
        }
    }
    if !package.symbols_mut().add_func(func.clone()) {
        debug!(func = %func.key(), "duplicate function ignored");
    }
}

fn add_type(package: &mut Package, file: &SourceFile, decl: &TypeDecl) {
    if !is_exported(&decl.name) {
        return;
    }

    let def = match &decl.spec {
        TypeSpec::Struct(s) => TypeDef::Struct(s.clone()),
        TypeSpec::Interface(i) => TypeDef::Interface(i.clone()),
        TypeSpec::Defined(underlying) => TypeDef::Simple(SimpleType {
            name: decl.name.clone(),
            type_params: decl.type_params.clone(),
            underlying: underlying.clone(),
            alias: false,
        }),
        TypeSpec::Alias {
            text,
            target: Some(target),
        } => {
            // An unknown qualifier is kept as written; resolution then
            // reports the alias as unreachable.
            let import_path = file
                .import_for(&target.qualifier)
                .map(|i| i.path.clone())
                .unwrap_or_else(|| target.qualifier.clone());
            let mut name = QualifiedName::new(import_path, target.name.clone());
            name.type_args = target.type_args.clone();
            if !package.add_alias(AliasRef::new(decl.name.clone(), name, text.clone())) {
                debug!(alias = %decl.name, "duplicate alias ignored");
            }
            return;
        }
        TypeSpec::Alias { text, target: None } => TypeDef::Simple(SimpleType {
            name: decl.name.clone(),
            type_params: decl.type_params.clone(),
            underlying: text.clone(),
            alias: true,
        }),
    };

    if !package.symbols_mut().add_type(def) {
        debug!(type_name = %decl.name, "duplicate type ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Import, ValueExpr, ValueKind};
    use crate::model::{AliasState, Receiver, UNKNOWN_TYPE};

    fn file(package: &str, imports: Vec<Import>, decls: Vec<Decl>) -> SourceFile {
        SourceFile {
            path: PathBuf::from(format!("{}.go", package)),
            package: package.to_string(),
            imports,
            decls,
        }
    }

    fn method(recv: &str, name: &str) -> Func {
        let mut f = Func::new(name);
        f.receiver = Some(Receiver::new(Some("r"), recv, true));
        f
    }

    fn value(names: &[&str], ty: Option<&str>, text: &str, kind: ValueKind) -> ValueSpec {
        ValueSpec {
            names: names.iter().map(|n| n.to_string()).collect(),
            ty: ty.map(str::to_string),
            values: vec![ValueExpr {
                text: text.to_string(),
                kind,
            }],
        }
    }

    #[test]
    fn test_mixed_packages_rejected() {
        let files = vec![
            file("a", vec![], vec![Decl::Func(Func::new("A"))]),
            file("b", vec![], vec![Decl::Func(Func::new("B"))]),
        ];
        let err = build_package(Path::new("/m/x"), "m/x", "m/x", &files).unwrap_err();
        assert!(matches!(err, IndexError::MixedPackages { ref names, .. } if names == &["a", "b"]));
    }

    #[test]
    fn test_no_declarations_rejected() {
        let files = vec![file("doc", vec![], vec![])];
        let err = build_package(Path::new("/m/doc"), "m/doc", "m/doc", &files).unwrap_err();
        assert!(matches!(err, IndexError::NoDeclarations(_)));
    }

    #[test]
    fn test_unexported_and_receiver_filtering() {
        let files = vec![file(
            "p",
            vec![],
            vec![
                Decl::Func(Func::new("Exported")),
                Decl::Func(Func::new("hidden")),
                Decl::Func(method("Client", "Do")),
                Decl::Func(method("client", "Do")),
                Decl::Func(method("Client", "do")),
            ],
        )];
        let pkg = build_package(Path::new("/m/p"), "m/p", "m/p", &files).unwrap();
        let keys: Vec<_> = pkg.symbols().funcs().keys().cloned().collect();
        assert_eq!(keys, vec!["Client.Do", "Exported"]);
    }

    #[test]
    fn test_alias_bound_to_import() {
        let decl = TypeDecl {
            name: "Foo".into(),
            type_params: vec![],
            spec: TypeSpec::Alias {
                text: "other.Bar".into(),
                target: Some(crate::ast::AliasTarget {
                    qualifier: "other".into(),
                    name: "Bar".into(),
                    type_args: vec![],
                }),
            },
        };
        let files = vec![file(
            "p",
            vec![Import::new(None, "example.com/lib/other")],
            vec![Decl::Type(decl)],
        )];
        let pkg = build_package(Path::new("/m/p"), "m/p", "m/p", &files).unwrap();

        let alias = pkg.alias("Foo").unwrap();
        assert_eq!(alias.target, QualifiedName::new("example.com/lib/other", "Bar"));
        assert_eq!(alias.state(), &AliasState::Unresolved);
        assert!(!pkg.symbols().has_type("Foo"));
        assert_eq!(pkg.import_path_of("other"), Some("example.com/lib/other"));
    }

    #[test]
    fn test_const_types() {
        let files = vec![file(
            "p",
            vec![],
            vec![
                Decl::Type(TypeDecl {
                    name: "Color".into(),
                    type_params: vec![],
                    spec: TypeSpec::Defined("string".into()),
                }),
                Decl::Const(vec![
                    value(&["Red"], Some("Color"), "\"red\"", ValueKind::String),
                    value(&["Max"], None, "10", ValueKind::Int),
                    value(&["Ext"], None, "other.Value", ValueKind::Ident("other.Value".into())),
                    value(&["internal"], None, "1", ValueKind::Int),
                ]),
            ],
        )];
        let pkg = build_package(Path::new("/m/p"), "m/p", "m/p", &files).unwrap();
        let consts = pkg.symbols().consts();

        assert_eq!(consts.len(), 3);
        assert_eq!(consts["Red"].ty, "Color");
        assert!(consts["Red"].declared);
        assert_eq!(consts["Red"].value.as_deref(), Some("\"red\""));
        assert_eq!(consts["Max"].ty, "int");
        assert!(!consts["Max"].declared);
        assert_eq!(consts["Ext"].ty, UNKNOWN_TYPE);
    }
}
