//! Copying a definition into the package of an alias
//!
//! Type text of a hoisted definition was written in the scope of the
//! package that declares it. Before it is stored under the alias name it is
//! rewritten for the alias's package: type names of the declaring package
//! are qualified, qualifiers of its imports are mapped onto the alias
//! package's imports, and type arguments of an instantiated alias replace
//! the type parameters.

use crate::model::{Func, Package, Param, TypeDef, TypeParam};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Words of a type expression that are never names
const KEYWORDS: &[&str] = &["chan", "func", "interface", "map", "struct"];

/// The package a hoisted definition comes from
#[derive(Debug, Clone)]
pub(super) struct Origin {
    import_path: String,
    name: String,
    /// Exported type and alias names declared by the package
    types: HashSet<String>,
    imports: BTreeMap<String, String>,
}

impl Origin {
    pub fn of(package: &Package) -> Self {
        let symbols = package.symbols();
        let types = symbols
            .structs()
            .keys()
            .chain(symbols.interfaces().keys())
            .chain(symbols.simple_types().keys())
            .cloned()
            .chain(package.aliases().iter().map(|a| a.name.clone()))
            .collect();
        Self {
            import_path: package.import_path.clone(),
            name: package.name.clone(),
            types,
            imports: package.imports().clone(),
        }
    }
}

/// Rewrites definitions of one origin for one destination package
pub(super) struct Hoister<'o> {
    origin: &'o Origin,
    /// Qualifier of the origin in the destination, `None` when they are the
    /// same package
    qualifier: Option<String>,
    /// Origin qualifier → destination qualifier, `None` to drop it
    requalify: HashMap<String, Option<String>>,
}

impl<'o> Hoister<'o> {
    /// Binds whatever qualifiers the hoisted text needs in `dest`
    pub fn new(origin: &'o Origin, dest: &mut Package) -> Self {
        let qualifier = if origin.import_path == dest.import_path {
            None
        } else {
            Some(bind_qualifier(dest, &origin.name, &origin.import_path))
        };

        let requalify = origin
            .imports
            .iter()
            .map(|(q, path)| {
                let mapped = if *path == dest.import_path {
                    None
                } else {
                    Some(bind_qualifier(dest, q, path))
                };
                (q.clone(), mapped)
            })
            .collect();

        Self {
            origin,
            qualifier,
            requalify,
        }
    }

    /// The definition under `name`, instantiated with `args` when the
    /// alias supplies one argument per type parameter
    pub fn definition(&self, def: TypeDef, name: &str, args: &[String]) -> TypeDef {
        let mut def = def.renamed(name);
        let type_params = match &mut def {
            TypeDef::Struct(s) => &mut s.type_params,
            TypeDef::Interface(i) => &mut i.type_params,
            TypeDef::Simple(t) => &mut t.type_params,
        };
        let scope = Scope::new(type_params.as_slice(), args);
        if scope.instantiated() {
            type_params.clear();
        } else {
            self.rewrite_params(type_params, &scope);
        }

        match &mut def {
            TypeDef::Struct(s) => {
                for field in &mut s.fields {
                    field.ty = self.type_text(&field.ty, &scope);
                }
                for embedded in &mut s.embedded {
                    embedded.ty = self.type_text(&embedded.ty, &scope);
                }
            }
            TypeDef::Interface(i) => {
                for method in &mut i.methods {
                    self.rewrite_signature(method, &scope);
                }
                for element in &mut i.embedded {
                    *element = self.type_text(element, &scope);
                }
            }
            TypeDef::Simple(t) => t.underlying = self.type_text(&t.underlying, &scope),
        }
        def
    }

    /// A method of the hoisted type, re-targeted at `name`
    pub fn method(&self, mut method: Func, name: &str, args: &[String]) -> Func {
        let mut scope = Scope::default();
        if let Some(recv) = method.receiver.as_mut() {
            recv.type_name = name.to_string();
            let params: Vec<_> = recv
                .type_args
                .iter()
                .map(|a| TypeParam {
                    name: a.clone(),
                    constraint: String::new(),
                })
                .collect();
            scope = Scope::new(&params, args);
            if scope.instantiated() {
                recv.type_args.clear();
            }
        }
        self.rewrite_signature(&mut method, &scope);
        method
    }

    fn rewrite_signature(&self, func: &mut Func, outer: &Scope) {
        let mut scope = outer.clone();
        scope
            .params
            .extend(func.type_params.iter().map(|p| p.name.clone()));
        self.rewrite_params(&mut func.type_params, &scope);
        for param in func.params.iter_mut().chain(func.results.iter_mut()) {
            self.rewrite_param(param, &scope);
        }
    }

    fn rewrite_params(&self, params: &mut [TypeParam], scope: &Scope) {
        for param in params {
            param.constraint = self.type_text(&param.constraint, scope);
        }
    }

    fn rewrite_param(&self, param: &mut Param, scope: &Scope) {
        param.ty = self.type_text(&param.ty, scope);
    }

    fn type_text(&self, text: &str, scope: &Scope) -> String {
        rewrite_names(text, |qualifier, name| match qualifier {
            None => {
                if let Some(arg) = scope.args.get(name) {
                    Some(arg.clone())
                } else if scope.params.contains(name) || !self.origin.types.contains(name) {
                    None
                } else {
                    self.qualifier.as_ref().map(|q| format!("{}.{}", q, name))
                }
            }
            Some(q) => match self.requalify.get(q)? {
                None => Some(name.to_string()),
                Some(mapped) if mapped != q => Some(format!("{}.{}", mapped, name)),
                Some(_) => None,
            },
        })
    }
}

/// Type parameters visible in a piece of text and their arguments
#[derive(Debug, Clone, Default)]
struct Scope {
    params: HashSet<String>,
    args: HashMap<String, String>,
}

impl Scope {
    fn new(params: &[TypeParam], args: &[String]) -> Self {
        let names = params.iter().map(|p| p.name.clone());
        if !args.is_empty() && args.len() == params.len() {
            Self {
                params: HashSet::new(),
                args: names.zip(args.iter().cloned()).collect(),
            }
        } else {
            Self {
                params: names.collect(),
                args: HashMap::new(),
            }
        }
    }

    fn instantiated(&self) -> bool {
        !self.args.is_empty()
    }
}

/// Qualifier under which `dest` refers to `import_path`
///
/// An existing import wins; otherwise `preferred` is bound, with a numeric
/// suffix when it already names another package.
fn bind_qualifier(dest: &mut Package, preferred: &str, import_path: &str) -> String {
    if let Some((q, _)) = dest.imports().iter().find(|(_, p)| *p == import_path) {
        return q.clone();
    }
    let mut candidate = preferred.to_string();
    let mut n = 2;
    while !dest.bind_import(&candidate, import_path) {
        candidate = format!("{}{}", preferred, n);
        n += 1;
    }
    candidate
}

/// Replace the names of a type expression
///
/// `f` gets the qualifier (if any) and the name of every word that is not
/// a keyword and returns its replacement. String literals are copied as
/// written.
fn rewrite_names(text: &str, mut f: impl FnMut(Option<&str>, &str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_alphabetic() || c == '_' {
            while chars
                .next_if(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
                .is_some()
            {}
            let end = chars.peek().map_or(text.len(), |(i, _)| *i);
            let word = &text[start..end];
            let replaced = if KEYWORDS.contains(&word) {
                None
            } else {
                match word.split_once('.') {
                    Some((q, name)) => f(Some(q), name),
                    None => f(None, word),
                }
            };
            out.push_str(replaced.as_deref().unwrap_or(word));
        } else if c == '"' || c == '`' {
            let mut escaped = false;
            for (_, d) in chars.by_ref() {
                if d == c && !escaped {
                    break;
                }
                escaped = c == '"' && d == '\\' && !escaped;
            }
            let end = chars.peek().map_or(text.len(), |(i, _)| *i);
            out.push_str(&text[start..end]);
        } else {
            out.push(c);
        }
    }
    out
}
