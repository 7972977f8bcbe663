//! Type inference for package-level constants and variables
//!
//! Only what is decidable from the declaring package itself is inferred:
//! untyped literals get their default type, composite literals and
//! conversions their syntactic type, calls of same-package functions with a
//! single result that result's type, and identifiers the type of the value
//! they name. Anything else is recorded as [`UNKNOWN_TYPE`].

use crate::ast::{Decl, SourceFile, ValueExpr, ValueKind, ValueSpec};
use crate::model::{Param, UNKNOWN_TYPE};
use std::collections::{HashMap, HashSet};

/// Predeclared types usable as conversion functions
const PREDECLARED_TYPES: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "any",
];

/// One named constant or variable after group expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValueDecl {
    pub name: String,
    pub declared: Option<String>,
    pub value: Option<ValueExpr>,
    /// The expression was carried over from an earlier spec of the group
    pub implicit: bool,
}

/// Expand a const group
///
/// A spec without type and values repeats the previous spec's type and
/// expressions; this is how `iota` sequences are written.
pub(crate) fn expand_consts(specs: &[ValueSpec]) -> Vec<ValueDecl> {
    let mut out = Vec::new();
    let mut prev_ty: Option<String> = None;
    let mut prev_values: Vec<ValueExpr> = Vec::new();

    for spec in specs {
        let implicit = spec.values.is_empty() && spec.ty.is_none();
        if !implicit {
            prev_ty = spec.ty.clone();
            prev_values = spec.values.clone();
        }
        for (i, name) in spec.names.iter().enumerate() {
            out.push(ValueDecl {
                name: name.clone(),
                declared: prev_ty.clone(),
                value: prev_values.get(i).cloned(),
                implicit,
            });
        }
    }
    out
}

/// Expand a var group; vars never carry types between specs
pub(crate) fn expand_vars(specs: &[ValueSpec]) -> Vec<ValueDecl> {
    let mut out = Vec::new();
    for spec in specs {
        // `var a, b = f()` binds every name to one multi-value call
        let shared = spec.values.len() == 1 && spec.names.len() > 1;
        for (i, name) in spec.names.iter().enumerate() {
            let value = if shared { None } else { spec.values.get(i).cloned() };
            out.push(ValueDecl {
                name: name.clone(),
                declared: spec.ty.clone(),
                value,
                implicit: false,
            });
        }
    }
    out
}

/// What a package declares, used to type initializers
#[derive(Debug, Default)]
pub(crate) struct PackageFacts {
    /// Every type name, exported or not
    types: HashSet<String>,
    /// Results of every free function
    funcs: HashMap<String, Vec<Param>>,
}

impl PackageFacts {
    pub fn collect(files: &[SourceFile]) -> Self {
        let mut facts = Self::default();
        for decl in files.iter().flat_map(|f| f.decls.iter()) {
            match decl {
                Decl::Type(t) => {
                    facts.types.insert(t.name.clone());
                }
                Decl::Func(f) if f.receiver.is_none() => {
                    facts.funcs.insert(f.name.clone(), f.results.clone());
                }
                _ => {}
            }
        }
        facts
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }
}

/// Infers value types across a package, remembering what it has settled
pub(crate) struct TypeInference<'f> {
    facts: &'f PackageFacts,
    known: HashMap<String, String>,
}

impl<'f> TypeInference<'f> {
    pub fn new(facts: &'f PackageFacts) -> Self {
        Self {
            facts,
            known: HashMap::new(),
        }
    }

    /// Types of `decls`, in order
    ///
    /// Identifiers may refer to values declared later in the package, so
    /// passes repeat until nothing new is learned.
    pub fn resolve(&mut self, decls: &[ValueDecl]) -> Vec<String> {
        let mut types: Vec<Option<String>> = vec![None; decls.len()];
        loop {
            let mut changed = false;
            for (slot, decl) in types.iter_mut().zip(decls) {
                if slot.is_some() {
                    continue;
                }
                let ty = decl
                    .declared
                    .clone()
                    .or_else(|| decl.value.as_ref().and_then(|v| self.infer(&v.kind)));
                if let Some(ty) = ty {
                    self.known.insert(decl.name.clone(), ty.clone());
                    *slot = Some(ty);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        types
            .into_iter()
            .map(|t| t.unwrap_or_else(|| UNKNOWN_TYPE.to_string()))
            .collect()
    }

    fn infer(&self, kind: &ValueKind) -> Option<String> {
        let ty = match kind {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Float => "float64",
            ValueKind::Imaginary => "complex128",
            ValueKind::Rune => "rune",
            ValueKind::Bool => "bool",
            ValueKind::Typed(t) => return Some(t.clone()),
            ValueKind::Call(f) => return self.call_type(f),
            ValueKind::Ident(name) => return self.known.get(name).cloned(),
            ValueKind::Other => return None,
        };
        Some(ty.to_string())
    }

    fn call_type(&self, callee: &str) -> Option<String> {
        if PREDECLARED_TYPES.contains(&callee) || self.facts.has_type(callee) {
            return Some(callee.to_string());
        }
        match self.facts.funcs.get(callee) {
            Some(results) if results.len() == 1 => Some(results[0].ty.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str, kind: ValueKind) -> ValueExpr {
        ValueExpr {
            text: text.to_string(),
            kind,
        }
    }

    fn spec(names: &[&str], ty: Option<&str>, values: Vec<ValueExpr>) -> ValueSpec {
        ValueSpec {
            names: names.iter().map(|n| n.to_string()).collect(),
            ty: ty.map(str::to_string),
            values,
        }
    }

    #[test]
    fn test_iota_carries_type() {
        let decls = expand_consts(&[
            spec(&["Monday"], Some("Weekday"), vec![expr("iota", ValueKind::Int)]),
            spec(&["Tuesday"], None, vec![]),
            spec(&["Wednesday"], None, vec![]),
        ]);
        assert_eq!(decls.len(), 3);
        assert!(decls[1].implicit);
        assert_eq!(decls[2].declared.as_deref(), Some("Weekday"));
    }

    #[test]
    fn test_untyped_literals() {
        let facts = PackageFacts::default();
        let decls = expand_consts(&[
            spec(&["S"], None, vec![expr("\"s\"", ValueKind::String)]),
            spec(&["F"], None, vec![expr("1.5", ValueKind::Float)]),
            spec(&["R"], None, vec![expr("'r'", ValueKind::Rune)]),
            spec(&["C"], None, vec![expr("2i", ValueKind::Imaginary)]),
            spec(&["B"], None, vec![expr("true", ValueKind::Bool)]),
        ]);
        let types = TypeInference::new(&facts).resolve(&decls);
        assert_eq!(types, vec!["string", "float64", "rune", "complex128", "bool"]);
    }

    #[test]
    fn test_identifier_declared_later() {
        let facts = PackageFacts::default();
        let decls = expand_consts(&[
            spec(&["Default"], None, vec![expr("Blue", ValueKind::Ident("Blue".into()))]),
            spec(&["Blue"], Some("Color"), vec![expr("\"blue\"", ValueKind::String)]),
        ]);
        let types = TypeInference::new(&facts).resolve(&decls);
        assert_eq!(types, vec!["Color", "Color"]);
    }

    #[test]
    fn test_calls() {
        let mut facts = PackageFacts::default();
        facts.types.insert("Duration".into());
        facts
            .funcs
            .insert("defaultName".into(), vec![Param::unnamed("string")]);
        facts.funcs.insert(
            "pair".into(),
            vec![Param::unnamed("int"), Param::unnamed("error")],
        );

        let decls = expand_vars(&[
            spec(&["Timeout"], None, vec![expr("Duration(5)", ValueKind::Call("Duration".into()))]),
            spec(&["Name"], None, vec![expr("defaultName()", ValueKind::Call("defaultName".into()))]),
            spec(&["Size"], None, vec![expr("int64(1)", ValueKind::Call("int64".into()))]),
            spec(&["Pair"], None, vec![expr("pair()", ValueKind::Call("pair".into()))]),
            spec(&["Ext"], None, vec![expr("other.New()", ValueKind::Call("other.New".into()))]),
        ]);
        let types = TypeInference::new(&facts).resolve(&decls);
        assert_eq!(
            types,
            vec!["Duration", "string", "int64", UNKNOWN_TYPE, UNKNOWN_TYPE]
        );
    }

    #[test]
    fn test_multi_value_var() {
        let decls = expand_vars(&[spec(
            &["A", "B"],
            None,
            vec![expr("f()", ValueKind::Call("f".into()))],
        )]);
        assert_eq!(decls.len(), 2);
        assert!(decls.iter().all(|d| d.value.is_none()));
    }
}
