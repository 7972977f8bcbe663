//! Declaration-level view of one Go source file
//!
//! Providers reduce a file to its package clause, imports and top-level
//! declarations. Function bodies are never represented.

use crate::model::{Func, Interface, Struct, TypeParam};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Name from the package clause
    pub package: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

impl SourceFile {
    /// Import path bound to a local qualifier in this file
    pub fn import_for(&self, qualifier: &str) -> Option<&Import> {
        self.imports
            .iter()
            .find(|i| i.local_name().as_deref() == Some(qualifier))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Explicit name (`foo "example.com/bar"`), including `.` and `_`
    pub name: Option<String>,
    pub path: String,
}

impl Import {
    pub fn new(name: Option<&str>, path: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            path: path.into(),
        }
    }

    /// Qualifier used in the file, `None` for dot and blank imports
    ///
    /// Without an explicit name this is the last path element, skipping a
    /// `/vN` major version suffix.
    pub fn local_name(&self) -> Option<String> {
        match self.name.as_deref() {
            Some(".") | Some("_") => None,
            Some(name) => Some(name.to_string()),
            None => {
                let mut elements = self.path.rsplit('/');
                let last = elements.next()?;
                let is_major = last
                    .strip_prefix('v')
                    .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
                if is_major {
                    elements.next().map(str::to_string)
                } else {
                    Some(last.to_string())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Const(Vec<ValueSpec>),
    Var(Vec<ValueSpec>),
    Func(Func),
    Type(TypeDecl),
}

/// One line of a const or var group: `A, B Color = "a", "b"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<String>,
    pub values: Vec<ValueExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueExpr {
    /// Expression as written, whitespace collapsed
    pub text: String,
    pub kind: ValueKind,
}

/// Shape of an initializer, as far as type inference needs it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    Float,
    Imaginary,
    Rune,
    Bool,
    /// Composite literal or conversion with a syntactic type
    Typed(String),
    /// Call of the named function or type
    Call(String),
    /// Plain or qualified identifier
    Ident(String),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub spec: TypeSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Struct(Struct),
    Interface(Interface),
    /// `type A = B`
    Alias {
        text: String,
        /// Set when the target is qualified by an import (`pkg.B`)
        target: Option<AliasTarget>,
    },
    /// `type A B` for any other underlying type
    Defined(String),
}

/// Qualified target of an alias as written: `pkg.Name[Args]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub qualifier: String,
    pub name: String,
    pub type_args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_local_name() {
        assert_eq!(Import::new(None, "net/http").local_name().as_deref(), Some("http"));
        assert_eq!(
            Import::new(None, "example.com/foo/v2").local_name().as_deref(),
            Some("foo")
        );
        assert_eq!(
            Import::new(Some("az"), "example.com/azcore").local_name().as_deref(),
            Some("az")
        );
        assert_eq!(Import::new(Some("_"), "embed").local_name(), None);
        assert_eq!(Import::new(Some("."), "strings").local_name(), None);
    }
}
