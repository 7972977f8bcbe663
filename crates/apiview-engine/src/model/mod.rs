//! Data model shared by indexing, resolution and serialization

mod diagnostic;
mod package;
mod symbols;

pub use diagnostic::{sort_diagnostics, Diagnostic, Level};
pub use package::{
    is_internal_path, package_scope, AliasFailure, AliasRef, AliasState, Module, Package,
    QualifiedName,
};
pub use symbols::{
    base_type_name, is_exported, Const, Embedded, Field, Func, Interface, Param, Receiver,
    SimpleType, Struct, SymbolTable, TypeDef, TypeParam, Var, UNKNOWN_TYPE,
};
