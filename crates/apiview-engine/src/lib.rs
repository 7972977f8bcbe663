//! Public API extraction for Go modules
//!
//! This crate builds the review listing of a Go module:
//! - Parsing Go sources into declarations (tree-sitter)
//! - Indexing packages and modules into symbol tables
//! - Resolving type aliases across packages and modules
//! - Classifying symbols into a type-centric order
//! - Serializing tokens, navigation and diagnostics

pub mod ast;
pub mod classify;
pub mod config;
pub mod index;
pub mod model;
pub mod output;
pub mod resolve;
pub mod review;

pub use ast::{AstError, AstProvider, GoSourceParser};
pub use classify::{ClassifiedPackage, Classifier, ConstGroup, TypeEntry, TypeShape};
pub use config::{ConfigError, ReviewConfig, SeverityPolicy};
pub use index::{IndexError, ModuleIndexer, PackageIndexer};
pub use model::{Diagnostic, Level, Module, Package};
pub use output::{
    NavKind, NavigationNode, ReviewDocument, SerializeError, Serializer, Token, TokenKind,
};
pub use resolve::{AliasResolver, ResolveSummary, WorkingSet};
pub use review::{load_config, review_module, Review, ReviewError};
