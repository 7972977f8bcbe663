//! Source file parsing
//!
//! Indexers consume Go sources through the [`AstProvider`] trait. The
//! bundled [`GoSourceParser`] is backed by tree-sitter; tests and embedders
//! may substitute their own provider.

mod go;
mod syntax;

pub use go::GoSourceParser;
pub use syntax::{
    AliasTarget, Decl, Import, SourceFile, TypeDecl, TypeSpec, ValueExpr, ValueKind, ValueSpec,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while parsing a source file
#[derive(Debug, Error)]
pub enum AstError {
    /// The grammar could not be loaded
    #[error("Failed to load Go grammar: {0}")]
    Language(String),

    /// The file does not parse
    #[error("{path}: {message}")]
    Syntax { path: PathBuf, message: String },

    /// The file is not valid UTF-8 or could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Something that turns one Go source file into declarations
pub trait AstProvider: Send + Sync {
    /// Parse `source`, the contents of `path`
    fn parse_source(&self, path: &Path, source: &str) -> Result<SourceFile, AstError>;

    /// Read and parse a file from disk
    fn parse_file(&self, path: &Path) -> Result<SourceFile, AstError> {
        let source = std::fs::read_to_string(path).map_err(|source| AstError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_source(path, &source)
    }
}
