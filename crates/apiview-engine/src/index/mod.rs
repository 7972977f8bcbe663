//! Package and module indexing

mod infer;
mod module;
mod package;

pub use module::ModuleIndexer;
pub use package::{build_package, PackageIndexer};

use crate::ast::AstError;
use apiview_deps::GoModError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while indexing
#[derive(Debug, Error)]
pub enum IndexError {
    /// Directory could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory tree could not be walked
    #[error("Failed to walk {dir}: {source}")]
    Walk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A source file failed to parse
    #[error(transparent)]
    Ast(#[from] AstError),

    /// Directory holds no non-test Go files
    #[error("No Go source files in {0}")]
    NoSources(PathBuf),

    /// Files of one directory declare different packages
    #[error("Files in {dir} declare different packages: {}", names.join(", "))]
    MixedPackages { dir: PathBuf, names: Vec<String> },

    /// Package has no declarations at all
    #[error("Package in {0} declares nothing")]
    NoDeclarations(PathBuf),

    /// Module root has no usable go.mod
    #[error("Invalid module at {dir}: {source}")]
    GoMod {
        dir: PathBuf,
        #[source]
        source: GoModError,
    },

    /// Module root is not a directory
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// No package directory was found
    #[error("No packages found under {0}")]
    NoPackages(PathBuf),
}
