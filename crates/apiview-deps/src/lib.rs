//! Dependency acquisition for apiview-go
//!
//! This crate locates the sources of Go modules referenced by a review:
//! - Module coordinates and their filesystem/URL escaping
//! - `go.mod` parsing (module path, requires, replaces)
//! - The on-disk dependency cache (archives and unpacked sources)
//! - Registry downloads over the Go module proxy protocol
//! - The module fetcher tying these together

pub mod cache;
pub mod config;
pub mod coord;
pub mod fetcher;
pub mod gomod;
pub mod registry;

pub use cache::{CacheError, DependencyCache};
pub use config::FetchConfig;
pub use coord::{escape_path, escape_version, unescape_path, CoordError, ModuleRef};
pub use fetcher::{Acquired, FetchError, ModuleFetcher, Origin};
pub use gomod::{path_within, GoMod, GoModError, Replace, ReplaceTarget, Require};
pub use registry::{ArchiveSource, RegistryClient, RegistryError};
