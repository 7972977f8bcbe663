//! Module registry client
//!
//! Downloads module archives over HTTPS from a registry speaking the Go
//! module proxy protocol.

mod client;

pub use client::{ArchiveSource, RegistryClient, RegistryError, MAX_ARCHIVE_SIZE};
