//! Review pipeline
//!
//! Index the module, resolve its aliases, classify and serialize.

use crate::ast::{AstProvider, GoSourceParser};
use crate::config::{ConfigError, ReviewConfig};
use crate::index::{IndexError, ModuleIndexer};
use crate::output::{ReviewDocument, SerializeError, Serializer};
use crate::resolve::{AliasResolver, WorkingSet};
use apiview_deps::{FetchConfig, FetchError, ModuleFetcher};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that abort a review run
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The root yields no module model
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The model reached the serializer in a state it must never be in
    #[error("Internal invariant violated: {0}")]
    Invariant(#[from] SerializeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The module fetcher could not be set up
    #[error("Failed to set up module fetching: {0}")]
    Fetch(#[from] FetchError),
}

/// One review run over a module root
pub struct Review<'a> {
    config: &'a ReviewConfig,
    provider: &'a dyn AstProvider,
    fetcher: Option<&'a ModuleFetcher>,
}

impl<'a> Review<'a> {
    /// Without a fetcher, aliases into modules that are not on disk stay
    /// unresolved with a diagnostic
    pub fn new(
        config: &'a ReviewConfig,
        provider: &'a dyn AstProvider,
        fetcher: Option<&'a ModuleFetcher>,
    ) -> Self {
        Self {
            config,
            provider,
            fetcher,
        }
    }

    pub fn run(&self, root: &Path) -> Result<ReviewDocument, ReviewError> {
        let module = ModuleIndexer::new(self.provider)
            .with_skip_dirs(self.config.skip_dirs.clone())
            .with_structural_level(self.config.severity.structural)
            .index(root)?;

        let mut working_set = WorkingSet::new(module);
        let summary =
            AliasResolver::new(self.config, self.provider, self.fetcher).resolve(&mut working_set);
        let module = working_set.into_reviewed();

        let document = Serializer::new(self.config).serialize_module(&module)?;
        info!(
            module = %module.path,
            tokens = document.tokens.len(),
            aliases = summary.resolved + summary.failed,
            diagnostics = document.diagnostics.len(),
            "review complete"
        );
        Ok(document)
    }
}

/// Load configuration from `path`, or defaults refined by the Go environment
pub fn load_config(path: Option<&Path>) -> Result<ReviewConfig, ReviewError> {
    match path {
        Some(path) => Ok(ReviewConfig::from_file(path)?),
        None => Ok(ReviewConfig {
            fetch: FetchConfig::from_env(),
            ..ReviewConfig::default()
        }),
    }
}

/// Review a module with the tree-sitter parser and a registry fetcher
pub fn review_module(root: &Path, config: &ReviewConfig) -> Result<ReviewDocument, ReviewError> {
    let parser = GoSourceParser::new();
    let fetcher = ModuleFetcher::new(config.fetch.clone())?;
    Review::new(config, &parser, Some(&fetcher)).run(root)
}
