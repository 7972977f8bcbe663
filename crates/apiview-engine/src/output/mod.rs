//! Token and navigation serialization
//!
//! Turns classified packages into the [`ReviewDocument`] consumed by the
//! review tool. The output depends only on its input: serializing the same
//! model twice yields identical documents.

mod document;
mod navigation;
mod render;
mod token;

pub use document::ReviewDocument;
pub use navigation::{NavKind, NavigationNode, TYPE_KIND_TAG};
pub use token::{Token, TokenKind};

use crate::classify::{ClassifiedPackage, Classifier};
use crate::config::ReviewConfig;
use crate::model::{sort_diagnostics, Diagnostic, Module};
use render::{Links, PackageRenderer, TokenWriter};
use thiserror::Error;
use tracing::debug;

/// Model states that must never reach the output
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// An alias was never settled by the resolver
    #[error("Alias {0} reached serialization unresolved")]
    UnresolvedAlias(String),

    /// Two tokens claim the same definition id
    #[error("Duplicate definition id {0}")]
    DuplicateDefinition(String),

    /// A navigation entry points at no token
    #[error("Navigation id {0} has no definition")]
    DanglingNavigation(String),
}

/// Writes review documents
pub struct Serializer<'c> {
    config: &'c ReviewConfig,
}

impl<'c> Serializer<'c> {
    pub fn new(config: &'c ReviewConfig) -> Self {
        Self { config }
    }

    /// Serialize classified packages in the given order
    pub fn serialize(
        &self,
        name: &str,
        packages: &[ClassifiedPackage<'_>],
        diagnostics: &[Diagnostic],
    ) -> Result<ReviewDocument, SerializeError> {
        let links = Links::collect(packages);
        let mut writer = TokenWriter::new();
        let mut navigation = Vec::with_capacity(packages.len());

        for cp in packages {
            let node = PackageRenderer::new(&mut writer, &links, cp.package).render(cp)?;
            navigation.push(node);
        }

        for node in navigation.iter().flat_map(NavigationNode::walk) {
            if let Some(id) = &node.navigation_id {
                if !writer.is_defined(id) {
                    return Err(SerializeError::DanglingNavigation(id.clone()));
                }
            }
        }

        let mut diagnostics = diagnostics.to_vec();
        sort_diagnostics(&mut diagnostics);

        let tokens = writer.into_tokens();
        debug!(
            document = %name,
            packages = packages.len(),
            tokens = tokens.len(),
            diagnostics = diagnostics.len(),
            "serialized review"
        );
        Ok(ReviewDocument {
            name: name.to_string(),
            language: self.config.language.clone(),
            package_name: name.to_string(),
            tokens,
            navigation,
            diagnostics,
        })
    }

    /// Classify and serialize the public packages of a module
    ///
    /// Internal and command packages are left out together with their
    /// diagnostics; module-level diagnostics are always kept.
    pub fn serialize_module(&self, module: &Module) -> Result<ReviewDocument, SerializeError> {
        let classifier = Classifier::new(self.config);
        let public: Vec<_> = module
            .packages()
            .values()
            .filter(|p| p.is_public())
            .collect();

        let classified: Vec<_> = public.iter().map(|p| classifier.classify(*p)).collect();
        let diagnostics: Vec<Diagnostic> = module
            .diagnostics()
            .iter()
            .chain(public.iter().flat_map(|p| p.diagnostics()))
            .cloned()
            .collect();

        self.serialize(&module.path, &classified, &diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AliasRef, Package, QualifiedName};

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "unresolved"))]
    fn test_unresolved_alias_is_rejected() {
        let mut package = Package::new("example.com/m/p", "p", "m/p", "/tmp");
        package.add_alias(AliasRef::new(
            "Foo",
            QualifiedName::new("example.com/m/q", "Bar"),
            "q.Bar",
        ));
        let config = ReviewConfig::default();
        let classified = Classifier::new(&config).classify(&package);

        let err = Serializer::new(&config)
            .serialize("example.com/m", &[classified], &[])
            .unwrap_err();
        assert_eq!(err, SerializeError::UnresolvedAlias("m/p.Foo".to_string()));
    }

    #[test]
    fn test_package_line_and_sorted_diagnostics() {
        let package = Package::new("example.com/m", "m", "m", "/tmp");
        let config = ReviewConfig::default();
        let classified = Classifier::new(&config).classify(&package);
        let diagnostics = vec![
            Diagnostic::warning("m.B", "second"),
            Diagnostic::info("m.A", "zeta"),
            Diagnostic::error("m.A", "alpha"),
        ];

        let doc = Serializer::new(&config)
            .serialize("example.com/m", &[classified], &diagnostics)
            .unwrap();

        assert_eq!(doc.text(), "package m\n\n");
        assert_eq!(doc.tokens[2].definition_id.as_deref(), Some("m"));
        let order: Vec<_> = doc.diagnostics.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(order, vec!["alpha", "zeta", "second"]);
        assert_eq!(doc.navigation.len(), 1);
        assert_eq!(doc.navigation[0].kind(), Some("package"));
    }
}
