//! The review document handed to the review tool

use super::navigation::NavigationNode;
use super::token::{Token, TokenKind};
use crate::model::Diagnostic;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDocument {
    pub name: String,
    pub language: String,
    pub package_name: String,
    pub tokens: Vec<Token>,
    pub navigation: Vec<NavigationNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReviewDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Listing text without token metadata, one line per declaration line
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| match t.kind {
                TokenKind::Newline => "\n",
                _ => t.value.as_str(),
            })
            .collect()
    }

    /// Token carrying a definition id
    pub fn definition(&self, id: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.definition_id.as_deref() == Some(id))
    }
}
