//! Review diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

/// A message attached to one definition id of the review
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub target_id: String,
    pub level: Level,
    pub text: String,
}

impl Diagnostic {
    pub fn new(target_id: impl Into<String>, level: Level, text: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            level,
            text: text.into(),
        }
    }

    pub fn info(target_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(target_id, Level::Info, text)
    }

    pub fn warning(target_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(target_id, Level::Warning, text)
    }

    pub fn error(target_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(target_id, Level::Error, text)
    }
}

/// Order diagnostics by target id, then message text
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.target_id
            .cmp(&b.target_id)
            .then_with(|| a.text.cmp(&b.text))
            .then_with(|| a.level.cmp(&b.level))
    });
}
