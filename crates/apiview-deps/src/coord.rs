//! Module coordinates
//!
//! A `ModuleRef` names one version of one module. Module paths and versions
//! are case-encoded before they touch a filesystem or a URL so that two paths
//! differing only in case never collide on case-insensitive filesystems.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while validating or escaping a coordinate
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordError {
    /// Empty module path
    #[error("Module path is empty")]
    EmptyPath,

    /// Empty version
    #[error("Version is empty for module {0}")]
    EmptyVersion(String),

    /// Character not allowed in a module path
    #[error("Invalid character {ch:?} in module path {path}")]
    InvalidChar { path: String, ch: char },

    /// Path element that is empty, `.` or `..`
    #[error("Invalid path element in module path {0}")]
    InvalidElement(String),

    /// Escaped text that cannot be decoded
    #[error("Invalid escaped text: {0}")]
    InvalidEscape(String),
}

/// A dependency coordinate (`path@version`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleRef {
    /// Module path, e.g. `github.com/Azure/azure-sdk-for-go/sdk/azcore`
    pub path: String,
    /// Module version, e.g. `v1.11.0`
    pub version: String,
}

impl ModuleRef {
    /// Create a validated coordinate
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Result<Self, CoordError> {
        let path = path.into();
        let version = version.into();
        check_path(&path)?;
        if version.is_empty() {
            return Err(CoordError::EmptyVersion(path));
        }
        check_version(&version)?;
        Ok(Self { path, version })
    }

    /// Escaped `path@version`, safe for use as a relative directory
    pub fn escaped(&self) -> Result<String, CoordError> {
        Ok(format!(
            "{}@{}",
            escape_path(&self.path)?,
            escape_version(&self.version)?
        ))
    }

    /// Escaped coordinate as a relative filesystem path
    ///
    /// Path separators in the module path become directory levels, which is
    /// the layout the Go toolchain uses for its own module cache.
    pub fn relative_dir(&self) -> Result<PathBuf, CoordError> {
        Ok(self.escaped()?.split('/').collect())
    }

    /// Prefix that every entry of a registry archive for this coordinate carries
    pub fn archive_prefix(&self) -> String {
        format!("{}@{}/", self.path, self.version)
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}

/// Validate a module path
pub fn check_path(path: &str) -> Result<(), CoordError> {
    if path.is_empty() {
        return Err(CoordError::EmptyPath);
    }

    for ch in path.chars() {
        if !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~' | '/' | '+')) {
            return Err(CoordError::InvalidChar {
                path: path.to_string(),
                ch,
            });
        }
    }

    if path
        .split('/')
        .any(|elem| elem.is_empty() || elem == "." || elem == "..")
    {
        return Err(CoordError::InvalidElement(path.to_string()));
    }

    Ok(())
}

fn check_version(version: &str) -> Result<(), CoordError> {
    if let Some(ch) = version
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '+')))
    {
        return Err(CoordError::InvalidChar {
            path: version.to_string(),
            ch,
        });
    }
    Ok(())
}

/// Case-encode a module path (`Azure` → `!azure`)
pub fn escape_path(path: &str) -> Result<String, CoordError> {
    check_path(path)?;
    Ok(escape_upper(path))
}

/// Case-encode a version string
pub fn escape_version(version: &str) -> Result<String, CoordError> {
    check_version(version)?;
    Ok(escape_upper(version))
}

fn escape_upper(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        if ch.is_ascii_uppercase() {
            out.push('!');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Reverse of [`escape_path`]
pub fn unescape_path(escaped: &str) -> Result<String, CoordError> {
    let mut out = String::with_capacity(escaped.len());
    let mut bang = false;
    for ch in escaped.chars() {
        if bang {
            if !ch.is_ascii_lowercase() {
                return Err(CoordError::InvalidEscape(escaped.to_string()));
            }
            out.push(ch.to_ascii_uppercase());
            bang = false;
        } else if ch == '!' {
            bang = true;
        } else if ch.is_ascii_uppercase() {
            return Err(CoordError::InvalidEscape(escaped.to_string()));
        } else {
            out.push(ch);
        }
    }
    if bang {
        return Err(CoordError::InvalidEscape(escaped.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_path_uppercase() {
        assert_eq!(
            escape_path("github.com/Azure/azure-sdk-for-go").unwrap(),
            "github.com/!azure/azure-sdk-for-go"
        );
        assert_eq!(escape_path("example.com/lower").unwrap(), "example.com/lower");
    }

    #[test]
    fn test_unescape_round_trip() {
        let escaped = escape_path("github.com/BurntSushi/TOML").unwrap();
        assert_eq!(escaped, "github.com/!burnt!sushi/!t!o!m!l");
        assert_eq!(unescape_path(&escaped).unwrap(), "github.com/BurntSushi/TOML");
    }

    #[test]
    fn test_unescape_rejects_uppercase() {
        assert!(unescape_path("github.com/Azure").is_err());
        assert!(unescape_path("trailing!").is_err());
    }

    #[test]
    fn test_invalid_paths() {
        assert_eq!(check_path(""), Err(CoordError::EmptyPath));
        assert!(check_path("example.com//x").is_err());
        assert!(check_path("example.com/../x").is_err());
        assert!(check_path("example.com/a b").is_err());
        assert!(check_path("example.com/!x").is_err());
    }

    #[test]
    fn test_module_ref_layout() {
        let m = ModuleRef::new("github.com/Azure/azcore", "v1.2.0").unwrap();
        assert_eq!(m.to_string(), "github.com/Azure/azcore@v1.2.0");
        assert_eq!(m.escaped().unwrap(), "github.com/!azure/azcore@v1.2.0");
        assert_eq!(
            m.relative_dir().unwrap(),
            PathBuf::from("github.com").join("!azure").join("azcore@v1.2.0")
        );
        assert_eq!(m.archive_prefix(), "github.com/Azure/azcore@v1.2.0/");
    }

    #[test]
    fn test_module_ref_requires_version() {
        assert!(matches!(
            ModuleRef::new("example.com/m", ""),
            Err(CoordError::EmptyVersion(_))
        ));
    }
}
