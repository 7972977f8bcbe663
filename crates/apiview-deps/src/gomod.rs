//! `go.mod` parsing
//!
//! Reads the directives the resolver needs: the module path, `require`
//! versions and `replace` redirections. Other directives are skipped.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading a `go.mod` file
#[derive(Debug, Error)]
pub enum GoModError {
    /// Failed to read the file
    #[error("Failed to read go.mod: {0}")]
    IoError(#[from] std::io::Error),

    /// No `module` directive
    #[error("go.mod has no module directive")]
    MissingModule,

    /// Malformed directive
    #[error("go.mod line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// A `require` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Require {
    pub path: String,
    pub version: String,
    /// Marked `// indirect`
    pub indirect: bool,
}

/// Where a `replace` directive redirects a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceTarget {
    /// Filesystem path, relative to the directory holding `go.mod`
    Local(PathBuf),
    /// Another module version
    Module { path: String, version: String },
}

/// A `replace` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub old_path: String,
    /// Only this version is replaced when set
    pub old_version: Option<String>,
    pub target: ReplaceTarget,
}

/// Parsed `go.mod`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    /// Module path from the `module` directive
    pub module: String,
    /// Language version from the `go` directive
    pub go_version: Option<String>,
    pub requires: Vec<Require>,
    pub replaces: Vec<Replace>,
}

#[derive(Clone, Copy, PartialEq)]
enum Block {
    None,
    Require,
    Replace,
    Other,
}

impl GoMod {
    /// Read `go.mod` from a file
    pub fn from_file(path: &Path) -> Result<Self, GoModError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Read `<dir>/go.mod`
    pub fn from_dir(dir: &Path) -> Result<Self, GoModError> {
        Self::from_file(&dir.join("go.mod"))
    }

    /// Parse the text of a `go.mod` file
    pub fn parse(content: &str) -> Result<Self, GoModError> {
        let mut gomod = GoMod::default();
        let mut block = Block::None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let (code, comment) = split_comment(raw);
            let code = code.trim();
            if code.is_empty() {
                continue;
            }

            if block != Block::None {
                if code == ")" {
                    block = Block::None;
                    continue;
                }
                match block {
                    Block::Require => gomod.push_require(code, comment, line_no)?,
                    Block::Replace => gomod.push_replace(code, line_no)?,
                    _ => {}
                }
                continue;
            }

            let (verb, rest) = match code.split_once(char::is_whitespace) {
                Some((verb, rest)) => (verb, rest.trim()),
                None => (code, ""),
            };

            match verb {
                "module" => gomod.module = unquote(rest).to_string(),
                "go" => gomod.go_version = Some(rest.to_string()),
                "require" if rest == "(" => block = Block::Require,
                "require" => gomod.push_require(rest, comment, line_no)?,
                "replace" if rest == "(" => block = Block::Replace,
                "replace" => gomod.push_replace(rest, line_no)?,
                _ if rest == "(" => block = Block::Other,
                _ => {}
            }
        }

        if gomod.module.is_empty() {
            return Err(GoModError::MissingModule);
        }
        Ok(gomod)
    }

    fn push_require(&mut self, spec: &str, comment: &str, line: usize) -> Result<(), GoModError> {
        let fields: Vec<&str> = spec.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(GoModError::Syntax {
                line,
                message: format!("expected `path version`, found `{}`", spec),
            });
        }
        self.requires.push(Require {
            path: unquote(fields[0]).to_string(),
            version: fields[1].to_string(),
            indirect: comment.trim() == "indirect",
        });
        Ok(())
    }

    fn push_replace(&mut self, spec: &str, line: usize) -> Result<(), GoModError> {
        let Some((old, new)) = spec.split_once("=>") else {
            return Err(GoModError::Syntax {
                line,
                message: format!("replace without `=>`: `{}`", spec),
            });
        };

        let old: Vec<&str> = old.split_whitespace().collect();
        let new: Vec<&str> = new.split_whitespace().collect();

        let (old_path, old_version) = match old.as_slice() {
            [path] => (unquote(path).to_string(), None),
            [path, version] => (unquote(path).to_string(), Some(version.to_string())),
            _ => {
                return Err(GoModError::Syntax {
                    line,
                    message: "malformed replace source".to_string(),
                })
            }
        };

        let target = match new.as_slice() {
            [path] => ReplaceTarget::Local(PathBuf::from(unquote(path))),
            [path, version] => ReplaceTarget::Module {
                path: unquote(path).to_string(),
                version: version.to_string(),
            },
            _ => {
                return Err(GoModError::Syntax {
                    line,
                    message: "malformed replace target".to_string(),
                })
            }
        };

        self.replaces.push(Replace {
            old_path,
            old_version,
            target,
        });
        Ok(())
    }

    /// Version required for an exact module path
    pub fn required_version(&self, module: &str) -> Option<&str> {
        self.requires
            .iter()
            .find(|r| r.path == module)
            .map(|r| r.version.as_str())
    }

    /// The required module that contains a package import path
    ///
    /// The longest matching module path wins, so nested modules shadow their
    /// parents the same way the Go toolchain resolves them.
    pub fn module_for_package(&self, import_path: &str) -> Option<&Require> {
        self.requires
            .iter()
            .filter(|r| path_within(import_path, &r.path))
            .max_by_key(|r| r.path.len())
    }

    /// The replacement that applies to a module, if any
    pub fn replacement(&self, module: &str, version: Option<&str>) -> Option<&Replace> {
        self.replaces.iter().find(|r| {
            r.old_path == module
                && match (&r.old_version, version) {
                    (Some(old), Some(v)) => old == v,
                    (Some(_), None) => false,
                    (None, _) => true,
                }
        })
    }

    /// Local replacements that may contain a package import path, longest first
    pub fn local_replacements_for(&self, import_path: &str) -> Vec<(&str, &Path)> {
        let mut found: Vec<(&str, &Path)> = self
            .replaces
            .iter()
            .filter_map(|r| match &r.target {
                ReplaceTarget::Local(dir) if path_within(import_path, &r.old_path) => {
                    Some((r.old_path.as_str(), dir.as_path()))
                }
                _ => None,
            })
            .collect();
        found.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        found
    }
}

/// Whether `import_path` is `module` or lives below it
pub fn path_within(import_path: &str, module: &str) -> bool {
    import_path == module
        || (import_path.starts_with(module) && import_path[module.len()..].starts_with('/'))
}

fn split_comment(line: &str) -> (&str, &str) {
    match line.find("//") {
        Some(idx) => (&line[..idx], &line[idx + 2..]),
        None => (line, ""),
    }
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}
