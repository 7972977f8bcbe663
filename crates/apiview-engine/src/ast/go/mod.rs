//! tree-sitter backed Go source provider
//!
//! Only top-level declarations are read:
//! - package clause and imports
//! - const and var groups with their initializers
//! - functions and methods (signatures only)
//! - type declarations, including struct and interface bodies

mod decls;
mod exprs;

use super::syntax::{Decl, Import, SourceFile};
use super::{AstError, AstProvider};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Parses Go sources with the tree-sitter Go grammar
#[derive(Debug, Default, Clone, Copy)]
pub struct GoSourceParser;

impl GoSourceParser {
    pub fn new() -> Self {
        Self
    }
}

impl AstProvider for GoSourceParser {
    fn parse_source(&self, path: &Path, source: &str) -> Result<SourceFile, AstError> {
        // Parsers are not Sync; one per call keeps the provider shareable
        // across indexing threads.
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| AstError::Language(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or_else(|| AstError::Syntax {
            path: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let line = find_error(root)
                .map(|n| n.start_position().row + 1)
                .unwrap_or(1);
            return Err(AstError::Syntax {
                path: path.to_path_buf(),
                message: format!("syntax error near line {}", line),
            });
        }

        DeclReader::new(source).read_file(path, root)
    }
}

/// Walks one syntax tree and produces declarations
struct DeclReader<'s> {
    src: &'s str,
}

impl<'s> DeclReader<'s> {
    fn new(src: &'s str) -> Self {
        Self { src }
    }

    fn read_file(&self, path: &Path, root: Node) -> Result<SourceFile, AstError> {
        let mut package = None;
        let mut imports = Vec::new();
        let mut decls = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => {
                    package = first_named(child).map(|n| self.text(n));
                }
                "import_declaration" => self.read_imports(child, &mut imports),
                "const_declaration" => {
                    decls.push(Decl::Const(self.read_value_specs(child, "const_spec")));
                }
                "var_declaration" => {
                    decls.push(Decl::Var(self.read_value_specs(child, "var_spec")));
                }
                "function_declaration" | "method_declaration" => {
                    if let Some(func) = self.read_func(child) {
                        decls.push(Decl::Func(func));
                    }
                }
                "type_declaration" => {
                    decls.extend(self.read_type_decls(child).into_iter().map(Decl::Type));
                }
                _ => {}
            }
        }

        let package = package.ok_or_else(|| AstError::Syntax {
            path: path.to_path_buf(),
            message: "missing package clause".to_string(),
        })?;

        Ok(SourceFile {
            path: path.to_path_buf(),
            package,
            imports,
            decls,
        })
    }

    fn read_imports(&self, node: Node, out: &mut Vec<Import>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => {
                    let Some(path) = child.child_by_field_name("path") else {
                        continue;
                    };
                    let name = child.child_by_field_name("name").map(|n| self.text(n));
                    out.push(Import {
                        name,
                        path: unquote(&self.text(path)).to_string(),
                    });
                }
                "import_spec_list" => self.read_imports(child, out),
                _ => {}
            }
        }
    }

    /// Source text of a node
    fn text(&self, node: Node) -> String {
        self.src[node.byte_range()].to_string()
    }

    /// Source text with whitespace runs collapsed to one space
    fn flat(&self, node: Node) -> String {
        self.src[node.byte_range()]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// First named child that is not a comment
fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    found
}

/// Named children without comments
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

fn find_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(find_error)
}

fn unquote(text: &str) -> &str {
    text.trim_matches(|c| c == '"' || c == '`')
}
