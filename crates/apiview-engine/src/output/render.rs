//! Token rendering of classified packages
//!
//! Each declaration is written in Go syntax, one line per declaration line.
//! The name token of every listed symbol carries its definition id; type
//! references to types listed in the same document carry a link to them.

use super::navigation::{NavKind, NavigationNode};
use super::token::{Token, TokenKind};
use super::SerializeError;
use crate::classify::{ClassifiedPackage, ConstGroup, TypeEntry, TypeShape};
use crate::model::{
    base_type_name, is_exported, Const, Func, Interface, Package, Param, Struct, TypeParam, Var,
    UNKNOWN_TYPE,
};
use std::collections::{HashMap, HashSet};

const INDENT: &str = "\t";

/// Words of a type expression that are keywords rather than type names
const TYPE_KEYWORDS: &[&str] = &["chan", "func", "interface", "map", "struct"];

/// Lower-case interfaces that may be embedded and are still shown
const PREDECLARED_INTERFACES: &[&str] = &["any", "comparable", "error"];

/// Definition ids of every listed type, for linking references
#[derive(Debug, Default)]
pub(crate) struct Links {
    /// Import path → type name → id
    local: HashMap<String, HashMap<String, String>>,
}

impl Links {
    pub fn collect(packages: &[ClassifiedPackage<'_>]) -> Self {
        let mut links = Self::default();
        for cp in packages {
            let package = cp.package;
            let local = links.local.entry(package.import_path.clone()).or_default();
            for entry in &cp.types {
                local.insert(entry.name.to_string(), package.definition_id(entry.name));
            }
        }
        links
    }

    /// Id of a type named in `from`; qualifiers go through its imports
    fn resolve(&self, from: &Package, name: &str) -> Option<String> {
        let (import_path, name) = match name.split_once('.') {
            Some((qualifier, name)) => (from.import_path_of(qualifier)?, name),
            None => (from.import_path.as_str(), name),
        };
        self.local.get(import_path)?.get(name).cloned()
    }
}

/// Accumulates the token stream and the set of defined ids
#[derive(Debug, Default)]
pub(crate) struct TokenWriter {
    tokens: Vec<Token>,
    defined: HashSet<String>,
}

impl TokenWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn is_defined(&self, id: &str) -> bool {
        self.defined.contains(id)
    }

    fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn emit(&mut self, kind: TokenKind, value: &str) {
        self.push(Token::new(kind, value));
    }

    fn keyword(&mut self, value: &str) {
        self.emit(TokenKind::Keyword, value);
    }

    fn punct(&mut self, value: &str) {
        self.emit(TokenKind::Punctuation, value);
    }

    fn space(&mut self) {
        self.emit(TokenKind::Whitespace, " ");
    }

    fn indent(&mut self) {
        self.emit(TokenKind::Whitespace, INDENT);
    }

    fn newline(&mut self) {
        self.emit(TokenKind::Newline, "\n");
    }

    fn value(&mut self, value: &str) {
        let kind = if value.starts_with('"') || value.starts_with('`') {
            TokenKind::StringLiteral
        } else {
            TokenKind::Literal
        };
        self.emit(kind, value);
    }

    /// Anchor token; ids must be unique in the document
    fn define(&mut self, token: Token, id: String) -> Result<(), SerializeError> {
        if !self.defined.insert(id.clone()) {
            return Err(SerializeError::DuplicateDefinition(id));
        }
        self.push(token.defining(id));
        Ok(())
    }
}

/// Renders one package into a shared writer
pub(crate) struct PackageRenderer<'r> {
    out: &'r mut TokenWriter,
    links: &'r Links,
    package: &'r Package,
}

impl<'r> PackageRenderer<'r> {
    pub fn new(out: &'r mut TokenWriter, links: &'r Links, package: &'r Package) -> Self {
        Self {
            out,
            links,
            package,
        }
    }

    /// Write the package and return its navigation node
    pub fn render(mut self, cp: &ClassifiedPackage<'_>) -> Result<NavigationNode, SerializeError> {
        let package = self.package;
        for alias in package.aliases() {
            debug_assert!(
                !alias.is_unresolved(),
                "alias {} reached serialization unresolved",
                alias.name
            );
            if alias.is_unresolved() {
                return Err(SerializeError::UnresolvedAlias(
                    package.definition_id(&alias.name),
                ));
            }
        }

        let mut nav = NavigationNode::new(&package.import_path, &package.scope, NavKind::Package);
        self.out.keyword("package");
        self.out.space();
        self.out.define(
            Token::new(TokenKind::Text, &package.name),
            package.scope.clone(),
        )?;
        self.out.newline();
        self.out.newline();

        for group in &cp.const_groups {
            nav.child_items.push(self.const_group(group)?);
        }
        if !cp.vars.is_empty() {
            self.var_block(&cp.vars, &mut nav)?;
        }
        for entry in &cp.types {
            nav.child_items.push(self.type_entry(entry)?);
        }
        for func in &cp.funcs {
            let id = package.definition_id(&func.name);
            self.func_decl(func, id.clone())?;
            self.out.newline();
            self.out.newline();
            nav.child_items
                .push(NavigationNode::new(&func.name, id, NavKind::Func));
        }
        Ok(nav)
    }

    fn const_group(&mut self, group: &ConstGroup<'_>) -> Result<NavigationNode, SerializeError> {
        let id = format!("{}.const-{}", self.package.scope, group.type_name);
        self.out
            .define(Token::new(TokenKind::Keyword, "const"), id.clone())?;
        self.out.space();
        self.out.punct("(");
        self.out.newline();
        for c in &group.consts {
            self.out.indent();
            self.const_spec(c)?;
            self.out.newline();
        }
        self.out.punct(")");
        self.out.newline();

        for func in &group.value_funcs {
            self.func_decl(func, self.package.definition_id(&func.name))?;
            self.out.newline();
        }
        for var in &group.value_vars {
            self.out.keyword("var");
            self.out.space();
            self.var_spec(var)?;
            self.out.newline();
        }
        self.out.newline();
        Ok(NavigationNode::new(group.type_name, id, NavKind::Enum))
    }

    fn const_spec(&mut self, c: &Const) -> Result<(), SerializeError> {
        self.out.define(
            Token::new(TokenKind::MemberName, &c.name),
            self.package.definition_id(&c.name),
        )?;
        if c.declared && c.ty != UNKNOWN_TYPE {
            self.out.space();
            self.type_expr(&c.ty);
        }
        if let Some(value) = &c.value {
            self.assign(value);
        }
        Ok(())
    }

    fn var_block(&mut self, vars: &[&Var], nav: &mut NavigationNode) -> Result<(), SerializeError> {
        self.out.keyword("var");
        self.out.space();
        self.out.punct("(");
        self.out.newline();
        for var in vars {
            self.out.indent();
            self.var_spec(var)?;
            self.out.newline();
            nav.child_items.push(NavigationNode::new(
                &var.name,
                self.package.definition_id(&var.name),
                NavKind::Var,
            ));
        }
        self.out.punct(")");
        self.out.newline();
        self.out.newline();
        Ok(())
    }

    fn var_spec(&mut self, var: &Var) -> Result<(), SerializeError> {
        self.out.define(
            Token::new(TokenKind::MemberName, &var.name),
            self.package.definition_id(&var.name),
        )?;
        if var.ty != UNKNOWN_TYPE {
            self.out.space();
            self.type_expr(&var.ty);
        } else if let Some(value) = &var.value {
            self.assign(value);
        }
        Ok(())
    }

    fn assign(&mut self, value: &str) {
        self.out.space();
        self.out.punct("=");
        self.out.space();
        self.out.value(value);
    }

    fn type_entry(&mut self, entry: &TypeEntry<'_>) -> Result<NavigationNode, SerializeError> {
        let id = self.package.definition_id(entry.name);
        self.out.keyword("type");
        self.out.space();
        self.out
            .define(Token::new(TokenKind::TypeName, entry.name), id.clone())?;

        let kind = match entry.shape {
            TypeShape::Struct(s) => {
                self.type_params(&s.type_params);
                self.out.space();
                self.struct_body(s, &id)?;
                NavKind::Struct
            }
            TypeShape::Interface(i) => {
                self.type_params(&i.type_params);
                self.out.space();
                self.interface_body(i, &id)?;
                NavKind::Interface
            }
            TypeShape::Simple(t) => {
                self.type_params(&t.type_params);
                self.out.space();
                if t.alias {
                    self.out.punct("=");
                    self.out.space();
                }
                self.type_expr(&t.underlying);
                if t.alias {
                    NavKind::Alias
                } else {
                    NavKind::Type
                }
            }
            TypeShape::Opaque(alias) => {
                self.out.space();
                self.out.punct("=");
                self.out.space();
                self.out.emit(TokenKind::TypeName, &alias.target_text);
                NavKind::Alias
            }
        };
        self.out.newline();

        for func in &entry.constructors {
            self.func_decl(func, self.package.definition_id(&func.name))?;
            self.out.newline();
        }
        for method in &entry.methods {
            self.func_decl(method, member_id(&method.name, &id))?;
            self.out.newline();
        }
        self.out.newline();
        Ok(NavigationNode::new(entry.name, id, kind))
    }

    fn struct_body(&mut self, s: &Struct, owner: &str) -> Result<(), SerializeError> {
        let embedded: Vec<_> = s
            .embedded
            .iter()
            .filter(|e| is_exported(base_type_name(&e.ty)))
            .collect();
        let fields: Vec<_> = s.fields.iter().filter(|f| is_exported(&f.name)).collect();

        self.out.keyword("struct");
        if embedded.is_empty() && fields.is_empty() {
            self.out.punct("{}");
            return Ok(());
        }
        self.out.space();
        self.out.punct("{");
        self.out.newline();

        for e in embedded {
            self.out.indent();
            if e.pointer {
                self.out.punct("*");
            }
            let (head, rest) = split_type_args(&e.ty);
            let token = Token::new(TokenKind::TypeName, head).linking(self.link(head));
            self.out
                .define(token, member_id(base_type_name(head), owner))?;
            self.type_expr(rest);
            self.tag(e.tag.as_deref());
            self.out.newline();
        }
        for field in fields {
            self.out.indent();
            self.out.define(
                Token::new(TokenKind::MemberName, &field.name),
                member_id(&field.name, owner),
            )?;
            self.out.space();
            self.type_expr(&field.ty);
            self.tag(field.tag.as_deref());
            self.out.newline();
        }
        self.out.punct("}");
        Ok(())
    }

    fn tag(&mut self, tag: Option<&str>) {
        if let Some(tag) = tag {
            self.out.space();
            self.out.emit(TokenKind::StringLiteral, tag);
        }
    }

    fn interface_body(&mut self, i: &Interface, owner: &str) -> Result<(), SerializeError> {
        let embedded: Vec<_> = i.embedded.iter().filter(|e| is_visible_element(e)).collect();
        let methods: Vec<_> = i.methods.iter().filter(|m| is_exported(&m.name)).collect();

        self.out.keyword("interface");
        if embedded.is_empty() && methods.is_empty() && !i.sealed {
            self.out.punct("{}");
            return Ok(());
        }
        self.out.space();
        self.out.punct("{");
        self.out.newline();

        for element in embedded {
            self.out.indent();
            if is_type_name(element) {
                let (head, rest) = split_type_args(element);
                let token = Token::new(TokenKind::TypeName, head).linking(self.link(head));
                self.out.push(token);
                self.type_expr(rest);
            } else {
                self.type_expr(element);
            }
            self.out.newline();
        }
        for method in methods {
            self.out.indent();
            self.signature(method, member_id(&method.name, owner))?;
            self.out.newline();
        }
        if i.sealed {
            self.out.indent();
            self.out
                .emit(TokenKind::Comment, "// contains unexported methods");
            self.out.newline();
        }
        self.out.punct("}");
        Ok(())
    }

    fn func_decl(&mut self, func: &Func, id: String) -> Result<(), SerializeError> {
        self.out.keyword("func");
        self.out.space();
        if let Some(recv) = &func.receiver {
            self.out.punct("(");
            if let Some(name) = &recv.name {
                self.out.emit(TokenKind::Text, name);
                self.out.space();
            }
            self.type_expr(&recv.type_text());
            self.out.punct(")");
            self.out.space();
        }
        self.signature(func, id)
    }

    /// Name, type parameters, parameters and results
    fn signature(&mut self, func: &Func, id: String) -> Result<(), SerializeError> {
        self.out
            .define(Token::new(TokenKind::MemberName, &func.name), id)?;
        self.type_params(&func.type_params);
        self.params(&func.params);

        match func.results.as_slice() {
            [] => {}
            [only] if only.name.is_none() => {
                self.out.space();
                self.type_expr(&only.ty);
            }
            results => {
                self.out.space();
                self.params(results);
            }
        }
        Ok(())
    }

    fn params(&mut self, params: &[Param]) {
        self.out.punct("(");
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                self.out.punct(",");
                self.out.space();
            }
            if let Some(name) = &param.name {
                self.out.emit(TokenKind::Text, name);
                self.out.space();
            }
            self.type_expr(&param.ty);
        }
        self.out.punct(")");
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.out.punct("[");
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                self.out.punct(",");
                self.out.space();
            }
            self.out.emit(TokenKind::TypeName, &param.name);
            self.out.space();
            self.type_expr(&param.constraint);
        }
        self.out.punct("]");
    }

    fn link(&self, name: &str) -> Option<String> {
        self.links.resolve(self.package, name)
    }

    /// Tokenize a type expression as written in the source
    fn type_expr(&mut self, ty: &str) {
        let mut chars = ty.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c.is_whitespace() {
                while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
                self.out.space();
            } else if c.is_alphabetic() || c == '_' {
                while chars
                    .next_if(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '.')
                    .is_some()
                {}
                let end = chars.peek().map_or(ty.len(), |(i, _)| *i);
                let word = &ty[start..end];
                if TYPE_KEYWORDS.contains(&word) {
                    self.out.keyword(word);
                } else {
                    let token = Token::new(TokenKind::TypeName, word).linking(self.link(word));
                    self.out.push(token);
                }
            } else if c.is_ascii_digit() {
                while chars.next_if(|(_, c)| c.is_ascii_alphanumeric()).is_some() {}
                let end = chars.peek().map_or(ty.len(), |(i, _)| *i);
                self.out.emit(TokenKind::Literal, &ty[start..end]);
            } else if c == '"' || c == '`' {
                let mut escaped = false;
                for (_, d) in chars.by_ref() {
                    if d == c && !escaped {
                        break;
                    }
                    escaped = c == '"' && d == '\\' && !escaped;
                }
                let end = chars.peek().map_or(ty.len(), |(i, _)| *i);
                self.out.emit(TokenKind::StringLiteral, &ty[start..end]);
            } else if ty[start..].starts_with("...") {
                chars.next();
                chars.next();
                self.out.punct("...");
            } else if ty[start..].starts_with("<-") {
                chars.next();
                self.out.punct("<-");
            } else {
                self.out.punct(&ty[start..start + c.len_utf8()]);
            }
        }
    }
}

/// `Name-<owner id>`
fn member_id(name: &str, owner: &str) -> String {
    format!("{}-{}", name, owner)
}

/// `pkg.List[T]` → (`pkg.List`, `[T]`)
fn split_type_args(ty: &str) -> (&str, &str) {
    match ty.find('[') {
        Some(idx) => ty.split_at(idx),
        None => (ty, ""),
    }
}

/// A plain, possibly qualified or instantiated, type name
fn is_type_name(element: &str) -> bool {
    let (head, _) = split_type_args(element);
    !head.is_empty()
        && head
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Unexported embedded interfaces are hidden with the rest of the
/// unexported API; type-set elements and qualified names stay
fn is_visible_element(element: &str) -> bool {
    if !is_type_name(element) {
        return true;
    }
    let (head, _) = split_type_args(element);
    head.contains('.') || is_exported(head) || PREDECLARED_INTERFACES.contains(&head)
}
