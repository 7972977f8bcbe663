//! Symbol table of one package
//!
//! Holds the exported declarations of a package. The table is append-only:
//! symbols are added during indexing and alias hoisting and never removed;
//! what is hidden from reviewers is decided at classification time.

use std::collections::BTreeMap;

/// Type recorded for values whose type cannot be determined locally
pub const UNKNOWN_TYPE: &str = "<unknown>";

/// Whether a Go identifier is exported
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// One parameter or result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Option<String>,
    /// Type as written, variadic parameters keep their `...` prefix
    pub ty: String,
}

impl Param {
    pub fn new(name: Option<&str>, ty: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            ty: ty.into(),
        }
    }

    /// Unnamed parameter
    pub fn unnamed(ty: impl Into<String>) -> Self {
        Self::new(None, ty)
    }
}

/// One type parameter (`T any`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: String,
}

/// Receiver of a method, captured when the declaration is indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    /// Receiver variable (`c` in `(c *Client)`)
    pub name: Option<String>,
    /// Receiver base type name without pointer or type arguments
    pub type_name: String,
    pub pointer: bool,
    /// Type arguments of a generic receiver (`T` in `(l *List[T])`)
    pub type_args: Vec<String>,
}

impl Receiver {
    pub fn new(name: Option<&str>, type_name: impl Into<String>, pointer: bool) -> Self {
        Self {
            name: name.map(str::to_string),
            type_name: type_name.into(),
            pointer,
            type_args: Vec::new(),
        }
    }

    /// Receiver type as written: `*List[T]`
    pub fn type_text(&self) -> String {
        let mut text = String::new();
        if self.pointer {
            text.push('*');
        }
        text.push_str(&self.type_name);
        if !self.type_args.is_empty() {
            text.push('[');
            text.push_str(&self.type_args.join(", "));
            text.push(']');
        }
        text
    }
}

/// Function, method or interface method signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Func {
    pub name: String,
    pub receiver: Option<Receiver>,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

impl Func {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            receiver: None,
            type_params: Vec::new(),
            params: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Key in the symbol table; methods are qualified by their receiver type
    /// so they never collide with a free function of the same name
    pub fn key(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{}.{}", recv.type_name, self.name),
            None => self.name.clone(),
        }
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }

    /// First result type with pointer and type arguments removed
    pub fn first_result_base(&self) -> Option<&str> {
        self.results.first().map(|p| base_type_name(&p.ty))
    }
}

/// Named struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: String,
    /// Struct tag including its quotes
    pub tag: Option<String>,
}

/// Anonymous (embedded) struct field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedded {
    /// Embedded type without the pointer marker
    pub ty: String,
    pub pointer: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<Field>,
    pub embedded: Vec<Embedded>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub methods: Vec<Func>,
    /// Embedded interfaces and type-set elements as written
    pub embedded: Vec<String>,
    /// Has at least one unexported method
    pub sealed: bool,
}

/// Defined type (`type Color string`) or local alias (`type X = Y`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleType {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub underlying: String,
    pub alias: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    pub name: String,
    /// Declared or inferred type, [`UNKNOWN_TYPE`] when neither is possible
    pub ty: String,
    /// The type was written in the declaration (or carried from the
    /// previous spec of the group)
    pub declared: bool,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: String,
    pub ty: String,
    pub declared: bool,
    pub value: Option<String>,
}

/// A type definition held by a symbol table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Struct(Struct),
    Interface(Interface),
    Simple(SimpleType),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Struct(s) => &s.name,
            TypeDef::Interface(i) => &i.name,
            TypeDef::Simple(t) => &t.name,
        }
    }

    /// Same definition under another name
    pub fn renamed(&self, name: &str) -> TypeDef {
        let mut def = self.clone();
        match &mut def {
            TypeDef::Struct(s) => s.name = name.to_string(),
            TypeDef::Interface(i) => i.name = name.to_string(),
            TypeDef::Simple(t) => t.name = name.to_string(),
        }
        def
    }
}

/// Exported declarations of a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    consts: BTreeMap<String, Const>,
    vars: BTreeMap<String, Var>,
    funcs: BTreeMap<String, Func>,
    interfaces: BTreeMap<String, Interface>,
    structs: BTreeMap<String, Struct>,
    simple_types: BTreeMap<String, SimpleType>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant; returns false if the name was already present
    pub fn add_const(&mut self, c: Const) -> bool {
        insert_new(&mut self.consts, c.name.clone(), c)
    }

    pub fn add_var(&mut self, v: Var) -> bool {
        insert_new(&mut self.vars, v.name.clone(), v)
    }

    pub fn add_func(&mut self, f: Func) -> bool {
        insert_new(&mut self.funcs, f.key(), f)
    }

    /// Add a type definition; a name is only ever held by one type bucket
    pub fn add_type(&mut self, def: TypeDef) -> bool {
        if self.has_type(def.name()) {
            return false;
        }
        match def {
            TypeDef::Struct(s) => insert_new(&mut self.structs, s.name.clone(), s),
            TypeDef::Interface(i) => insert_new(&mut self.interfaces, i.name.clone(), i),
            TypeDef::Simple(t) => insert_new(&mut self.simple_types, t.name.clone(), t),
        }
    }

    pub fn consts(&self) -> &BTreeMap<String, Const> {
        &self.consts
    }

    pub fn vars(&self) -> &BTreeMap<String, Var> {
        &self.vars
    }

    pub fn funcs(&self) -> &BTreeMap<String, Func> {
        &self.funcs
    }

    pub fn interfaces(&self) -> &BTreeMap<String, Interface> {
        &self.interfaces
    }

    pub fn structs(&self) -> &BTreeMap<String, Struct> {
        &self.structs
    }

    pub fn simple_types(&self) -> &BTreeMap<String, SimpleType> {
        &self.simple_types
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.structs.contains_key(name)
            || self.interfaces.contains_key(name)
            || self.simple_types.contains_key(name)
    }

    /// Type definition by name
    pub fn type_def(&self, name: &str) -> Option<TypeDef> {
        if let Some(s) = self.structs.get(name) {
            return Some(TypeDef::Struct(s.clone()));
        }
        if let Some(i) = self.interfaces.get(name) {
            return Some(TypeDef::Interface(i.clone()));
        }
        self.simple_types
            .get(name)
            .map(|t| TypeDef::Simple(t.clone()))
    }

    /// Methods whose receiver type is `type_name`, ordered by name
    pub fn methods_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Func> + 'a {
        self.funcs.values().filter(move |f| {
            f.receiver
                .as_ref()
                .is_some_and(|r| r.type_name == type_name)
        })
    }

    /// Number of symbols in all buckets
    pub fn len(&self) -> usize {
        self.consts.len()
            + self.vars.len()
            + self.funcs.len()
            + self.interfaces.len()
            + self.structs.len()
            + self.simple_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_new<V>(map: &mut BTreeMap<String, V>, key: String, value: V) -> bool {
    if map.contains_key(&key) {
        return false;
    }
    map.insert(key, value);
    true
}

/// `*pkg.List[T]` → `List`
pub fn base_type_name(ty: &str) -> &str {
    let ty = ty.trim_start_matches('*');
    let ty = ty.split('[').next().unwrap_or(ty);
    ty.rsplit('.').next().unwrap_or(ty)
}
