//! Symbol classification and ordering
//!
//! Turns the flat symbol table of a package into the type-centric view
//! shown to reviewers: const blocks by type, types with their constructors
//! and methods, then whatever functions are left.

use crate::config::ReviewConfig;
use crate::model::{
    AliasRef, AliasState, Const, Func, Interface, Package, SimpleType, Struct, Var, UNKNOWN_TYPE,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Prefixes of functions the Go tool treats as tests
const TEST_PREFIXES: &[&str] = &["Test", "Benchmark", "Example", "Fuzz"];

/// Constants sharing one type
#[derive(Debug, Clone)]
pub struct ConstGroup<'p> {
    pub type_name: &'p str,
    pub consts: Vec<&'p Const>,
    /// `Possible<Type>Values` functions
    pub value_funcs: Vec<&'p Func>,
    /// `Possible<Type>Values` variables
    pub value_vars: Vec<&'p Var>,
}

impl ConstGroup<'_> {
    /// Block of constants whose type could not be determined
    pub fn is_unknown(&self) -> bool {
        self.type_name == UNKNOWN_TYPE
    }
}

/// What a listed type looks like
#[derive(Debug, Clone, Copy)]
pub enum TypeShape<'p> {
    Struct(&'p Struct),
    Interface(&'p Interface),
    Simple(&'p SimpleType),
    /// Cross-package alias whose definition could not be loaded
    Opaque(&'p AliasRef),
}

/// One type with everything attached to it
#[derive(Debug, Clone)]
pub struct TypeEntry<'p> {
    pub name: &'p str,
    pub shape: TypeShape<'p>,
    pub constructors: Vec<&'p Func>,
    pub methods: Vec<&'p Func>,
}

/// A package in review order
#[derive(Debug, Clone)]
pub struct ClassifiedPackage<'p> {
    pub package: &'p Package,
    pub const_groups: Vec<ConstGroup<'p>>,
    pub vars: Vec<&'p Var>,
    pub types: Vec<TypeEntry<'p>>,
    pub funcs: Vec<&'p Func>,
}

impl<'p> ClassifiedPackage<'p> {
    pub fn type_entry(&self, name: &str) -> Option<&TypeEntry<'p>> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// Groups and orders package symbols
pub struct Classifier<'c> {
    config: &'c ReviewConfig,
}

impl<'c> Classifier<'c> {
    pub fn new(config: &'c ReviewConfig) -> Self {
        Self { config }
    }

    pub fn classify<'p>(&self, package: &'p Package) -> ClassifiedPackage<'p> {
        let symbols = package.symbols();

        let mut const_groups = group_consts(symbols.consts().values());
        let mut types = self.collect_types(package);

        let mut vars = Vec::new();
        for var in symbols.vars().values() {
            match value_list_owner(&var.name).and_then(|t| find_group(&mut const_groups, t)) {
                Some(group) => group.value_vars.push(var),
                None => vars.push(var),
            }
        }

        let mut funcs = Vec::new();
        for func in symbols.funcs().values() {
            if is_test_like(&func.name) {
                trace!(func = %func.key(), "hiding test function");
                continue;
            }
            if let Some(recv) = &func.receiver {
                match types.iter_mut().find(|t| t.name == recv.type_name) {
                    Some(entry) => entry.methods.push(func),
                    None => trace!(method = %func.key(), "method without listed receiver"),
                }
                continue;
            }
            if let Some(group) =
                value_list_owner(&func.name).and_then(|t| find_group(&mut const_groups, t))
            {
                group.value_funcs.push(func);
                continue;
            }
            match constructed_type(func, &types) {
                Some(idx) => types[idx].constructors.push(func),
                None => funcs.push(func),
            }
        }

        const_groups.retain(|g| !g.consts.is_empty());
        ClassifiedPackage {
            package,
            const_groups,
            vars,
            types,
            funcs,
        }
    }

    /// Listed types, primary types first, then by name
    fn collect_types<'p>(&self, package: &'p Package) -> Vec<TypeEntry<'p>> {
        let symbols = package.symbols();
        let mut types: Vec<TypeEntry<'p>> = Vec::new();
        let mut push = |name: &'p str, shape| {
            types.push(TypeEntry {
                name,
                shape,
                constructors: Vec::new(),
                methods: Vec::new(),
            })
        };

        for s in symbols.structs().values() {
            push(&s.name, TypeShape::Struct(s));
        }
        for i in symbols.interfaces().values() {
            push(&i.name, TypeShape::Interface(i));
        }
        for t in symbols.simple_types().values() {
            push(&t.name, TypeShape::Simple(t));
        }
        // Resolved aliases were hoisted into the table above
        for alias in package.aliases() {
            if !matches!(alias.state(), AliasState::Resolved { .. }) {
                push(&alias.name, TypeShape::Opaque(alias));
            }
        }

        types.sort_by(|a, b| {
            let a_primary = self.config.is_primary(a.name);
            let b_primary = self.config.is_primary(b.name);
            b_primary.cmp(&a_primary).then_with(|| a.name.cmp(b.name))
        });
        types
    }
}

/// Const blocks ordered by type name, constants by name; the block of
/// unknown-typed constants comes last
fn group_consts<'p>(consts: impl Iterator<Item = &'p Const>) -> Vec<ConstGroup<'p>> {
    let mut by_type: BTreeMap<&'p str, Vec<&'p Const>> = BTreeMap::new();
    for c in consts {
        by_type.entry(c.ty.as_str()).or_default().push(c);
    }

    let mut groups: Vec<ConstGroup<'p>> = by_type
        .into_iter()
        .map(|(type_name, mut consts)| {
            consts.sort_by(|a, b| a.name.cmp(&b.name));
            ConstGroup {
                type_name,
                consts,
                value_funcs: Vec::new(),
                value_vars: Vec::new(),
            }
        })
        .collect();
    groups.sort_by_key(|g| (g.is_unknown(), g.type_name));
    groups
}

fn find_group<'g, 'p>(
    groups: &'g mut [ConstGroup<'p>],
    type_name: &str,
) -> Option<&'g mut ConstGroup<'p>> {
    groups.iter_mut().find(|g| g.type_name == type_name)
}

/// `PossibleColorValues` → `Color`
fn value_list_owner(name: &str) -> Option<&str> {
    name.strip_prefix("Possible")?
        .strip_suffix("Values")
        .filter(|t| !t.is_empty())
}

/// Index of the type a `New…` function constructs
///
/// `New<Type>` always belongs to `<Type>`; a longer `New<Type>…` name
/// belongs to it only when its first result is `<Type>` or `*<Type>`.
/// The longest matching type name wins.
fn constructed_type(func: &Func, types: &[TypeEntry<'_>]) -> Option<usize> {
    let rest = func.name.strip_prefix("New")?;
    let first_result = func.first_result_base();

    types
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            rest == t.name || (rest.starts_with(t.name) && first_result == Some(t.name))
        })
        .max_by_key(|(_, t)| t.name.len())
        .map(|(idx, _)| idx)
}

/// `TestFoo`, `Benchmark_x`, `Example`: names `go test` would pick up
pub fn is_test_like(name: &str) -> bool {
    TEST_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix).is_some_and(|rest| {
            rest.chars()
                .next()
                .map_or(true, |c| c == '_' || c.is_uppercase())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AliasFailure, Field, Param, QualifiedName, Receiver, TypeDef};

    fn package() -> Package {
        Package::new("example.com/shop", "shop", "shop", "/tmp/shop")
    }

    fn typed_const(name: &str, ty: &str) -> Const {
        Const {
            name: name.to_string(),
            ty: ty.to_string(),
            declared: true,
            value: Some("1".to_string()),
        }
    }

    fn strukt(name: &str) -> TypeDef {
        TypeDef::Struct(Struct {
            name: name.to_string(),
            type_params: Vec::new(),
            fields: vec![Field {
                name: "ID".to_string(),
                ty: "string".to_string(),
                tag: None,
            }],
            embedded: Vec::new(),
        })
    }

    fn func(name: &str, result: Option<&str>) -> Func {
        let mut f = Func::new(name);
        if let Some(ty) = result {
            f.results.push(Param::unnamed(ty));
        }
        f
    }

    fn method(recv: &str, name: &str) -> Func {
        let mut f = Func::new(name);
        f.receiver = Some(Receiver::new(Some("x"), recv, true));
        f
    }

    #[test]
    fn test_is_test_like() {
        assert!(is_test_like("TestWidget"));
        assert!(is_test_like("Test"));
        assert!(is_test_like("Benchmark_parse"));
        assert!(is_test_like("ExampleClient_Get"));
        assert!(is_test_like("FuzzDecode"));
        assert!(!is_test_like("Testify"));
        assert!(!is_test_like("Examples"));
        assert!(!is_test_like("NewTest"));
    }

    #[test]
    fn test_value_list_owner() {
        assert_eq!(value_list_owner("PossibleColorValues"), Some("Color"));
        assert_eq!(value_list_owner("PossibleValues"), None);
        assert_eq!(value_list_owner("ColorValues"), None);
    }

    #[test]
    fn test_const_groups_and_possible_values() {
        let mut p = package();
        p.symbols_mut().add_type(TypeDef::Simple(SimpleType {
            name: "Color".to_string(),
            type_params: Vec::new(),
            underlying: "string".to_string(),
            alias: false,
        }));
        p.symbols_mut().add_const(typed_const("Red", "Color"));
        p.symbols_mut().add_const(typed_const("Blue", "Color"));
        p.symbols_mut().add_const(typed_const("Max", "int"));
        p.symbols_mut().add_const(typed_const("Odd", UNKNOWN_TYPE));
        p.symbols_mut().add_const(typed_const("Alpha", "Align"));
        p.symbols_mut()
            .add_func(func("PossibleColorValues", Some("[]Color")));
        p.symbols_mut()
            .add_func(func("PossibleShapeValues", Some("[]Shape")));

        let config = ReviewConfig::default();
        let classified = Classifier::new(&config).classify(&p);

        let order: Vec<_> = classified.const_groups.iter().map(|g| g.type_name).collect();
        assert_eq!(order, vec!["Align", "Color", "int", UNKNOWN_TYPE]);

        let color = &classified.const_groups[1];
        let names: Vec<_> = color.consts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Blue", "Red"]);
        assert_eq!(color.value_funcs.len(), 1);
        assert_eq!(color.value_funcs[0].name, "PossibleColorValues");

        // No Shape constants, so the function stays free
        let free: Vec<_> = classified.funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(free, vec!["PossibleShapeValues"]);
    }

    #[test]
    fn test_primary_types_first() {
        let mut p = package();
        p.symbols_mut().add_type(strukt("Widget"));
        p.symbols_mut().add_type(strukt("Apple"));
        p.symbols_mut().add_type(strukt("WidgetClient"));

        let config = ReviewConfig::default();
        let classified = Classifier::new(&config).classify(&p);
        let order: Vec<_> = classified.types.iter().map(|t| t.name).collect();
        assert_eq!(order, vec!["WidgetClient", "Apple", "Widget"]);
    }

    #[test]
    fn test_constructors_and_methods_attach() {
        let mut p = package();
        p.symbols_mut().add_type(strukt("Widget"));
        p.symbols_mut().add_type(strukt("WidgetClient"));
        p.symbols_mut().add_func(func("NewWidget", Some("*Widget")));
        p.symbols_mut()
            .add_func(func("NewWidgetClient", Some("*WidgetClient")));
        p.symbols_mut()
            .add_func(func("NewWidgetFromJSON", Some("*Widget")));
        p.symbols_mut()
            .add_func(func("NewWidgetish", Some("string")));
        p.symbols_mut().add_func(method("Widget", "Paint"));
        p.symbols_mut().add_func(method("Widget", "TestPaint"));
        p.symbols_mut().add_func(func("Helper", None));

        let config = ReviewConfig::default();
        let classified = Classifier::new(&config).classify(&p);

        let client = classified.type_entry("WidgetClient").unwrap();
        let ctors: Vec<_> = client.constructors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(ctors, vec!["NewWidgetClient"]);

        let widget = classified.type_entry("Widget").unwrap();
        let ctors: Vec<_> = widget.constructors.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(ctors, vec!["NewWidget", "NewWidgetFromJSON"]);
        let methods: Vec<_> = widget.methods.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(methods, vec!["Paint"]);

        let free: Vec<_> = classified.funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(free, vec!["Helper", "NewWidgetish"]);
    }

    #[test]
    fn test_failed_alias_is_opaque() {
        let mut p = package();
        let mut alias = AliasRef::new(
            "Foo",
            QualifiedName::new("github.com/other/lib", "Bar"),
            "lib.Bar",
        );
        alias.settle(AliasState::Failed(AliasFailure::ExternalRepo));
        p.add_alias(alias);

        let config = ReviewConfig::default();
        let classified = Classifier::new(&config).classify(&p);
        assert_eq!(classified.types.len(), 1);
        assert!(matches!(classified.types[0].shape, TypeShape::Opaque(a) if a.name == "Foo"));
    }
}
