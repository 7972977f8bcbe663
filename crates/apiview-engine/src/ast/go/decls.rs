use super::{first_named, named_children, DeclReader};
use crate::ast::syntax::{AliasTarget, TypeDecl, TypeSpec, ValueSpec};
use crate::model::{is_exported, Embedded, Field, Func, Interface, Param, Receiver, Struct, TypeParam};
use tree_sitter::Node;

/// Function, type and value declarations
impl DeclReader<'_> {
    pub(super) fn read_func(&self, node: Node) -> Option<Func> {
        let name = node.child_by_field_name("name")?;
        let mut func = Func::new(self.text(name));

        if node.kind() == "method_declaration" {
            let receiver = node.child_by_field_name("receiver")?;
            func.receiver = Some(self.read_receiver(receiver)?);
        }
        self.read_signature(node, &mut func);
        Some(func)
    }

    /// Type parameters, parameters and results of a function-like node
    fn read_signature(&self, node: Node, func: &mut Func) {
        if let Some(list) = node.child_by_field_name("type_parameters") {
            func.type_params = self.read_type_params(list);
        }
        if let Some(list) = node.child_by_field_name("parameters") {
            func.params = self.read_params(list);
        }
        if let Some(result) = node.child_by_field_name("result") {
            func.results = if result.kind() == "parameter_list" {
                self.read_params(result)
            } else {
                vec![Param::unnamed(self.flat(result))]
            };
        }
    }

    fn read_params(&self, list: Node) -> Vec<Param> {
        let mut params = Vec::new();
        for decl in named_children(list) {
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let ty = match decl.kind() {
                "variadic_parameter_declaration" => format!("...{}", self.flat(ty)),
                _ => self.flat(ty),
            };

            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(n))
                .collect();
            if names.is_empty() {
                params.push(Param::unnamed(ty));
            } else {
                params.extend(names.iter().map(|n| Param::new(Some(n.as_str()), ty.clone())));
            }
        }
        params
    }

    fn read_type_params(&self, list: Node) -> Vec<TypeParam> {
        let mut params = Vec::new();
        for decl in named_children(list) {
            let constraint = decl
                .child_by_field_name("type")
                .map(|t| self.flat(t))
                .unwrap_or_else(|| "any".to_string());
            let mut cursor = decl.walk();
            for name in decl.children_by_field_name("name", &mut cursor) {
                params.push(TypeParam {
                    name: self.text(name),
                    constraint: constraint.clone(),
                });
            }
        }
        params
    }

    fn read_receiver(&self, list: Node) -> Option<Receiver> {
        let decl = named_children(list)
            .into_iter()
            .find(|n| n.kind() == "parameter_declaration")?;
        let name = decl.child_by_field_name("name").map(|n| self.text(n));

        let mut ty = decl.child_by_field_name("type")?;
        let mut pointer = false;
        loop {
            match ty.kind() {
                "pointer_type" => {
                    pointer = true;
                    ty = first_named(ty)?;
                }
                "parenthesized_type" => ty = first_named(ty)?,
                _ => break,
            }
        }

        let mut receiver = Receiver::new(name.as_deref(), String::new(), pointer);
        if ty.kind() == "generic_type" {
            receiver.type_name = self.text(ty.child_by_field_name("type")?);
            receiver.type_args = ty
                .child_by_field_name("type_arguments")
                .map(|args| self.type_args(args))
                .unwrap_or_default();
        } else {
            receiver.type_name = self.text(ty);
        }
        Some(receiver)
    }

    fn type_args(&self, args: Node) -> Vec<String> {
        named_children(args).into_iter().map(|a| self.flat(a)).collect()
    }

    pub(super) fn read_type_decls(&self, node: Node) -> Vec<TypeDecl> {
        named_children(node)
            .into_iter()
            .filter_map(|spec| match spec.kind() {
                "type_spec" | "type_alias" => self.read_type_spec(spec),
                _ => None,
            })
            .collect()
    }

    fn read_type_spec(&self, node: Node) -> Option<TypeDecl> {
        let name = self.text(node.child_by_field_name("name")?);
        let type_params = node
            .child_by_field_name("type_parameters")
            .map(|list| self.read_type_params(list))
            .unwrap_or_default();
        let ty = node.child_by_field_name("type")?;

        let is_alias = node.kind() == "type_alias" || has_child(node, "=");
        let spec = if is_alias {
            TypeSpec::Alias {
                text: self.flat(ty),
                target: self.alias_target(ty),
            }
        } else {
            match ty.kind() {
                "struct_type" => TypeSpec::Struct(self.read_struct(&name, &type_params, ty)),
                "interface_type" => {
                    TypeSpec::Interface(self.read_interface(&name, &type_params, ty))
                }
                _ => TypeSpec::Defined(self.flat(ty)),
            }
        };

        Some(TypeDecl {
            name,
            type_params,
            spec,
        })
    }

    fn alias_target(&self, ty: Node) -> Option<AliasTarget> {
        match ty.kind() {
            "qualified_type" => Some(AliasTarget {
                qualifier: self.text(ty.child_by_field_name("package")?),
                name: self.text(ty.child_by_field_name("name")?),
                type_args: Vec::new(),
            }),
            "generic_type" => {
                let mut target = self.alias_target(ty.child_by_field_name("type")?)?;
                target.type_args = ty
                    .child_by_field_name("type_arguments")
                    .map(|args| self.type_args(args))
                    .unwrap_or_default();
                Some(target)
            }
            _ => None,
        }
    }

    fn read_struct(&self, name: &str, type_params: &[TypeParam], node: Node) -> Struct {
        let mut s = Struct {
            name: name.to_string(),
            type_params: type_params.to_vec(),
            fields: Vec::new(),
            embedded: Vec::new(),
        };

        let Some(list) = first_named(node) else {
            return s;
        };
        for decl in named_children(list) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let tag = decl.child_by_field_name("tag").map(|t| self.text(t));

            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(n))
                .collect();

            if names.is_empty() {
                s.embedded.push(Embedded {
                    ty: self.flat(ty),
                    pointer: has_child(decl, "*"),
                    tag,
                });
            } else {
                let ty = self.flat(ty);
                s.fields.extend(names.into_iter().map(|name| Field {
                    name,
                    ty: ty.clone(),
                    tag: tag.clone(),
                }));
            }
        }
        s
    }

    fn read_interface(&self, name: &str, type_params: &[TypeParam], node: Node) -> Interface {
        let mut methods = Vec::new();
        let mut embedded = Vec::new();

        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    if let Some(n) = elem.child_by_field_name("name") {
                        let mut method = Func::new(self.text(n));
                        self.read_signature(elem, &mut method);
                        methods.push(method);
                    }
                }
                "type_elem" | "constraint_elem" | "interface_type_name" => {
                    embedded.push(self.flat(elem));
                }
                _ => {}
            }
        }

        let sealed = methods.iter().any(|m| !is_exported(&m.name));
        Interface {
            name: name.to_string(),
            type_params: type_params.to_vec(),
            methods,
            embedded,
            sealed,
        }
    }

    /// Specs of a const or var declaration, flattening grouped forms
    pub(super) fn read_value_specs(&self, node: Node, spec_kind: &str) -> Vec<ValueSpec> {
        let mut specs = Vec::new();
        for child in named_children(node) {
            if child.kind() == spec_kind {
                specs.push(self.read_value_spec(child));
            } else if child.kind().ends_with("_spec_list") {
                specs.extend(self.read_value_specs(child, spec_kind));
            }
        }
        specs
    }

    fn read_value_spec(&self, node: Node) -> ValueSpec {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.text(n))
            .collect();
        let ty = node.child_by_field_name("type").map(|t| self.flat(t));
        let values = node
            .child_by_field_name("value")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .map(|expr| self.read_expr(expr))
                    .collect()
            })
            .unwrap_or_default();

        ValueSpec { names, ty, values }
    }
}

/// Whether `node` has a direct child of the given kind (named or not)
fn has_child(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}
