use super::{first_named, DeclReader};
use crate::ast::syntax::{ValueExpr, ValueKind};
use tree_sitter::Node;

/// Node kinds that spell a type when they appear in call position
const TYPE_KINDS: &[&str] = &[
    "slice_type",
    "array_type",
    "map_type",
    "pointer_type",
    "channel_type",
    "function_type",
    "qualified_type",
    "generic_type",
    "parenthesized_type",
];

/// Initializer expressions
impl DeclReader<'_> {
    pub(super) fn read_expr(&self, node: Node) -> ValueExpr {
        ValueExpr {
            text: self.flat(node),
            kind: self.value_kind(node),
        }
    }

    fn value_kind(&self, node: Node) -> ValueKind {
        match node.kind() {
            "interpreted_string_literal" | "raw_string_literal" => ValueKind::String,
            "int_literal" | "iota" => ValueKind::Int,
            "float_literal" => ValueKind::Float,
            "imaginary_literal" => ValueKind::Imaginary,
            "rune_literal" => ValueKind::Rune,
            "true" | "false" => ValueKind::Bool,
            "identifier" | "selector_expression" => ValueKind::Ident(self.text(node)),
            "composite_literal" | "type_conversion_expression" => node
                .child_by_field_name("type")
                .map(|t| ValueKind::Typed(self.flat(t)))
                .unwrap_or(ValueKind::Other),
            "call_expression" => {
                let Some(function) = node.child_by_field_name("function") else {
                    return ValueKind::Other;
                };
                match function.kind() {
                    "identifier" | "selector_expression" => ValueKind::Call(self.text(function)),
                    kind if TYPE_KINDS.contains(&kind) => ValueKind::Typed(self.flat(function)),
                    _ => ValueKind::Other,
                }
            }
            "parenthesized_expression" => first_named(node)
                .map(|inner| self.value_kind(inner))
                .unwrap_or(ValueKind::Other),
            "unary_expression" => self.unary_kind(node),
            "binary_expression" => self.binary_kind(node),
            _ => ValueKind::Other,
        }
    }

    fn unary_kind(&self, node: Node) -> ValueKind {
        let op = node
            .child_by_field_name("operator")
            .map(|o| self.text(o))
            .unwrap_or_default();
        let Some(operand) = node.child_by_field_name("operand") else {
            return ValueKind::Other;
        };
        match op.as_str() {
            "!" => ValueKind::Bool,
            "&" => match self.value_kind(operand) {
                ValueKind::Typed(t) => ValueKind::Typed(format!("*{}", t)),
                _ => ValueKind::Other,
            },
            "<-" | "*" => ValueKind::Other,
            _ => self.value_kind(operand),
        }
    }

    fn binary_kind(&self, node: Node) -> ValueKind {
        let op = node
            .child_by_field_name("operator")
            .map(|o| self.text(o))
            .unwrap_or_default();
        if matches!(op.as_str(), "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||") {
            return ValueKind::Bool;
        }

        let left = node
            .child_by_field_name("left")
            .map(|n| self.value_kind(n))
            .unwrap_or(ValueKind::Other);
        if matches!(op.as_str(), "<<" | ">>") {
            return left;
        }
        let right = node
            .child_by_field_name("right")
            .map(|n| self.value_kind(n))
            .unwrap_or(ValueKind::Other);
        combine(left, right)
    }
}

/// Kind of `a op b` for arithmetic operators
///
/// A typed operand decides the result; between untyped constants the later
/// kind in int, rune, float, complex wins.
fn combine(left: ValueKind, right: ValueKind) -> ValueKind {
    fn rank(kind: &ValueKind) -> Option<u8> {
        match kind {
            ValueKind::Int => Some(0),
            ValueKind::Rune => Some(1),
            ValueKind::Float => Some(2),
            ValueKind::Imaginary => Some(3),
            _ => None,
        }
    }

    match (&left, &right) {
        (ValueKind::Other, _) => right,
        (_, ValueKind::Other) => left,
        (ValueKind::Typed(_) | ValueKind::Ident(_) | ValueKind::Call(_), _) => left,
        (_, ValueKind::Typed(_) | ValueKind::Ident(_) | ValueKind::Call(_)) => right,
        _ => match (rank(&left), rank(&right)) {
            (Some(l), Some(r)) if r > l => right,
            _ => left,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_untyped() {
        assert_eq!(combine(ValueKind::Int, ValueKind::Float), ValueKind::Float);
        assert_eq!(combine(ValueKind::Rune, ValueKind::Int), ValueKind::Rune);
        assert_eq!(combine(ValueKind::String, ValueKind::String), ValueKind::String);
    }

    #[test]
    fn test_combine_prefers_typed_operand() {
        assert_eq!(
            combine(ValueKind::Int, ValueKind::Ident("Base".into())),
            ValueKind::Ident("Base".into())
        );
        assert_eq!(
            combine(ValueKind::Typed("Size".into()), ValueKind::Int),
            ValueKind::Typed("Size".into())
        );
    }
}
