//! Navigation tree of the review sidebar

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag key carrying the symbol kind
pub const TYPE_KIND_TAG: &str = "TypeKind";

/// Symbol kind shown as the icon of a navigation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKind {
    Package,
    Struct,
    Interface,
    Enum,
    Type,
    Alias,
    Func,
    Var,
}

impl NavKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavKind::Package => "package",
            NavKind::Struct => "struct",
            NavKind::Interface => "interface",
            NavKind::Enum => "enum",
            NavKind::Type => "type",
            NavKind::Alias => "alias",
            NavKind::Func => "func",
            NavKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    pub text: String,
    /// Definition id this entry jumps to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_id: Option<String>,
    #[serde(default)]
    pub child_items: Vec<NavigationNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl NavigationNode {
    pub fn new(text: impl Into<String>, id: impl Into<String>, kind: NavKind) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TYPE_KIND_TAG.to_string(), kind.as_str().to_string());
        Self {
            text: text.into(),
            navigation_id: Some(id.into()),
            child_items: Vec::new(),
            tags: Some(tags),
        }
    }

    /// Kind tag of this entry
    pub fn kind(&self) -> Option<&str> {
        self.tags
            .as_ref()
            .and_then(|t| t.get(TYPE_KIND_TAG))
            .map(String::as_str)
    }

    /// This node and all of its descendants, depth first
    pub fn walk(&self) -> Vec<&NavigationNode> {
        let mut out = vec![self];
        for child in &self.child_items {
            out.extend(child.walk());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_json_shape() {
        let mut root = NavigationNode::new("shop", "shop", NavKind::Package);
        root.child_items
            .push(NavigationNode::new("Widget", "shop.Widget", NavKind::Struct));

        let value = serde_json::to_value(&root).unwrap();
        assert_eq!(value["navigationId"], "shop");
        assert_eq!(value["tags"]["TypeKind"], "package");
        assert_eq!(value["childItems"][0]["text"], "Widget");
        assert_eq!(value["childItems"][0]["tags"]["TypeKind"], "struct");
        assert_eq!(root.walk().len(), 2);
        assert_eq!(root.child_items[0].kind(), Some("struct"));
    }
}
