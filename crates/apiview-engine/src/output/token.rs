//! Review tokens

use serde::{Deserialize, Serialize};

/// Visual kind of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Text,
    Newline,
    Whitespace,
    Punctuation,
    Keyword,
    TypeName,
    MemberName,
    StringLiteral,
    Literal,
    Comment,
}

/// One atom of the review listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Anchor for this token; unique within a document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<String>,
    /// Definition this token links to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to_id: Option<String>,
    pub value: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            definition_id: None,
            navigate_to_id: None,
            value: value.into(),
            kind,
        }
    }

    pub fn defining(mut self, id: impl Into<String>) -> Self {
        self.definition_id = Some(id.into());
        self
    }

    pub fn linking(mut self, id: Option<String>) -> Self {
        self.navigate_to_id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_json_shape() {
        let token = Token::new(TokenKind::TypeName, "Widget").linking(Some("shop.Widget".into()));
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(
            json,
            r#"{"navigateToId":"shop.Widget","value":"Widget","kind":"typeName"}"#
        );

        let plain = Token::new(TokenKind::StringLiteral, "\"x\"");
        let json = serde_json::to_string(&plain).unwrap();
        assert_eq!(json, r#"{"value":"\"x\"","kind":"stringLiteral"}"#);
    }
}
