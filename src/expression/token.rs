//! Token templates: literal text mixed with `${param}`, `@{attr}` and `%{property}` references.
//!
//! A reference may carry a default after the first colon: `${page:1}`.
//! An opening marker without a closing brace is kept as literal text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `${name}`: request parameter.
    Parameter,
    /// `@{name}`: request attribute, dotted names walk into JSON values.
    Attribute,
    /// `%{name}`: engine property.
    Property,
}

impl TokenKind {
    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '$' => Some(Self::Parameter),
            '@' => Some(Self::Attribute),
            '%' => Some(Self::Property),
            _ => None,
        }
    }

    fn marker(self) -> char {
        match self {
            Self::Parameter => '$',
            Self::Attribute => '@',
            Self::Property => '%',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Reference {
        kind: TokenKind,
        name: String,
        default: Option<String>,
    },
}

impl Token {
    pub fn reference(kind: TokenKind, name: impl Into<String>) -> Self {
        Self::Reference {
            kind,
            name: name.into(),
            default: None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Reference { kind, name, default } => {
                write!(f, "{}{{{}", kind.marker(), name)?;
                if let Some(default) = default {
                    write!(f, ":{default}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenExpression {
    source: String,
    tokens: Vec<Token>,
}

impl TokenExpression {
    pub fn parse(source: &str) -> Self {
        Self {
            source: source.to_string(),
            tokens: tokenize(source),
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = if text.is_empty() {
            Vec::new()
        } else {
            vec![Token::Text(text.clone())]
        };
        Self { source: text, tokens }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn has_references(&self) -> bool {
        self.tokens
            .iter()
            .any(|token| matches!(token, Token::Reference { .. }))
    }

    /// The lone reference when the whole template is a single reference.
    pub fn single_reference(&self) -> Option<&Token> {
        match self.tokens.as_slice() {
            [token @ Token::Reference { .. }] => Some(token),
            _ => None,
        }
    }
}

impl fmt::Display for TokenExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for TokenExpression {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

/// Parses the body of a reference (`name` or `name:default`).
pub(crate) fn parse_reference(kind: TokenKind, body: &str) -> Token {
    let (name, default) = match body.split_once(':') {
        Some((name, default)) => (name, Some(default.to_string())),
        None => (body, None),
    };
    Token::Reference {
        kind,
        name: name.trim().to_string(),
        default,
    }
}

/// Locates a reference starting at byte `start`, returning the token and the end offset.
pub(crate) fn scan_reference(source: &str, start: usize) -> Option<(Token, usize)> {
    let mut chars = source[start..].chars();
    let kind = chars.next().and_then(TokenKind::from_marker)?;
    if chars.next() != Some('{') {
        return None;
    }
    let body_start = start + 2;
    let close = source[body_start..].find('}')? + body_start;
    Some((parse_reference(kind, &source[body_start..close]), close + 1))
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < source.len() {
        if let Some((token, end)) = scan_reference(source, pos) {
            if !text.is_empty() {
                tokens.push(Token::Text(std::mem::take(&mut text)));
            }
            tokens.push(token);
            pos = end;
            continue;
        }
        let Some(ch) = source[pos..].chars().next() else {
            break;
        };
        text.push(ch);
        pos += ch.len_utf8();
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_template_splits_into_tokens() {
        let expr = TokenExpression::parse("Hello ${name:guest}, see @{user.email}!");
        assert_eq!(
            expr.tokens(),
            &[
                Token::Text("Hello ".to_string()),
                Token::Reference {
                    kind: TokenKind::Parameter,
                    name: "name".to_string(),
                    default: Some("guest".to_string()),
                },
                Token::Text(", see ".to_string()),
                Token::reference(TokenKind::Attribute, "user.email"),
                Token::Text("!".to_string()),
            ]
        );
        assert!(expr.has_references());
        assert!(expr.single_reference().is_none());
    }

    #[test]
    fn test_unterminated_reference_is_literal() {
        let expr = TokenExpression::parse("cost: ${amount");
        assert_eq!(expr.tokens(), &[Token::Text("cost: ${amount".to_string())]);
        assert!(!expr.has_references());
    }

    #[test]
    fn test_single_property_reference() {
        let expr = TokenExpression::parse("%{site.title}");
        assert_eq!(
            expr.single_reference(),
            Some(&Token::reference(TokenKind::Property, "site.title"))
        );
        assert_eq!(expr.to_string(), "%{site.title}");
    }
}
