//! # Expressions
//!
//! Token templates ([`TokenExpression`]) and boolean conditions ([`Condition`])
//! evaluated against whatever implements [`TokenSource`]. During an activity that is
//! the [`Translet`](crate::activity::Translet): parameters and attributes come from
//! the request adapter, properties from the engine configuration.

mod condition;
mod token;

pub use condition::Condition;
pub use token::{Token, TokenExpression, TokenKind};

use serde_json::{Map, Value};

use crate::rule::{ItemRule, ItemValue};

/// Where token references are read from.
pub trait TokenSource {
    fn parameter_values(&self, name: &str) -> Option<Vec<String>>;
    fn attribute(&self, name: &str) -> Option<Value>;
    fn property(&self, name: &str) -> Option<String>;
}

/// Evaluates templates and item rules against a [`TokenSource`].
pub struct TokenEvaluator<'a> {
    source: &'a dyn TokenSource,
}

impl<'a> TokenEvaluator<'a> {
    pub fn new(source: &'a dyn TokenSource) -> Self {
        Self { source }
    }

    /// Resolves one token; unresolved references fall back to their default, then `Null`.
    pub fn resolve(&self, token: &Token) -> Value {
        match token {
            Token::Text(text) => Value::String(text.clone()),
            Token::Reference { kind, name, default } => {
                let value = match kind {
                    TokenKind::Parameter => self
                        .source
                        .parameter_values(name)
                        .and_then(|values| values.into_iter().next())
                        .map(Value::String),
                    TokenKind::Attribute => self.attribute_path(name),
                    TokenKind::Property => self.source.property(name).map(Value::String),
                };
                value
                    .or_else(|| default.clone().map(Value::String))
                    .unwrap_or(Value::Null)
            }
        }
    }

    /// A template that is exactly one reference keeps the referenced value's type;
    /// anything else renders to a string with unresolved references left empty.
    pub fn evaluate(&self, expr: &TokenExpression) -> Value {
        if let Some(token) = expr.single_reference() {
            return self.resolve(token);
        }
        let text: String = expr
            .tokens()
            .iter()
            .map(|token| value_to_text(&self.resolve(token)))
            .collect();
        Value::String(text)
    }

    pub fn evaluate_string(&self, expr: &TokenExpression) -> Option<String> {
        match self.evaluate(expr) {
            Value::Null => None,
            value => Some(value_to_text(&value)),
        }
    }

    /// `None` when the item declares no value.
    pub fn evaluate_item(&self, item: &ItemRule) -> Option<Value> {
        let value = match item.value_rule()? {
            ItemValue::Single(expr) => self.evaluate(expr),
            ItemValue::List(exprs) => {
                Value::Array(exprs.iter().map(|expr| self.evaluate(expr)).collect())
            }
            ItemValue::Map(entries) => {
                let map: Map<String, Value> = entries
                    .iter()
                    .map(|(key, expr)| (key.clone(), self.evaluate(expr)))
                    .collect();
                Value::Object(map)
            }
        };
        Some(value)
    }

    fn attribute_path(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.source.attribute(name) {
            return Some(value);
        }
        let mut segments = name.split('.');
        let root = self.source.attribute(segments.next()?)?;
        segments.try_fold(root, |current, segment| match current {
            Value::Object(mut map) => map.remove(segment),
            Value::Array(mut items) => {
                let index: usize = segment.parse().ok()?;
                (index < items.len()).then(|| items.swap_remove(index))
            }
            _ => None,
        })
    }
}

/// Renders a value as text; strings are unquoted and `Null` is empty.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Flattens a value into parameter strings; `Null` yields `None`.
pub fn value_to_strings(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(value_to_text)
                .collect(),
        ),
        other => Some(vec![value_to_text(other)]),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct MapSource {
        pub parameters: HashMap<String, Vec<String>>,
        pub attributes: HashMap<String, Value>,
        pub properties: HashMap<String, String>,
    }

    impl TokenSource for MapSource {
        fn parameter_values(&self, name: &str) -> Option<Vec<String>> {
            self.parameters.get(name).cloned()
        }

        fn attribute(&self, name: &str) -> Option<Value> {
            self.attributes.get(name).cloned()
        }

        fn property(&self, name: &str) -> Option<String> {
            self.properties.get(name).cloned()
        }
    }

    #[test]
    fn test_single_reference_keeps_value_type() {
        let mut source = MapSource::default();
        source
            .attributes
            .insert("user".to_string(), serde_json::json!({"age": 42, "tags": ["a", "b"]}));
        let evaluator = TokenEvaluator::new(&source);

        assert_eq!(
            evaluator.evaluate(&TokenExpression::parse("@{user.age}")),
            serde_json::json!(42)
        );
        assert_eq!(
            evaluator.evaluate(&TokenExpression::parse("@{user.tags.1}")),
            serde_json::json!("b")
        );
    }

    #[test]
    fn test_mixed_template_renders_missing_as_empty() {
        let mut source = MapSource::default();
        source
            .parameters
            .insert("name".to_string(), vec!["Ann".to_string()]);
        let evaluator = TokenEvaluator::new(&source);

        let value = evaluator.evaluate(&TokenExpression::parse("Hi ${name} ${missing}!"));
        assert_eq!(value, serde_json::json!("Hi Ann !"));
        assert_eq!(
            evaluator.evaluate(&TokenExpression::parse("${missing:fallback}")),
            serde_json::json!("fallback")
        );
        assert_eq!(evaluator.evaluate_string(&TokenExpression::parse("${missing}")), None);
    }

    #[test]
    fn test_value_to_strings_skips_nulls() {
        let value = serde_json::json!(["a", null, 3]);
        assert_eq!(
            value_to_strings(&value),
            Some(vec!["a".to_string(), "3".to_string()])
        );
        assert_eq!(value_to_strings(&Value::Null), None);
    }
}
