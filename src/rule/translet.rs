use std::sync::Arc;

use regex::Regex;

use super::action::{ActionList, ContentList};
use super::exception::ExceptionRule;
use super::request::RequestRule;
use super::response::{Response, ResponseRule};
use super::MethodType;
use crate::aspect::AdviceRegistries;
use crate::error::{ActivityError, ActivityResult};
use crate::expression::{Token, TokenExpression};

/// Matches request names against a translet name containing `${var}` segments.
#[derive(Debug, Clone)]
struct NamePattern {
    regex: Regex,
    variables: Vec<String>,
}

impl NamePattern {
    fn compile(template: &TokenExpression) -> ActivityResult<Self> {
        let mut expression = String::from("^");
        let mut variables = Vec::new();
        for token in template.tokens() {
            match token {
                Token::Text(text) => expression.push_str(&regex::escape(text)),
                Token::Reference { name, .. } => {
                    expression.push_str("([^/]+)");
                    variables.push(name.clone());
                }
            }
        }
        expression.push('$');
        let regex = Regex::new(&expression).map_err(|e| {
            ActivityError::IllegalRule(format!(
                "invalid translet name pattern '{}': {e}",
                template.source()
            ))
        })?;
        Ok(Self { regex, variables })
    }

    fn captures(&self, name: &str) -> Option<Vec<(String, String)>> {
        let captures = self.regex.captures(name)?;
        Some(
            self.variables
                .iter()
                .enumerate()
                .filter_map(|(index, variable)| {
                    captures
                        .get(index + 1)
                        .map(|value| (variable.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// A named unit of request handling.
///
/// Names may contain `${var}` segments (`/users/${id}`); the matched values are
/// bound as request attributes when the translet is prepared.
#[derive(Debug, Clone)]
pub struct TransletRule {
    name: String,
    pattern: Option<NamePattern>,
    methods: Option<Vec<MethodType>>,
    request_rule: RequestRule,
    response_rule: ResponseRule,
    content_list: Option<ContentList>,
    exception_rule: Option<ExceptionRule>,
    description: Option<String>,
    advice_registries: Option<Arc<AdviceRegistries>>,
}

impl TransletRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            methods: None,
            request_rule: RequestRule::default(),
            response_rule: ResponseRule::default(),
            content_list: None,
            exception_rule: None,
            description: None,
            advice_registries: None,
        }
    }

    pub fn method(mut self, method: MethodType) -> Self {
        self.methods.get_or_insert_with(Vec::new).push(method);
        self
    }

    pub fn request(mut self, rule: RequestRule) -> Self {
        self.request_rule = rule;
        self
    }

    pub fn response_rule(mut self, rule: ResponseRule) -> Self {
        self.response_rule = rule;
        self
    }

    pub fn response(mut self, response: impl Into<Response>) -> Self {
        self.response_rule = std::mem::take(&mut self.response_rule).response(response);
        self
    }

    /// Appends an action list to the content section.
    pub fn content(mut self, list: ActionList) -> Self {
        let contents = self.content_list.take().unwrap_or_default();
        self.content_list = Some(contents.content(list));
        self
    }

    pub fn contents(mut self, contents: ContentList) -> Self {
        self.content_list = Some(contents);
        self
    }

    pub fn exception(mut self, rule: ExceptionRule) -> Self {
        self.exception_rule = Some(rule);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> Option<&[MethodType]> {
        self.methods.as_deref()
    }

    pub fn request_rule(&self) -> &RequestRule {
        &self.request_rule
    }

    pub fn get_response_rule(&self) -> &ResponseRule {
        &self.response_rule
    }

    pub fn content_list(&self) -> Option<&ContentList> {
        self.content_list.as_ref()
    }

    pub fn exception_rule(&self) -> Option<&ExceptionRule> {
        self.exception_rule.as_ref()
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn has_path_variables(&self) -> bool {
        self.pattern.is_some()
    }

    /// A translet without declared methods accepts any request, including one with no method.
    pub fn allows(&self, method: Option<MethodType>) -> bool {
        match (&self.methods, method) {
            (None, _) => true,
            (Some(methods), Some(method)) => methods.contains(&method),
            (Some(_), None) => false,
        }
    }

    /// Path variables bound by `name`, or `None` when the name does not match.
    pub fn match_name(&self, name: &str) -> Option<Vec<(String, String)>> {
        match &self.pattern {
            Some(pattern) => pattern.captures(name),
            None => (self.name == name).then(Vec::new),
        }
    }

    /// Registries computed when the context was built; absent for pattern translets.
    pub fn advice_registries(&self) -> Option<&Arc<AdviceRegistries>> {
        self.advice_registries.as_ref()
    }

    /// A per-activity copy of the precomputed registries.
    pub fn replicate_advice_registries(&self) -> Option<AdviceRegistries> {
        self.advice_registries
            .as_deref()
            .map(AdviceRegistries::replicate)
    }

    pub(crate) fn compile_name(&mut self) -> ActivityResult<()> {
        let template = TokenExpression::parse(&self.name);
        self.pattern = if template.has_references() {
            Some(NamePattern::compile(&template)?)
        } else {
            None
        };
        Ok(())
    }

    pub(crate) fn set_advice_registries(&mut self, registries: AdviceRegistries) {
        self.advice_registries = Some(Arc::new(registries));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_variables_are_captured() {
        let mut rule = TransletRule::new("/users/${id}/orders/${order}");
        rule.compile_name().expect("valid pattern");

        assert!(rule.has_path_variables());
        assert_eq!(
            rule.match_name("/users/7/orders/42"),
            Some(vec![
                ("id".to_string(), "7".to_string()),
                ("order".to_string(), "42".to_string()),
            ])
        );
        assert_eq!(rule.match_name("/users/7/orders"), None);
    }

    #[test]
    fn test_method_restrictions() {
        let open = TransletRule::new("/open");
        assert!(open.allows(None));
        assert!(open.allows(Some(MethodType::Delete)));

        let post_only = TransletRule::new("/submit").method(MethodType::Post);
        assert!(post_only.allows(Some(MethodType::Post)));
        assert!(!post_only.allows(Some(MethodType::Get)));
        assert!(!post_only.allows(None));
    }
}
