use super::item::{ItemRule, ItemRuleList};
use super::MethodType;
use crate::expression::TokenExpression;

#[derive(Debug, Clone, PartialEq)]
pub enum TransformFormat {
    /// The process result rendered as JSON.
    Json { pretty: bool },
    /// A token template rendered against the translet.
    Text(TokenExpression),
    /// Rendered by a registered [`Transformer`](crate::activity::Transformer).
    Custom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformRule {
    format: TransformFormat,
    content_type: Option<String>,
    encoding: Option<String>,
}

impl TransformRule {
    pub fn json() -> Self {
        Self::with_format(TransformFormat::Json { pretty: false }, Some("application/json"))
    }

    pub fn text(template: &str) -> Self {
        Self::with_format(
            TransformFormat::Text(TokenExpression::parse(template)),
            Some("text/plain"),
        )
    }

    pub fn custom(transformer: impl Into<String>) -> Self {
        Self::with_format(TransformFormat::Custom(transformer.into()), None)
    }

    fn with_format(format: TransformFormat, content_type: Option<&str>) -> Self {
        Self {
            format,
            content_type: content_type.map(str::to_string),
            encoding: None,
        }
    }

    pub fn pretty(mut self) -> Self {
        if let TransformFormat::Json { pretty } = &mut self.format {
            *pretty = true;
        }
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn format(&self) -> &TransformFormat {
        &self.format
    }

    pub fn get_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn get_encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRule {
    name: TokenExpression,
    dispatcher: Option<String>,
    content_type: Option<String>,
    encoding: Option<String>,
}

impl DispatchRule {
    pub fn new(name: &str) -> Self {
        Self {
            name: TokenExpression::parse(name),
            dispatcher: None,
            content_type: None,
            encoding: None,
        }
    }

    pub fn dispatcher(mut self, dispatcher: impl Into<String>) -> Self {
        self.dispatcher = Some(dispatcher.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// View name, possibly containing token references.
    pub fn name(&self) -> &TokenExpression {
        &self.name
    }

    pub fn get_dispatcher(&self) -> Option<&str> {
        self.dispatcher.as_deref()
    }

    pub fn get_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn get_encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRule {
    translet_name: String,
    method: Option<MethodType>,
    attributes: ItemRuleList,
    content_type: Option<String>,
}

impl ForwardRule {
    pub fn new(translet_name: impl Into<String>) -> Self {
        Self {
            translet_name: translet_name.into(),
            method: None,
            attributes: ItemRuleList::default(),
            content_type: None,
        }
    }

    pub fn method(mut self, method: MethodType) -> Self {
        self.method = Some(method);
        self
    }

    /// Attribute evaluated against the forwarding translet and handed to the target.
    pub fn attribute(mut self, item: ItemRule) -> Self {
        self.attributes.push(item);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn translet_name(&self) -> &str {
        &self.translet_name
    }

    pub fn request_method(&self) -> Option<MethodType> {
        self.method
    }

    pub fn attributes(&self) -> &ItemRuleList {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectRule {
    target: TokenExpression,
    parameters: ItemRuleList,
    exclude_null_parameters: bool,
    exclude_empty_parameters: bool,
    encoding: Option<String>,
    content_type: Option<String>,
}

impl RedirectRule {
    pub fn new(target: &str) -> Self {
        Self {
            target: TokenExpression::parse(target),
            parameters: ItemRuleList::default(),
            exclude_null_parameters: false,
            exclude_empty_parameters: false,
            encoding: None,
            content_type: None,
        }
    }

    pub fn parameter(mut self, item: ItemRule) -> Self {
        self.parameters.push(item);
        self
    }

    pub fn exclude_null_parameters(mut self) -> Self {
        self.exclude_null_parameters = true;
        self
    }

    pub fn exclude_empty_parameters(mut self) -> Self {
        self.exclude_empty_parameters = true;
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn target(&self) -> &TokenExpression {
        &self.target
    }

    pub fn parameters(&self) -> &ItemRuleList {
        &self.parameters
    }

    pub fn excludes_null_parameters(&self) -> bool {
        self.exclude_null_parameters
    }

    pub fn excludes_empty_parameters(&self) -> bool {
        self.exclude_empty_parameters
    }

    pub fn get_encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

/// What an activity commits once content has run.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Transform(TransformRule),
    Dispatch(DispatchRule),
    Forward(ForwardRule),
    Redirect(RedirectRule),
}

impl Response {
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Transform(rule) => rule.content_type.as_deref(),
            Self::Dispatch(rule) => rule.content_type.as_deref(),
            Self::Forward(rule) => rule.content_type.as_deref(),
            Self::Redirect(rule) => rule.content_type.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Dispatch(_) => "dispatch",
            Self::Forward(_) => "forward",
            Self::Redirect(_) => "redirect",
        }
    }
}

impl From<TransformRule> for Response {
    fn from(rule: TransformRule) -> Self {
        Self::Transform(rule)
    }
}

impl From<DispatchRule> for Response {
    fn from(rule: DispatchRule) -> Self {
        Self::Dispatch(rule)
    }
}

impl From<ForwardRule> for Response {
    fn from(rule: ForwardRule) -> Self {
        Self::Forward(rule)
    }
}

impl From<RedirectRule> for Response {
    fn from(rule: RedirectRule) -> Self {
        Self::Redirect(rule)
    }
}

/// Response section of a translet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseRule {
    encoding: Option<String>,
    response: Option<Response>,
}

impl ResponseRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn response(mut self, response: impl Into<Response>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn get_encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn get_response(&self) -> Option<&Response> {
        self.response.as_ref()
    }
}
