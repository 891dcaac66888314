use super::item::{ItemRule, ItemRuleList};

/// Request section of a translet: declared parameters and attributes.
///
/// Declared items with a value overwrite whatever the request carried;
/// mandatory items must be present once declarations are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestRule {
    encoding: Option<String>,
    parameters: ItemRuleList,
    attributes: ItemRuleList,
}

impl RequestRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn parameter(mut self, item: ItemRule) -> Self {
        self.parameters.push(item);
        self
    }

    pub fn attribute(mut self, item: ItemRule) -> Self {
        self.attributes.push(item);
        self
    }

    pub fn get_encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn parameters(&self) -> &ItemRuleList {
        &self.parameters
    }

    pub fn attributes(&self) -> &ItemRuleList {
        &self.attributes
    }
}
