use crate::expression::TokenExpression;

/// Declared value of an item: a template, a list of templates or named templates.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Single(TokenExpression),
    List(Vec<TokenExpression>),
    Map(Vec<(String, TokenExpression)>),
}

/// A named parameter, attribute, argument or header declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRule {
    name: String,
    value: Option<ItemValue>,
    mandatory: bool,
}

impl ItemRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            mandatory: false,
        }
    }

    pub fn value(mut self, template: &str) -> Self {
        self.value = Some(ItemValue::Single(TokenExpression::parse(template)));
        self
    }

    pub fn values<'a>(mut self, templates: impl IntoIterator<Item = &'a str>) -> Self {
        self.value = Some(ItemValue::List(
            templates.into_iter().map(TokenExpression::parse).collect(),
        ));
        self
    }

    pub fn entry(mut self, key: impl Into<String>, template: &str) -> Self {
        let entry = (key.into(), TokenExpression::parse(template));
        match &mut self.value {
            Some(ItemValue::Map(entries)) => entries.push(entry),
            _ => self.value = Some(ItemValue::Map(vec![entry])),
        }
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_rule(&self) -> Option<&ItemValue> {
        self.value.as_ref()
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}

/// Ordered item declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemRuleList(Vec<ItemRule>);

impl ItemRuleList {
    pub fn push(&mut self, item: ItemRule) {
        self.0.push(item);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemRule> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<ItemRule> for ItemRuleList {
    fn from_iter<I: IntoIterator<Item = ItemRule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ItemRuleList {
    type Item = &'a ItemRule;
    type IntoIter = std::slice::Iter<'a, ItemRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
