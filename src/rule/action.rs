use std::fmt;

use super::choose::ChooseRule;
use super::item::{ItemRule, ItemRuleList};
use super::MethodType;

/// How a bean-method action finds its bean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeanRef {
    Id(String),
    Type(String),
    /// The advice bean of the aspect the action is declared in.
    Advice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeanMethodActionRule {
    id: Option<String>,
    bean: BeanRef,
    method: String,
    arguments: ItemRuleList,
    properties: ItemRuleList,
    requires_translet: bool,
    hidden: bool,
}

impl BeanMethodActionRule {
    pub fn new(bean_id: impl Into<String>, method: impl Into<String>) -> Self {
        Self::with_bean(BeanRef::Id(bean_id.into()), method)
    }

    pub fn by_type(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::with_bean(BeanRef::Type(type_name.into()), method)
    }

    /// Invokes `method` on the enclosing aspect's advice bean.
    pub fn advice(method: impl Into<String>) -> Self {
        Self::with_bean(BeanRef::Advice, method)
    }

    fn with_bean(bean: BeanRef, method: impl Into<String>) -> Self {
        Self {
            id: None,
            bean,
            method: method.into(),
            arguments: ItemRuleList::default(),
            properties: ItemRuleList::default(),
            requires_translet: false,
            hidden: false,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn argument(mut self, item: ItemRule) -> Self {
        self.arguments.push(item);
        self
    }

    pub fn property(mut self, item: ItemRule) -> Self {
        self.properties.push(item);
        self
    }

    /// Hands the current translet to the bean method.
    pub fn requires_translet(mut self) -> Self {
        self.requires_translet = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn bean(&self) -> &BeanRef {
        &self.bean
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &ItemRuleList {
        &self.arguments
    }

    pub fn properties(&self) -> &ItemRuleList {
        &self.properties
    }

    pub fn is_translet_required(&self) -> bool {
        self.requires_translet
    }
}

/// Evaluates its items, stores them as request attributes and yields them as a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoActionRule {
    id: Option<String>,
    items: ItemRuleList,
    hidden: bool,
}

impl EchoActionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn item(mut self, item: ItemRule) -> Self {
        self.items.push(item);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn items(&self) -> &ItemRuleList {
        &self.items
    }
}

/// Sets response headers. Never produces a result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderActionRule {
    id: Option<String>,
    headers: ItemRuleList,
}

impl HeaderActionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn header(mut self, item: ItemRule) -> Self {
        self.headers.push(item);
        self
    }

    pub fn headers(&self) -> &ItemRuleList {
        &self.headers
    }
}

/// Runs another translet as a nested activity and records its process result.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeActionRule {
    id: Option<String>,
    translet_name: String,
    method: Option<MethodType>,
    parameters: ItemRuleList,
    attributes: ItemRuleList,
    hidden: bool,
}

impl IncludeActionRule {
    pub fn new(translet_name: impl Into<String>) -> Self {
        Self {
            id: None,
            translet_name: translet_name.into(),
            method: None,
            parameters: ItemRuleList::default(),
            attributes: ItemRuleList::default(),
            hidden: false,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn method(mut self, method: MethodType) -> Self {
        self.method = Some(method);
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

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn translet_name(&self) -> &str {
        &self.translet_name
    }

    pub fn request_method(&self) -> Option<MethodType> {
        self.method
    }

    pub fn parameters(&self) -> &ItemRuleList {
        &self.parameters
    }

    pub fn attributes(&self) -> &ItemRuleList {
        &self.attributes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    BeanMethod,
    Echo,
    Headers,
    Include,
    Choose,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeanMethod => "bean-method",
            Self::Echo => "echo",
            Self::Headers => "headers",
            Self::Include => "include",
            Self::Choose => "choose",
        };
        f.write_str(name)
    }
}

/// One executable step of a content, advice or exception handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRule {
    BeanMethod(BeanMethodActionRule),
    Echo(EchoActionRule),
    Headers(HeaderActionRule),
    Include(IncludeActionRule),
    Choose(ChooseRule),
}

impl ActionRule {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::BeanMethod(rule) => rule.id.as_deref(),
            Self::Echo(rule) => rule.id.as_deref(),
            Self::Headers(rule) => rule.id.as_deref(),
            Self::Include(rule) => rule.id.as_deref(),
            Self::Choose(_) => None,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::BeanMethod(_) => ActionKind::BeanMethod,
            Self::Echo(_) => ActionKind::Echo,
            Self::Headers(_) => ActionKind::Headers,
            Self::Include(_) => ActionKind::Include,
            Self::Choose(_) => ActionKind::Choose,
        }
    }

    /// Hidden actions run normally but leave no entry in the process result.
    pub fn is_hidden(&self) -> bool {
        match self {
            Self::BeanMethod(rule) => rule.hidden,
            Self::Echo(rule) => rule.hidden,
            Self::Include(rule) => rule.hidden,
            Self::Headers(_) | Self::Choose(_) => true,
        }
    }

    /// Short label used in logs and error messages.
    pub fn describe(&self) -> String {
        let target = match self {
            Self::BeanMethod(rule) => match &rule.bean {
                BeanRef::Id(id) => format!("{id}.{}", rule.method),
                BeanRef::Type(type_name) => format!("<{type_name}>.{}", rule.method),
                BeanRef::Advice => format!("<advice>.{}", rule.method),
            },
            Self::Include(rule) => rule.translet_name.clone(),
            Self::Echo(_) | Self::Headers(_) | Self::Choose(_) => String::new(),
        };
        match (self.id(), target.is_empty()) {
            (Some(id), true) => format!("{}#{id}", self.kind()),
            (Some(id), false) => format!("{}#{id}({target})", self.kind()),
            (None, true) => self.kind().to_string(),
            (None, false) => format!("{}({target})", self.kind()),
        }
    }
}

impl From<BeanMethodActionRule> for ActionRule {
    fn from(rule: BeanMethodActionRule) -> Self {
        Self::BeanMethod(rule)
    }
}

impl From<EchoActionRule> for ActionRule {
    fn from(rule: EchoActionRule) -> Self {
        Self::Echo(rule)
    }
}

impl From<HeaderActionRule> for ActionRule {
    fn from(rule: HeaderActionRule) -> Self {
        Self::Headers(rule)
    }
}

impl From<IncludeActionRule> for ActionRule {
    fn from(rule: IncludeActionRule) -> Self {
        Self::Include(rule)
    }
}

impl From<ChooseRule> for ActionRule {
    fn from(rule: ChooseRule) -> Self {
        Self::Choose(rule)
    }
}

/// An ordered group of actions whose results form one content result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionList {
    name: Option<String>,
    actions: Vec<ActionRule>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            actions: Vec::new(),
        }
    }

    pub fn action(mut self, action: impl Into<ActionRule>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn push(&mut self, action: impl Into<ActionRule>) {
        self.actions.push(action.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn actions(&self) -> &[ActionRule] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// The content section of a translet: action lists run in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentList {
    name: Option<String>,
    lists: Vec<ActionList>,
}

impl ContentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            lists: Vec::new(),
        }
    }

    pub fn content(mut self, list: ActionList) -> Self {
        self.lists.push(list);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn action_lists(&self) -> &[ActionList] {
        &self.lists
    }
}
