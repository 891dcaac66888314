use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::action::{ActionRule, BeanRef};
use super::exception::ExceptionRule;
use super::MethodType;
use crate::aspect::{NameMatcher, Pointcut, PointcutPattern};
use crate::error::{ActivityError, ActivityResult};

/// The phase of an activity an aspect wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinpointScope {
    /// The whole translet: before content, after response, finally at the end.
    Translet,
    /// Request parsing during preparation.
    Request,
    /// Content production.
    Content,
    /// Response commit.
    Response,
}

impl JoinpointScope {
    pub const ALL: [JoinpointScope; 4] = [Self::Translet, Self::Request, Self::Content, Self::Response];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Translet => 0,
            Self::Request => 1,
            Self::Content => 2,
            Self::Response => 3,
        }
    }
}

impl fmt::Display for JoinpointScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Translet => "translet",
            Self::Request => "request",
            Self::Content => "content",
            Self::Response => "response",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceType {
    Before,
    After,
    /// Runs in both the before and the after phase.
    Around,
    Finally,
    Thrown,
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Around => "around",
            Self::Finally => "finally",
            Self::Thrown => "thrown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointcutType {
    #[default]
    Wildcard,
    Regexp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdviceRule {
    advice_type: AdviceType,
    action: ActionRule,
}

impl AdviceRule {
    pub fn advice_type(&self) -> AdviceType {
        self.advice_type
    }

    pub fn action(&self) -> &ActionRule {
        &self.action
    }
}

/// Cross-cutting behavior woven into every translet its pointcut matches.
///
/// Aspects are identified by id; two aspect rules with the same id are the same aspect.
#[derive(Debug, Clone)]
pub struct AspectRule {
    id: String,
    order: i32,
    isolated: bool,
    scope: JoinpointScope,
    methods: Option<Vec<MethodType>>,
    headers: Option<Vec<String>>,
    pointcut: Pointcut,
    advice_bean_id: Option<String>,
    advices: Vec<Arc<AdviceRule>>,
    exception_rule: Option<ExceptionRule>,
    settings: BTreeMap<String, String>,
}

impl PartialEq for AspectRule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl AspectRule {
    pub fn builder(id: impl Into<String>) -> AspectRuleBuilder {
        AspectRuleBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lower orders run their before advice first and their after advice last.
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Isolated aspects never join a translet's registry through pointcut matching.
    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    pub fn scope(&self) -> JoinpointScope {
        self.scope
    }

    pub fn methods(&self) -> Option<&[MethodType]> {
        self.methods.as_deref()
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    pub fn advice_bean_id(&self) -> Option<&str> {
        self.advice_bean_id.as_deref()
    }

    pub fn advices(&self) -> &[Arc<AdviceRule>] {
        &self.advices
    }

    pub fn exception_rule(&self) -> Option<&ExceptionRule> {
        self.exception_rule.as_ref()
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }
}

enum RawPattern {
    Translet(String),
    Bean {
        bean: Option<String>,
        method: Option<String>,
    },
}

pub struct AspectRuleBuilder {
    id: String,
    order: i32,
    isolated: bool,
    scope: JoinpointScope,
    methods: Option<Vec<MethodType>>,
    headers: Option<Vec<String>>,
    pointcut_type: PointcutType,
    includes: Vec<RawPattern>,
    excludes: Vec<String>,
    advice_bean_id: Option<String>,
    advices: Vec<AdviceRule>,
    exception_rule: Option<ExceptionRule>,
    settings: BTreeMap<String, String>,
}

impl AspectRuleBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order: i32::MAX,
            isolated: false,
            scope: JoinpointScope::Translet,
            methods: None,
            headers: None,
            pointcut_type: PointcutType::Wildcard,
            includes: Vec::new(),
            excludes: Vec::new(),
            advice_bean_id: None,
            advices: Vec::new(),
            exception_rule: None,
            settings: BTreeMap::new(),
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn isolated(mut self) -> Self {
        self.isolated = true;
        self
    }

    pub fn scope(mut self, scope: JoinpointScope) -> Self {
        self.scope = scope;
        self
    }

    /// Restricts advice execution to requests made with `method`.
    pub fn method(mut self, method: MethodType) -> Self {
        self.methods.get_or_insert_with(Vec::new).push(method);
        self
    }

    /// Restricts advice execution to requests carrying `header`.
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Vec::new).push(header.into());
        self
    }

    pub fn pointcut_type(mut self, pointcut_type: PointcutType) -> Self {
        self.pointcut_type = pointcut_type;
        self
    }

    pub fn include(mut self, translet_pattern: impl Into<String>) -> Self {
        self.includes.push(RawPattern::Translet(translet_pattern.into()));
        self
    }

    pub fn exclude(mut self, translet_pattern: impl Into<String>) -> Self {
        self.excludes.push(translet_pattern.into());
        self
    }

    /// Targets bean method invocations rather than translets.
    pub fn bean_method(mut self, bean_pattern: Option<&str>, method_pattern: Option<&str>) -> Self {
        self.includes.push(RawPattern::Bean {
            bean: bean_pattern.map(str::to_string),
            method: method_pattern.map(str::to_string),
        });
        self
    }

    pub fn advice_bean(mut self, bean_id: impl Into<String>) -> Self {
        self.advice_bean_id = Some(bean_id.into());
        self
    }

    pub fn before(self, action: impl Into<ActionRule>) -> Self {
        self.advice(AdviceType::Before, action)
    }

    pub fn after(self, action: impl Into<ActionRule>) -> Self {
        self.advice(AdviceType::After, action)
    }

    pub fn around(self, action: impl Into<ActionRule>) -> Self {
        self.advice(AdviceType::Around, action)
    }

    pub fn finally(self, action: impl Into<ActionRule>) -> Self {
        self.advice(AdviceType::Finally, action)
    }

    pub fn advice(mut self, advice_type: AdviceType, action: impl Into<ActionRule>) -> Self {
        self.advices.push(AdviceRule {
            advice_type,
            action: action.into(),
        });
        self
    }

    pub fn exception(mut self, rule: ExceptionRule) -> Self {
        self.exception_rule = Some(rule);
        self
    }

    pub fn setting(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> ActivityResult<AspectRule> {
        if self.id.trim().is_empty() {
            return Err(ActivityError::IllegalRule("aspect id must not be empty".to_string()));
        }
        if self.advices.iter().any(|advice| advice.advice_type == AdviceType::Thrown) {
            return Err(ActivityError::IllegalRule(format!(
                "aspect '{}' declares thrown advice outside its exception rule",
                self.id
            )));
        }
        let uses_advice_bean = self.advices.iter().any(|advice| {
            matches!(&advice.action, ActionRule::BeanMethod(rule) if *rule.bean() == BeanRef::Advice)
        });
        if uses_advice_bean && self.advice_bean_id.is_none() {
            return Err(ActivityError::IllegalRule(format!(
                "aspect '{}' invokes its advice bean but declares none",
                self.id
            )));
        }

        let compile = |pattern: &str| NameMatcher::compile(self.pointcut_type, pattern);
        let mut pointcut = Pointcut::default();
        for raw in &self.includes {
            let pattern = match raw {
                RawPattern::Translet(pattern) => PointcutPattern::translet(compile(pattern)?),
                RawPattern::Bean { bean, method } => PointcutPattern::bean(
                    bean.as_deref().map(compile).transpose()?,
                    method.as_deref().map(compile).transpose()?,
                ),
            };
            pointcut.include(pattern);
        }
        for pattern in &self.excludes {
            pointcut.exclude(PointcutPattern::translet(compile(pattern)?));
        }

        Ok(AspectRule {
            id: self.id,
            order: self.order,
            isolated: self.isolated,
            scope: self.scope,
            methods: self.methods,
            headers: self.headers,
            pointcut,
            advice_bean_id: self.advice_bean_id,
            advices: self.advices.into_iter().map(Arc::new).collect(),
            exception_rule: self.exception_rule,
            settings: self.settings,
        })
    }
}
