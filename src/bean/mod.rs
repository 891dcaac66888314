//! # Beans
//!
//! Beans are the application objects bean-method actions invoke.
//!
//! Methods are resolved by name at run time, so a bean is anything implementing
//! [`Bean::invoke`]. [`FnBean`] builds one from closures.
//!
//! ## Scopes
//!
//! - **Singleton**: created once per [`BeanRegistry`], on first use.
//! - **Prototype**: created on every lookup.
//! - **Request**: created once per top-level activity (shared with its
//!   includes and forwards) and destroyed when that activity completes.

mod registry;

pub use registry::{BeanRegistry, RequestScope};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::activity::Translet;
use crate::error::{ActivityError, ActivityResult, Failure};

/// Arguments of one bean method call.
pub struct Invocation<'t> {
    arguments: Vec<(String, Value)>,
    properties: Vec<(String, Value)>,
    translet: Option<&'t mut Translet>,
}

impl<'t> Invocation<'t> {
    pub fn new(
        arguments: Vec<(String, Value)>,
        properties: Vec<(String, Value)>,
        translet: Option<&'t mut Translet>,
    ) -> Self {
        Self {
            arguments,
            properties,
            translet,
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        lookup(&self.arguments, name)
    }

    pub fn argument_at(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index).map(|(_, value)| value)
    }

    pub fn arguments(&self) -> &[(String, Value)] {
        &self.arguments
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        lookup(&self.properties, name)
    }

    pub fn has_translet(&self) -> bool {
        self.translet.is_some()
    }

    /// The current translet, available when the action declared it requires one.
    pub fn translet(&mut self) -> ActivityResult<&mut Translet> {
        self.translet.as_deref_mut().ok_or_else(|| {
            ActivityError::IllegalRule(
                "bean method needs the translet but its action does not pass it".to_string(),
            )
        })
    }
}

fn lookup<'a>(items: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    items
        .iter()
        .find(|(item, _)| item == name)
        .map(|(_, value)| value)
}

/// An application object whose methods actions can invoke.
pub trait Bean: Send + Sync + 'static {
    fn invoke(&self, method: &str, call: &mut Invocation<'_>) -> ActivityResult<Value>;

    /// Called once when the bean's scope ends.
    fn destroy(&self) {}
}

type MethodFn = dyn Fn(&mut Invocation<'_>) -> ActivityResult<Value> + Send + Sync;

/// A bean assembled from closures, one per method name.
#[derive(Default)]
pub struct FnBean {
    methods: HashMap<String, Box<MethodFn>>,
    on_destroy: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FnBean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> ActivityResult<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }

    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_destroy = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for FnBean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("FnBean").field("methods", &methods).finish()
    }
}

impl Bean for FnBean {
    fn invoke(&self, method: &str, call: &mut Invocation<'_>) -> ActivityResult<Value> {
        let handler = self.methods.get(method).ok_or_else(|| {
            ActivityError::raise(
                Failure::new("NoSuchMethodException", format!("no bean method named '{method}'"))
                    .extends("ReflectiveOperationException"),
            )
        })?;
        handler(call)
    }

    fn destroy(&self) {
        if let Some(hook) = &self.on_destroy {
            hook();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeanScope {
    #[default]
    Singleton,
    Prototype,
    Request,
}

pub type BeanFactory = Arc<dyn Fn() -> ActivityResult<Arc<dyn Bean>> + Send + Sync>;

/// How to create a bean and how long an instance lives.
#[derive(Clone)]
pub struct BeanRule {
    id: String,
    type_name: Option<String>,
    scope: BeanScope,
    factory: BeanFactory,
}

impl BeanRule {
    pub fn new<F>(id: impl Into<String>, scope: BeanScope, factory: F) -> Self
    where
        F: Fn() -> ActivityResult<Arc<dyn Bean>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            type_name: None,
            scope,
            factory: Arc::new(factory),
        }
    }

    /// A rule whose factory cannot fail.
    pub fn of<B, F>(id: impl Into<String>, scope: BeanScope, factory: F) -> Self
    where
        B: Bean,
        F: Fn() -> B + Send + Sync + 'static,
    {
        Self::new(id, scope, move || Ok(Arc::new(factory()) as Arc<dyn Bean>))
    }

    /// A singleton wrapping an already constructed bean.
    pub fn instance(id: impl Into<String>, bean: Arc<dyn Bean>) -> Self {
        Self::new(id, BeanScope::Singleton, move || Ok(Arc::clone(&bean)))
    }

    /// Makes the bean resolvable by type name.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get_type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn scope(&self) -> BeanScope {
        self.scope
    }

    pub(crate) fn create(&self) -> ActivityResult<Arc<dyn Bean>> {
        (self.factory)()
    }
}

impl fmt::Debug for BeanRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanRule")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
