use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{Bean, BeanRule, BeanScope};
use crate::error::{ActivityError, ActivityResult};

/// Lazily created singleton slot.
///
/// Each slot has its own lock, so creating one singleton never blocks lookups of another.
#[derive(Default)]
struct SingletonSlot {
    instance: RwLock<Option<Arc<dyn Bean>>>,
}

impl SingletonSlot {
    fn get_or_create(&self, rule: &BeanRule) -> ActivityResult<Arc<dyn Bean>> {
        if let Some(bean) = self.instance.read().as_ref() {
            return Ok(Arc::clone(bean));
        }
        let mut slot = self.instance.write();
        if let Some(bean) = slot.as_ref() {
            return Ok(Arc::clone(bean));
        }
        let bean = rule.create()?;
        debug!(bean_id = rule.id(), "Created singleton bean");
        *slot = Some(Arc::clone(&bean));
        Ok(bean)
    }

    fn take(&self) -> Option<Arc<dyn Bean>> {
        self.instance.write().take()
    }
}

/// Bean instances living as long as one top-level activity.
///
/// Forwards and includes share their parent's scope; the owner destroys it once.
#[derive(Default)]
pub struct RequestScope {
    instances: RefCell<Vec<(String, Arc<dyn Bean>)>>,
    destroyed: Cell<bool>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, rule: &BeanRule) -> ActivityResult<Arc<dyn Bean>> {
        if self.destroyed.get() {
            return Err(ActivityError::IllegalRule(format!(
                "request scope already destroyed; cannot provide bean '{}'",
                rule.id()
            )));
        }
        if let Some((_, bean)) = self.instances.borrow().iter().find(|(id, _)| id == rule.id()) {
            return Ok(Arc::clone(bean));
        }
        let bean = rule.create()?;
        self.instances
            .borrow_mut()
            .push((rule.id().to_string(), Arc::clone(&bean)));
        debug!(bean_id = rule.id(), "Created request-scoped bean");
        Ok(bean)
    }

    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Destroys every instance in reverse creation order. Returns `false` if
    /// the scope was already destroyed.
    pub fn destroy(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        let instances = std::mem::take(&mut *self.instances.borrow_mut());
        for (id, bean) in instances.into_iter().rev() {
            debug!(bean_id = %id, "Destroying request-scoped bean");
            bean.destroy();
        }
        true
    }
}

/// All bean rules of a context plus the singleton instances created from them.
#[derive(Default)]
pub struct BeanRegistry {
    rules: HashMap<String, BeanRule>,
    singletons: HashMap<String, SingletonSlot>,
    by_type: HashMap<String, Vec<String>>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: BeanRule) -> ActivityResult<()> {
        if self.rules.contains_key(rule.id()) {
            return Err(ActivityError::IllegalRule(format!(
                "duplicate bean id '{}'",
                rule.id()
            )));
        }
        if let Some(type_name) = rule.get_type_name() {
            self.by_type
                .entry(type_name.to_string())
                .or_default()
                .push(rule.id().to_string());
        }
        if rule.scope() == BeanScope::Singleton {
            self.singletons
                .insert(rule.id().to_string(), SingletonSlot::default());
        }
        self.rules.insert(rule.id().to_string(), rule);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    pub fn rule(&self, id: &str) -> Option<&BeanRule> {
        self.rules.get(id)
    }

    /// Looks a bean up by id. Request-scoped beans need the activity's scope.
    pub fn get_bean(&self, id: &str, scope: Option<&RequestScope>) -> ActivityResult<Arc<dyn Bean>> {
        let rule = self
            .rules
            .get(id)
            .ok_or_else(|| ActivityError::BeanNotFound(id.to_string()))?;
        match rule.scope() {
            BeanScope::Prototype => rule.create(),
            BeanScope::Singleton => self
                .singletons
                .get(id)
                .ok_or_else(|| ActivityError::BeanNotFound(id.to_string()))?
                .get_or_create(rule),
            BeanScope::Request => scope
                .ok_or_else(|| {
                    ActivityError::IllegalRule(format!(
                        "request-scoped bean '{id}' requested outside of an activity"
                    ))
                })?
                .get_or_create(rule),
        }
    }

    pub fn get_bean_by_type(
        &self,
        type_name: &str,
        scope: Option<&RequestScope>,
    ) -> ActivityResult<Arc<dyn Bean>> {
        match self.by_type.get(type_name).map(Vec::as_slice) {
            Some([id]) => self.get_bean(id, scope),
            Some(ids) if ids.len() > 1 => Err(ActivityError::IllegalRule(format!(
                "bean type '{type_name}' is ambiguous: {}",
                ids.join(", ")
            ))),
            _ => Err(ActivityError::BeanNotFound(format!("<{type_name}>"))),
        }
    }

    /// Destroys every created singleton.
    pub fn destroy_singletons(&self) {
        for (id, slot) in &self.singletons {
            if let Some(bean) = slot.take() {
                debug!(bean_id = %id, "Destroying singleton bean");
                bean.destroy();
            }
        }
    }
}

impl Drop for BeanRegistry {
    fn drop(&mut self) {
        self.destroy_singletons();
    }
}
