//! The shared, immutable environment every activity runs in.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use super::response::{Transformer, ViewDispatcher};
use crate::aspect::AdviceRegistries;
use crate::bean::{BeanRegistry, BeanRule};
use crate::config::EngineConfig;
use crate::error::{ActivityError, ActivityResult};
use crate::message::{MessageSource, StaticMessageSource};
use crate::rule::{AspectRule, MethodType, TransletRule};

/// A translet rule selected for a request name, with its bound path variables.
#[derive(Debug, Clone)]
pub struct ResolvedTranslet {
    pub rule: Arc<TransletRule>,
    pub path_variables: Vec<(String, String)>,
}

#[derive(Default)]
struct TransletRegistry {
    exact: HashMap<String, Vec<Arc<TransletRule>>>,
    patterns: Vec<Arc<TransletRule>>,
}

impl TransletRegistry {
    fn register(&mut self, rule: Arc<TransletRule>) {
        if rule.has_path_variables() {
            self.patterns.push(rule);
        } else {
            self.exact
                .entry(rule.name().to_string())
                .or_default()
                .push(rule);
        }
    }

    /// Exact names win over patterns; within each, declaration order decides.
    fn resolve(&self, name: &str, method: Option<MethodType>) -> Option<ResolvedTranslet> {
        if let Some(rule) = self
            .exact
            .get(name)
            .and_then(|rules| rules.iter().find(|rule| rule.allows(method)))
        {
            return Some(ResolvedTranslet {
                rule: Arc::clone(rule),
                path_variables: Vec::new(),
            });
        }
        self.patterns
            .iter()
            .filter(|rule| rule.allows(method))
            .find_map(|rule| {
                rule.match_name(name).map(|path_variables| ResolvedTranslet {
                    rule: Arc::clone(rule),
                    path_variables,
                })
            })
    }

    fn len(&self) -> usize {
        self.exact.values().map(Vec::len).sum::<usize>() + self.patterns.len()
    }
}

/// Rules, beans and collaborators shared read-only by all activities.
pub struct ActivityContext {
    config: EngineConfig,
    translets: TransletRegistry,
    aspects: Vec<Arc<AspectRule>>,
    beans: BeanRegistry,
    messages: Arc<dyn MessageSource>,
    dispatchers: HashMap<String, Arc<dyn ViewDispatcher>>,
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl ActivityContext {
    pub fn builder() -> ActivityContextBuilder {
        ActivityContextBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn beans(&self) -> &BeanRegistry {
        &self.beans
    }

    /// Aspects in ascending order.
    pub fn aspects(&self) -> &[Arc<AspectRule>] {
        &self.aspects
    }

    pub fn messages(&self) -> &dyn MessageSource {
        self.messages.as_ref()
    }

    pub fn dispatcher(&self, name: &str) -> Option<&Arc<dyn ViewDispatcher>> {
        self.dispatchers.get(name)
    }

    pub fn transformer(&self, name: &str) -> Option<&Arc<dyn Transformer>> {
        self.transformers.get(name)
    }

    pub fn resolve(&self, name: &str, method: Option<MethodType>) -> ActivityResult<ResolvedTranslet> {
        self.translets
            .resolve(name, method)
            .ok_or_else(|| ActivityError::TransletNotFound {
                name: name.to_string(),
                method,
            })
    }

    /// Registries an activity works with for `rule` requested as `name`.
    pub fn advice_registries_for(&self, rule: &TransletRule, name: &str) -> AdviceRegistries {
        match rule.replicate_advice_registries() {
            Some(registries) => registries,
            None => AdviceRegistries::compute(&self.aspects, name),
        }
    }

    /// The activity currently bound to this thread, if any.
    pub fn current_activity() -> Option<CurrentActivity> {
        CURRENT_ACTIVITY.with(|current| current.borrow().clone())
    }
}

impl fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityContext")
            .field("config", &self.config)
            .field("translets", &self.translets.len())
            .field("aspects", &self.aspects.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ActivityContextBuilder {
    config: EngineConfig,
    translets: Vec<TransletRule>,
    aspects: Vec<AspectRule>,
    beans: Vec<BeanRule>,
    messages: Option<Arc<dyn MessageSource>>,
    dispatchers: HashMap<String, Arc<dyn ViewDispatcher>>,
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl ActivityContextBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn translet(mut self, rule: TransletRule) -> Self {
        self.translets.push(rule);
        self
    }

    pub fn aspect(mut self, rule: AspectRule) -> Self {
        self.aspects.push(rule);
        self
    }

    pub fn bean(mut self, rule: BeanRule) -> Self {
        self.beans.push(rule);
        self
    }

    pub fn messages(mut self, messages: Arc<dyn MessageSource>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn dispatcher(mut self, name: impl Into<String>, dispatcher: Arc<dyn ViewDispatcher>) -> Self {
        self.dispatchers.insert(name.into(), dispatcher);
        self
    }

    pub fn transformer(mut self, name: impl Into<String>, transformer: Arc<dyn Transformer>) -> Self {
        self.transformers.insert(name.into(), transformer);
        self
    }

    /// Validates the rules and precomputes advice registries for fixed-name translets.
    pub fn build(self) -> ActivityResult<Arc<ActivityContext>> {
        let mut aspects: Vec<Arc<AspectRule>> = Vec::with_capacity(self.aspects.len());
        for aspect in self.aspects {
            if aspects.iter().any(|existing| existing.id() == aspect.id()) {
                return Err(ActivityError::IllegalRule(format!(
                    "duplicate aspect id '{}'",
                    aspect.id()
                )));
            }
            aspects.push(Arc::new(aspect));
        }
        aspects.sort_by_key(|aspect| aspect.order());

        let mut beans = BeanRegistry::new();
        for rule in self.beans {
            beans.register(rule)?;
        }

        let mut translets = TransletRegistry::default();
        for mut rule in self.translets {
            rule.compile_name()?;
            if !rule.has_path_variables() {
                let registries = AdviceRegistries::compute(&aspects, rule.name());
                debug!(
                    translet = rule.name(),
                    aspects = ?registries.scope(crate::rule::JoinpointScope::Translet).aspect_ids(),
                    "Precomputed advice registries"
                );
                rule.set_advice_registries(registries);
            }
            translets.register(Arc::new(rule));
        }

        info!(
            translets = translets.len(),
            aspects = aspects.len(),
            "Activity context built"
        );

        Ok(Arc::new(ActivityContext {
            config: self.config,
            translets,
            aspects,
            beans,
            messages: self
                .messages
                .unwrap_or_else(|| Arc::new(StaticMessageSource::new())),
            dispatchers: self.dispatchers,
            transformers: self.transformers,
        }))
    }
}

// =============================================================================
// CURRENT ACTIVITY BINDING
// =============================================================================

/// Identity of the activity bound to the current thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentActivity {
    pub activity_id: u64,
    pub translet_name: String,
    pub method: Option<MethodType>,
    /// Include nesting level; zero for a top-level activity.
    pub depth: usize,
}

thread_local! {
    static CURRENT_ACTIVITY: RefCell<Option<CurrentActivity>> = const { RefCell::new(None) };
}

/// Binds an activity to the thread and restores the previous binding on drop.
pub(crate) struct CurrentActivityGuard {
    previous: Option<CurrentActivity>,
}

impl CurrentActivityGuard {
    pub(crate) fn bind(current: CurrentActivity) -> Self {
        let previous = CURRENT_ACTIVITY.with(|slot| slot.replace(Some(current)));
        Self { previous }
    }

    /// Updates the binding in place, keeping the saved previous binding.
    pub(crate) fn rebind(&self, current: CurrentActivity) {
        CURRENT_ACTIVITY.with(|slot| {
            slot.replace(Some(current));
        });
    }
}

impl Drop for CurrentActivityGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_ACTIVITY.with(|slot| {
            slot.replace(previous);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(id: u64, name: &str) -> CurrentActivity {
        CurrentActivity {
            activity_id: id,
            translet_name: name.to_string(),
            method: None,
            depth: 0,
        }
    }

    #[test]
    fn test_guard_restores_previous_binding() {
        assert!(ActivityContext::current_activity().is_none());
        let outer = CurrentActivityGuard::bind(current(1, "/outer"));
        {
            let _inner = CurrentActivityGuard::bind(current(2, "/inner"));
            assert_eq!(ActivityContext::current_activity().map(|c| c.activity_id), Some(2));
        }
        assert_eq!(ActivityContext::current_activity().map(|c| c.activity_id), Some(1));
        outer.rebind(current(1, "/forwarded"));
        assert_eq!(
            ActivityContext::current_activity().map(|c| c.translet_name),
            Some("/forwarded".to_string())
        );
        drop(outer);
        assert!(ActivityContext::current_activity().is_none());
    }

    #[test]
    fn test_exact_names_win_over_patterns() {
        let context = ActivityContext::builder()
            .translet(TransletRule::new("/users/${id}"))
            .translet(TransletRule::new("/users/me"))
            .build()
            .expect("valid context");

        let exact = context.resolve("/users/me", None).expect("resolved");
        assert_eq!(exact.rule.name(), "/users/me");
        assert!(exact.path_variables.is_empty());

        let pattern = context.resolve("/users/9", None).expect("resolved");
        assert_eq!(pattern.rule.name(), "/users/${id}");
        assert_eq!(pattern.path_variables, vec![("id".to_string(), "9".to_string())]);

        assert!(matches!(
            context.resolve("/nowhere", Some(MethodType::Get)),
            Err(ActivityError::TransletNotFound { .. })
        ));
    }

    #[test]
    fn test_precomputed_registries_match_fresh_computation() {
        let aspect = |id: &str, order: i32, pattern: &str| {
            AspectRule::builder(id)
                .order(order)
                .include(pattern)
                .before(crate::rule::BeanMethodActionRule::new("log", id))
                .finally(crate::rule::BeanMethodActionRule::new("log", id))
                .build()
                .expect("valid aspect")
        };
        let context = ActivityContext::builder()
            .aspect(aspect("late", 5, "/shop/**"))
            .aspect(aspect("early", 1, "/shop/**"))
            .aspect(aspect("other", 2, "/admin/**"))
            .translet(TransletRule::new("/shop/cart"))
            .build()
            .expect("valid context");

        let resolved = context.resolve("/shop/cart", None).expect("resolved");
        let cached = resolved
            .rule
            .advice_registries()
            .expect("fixed names are precomputed");
        let fresh = AdviceRegistries::compute(context.aspects(), "/shop/cart");
        assert_eq!(**cached, fresh);
        assert_eq!(context.advice_registries_for(&resolved.rule, "/shop/cart"), fresh);
        assert!(!fresh.contains("other"));
    }

    #[test]
    fn test_duplicate_aspect_ids_are_rejected() {
        let aspect = || AspectRule::builder("dup").build().expect("valid aspect");
        let result = ActivityContext::builder()
            .aspect(aspect())
            .aspect(aspect())
            .build();
        assert!(matches!(result, Err(ActivityError::IllegalRule(_))));
    }
}
