use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::rule::{ActionRule, AdviceRule, AdviceType, AspectRule, ExceptionRule, JoinpointScope};

/// One advice of one aspect, as registered for a translet.
#[derive(Debug, Clone)]
pub struct AdviceUnit {
    aspect: Arc<AspectRule>,
    advice: Arc<AdviceRule>,
}

impl AdviceUnit {
    pub fn aspect(&self) -> &Arc<AspectRule> {
        &self.aspect
    }

    pub fn aspect_id(&self) -> &str {
        self.aspect.id()
    }

    pub fn advice_type(&self) -> AdviceType {
        self.advice.advice_type()
    }

    pub fn action(&self) -> &ActionRule {
        self.advice.action()
    }
}

impl PartialEq for AdviceUnit {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.aspect, &other.aspect) && Arc::ptr_eq(&self.advice, &other.advice)
    }
}

/// Ordered advice of one join-point scope.
///
/// Before advice runs by ascending aspect order; after and finally advice run in
/// the reverse order, so the first aspect in is the last one out. Equal orders keep
/// registration order. Cloning shares every rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AspectAdviceRuleRegistry {
    before: Vec<AdviceUnit>,
    after: Vec<AdviceUnit>,
    finally: Vec<AdviceUnit>,
    exception_aspects: Vec<Arc<AspectRule>>,
    settings: BTreeMap<String, String>,
    aspect_ids: Vec<String>,
}

impl AspectAdviceRuleRegistry {
    pub fn register(&mut self, aspect: &Arc<AspectRule>) {
        if self.contains(aspect.id()) {
            return;
        }
        let order = aspect.order();
        for advice in aspect.advices() {
            let unit = AdviceUnit {
                aspect: Arc::clone(aspect),
                advice: Arc::clone(advice),
            };
            match advice.advice_type() {
                AdviceType::Before => insert_ascending(&mut self.before, unit, order),
                AdviceType::After => insert_descending(&mut self.after, unit, order),
                AdviceType::Around => {
                    insert_ascending(&mut self.before, unit.clone(), order);
                    insert_descending(&mut self.after, unit, order);
                }
                AdviceType::Finally => insert_descending(&mut self.finally, unit, order),
                AdviceType::Thrown => {}
            }
        }
        if aspect.exception_rule().is_some() {
            let pos = self
                .exception_aspects
                .iter()
                .position(|existing| existing.order() > order)
                .unwrap_or(self.exception_aspects.len());
            self.exception_aspects.insert(pos, Arc::clone(aspect));
        }
        for (name, value) in aspect.settings() {
            self.settings
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        self.aspect_ids.push(aspect.id().to_string());
        trace!(aspect_id = aspect.id(), scope = %aspect.scope(), "Registered aspect");
    }

    pub fn contains(&self, aspect_id: &str) -> bool {
        self.aspect_ids.iter().any(|id| id == aspect_id)
    }

    pub fn is_empty(&self) -> bool {
        self.aspect_ids.is_empty()
    }

    pub fn aspect_ids(&self) -> &[String] {
        &self.aspect_ids
    }

    pub fn before_advice(&self) -> &[AdviceUnit] {
        &self.before
    }

    pub fn after_advice(&self) -> &[AdviceUnit] {
        &self.after
    }

    pub fn finally_advice(&self) -> &[AdviceUnit] {
        &self.finally
    }

    pub fn exception_rules(&self) -> impl Iterator<Item = (&Arc<AspectRule>, &ExceptionRule)> {
        self.exception_aspects
            .iter()
            .filter_map(|aspect| aspect.exception_rule().map(|rule| (aspect, rule)))
    }

    /// The value declared by the lowest-ordered aspect that sets `name`.
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }
}

fn insert_ascending(list: &mut Vec<AdviceUnit>, unit: AdviceUnit, order: i32) {
    let pos = list
        .iter()
        .position(|existing| existing.aspect.order() > order)
        .unwrap_or(list.len());
    list.insert(pos, unit);
}

fn insert_descending(list: &mut Vec<AdviceUnit>, unit: AdviceUnit, order: i32) {
    let pos = list
        .iter()
        .position(|existing| existing.aspect.order() <= order)
        .unwrap_or(list.len());
    list.insert(pos, unit);
}

/// Advice registries of one translet, one per join-point scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviceRegistries {
    scopes: [AspectAdviceRuleRegistry; 4],
}

impl AdviceRegistries {
    /// Registers every aspect applicable to `translet_name`.
    ///
    /// `aspects` must already be in ascending order.
    pub fn compute<'a>(
        aspects: impl IntoIterator<Item = &'a Arc<AspectRule>>,
        translet_name: &str,
    ) -> Self {
        let mut registries = Self::default();
        for aspect in aspects {
            if Self::is_applicable(aspect, translet_name) {
                registries.register(aspect);
            }
        }
        registries
    }

    /// Applicability by pointcut only; method and header filters apply at execution.
    pub fn is_applicable(aspect: &AspectRule, translet_name: &str) -> bool {
        !aspect.is_isolated()
            && !aspect.pointcut().is_bean_relevant()
            && aspect.pointcut().matches_translet(translet_name)
    }

    pub fn register(&mut self, aspect: &Arc<AspectRule>) {
        self.scopes[aspect.scope().index()].register(aspect);
    }

    pub fn contains(&self, aspect_id: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(aspect_id))
    }

    pub fn scope(&self, scope: JoinpointScope) -> &AspectAdviceRuleRegistry {
        &self.scopes[scope.index()]
    }

    /// Settings of the translet scope.
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.scope(JoinpointScope::Translet).setting(name)
    }

    /// Exception rules of every scope, translet scope first.
    pub fn exception_rules(&self) -> impl Iterator<Item = (&Arc<AspectRule>, &ExceptionRule)> {
        self.scopes.iter().flat_map(|scope| scope.exception_rules())
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.iter().all(AspectAdviceRuleRegistry::is_empty)
    }

    /// A copy for one activity: new lists, shared rules.
    pub fn replicate(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{BeanMethodActionRule, ExceptionThrownRule};

    fn aspect(id: &str, order: i32) -> Arc<AspectRule> {
        Arc::new(
            AspectRule::builder(id)
                .order(order)
                .include("/shop/**")
                .before(BeanMethodActionRule::new("log", "before").id(format!("{id}-before")))
                .after(BeanMethodActionRule::new("log", "after").id(format!("{id}-after")))
                .finally(BeanMethodActionRule::new("log", "finally"))
                .build()
                .expect("valid aspect"),
        )
    }

    fn ids(units: &[AdviceUnit]) -> Vec<&str> {
        units.iter().map(AdviceUnit::aspect_id).collect()
    }

    #[test]
    fn test_before_ascends_and_after_descends() {
        let aspects = [aspect("a", 1), aspect("b", 2), aspect("c", 3)];
        let registries = AdviceRegistries::compute(&aspects, "/shop/cart");
        let translet = registries.scope(JoinpointScope::Translet);

        assert_eq!(ids(translet.before_advice()), vec!["a", "b", "c"]);
        assert_eq!(ids(translet.after_advice()), vec!["c", "b", "a"]);
        assert_eq!(ids(translet.finally_advice()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_late_registration_respects_order() {
        let mut registries = AdviceRegistries::compute(&[aspect("a", 1), aspect("c", 3)], "/shop/x");
        registries.register(&aspect("b", 2));
        let translet = registries.scope(JoinpointScope::Translet);

        assert_eq!(ids(translet.before_advice()), vec!["a", "b", "c"]);
        assert_eq!(ids(translet.after_advice()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_isolated_and_unmatched_aspects_are_skipped() {
        let isolated = Arc::new(
            AspectRule::builder("iso")
                .isolated()
                .before(BeanMethodActionRule::new("log", "x"))
                .build()
                .expect("valid aspect"),
        );
        let registries = AdviceRegistries::compute(&[isolated, aspect("a", 1)], "/admin/users");
        assert!(registries.is_empty());
    }

    #[test]
    fn test_replicate_shares_rules_and_settings_prefer_lower_order() {
        let low = Arc::new(
            AspectRule::builder("low")
                .order(1)
                .setting("characterEncoding", "UTF-8")
                .exception(ExceptionRule::new().thrown(ExceptionThrownRule::new()))
                .build()
                .expect("valid aspect"),
        );
        let high = Arc::new(
            AspectRule::builder("high")
                .order(5)
                .setting("characterEncoding", "EUC-KR")
                .build()
                .expect("valid aspect"),
        );
        let registries = AdviceRegistries::compute(&[low, high], "/any");

        assert_eq!(registries.setting("characterEncoding"), Some("UTF-8"));
        assert_eq!(registries.exception_rules().count(), 1);

        let copy = registries.replicate();
        assert_eq!(copy, registries);
    }
}
