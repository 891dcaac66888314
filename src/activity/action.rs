//! Action execution for contents, advice and exception handlers.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use super::core::Activity;
use super::result::{ActionResult, ProcessResult, ResultValue};
use crate::aspect::{AdviceRegistries, AdviceUnit};
use crate::bean::{Bean, Invocation};
use crate::error::{ActivityError, ActivityResult};
use crate::expression::{value_to_strings, TokenEvaluator};
use crate::rule::{
    ActionRule, AspectRule, BeanMethodActionRule, BeanRef, EchoActionRule, HeaderActionRule,
    IncludeActionRule, ItemRuleList, WhenRule,
};

/// What running one action produced.
pub(super) enum ActionOutcome<'r> {
    Value(Value),
    /// The process result of an included translet.
    Nested(ProcessResult),
    NoResult,
    /// The branch a choose action selected; its actions still have to run.
    Branch(&'r WhenRule),
}

impl Activity {
    /// Runs a content action and records its result in the content at `content_index`.
    ///
    /// A failure becomes the raised exception of the translet.
    pub(super) fn execute_content_action(&mut self, action: &ActionRule, content_index: usize) -> ActivityResult<()> {
        debug!(action = %action.describe(), "Executing action");
        let result = self
            .run_action(action, None)
            .and_then(|outcome| self.record_outcome(action, outcome, content_index));
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_terminated() => Err(e),
            Err(e @ ActivityError::ActionExecution { .. }) => Err(e),
            Err(e) => {
                let error = ActivityError::ActionExecution {
                    action: action.describe(),
                    source: Box::new(e),
                };
                self.translet_guarded()?
                    .set_raised_exception(error.clone());
                Err(error)
            }
        }
    }

    fn record_outcome(&mut self, action: &ActionRule, outcome: ActionOutcome<'_>, content_index: usize) -> ActivityResult<()> {
        let value = match outcome {
            ActionOutcome::NoResult => return Ok(()),
            ActionOutcome::Value(value) => ResultValue::Data(value),
            ActionOutcome::Nested(result) => ResultValue::Nested(result),
            ActionOutcome::Branch(when) => {
                debug!(case_no = when.case_no(), "Branch selected");
                for nested in when.actions() {
                    self.execute_content_action(nested, content_index)?;
                    if self.translet_ref()?.is_response_reserved() {
                        return Ok(());
                    }
                }
                if let Some(response) = when.reserved_response() {
                    self.translet_guarded()?.reserve_response(response.clone());
                }
                return Ok(());
            }
        };
        if action.is_hidden() {
            return Ok(());
        }
        self.translet_ref()?
            .shared_process_result()
            .borrow_mut()
            .push(content_index, ActionResult::new(action.id(), value));
        Ok(())
    }

    /// Runs one advice action and caches its result by aspect and advice type.
    ///
    /// `forced` advice (finally) only logs its failures.
    pub(super) fn execute_advice_unit(&mut self, unit: &AdviceUnit, forced: bool) -> ActivityResult<()> {
        let aspect = Arc::clone(unit.aspect());
        debug!(
            aspect_id = aspect.id(),
            advice = %unit.advice_type(),
            action = %unit.action().describe(),
            "Executing advice"
        );
        let result = self
            .run_action(unit.action(), Some(&aspect))
            .and_then(|outcome| self.outcome_value(outcome, Some(&aspect)));
        match result {
            Ok(value) => {
                self.translet_guarded()?
                    .put_advice_result(aspect.id(), unit.advice_type(), value);
                Ok(())
            }
            Err(e) if e.is_terminated() => Err(e),
            Err(e) if forced => {
                warn!(aspect_id = aspect.id(), error = %e, "Finally advice failed");
                Ok(())
            }
            Err(e) => {
                let error = ActivityError::AdviceExecution {
                    aspect_id: aspect.id().to_string(),
                    advice: unit.advice_type(),
                    source: Box::new(e),
                };
                self.translet_guarded()?
                    .set_raised_exception(error.clone());
                Err(error)
            }
        }
    }

    /// Flattens an outcome into a value, running a selected branch to completion.
    pub(super) fn outcome_value(
        &mut self,
        outcome: ActionOutcome<'_>,
        aspect: Option<&Arc<AspectRule>>,
    ) -> ActivityResult<Value> {
        Ok(match outcome {
            ActionOutcome::Value(value) => value,
            ActionOutcome::Nested(result) => result.to_value(),
            ActionOutcome::NoResult => Value::Null,
            ActionOutcome::Branch(when) => {
                let mut last = Value::Null;
                for action in when.actions() {
                    let outcome = self.run_action(action, aspect)?;
                    last = self.outcome_value(outcome, aspect)?;
                }
                if let Some(response) = when.reserved_response() {
                    self.translet_guarded()?.reserve_response(response.clone());
                }
                last
            }
        })
    }

    /// Executes a single action. `aspect` is set when it runs as advice.
    pub(super) fn run_action<'r>(
        &mut self,
        action: &'r ActionRule,
        aspect: Option<&Arc<AspectRule>>,
    ) -> ActivityResult<ActionOutcome<'r>> {
        match action {
            ActionRule::BeanMethod(rule) => self
                .invoke_bean_method(rule, aspect)
                .map(ActionOutcome::Value),
            ActionRule::Echo(rule) => self.echo(rule).map(ActionOutcome::Value),
            ActionRule::Headers(rule) => {
                self.set_headers(rule)?;
                Ok(ActionOutcome::NoResult)
            }
            ActionRule::Include(rule) => self.include(rule).map(ActionOutcome::Nested),
            ActionRule::Choose(rule) => {
                let translet = self.translet_ref()?;
                Ok(match rule.select(&TokenEvaluator::new(translet)) {
                    Some(when) => ActionOutcome::Branch(when),
                    None => ActionOutcome::NoResult,
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Bean methods
    // -------------------------------------------------------------------------

    fn invoke_bean_method(&mut self, rule: &BeanMethodActionRule, aspect: Option<&Arc<AspectRule>>) -> ActivityResult<Value> {
        let bean = self.resolve_bean(rule.bean(), aspect)?;
        let (arguments, properties) = {
            let translet = self.translet_ref()?;
            let evaluator = TokenEvaluator::new(translet);
            (
                evaluate_items(&evaluator, rule.arguments()),
                evaluate_items(&evaluator, rule.properties()),
            )
        };

        let translet = if rule.is_translet_required() {
            Some(self.translet_guarded()?)
        } else {
            None
        };
        let mut call = Invocation::new(arguments, properties, translet);
        trace!(method = rule.method(), "Invoking bean method");
        let value = bean.invoke(rule.method(), &mut call)?;

        self.register_pending_aspects()?;
        Ok(value)
    }

    fn resolve_bean(&mut self, bean: &BeanRef, aspect: Option<&Arc<AspectRule>>) -> ActivityResult<Arc<dyn Bean>> {
        let beans = self.context.beans();
        match bean {
            BeanRef::Id(id) => beans.get_bean(id, Some(&*self.request_scope)),
            BeanRef::Type(type_name) => beans.get_bean_by_type(type_name, Some(&*self.request_scope)),
            BeanRef::Advice => {
                let aspect = aspect.ok_or_else(|| {
                    ActivityError::IllegalRule("advice bean referenced outside of an aspect".to_string())
                })?;
                if let Some(bean) = self.translet_ref()?.advice_bean(aspect.id()) {
                    return Ok(bean);
                }
                let id = aspect.advice_bean_id().ok_or_else(|| {
                    ActivityError::IllegalRule(format!("aspect '{}' declares no advice bean", aspect.id()))
                })?;
                let bean = self
                    .context
                    .beans()
                    .get_bean(id, Some(&*self.request_scope))?;
                self.translet_guarded()?
                    .put_advice_bean(aspect.id(), Arc::clone(&bean));
                Ok(bean)
            }
        }
    }

    /// Folds aspects registered by the last bean method into the registries.
    ///
    /// An aspect whose before phase already ran gets its before advice now.
    fn register_pending_aspects(&mut self) -> ActivityResult<()> {
        let pending = self.translet_guarded()?.take_pending_aspects();
        for aspect in pending {
            let name = self.translet_ref()?.name().to_string();
            if self.registries.contains(aspect.id()) {
                debug!(aspect_id = aspect.id(), "Aspect already registered");
                continue;
            }
            if !AdviceRegistries::is_applicable(&aspect, &name) {
                debug!(aspect_id = aspect.id(), translet = %name, "Aspect does not apply");
                continue;
            }

            let aspect = Arc::new(aspect);
            self.registries.register(&aspect);
            info!(aspect_id = aspect.id(), scope = %aspect.scope(), "Aspect registered at run time");

            let scope = aspect.scope();
            if self.started_scopes[scope.index()] && self.is_acceptable(&aspect) {
                let units: Vec<AdviceUnit> = self
                    .registries
                    .scope(scope)
                    .before_advice()
                    .iter()
                    .filter(|unit| Arc::ptr_eq(unit.aspect(), &aspect))
                    .cloned()
                    .collect();
                for unit in &units {
                    self.execute_advice_unit(unit, false)?;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Echo, headers and include
    // -------------------------------------------------------------------------

    /// Evaluates the items into request attributes and returns them as a map.
    fn echo(&self, rule: &EchoActionRule) -> ActivityResult<Value> {
        let translet = self.translet_ref()?;
        let evaluator = TokenEvaluator::new(translet);
        let mut map = Map::new();
        for item in rule.items() {
            let value = evaluator.evaluate_item(item).unwrap_or(Value::Null);
            translet.set_attribute(item.name(), value.clone());
            map.insert(item.name().to_string(), value);
        }
        Ok(Value::Object(map))
    }

    fn set_headers(&self, rule: &HeaderActionRule) -> ActivityResult<()> {
        let translet = self.translet_ref()?;
        let Some(response) = translet.response_adapter() else {
            debug!("No response adapter; headers dropped");
            return Ok(());
        };
        let evaluator = TokenEvaluator::new(translet);
        for item in rule.headers() {
            let values = evaluator
                .evaluate_item(item)
                .as_ref()
                .and_then(value_to_strings)
                .unwrap_or_default();
            for value in values {
                response.set_header(item.name(), &value);
            }
        }
        Ok(())
    }

    /// Runs the included translet as a child activity and returns its results.
    fn include(&mut self, rule: &IncludeActionRule) -> ActivityResult<ProcessResult> {
        let translet = self.translet_ref()?;
        {
            let evaluator = TokenEvaluator::new(translet);
            for item in rule.parameters() {
                if let Some(values) = evaluator.evaluate_item(item).as_ref().and_then(value_to_strings) {
                    translet.set_parameter_values(item.name(), values);
                }
            }
            for item in rule.attributes() {
                if let Some(value) = evaluator.evaluate_item(item) {
                    translet.set_attribute(item.name(), value);
                }
            }
        }
        let method = rule.request_method().or_else(|| translet.method());

        info!(
            translet = rule.translet_name(),
            depth = self.depth + 1,
            "Including translet"
        );
        let mut child = self.child();
        child.execute(rule.translet_name(), method)
    }
}

fn evaluate_items(evaluator: &TokenEvaluator<'_>, items: &ItemRuleList) -> Vec<(String, Value)> {
    items
        .iter()
        .map(|item| {
            (
                item.name().to_string(),
                evaluator.evaluate_item(item).unwrap_or(Value::Null),
            )
        })
        .collect()
}

