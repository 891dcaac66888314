//! # The Activity State Machine
//!
//! An [`Activity`] drives one request through its translet:
//!
//! ```text
//! Created -> Prepared -> BeforeAdvice -> Content -> Responding -> AfterAdvice
//!         -> FinallyAdvice -> [ExceptionRemap -> Responding] -> Finished
//! ```
//!
//! ## Forwarding
//!
//! A forward response does not commit anything. The activity prepares the
//! target translet in place (keeping the process result and any raised
//! exception) and runs another cycle. Cycles are driven by a loop, and the
//! number of hops is capped by [`EngineConfig::max_forward_hops`].
//!
//! ## Inclusion
//!
//! An include action runs a child activity that shares the adapters and the
//! request scope but owns a fresh process result. The child never commits a
//! response; its result is nested under the include action's id.
//!
//! [`EngineConfig::max_forward_hops`]: crate::config::EngineConfig::max_forward_hops

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Span};

use super::context::{ActivityContext, CurrentActivity, CurrentActivityGuard, ResolvedTranslet};
use super::response;
use super::result::{ProcessResult, SharedProcessResult};
use super::translet::{Translet, TransletParts};
use crate::adapter::{RequestAdapter, ResponseAdapter, SessionAdapter};
use crate::aspect::AdviceRegistries;
use crate::bean::RequestScope;
use crate::error::{ActivityError, ActivityResult};
use crate::expression::{value_to_strings, TokenEvaluator};
use crate::rule::{
    AdviceType, AspectRule, ExceptionThrownRule, ForwardRule, JoinpointScope, MethodType, Response,
    TransletRule,
};

/// Setting an aspect can declare to choose the request and response encoding.
pub const CHARACTER_ENCODING_SETTING: &str = "characterEncoding";

static NEXT_ACTIVITY_ID: AtomicU64 = AtomicU64::new(1);

/// Where an activity is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityState {
    Created,
    Prepared,
    BeforeAdvice,
    Content,
    AfterAdvice,
    Responding,
    FinallyAdvice,
    ExceptionRemap,
    Finished,
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Prepared => "prepared",
            Self::BeforeAdvice => "before-advice",
            Self::Content => "content",
            Self::AfterAdvice => "after-advice",
            Self::Responding => "responding",
            Self::FinallyAdvice => "finally-advice",
            Self::ExceptionRemap => "exception-remap",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AdvicePhase {
    Before,
    After,
    Finally,
}

/// How one translet cycle ended.
enum Cycle {
    Completed,
    Forward(ForwardRule),
}

/// What an exception handler did with the raised exception.
enum Remap {
    Unhandled,
    Responded,
    Forward(ForwardRule),
}

/// One request lifecycle, including every forward it follows.
///
/// Activities are single-threaded: the process result and the request scope
/// are shared with includes through `Rc`, so an activity stays on the thread
/// that created it.
pub struct Activity {
    pub(super) id: u64,
    pub(super) context: Arc<ActivityContext>,
    pub(super) request: Arc<dyn RequestAdapter>,
    pub(super) response: Option<Arc<dyn ResponseAdapter>>,
    pub(super) session: Option<Arc<dyn SessionAdapter>>,
    pub(super) state: ActivityState,
    pub(super) translet: Option<Translet>,
    pub(super) registries: AdviceRegistries,
    pub(super) request_scope: Rc<RequestScope>,
    owns_request_scope: bool,
    included: bool,
    pub(super) depth: usize,
    parent_encoding: Option<String>,
    committed: bool,
    absorbs_exception: bool,
    forward_hops: usize,
    pub(super) started_scopes: [bool; 4],
    guard: Option<CurrentActivityGuard>,
    span: Span,
}

impl Activity {
    pub fn new(context: Arc<ActivityContext>, request: Arc<dyn RequestAdapter>) -> Self {
        Self::create(context, request, Rc::new(RequestScope::new()), 0)
    }

    fn create(
        context: Arc<ActivityContext>,
        request: Arc<dyn RequestAdapter>,
        request_scope: Rc<RequestScope>,
        depth: usize,
    ) -> Self {
        let id = NEXT_ACTIVITY_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            context,
            request,
            response: None,
            session: None,
            state: ActivityState::Created,
            translet: None,
            registries: AdviceRegistries::default(),
            request_scope,
            owns_request_scope: depth == 0,
            included: depth > 0,
            depth,
            parent_encoding: None,
            committed: false,
            absorbs_exception: false,
            forward_hops: 0,
            started_scopes: [false; 4],
            guard: None,
            span: info_span!("activity", id, depth, translet = tracing::field::Empty),
        }
    }

    pub fn with_response(mut self, response: Arc<dyn ResponseAdapter>) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn SessionAdapter>) -> Self {
        self.session = Some(session);
        self
    }

    /// A child activity for an include action of this one.
    pub(super) fn child(&self) -> Self {
        let mut child = Self::create(
            Arc::clone(&self.context),
            Arc::clone(&self.request),
            Rc::clone(&self.request_scope),
            self.depth + 1,
        );
        child.response = self.response.clone();
        child.session = self.session.clone();
        child.parent_encoding = self
            .translet
            .as_ref()
            .and_then(Translet::request_encoding)
            .map(str::to_string);
        child
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn context(&self) -> &Arc<ActivityContext> {
        &self.context
    }

    pub fn translet(&self) -> Option<&Translet> {
        self.translet.as_ref()
    }

    pub fn translet_mut(&mut self) -> Option<&mut Translet> {
        self.translet.as_mut()
    }

    /// Advice registries of the current translet, including aspects registered at run time.
    pub fn advice_registries(&self) -> &AdviceRegistries {
        &self.registries
    }

    pub fn request_scope(&self) -> &RequestScope {
        &self.request_scope
    }

    pub fn is_included(&self) -> bool {
        self.included
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn forward_hops(&self) -> usize {
        self.forward_hops
    }

    /// A copy of the results accumulated so far.
    pub fn process_result(&self) -> Option<ProcessResult> {
        self.translet
            .as_ref()
            .map(|translet| translet.shared_process_result().snapshot())
    }

    pub(super) fn translet_ref(&self) -> ActivityResult<&Translet> {
        self.translet
            .as_ref()
            .ok_or_else(|| ActivityError::IllegalRule("activity has not been prepared".to_string()))
    }

    pub(super) fn translet_guarded(&mut self) -> ActivityResult<&mut Translet> {
        self.translet
            .as_mut()
            .ok_or_else(|| ActivityError::IllegalRule("activity has not been prepared".to_string()))
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Prepare, perform and finish `name` in one call.
    ///
    /// The activity is always finished, whatever the outcome.
    pub fn execute(&mut self, name: &str, method: Option<MethodType>) -> ActivityResult<ProcessResult> {
        let mut result = self.prepare(name, method);
        if result.is_ok() {
            result = self.perform();
        }
        let result = result.map(|()| self.process_result().unwrap_or_default());
        self.finish();
        result
    }

    /// Resolves `name` and readies its translet: path variables, encodings and
    /// the declared request items.
    ///
    /// Routing failures surface as [`ActivityError::TransletNotFound`]; other
    /// failures are wrapped in [`ActivityError::Prepare`], unless an exception
    /// rule handles them, in which case they are left for [`perform`](Self::perform).
    pub fn prepare(&mut self, name: &str, method: Option<MethodType>) -> ActivityResult<()> {
        let _entered = self.span.clone().entered();
        if self.state != ActivityState::Created {
            return Err(ActivityError::Prepare(Box::new(ActivityError::IllegalRule(format!(
                "activity is already {}",
                self.state
            )))));
        }
        self.span.record("translet", name);
        self.prepare_translet(name, method)
    }

    /// Runs the prepared translet and every forward it leads to.
    ///
    /// Exceptions handled by an exception rule are absorbed; anything else
    /// surfaces as its root cause.
    pub fn perform(&mut self) -> ActivityResult<()> {
        let _entered = self.span.clone().entered();
        if self.state != ActivityState::Prepared {
            return Err(ActivityError::Perform(Box::new(ActivityError::IllegalRule(format!(
                "activity is {} and cannot be performed",
                self.state
            )))));
        }

        let result = self.perform_forwarding();
        self.destroy_request_scope();

        match &result {
            Ok(()) => debug!(hops = self.forward_hops, "Activity performed"),
            Err(e) if e.is_terminated() => info!(reason = %e, "Activity terminated"),
            Err(e) => error!(error = %e, "Activity failed"),
        }
        result
    }

    /// Flushes the response of a top-level activity and releases the thread binding.
    pub fn finish(&mut self) {
        let _entered = self.span.clone().entered();
        if !self.included {
            if let Some(response) = &self.response {
                if let Err(e) = response.flush() {
                    warn!(error = %e, "Failed to flush response");
                }
            }
        }
        self.destroy_request_scope();
        self.guard = None;
        self.state = ActivityState::Finished;
    }

    fn destroy_request_scope(&self) {
        if self.owns_request_scope && self.request_scope.destroy() {
            debug!("Request scope destroyed");
        }
    }

    // =========================================================================
    // Preparation
    // =========================================================================

    fn prepare_translet(&mut self, name: &str, method: Option<MethodType>) -> ActivityResult<()> {
        let resolved = self.context.resolve(name, method)?;

        let (process_result, raised, parent_encoding) = match self.translet.take() {
            Some(mut previous) => (
                previous.shared_process_result().clone(),
                previous.take_raised_exception(),
                previous.request_encoding().map(str::to_string),
            ),
            None => (SharedProcessResult::new(None), None, self.parent_encoding.clone()),
        };

        self.translet = Some(Translet::new(TransletParts {
            name: name.to_string(),
            method,
            rule: Arc::clone(&resolved.rule),
            context: Arc::clone(&self.context),
            request: Arc::clone(&self.request),
            response: self.response.clone(),
            session: self.session.clone(),
            process_result,
            raised,
        }));
        self.bind_current(name, method);

        self.registries = self.context.advice_registries_for(&resolved.rule, name);
        self.started_scopes = [false; 4];
        self.committed = false;
        self.absorbs_exception = false;

        match self.prepare_request(&resolved, parent_encoding) {
            Ok(()) => {}
            Err(e) if e.is_terminated() => return Err(e),
            Err(e) if is_validation_error(&e) && self.has_exception_handler(&e) => {
                info!(error = %e, "Request rejected; deferring to exception handling");
                self.translet_guarded()?.set_raised_exception(e);
            }
            Err(e) => return Err(ActivityError::Prepare(Box::new(e))),
        }

        self.state = ActivityState::Prepared;
        debug!(translet = name, rule = resolved.rule.name(), "Activity prepared");
        Ok(())
    }

    fn bind_current(&mut self, name: &str, method: Option<MethodType>) {
        let current = CurrentActivity {
            activity_id: self.id,
            translet_name: name.to_string(),
            method,
            depth: self.depth,
        };
        match &self.guard {
            Some(guard) => guard.rebind(current),
            None => self.guard = Some(CurrentActivityGuard::bind(current)),
        }
    }

    fn prepare_request(&mut self, resolved: &ResolvedTranslet, parent_encoding: Option<String>) -> ActivityResult<()> {
        let settings = self.registries.scope(JoinpointScope::Translet).settings().clone();
        let setting_encoding = settings.get(CHARACTER_ENCODING_SETTING).cloned();

        for (name, value) in &resolved.path_variables {
            self.request
                .set_attribute(name, serde_json::Value::String(value.clone()));
        }

        let rule = Arc::clone(&resolved.rule);
        let request_encoding = rule
            .request_rule()
            .get_encoding()
            .map(str::to_string)
            .or_else(|| setting_encoding.clone())
            .or(parent_encoding)
            .or_else(|| self.request.encoding())
            .unwrap_or_else(|| self.context.config().default_encoding.clone());
        let response_encoding = rule
            .get_response_rule()
            .get_encoding()
            .map(str::to_string)
            .or(setting_encoding)
            .unwrap_or_else(|| request_encoding.clone());

        self.request.set_encoding(&request_encoding);
        if let Some(response) = &self.response {
            response.set_encoding(&response_encoding);
        }

        let translet = self.translet_guarded()?;
        translet.set_settings(settings);
        translet.set_encodings(request_encoding, response_encoding);

        self.within_scope(JoinpointScope::Request, |activity| {
            activity.parse_declared_items(&rule)
        })
    }

    /// Evaluates the declared parameters and attributes and checks the mandatory ones.
    fn parse_declared_items(&self, rule: &TransletRule) -> ActivityResult<()> {
        let translet = self.translet_ref()?;
        let evaluator = TokenEvaluator::new(translet);
        let request_rule = rule.request_rule();

        let mut missing = Vec::new();
        for item in request_rule.parameters() {
            if item.value_rule().is_some() {
                if let Some(values) = evaluator.evaluate_item(item).as_ref().and_then(value_to_strings) {
                    translet.set_parameter_values(item.name(), values);
                }
            }
            let present = translet
                .parameter(item.name())
                .is_some_and(|value| !value.is_empty());
            if item.is_mandatory() && !present {
                missing.push(item.name().to_string());
            }
        }
        if !missing.is_empty() {
            return Err(ActivityError::MissingMandatoryParameters(missing));
        }

        for item in request_rule.attributes() {
            if item.value_rule().is_some() {
                if let Some(value) = evaluator.evaluate_item(item).filter(|value| !value.is_null()) {
                    translet.set_attribute(item.name(), value);
                }
            }
            if item.is_mandatory() && translet.attribute(item.name()).is_none() {
                missing.push(item.name().to_string());
            }
        }
        if !missing.is_empty() {
            return Err(ActivityError::MissingMandatoryAttributes(missing));
        }
        Ok(())
    }

    fn has_exception_handler(&self, error: &ActivityError) -> bool {
        let Some(translet) = &self.translet else {
            return false;
        };
        translet
            .rule()
            .exception_rule()
            .is_some_and(|rule| rule.find(error).is_some())
            || self
                .registries
                .exception_rules()
                .any(|(aspect, rule)| self.is_acceptable(aspect) && rule.find(error).is_some())
    }

    // =========================================================================
    // Perform
    // =========================================================================

    fn perform_forwarding(&mut self) -> ActivityResult<()> {
        loop {
            match self.perform_cycle()? {
                Cycle::Completed => return Ok(()),
                Cycle::Forward(rule) => self.forward(rule)?,
            }
        }
    }

    fn forward(&mut self, rule: ForwardRule) -> ActivityResult<()> {
        let max_hops = self.context.config().max_forward_hops;
        if self.forward_hops >= max_hops {
            return Err(ActivityError::ForwardLimitExceeded {
                name: rule.translet_name().to_string(),
                hops: self.forward_hops,
            });
        }
        self.forward_hops += 1;

        let translet = self.translet_ref()?;
        {
            let evaluator = TokenEvaluator::new(translet);
            for item in rule.attributes() {
                if let Some(value) = evaluator.evaluate_item(item) {
                    translet.set_attribute(item.name(), value);
                }
            }
        }
        let method = rule.request_method().or_else(|| translet.method());
        info!(
            from = translet.name(),
            to = rule.translet_name(),
            hop = self.forward_hops,
            "Forwarding"
        );

        self.state = ActivityState::Created;
        self.prepare_translet(rule.translet_name(), method)
    }

    /// One translet cycle: advice, content, response, finally advice and exception remapping.
    fn perform_cycle(&mut self) -> ActivityResult<Cycle> {
        if !self.translet_ref()?.is_exception_raised() {
            match self.run_translet() {
                Ok(Some(forward)) => return Ok(Cycle::Forward(forward)),
                Ok(None) => {}
                Err(e) if e.is_terminated() => {
                    self.state = ActivityState::FinallyAdvice;
                    self.execute_advice(JoinpointScope::Translet, AdvicePhase::Finally)?;
                    return Err(e);
                }
                Err(e) => {
                    debug!(error = %e, "Exception raised");
                    self.translet_guarded()?.set_raised_exception(e);
                }
            }
        }

        self.state = ActivityState::FinallyAdvice;
        self.execute_advice(JoinpointScope::Translet, AdvicePhase::Finally)?;

        let Some(raised) = self.translet_ref()?.raised_exception().cloned() else {
            return Ok(Cycle::Completed);
        };
        self.state = ActivityState::ExceptionRemap;
        match self.remap_exception(&raised)? {
            Remap::Forward(forward) => Ok(Cycle::Forward(forward)),
            Remap::Responded => {
                info!(error = %raised.root_cause(), "Exception remapped to a response");
                Ok(Cycle::Completed)
            }
            Remap::Unhandled => Err(raised.into_root_cause()),
        }
    }

    fn run_translet(&mut self) -> ActivityResult<Option<ForwardRule>> {
        self.state = ActivityState::BeforeAdvice;
        self.execute_advice(JoinpointScope::Translet, AdvicePhase::Before)?;

        if !self.translet_ref()?.is_response_reserved() {
            self.state = ActivityState::Content;
            self.produce()?;
        }

        self.state = ActivityState::Responding;
        if let Some(forward) = self.respond()? {
            return Ok(Some(forward));
        }

        self.state = ActivityState::AfterAdvice;
        self.execute_advice(JoinpointScope::Translet, AdvicePhase::After)?;
        Ok(None)
    }

    /// Runs the content action lists, stopping once a response is reserved.
    fn produce(&mut self) -> ActivityResult<()> {
        let rule = Arc::clone(self.translet_ref()?.rule());
        let Some(contents) = rule.content_list() else {
            return Ok(());
        };
        self.within_scope(JoinpointScope::Content, |activity| {
            for list in contents.action_lists() {
                let index = activity
                    .translet_ref()?
                    .shared_process_result()
                    .borrow_mut()
                    .open_content(list.name());
                for action in list.actions() {
                    activity.execute_content_action(action, index)?;
                    if activity.translet_ref()?.is_response_reserved() {
                        debug!("Response reserved; skipping remaining content");
                        return Ok(());
                    }
                }
            }
            Ok(())
        })
    }

    /// Commits the reserved or declared response once.
    ///
    /// A forward is returned to the caller instead of being committed.
    fn respond(&mut self) -> ActivityResult<Option<ForwardRule>> {
        if self.included || self.committed {
            return Ok(None);
        }
        self.committed = true;

        let translet = self.translet_ref()?;
        let Some(response) = translet
            .reserved_response()
            .or_else(|| translet.rule().get_response_rule().get_response())
            .cloned()
        else {
            debug!("No response to commit");
            self.absorb_exception()?;
            return Ok(None);
        };

        if let Response::Forward(forward) = response {
            self.absorb_exception()?;
            return Ok(Some(forward));
        }

        debug!(kind = response.kind(), "Committing response");
        self.within_scope(JoinpointScope::Response, |activity| {
            response::commit(&response, activity.translet_ref()?)
        })
        .map_err(|e| {
            if e.is_terminated() {
                e
            } else {
                ActivityError::Perform(Box::new(e))
            }
        })?;
        self.absorb_exception()?;
        Ok(None)
    }

    fn absorb_exception(&mut self) -> ActivityResult<()> {
        if self.absorbs_exception {
            self.absorbs_exception = false;
            self.translet_guarded()?.clear_raised_exception();
        }
        Ok(())
    }

    // =========================================================================
    // Exception remapping
    // =========================================================================

    /// Lets the translet's exception rule, then each aspect's, handle `raised`.
    fn remap_exception(&mut self, raised: &ActivityError) -> ActivityResult<Remap> {
        let rule = Arc::clone(self.translet_ref()?.rule());
        if let Some(thrown) = rule.exception_rule().and_then(|rule| rule.find(raised)) {
            match self.handle_thrown(thrown, None)? {
                Remap::Unhandled => {}
                done => return Ok(done),
            }
        }

        let aspects: Vec<Arc<AspectRule>> = self
            .registries
            .exception_rules()
            .map(|(aspect, _)| Arc::clone(aspect))
            .collect();
        for aspect in &aspects {
            if !self.is_acceptable(aspect) {
                continue;
            }
            let Some(thrown) = aspect.exception_rule().and_then(|rule| rule.find(raised)) else {
                continue;
            };
            match self.handle_thrown(thrown, Some(aspect))? {
                Remap::Unhandled => {}
                done => return Ok(done),
            }
        }
        Ok(Remap::Unhandled)
    }

    fn handle_thrown(&mut self, thrown: &ExceptionThrownRule, aspect: Option<&Arc<AspectRule>>) -> ActivityResult<Remap> {
        if let Some(action) = thrown.handler_action() {
            let result = self
                .run_action(action, aspect)
                .and_then(|outcome| self.outcome_value(outcome, aspect));
            match result {
                Ok(value) => {
                    if let Some(aspect) = aspect {
                        self.translet_guarded()?
                            .put_advice_result(aspect.id(), AdviceType::Thrown, value);
                    }
                }
                Err(e) if e.is_terminated() => return Err(e),
                Err(e) => warn!(error = %e, "Exception handler action failed"),
            }
        }

        let translet = self.translet_ref()?;
        let desired = self.request.desired_content_type().or_else(|| {
            translet
                .declared_response()
                .and_then(Response::content_type)
                .map(str::to_string)
                .or_else(|| self.context.config().default_content_type.clone())
        });
        let Some(response) = thrown.desired_response(desired.as_deref()).cloned() else {
            return Ok(Remap::Unhandled);
        };

        self.translet_guarded()?.reserve_response(response);
        self.committed = false;
        self.absorbs_exception = true;
        self.state = ActivityState::Responding;
        Ok(match self.respond()? {
            Some(forward) => Remap::Forward(forward),
            None => Remap::Responded,
        })
    }

    // =========================================================================
    // Advice
    // =========================================================================

    /// Runs `body` between the before and after advice of `scope`, then its finally advice.
    pub(super) fn within_scope<T>(
        &mut self,
        scope: JoinpointScope,
        body: impl FnOnce(&mut Self) -> ActivityResult<T>,
    ) -> ActivityResult<T> {
        let result = match self.execute_advice(scope, AdvicePhase::Before) {
            Ok(()) => match body(self) {
                Ok(value) => self
                    .execute_advice(scope, AdvicePhase::After)
                    .map(|()| value),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        self.execute_advice(scope, AdvicePhase::Finally)?;
        result
    }

    /// Runs one phase of `scope`'s advice.
    ///
    /// Finally advice is forced: failures are logged and skipped so they never
    /// hide an exception already raised. Only termination escapes it.
    pub(super) fn execute_advice(&mut self, scope: JoinpointScope, phase: AdvicePhase) -> ActivityResult<()> {
        let registry = self.registries.scope(scope);
        let units = match phase {
            AdvicePhase::Before => registry.before_advice(),
            AdvicePhase::After => registry.after_advice(),
            AdvicePhase::Finally => registry.finally_advice(),
        }
        .to_vec();
        if phase == AdvicePhase::Before {
            self.started_scopes[scope.index()] = true;
        }

        for unit in &units {
            if !self.is_acceptable(unit.aspect()) {
                continue;
            }
            self.execute_advice_unit(unit, phase == AdvicePhase::Finally)?;
        }
        Ok(())
    }

    /// Whether the aspect's method and header filters admit the current request.
    pub(super) fn is_acceptable(&self, aspect: &AspectRule) -> bool {
        if let Some(methods) = aspect.methods() {
            let method = self.translet.as_ref().and_then(Translet::method);
            if !method.is_some_and(|method| methods.contains(&method)) {
                return false;
            }
        }
        if let Some(headers) = aspect.headers() {
            if !headers.iter().any(|header| self.request.header(header).is_some()) {
                return false;
            }
        }
        true
    }
}

fn is_validation_error(error: &ActivityError) -> bool {
    matches!(
        error.root_cause(),
        ActivityError::MissingMandatoryParameters(_) | ActivityError::MissingMandatoryAttributes(_)
    )
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("translet", &self.translet.as_ref().map(Translet::name))
            .field("depth", &self.depth)
            .field("forward_hops", &self.forward_hops)
            .finish_non_exhaustive()
    }
}
