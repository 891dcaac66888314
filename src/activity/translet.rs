//! The per-activity facade handed to bean methods.

use std::cell::Ref;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::context::ActivityContext;
use super::result::{ProcessResult, ResultValue, SharedProcessResult};
use crate::adapter::{RequestAdapter, ResponseAdapter, SessionAdapter};
use crate::bean::Bean;
use crate::error::ActivityError;
use crate::expression::TokenSource;
use crate::rule::{
    AdviceType, AspectRule, DispatchRule, ForwardRule, MethodType, RedirectRule, Response, TransformRule,
    TransletRule,
};

/// State of one translet execution: request access, results, the reserved
/// response and the first raised error.
///
/// A forward replaces the translet but keeps its process result.
pub struct Translet {
    name: String,
    method: Option<MethodType>,
    rule: Arc<TransletRule>,
    context: Arc<ActivityContext>,
    request: Arc<dyn RequestAdapter>,
    response: Option<Arc<dyn ResponseAdapter>>,
    session: Option<Arc<dyn SessionAdapter>>,
    process_result: SharedProcessResult,
    reserved: Option<Response>,
    raised: Option<ActivityError>,
    advice_results: HashMap<(String, AdviceType), Value>,
    advice_beans: HashMap<String, Arc<dyn Bean>>,
    pending_aspects: Vec<AspectRule>,
    settings: BTreeMap<String, String>,
    request_encoding: Option<String>,
    response_encoding: Option<String>,
}

pub(crate) struct TransletParts {
    pub name: String,
    pub method: Option<MethodType>,
    pub rule: Arc<TransletRule>,
    pub context: Arc<ActivityContext>,
    pub request: Arc<dyn RequestAdapter>,
    pub response: Option<Arc<dyn ResponseAdapter>>,
    pub session: Option<Arc<dyn SessionAdapter>>,
    pub process_result: SharedProcessResult,
    pub raised: Option<ActivityError>,
}

impl Translet {
    pub(crate) fn new(parts: TransletParts) -> Self {
        Self {
            name: parts.name,
            method: parts.method,
            rule: parts.rule,
            context: parts.context,
            request: parts.request,
            response: parts.response,
            session: parts.session,
            process_result: parts.process_result,
            reserved: None,
            raised: parts.raised,
            advice_results: HashMap::new(),
            advice_beans: HashMap::new(),
            pending_aspects: Vec::new(),
            settings: BTreeMap::new(),
            request_encoding: None,
            response_encoding: None,
        }
    }

    /// The requested name, which differs from the rule name for pattern translets.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Option<MethodType> {
        self.method
    }

    pub fn rule(&self) -> &Arc<TransletRule> {
        &self.rule
    }

    pub fn context(&self) -> &Arc<ActivityContext> {
        &self.context
    }

    pub fn description(&self) -> Option<&str> {
        self.rule.get_description()
    }

    // -------------------------------------------------------------------------
    // Request access
    // -------------------------------------------------------------------------

    pub fn request_adapter(&self) -> &Arc<dyn RequestAdapter> {
        &self.request
    }

    pub fn response_adapter(&self) -> Option<&Arc<dyn ResponseAdapter>> {
        self.response.as_ref()
    }

    pub fn session_adapter(&self) -> Option<&Arc<dyn SessionAdapter>> {
        self.session.as_ref()
    }

    pub fn parameter(&self, name: &str) -> Option<String> {
        self.request.parameter(name)
    }

    pub fn parameter_values(&self, name: &str) -> Option<Vec<String>> {
        self.request.parameter_values(name)
    }

    pub fn set_parameter(&self, name: &str, value: impl Into<String>) {
        self.request.set_parameter(name, vec![value.into()]);
    }

    pub fn set_parameter_values(&self, name: &str, values: Vec<String>) {
        self.request.set_parameter(name, values);
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.request.attribute(name)
    }

    pub fn set_attribute(&self, name: &str, value: impl Into<Value>) {
        self.request.set_attribute(name, value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.request.remove_attribute(name)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.request.header(name)
    }

    pub fn session_attribute(&self, name: &str) -> Option<Value> {
        self.session.as_ref()?.attribute(name)
    }

    pub fn set_session_attribute(&self, name: &str, value: impl Into<Value>) {
        if let Some(session) = &self.session {
            session.set_attribute(name, value.into());
        }
    }

    pub fn request_encoding(&self) -> Option<&str> {
        self.request_encoding.as_deref()
    }

    pub fn response_encoding(&self) -> Option<&str> {
        self.response_encoding.as_deref()
    }

    pub(crate) fn set_encodings(&mut self, request: String, response: String) {
        self.request_encoding = Some(request);
        self.response_encoding = Some(response);
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    pub fn process_result(&self) -> Ref<'_, ProcessResult> {
        self.process_result.borrow()
    }

    pub(crate) fn shared_process_result(&self) -> &SharedProcessResult {
        &self.process_result
    }

    /// Replaces the accumulated process result.
    pub fn set_process_result(&self, result: ProcessResult) {
        *self.process_result.borrow_mut() = result;
    }

    /// Most recent result recorded under `action_id`.
    pub fn action_result(&self, action_id: &str) -> Option<ResultValue> {
        self.process_result.borrow().find(action_id).cloned()
    }

    // -------------------------------------------------------------------------
    // Response reservation
    // -------------------------------------------------------------------------

    /// Reserves the response to commit; content stops before the next action.
    pub fn reserve_response(&mut self, response: impl Into<Response>) {
        self.reserved = Some(response.into());
    }

    pub fn transform(&mut self, rule: TransformRule) {
        self.reserve_response(rule);
    }

    pub fn dispatch(&mut self, name: &str) {
        self.reserve_response(DispatchRule::new(name));
    }

    pub fn forward(&mut self, translet_name: &str) {
        self.reserve_response(ForwardRule::new(translet_name));
    }

    pub fn redirect(&mut self, target: &str) {
        self.reserve_response(RedirectRule::new(target));
    }

    pub fn reserved_response(&self) -> Option<&Response> {
        self.reserved.as_ref()
    }

    pub fn is_response_reserved(&self) -> bool {
        self.reserved.is_some()
    }

    /// The response an exception handler would be chosen against.
    pub(crate) fn declared_response(&self) -> Option<&Response> {
        self.reserved
            .as_ref()
            .or_else(|| self.rule.get_response_rule().get_response())
    }

    // -------------------------------------------------------------------------
    // Raised errors
    // -------------------------------------------------------------------------

    /// The first error raised during this activity.
    pub fn raised_exception(&self) -> Option<&ActivityError> {
        self.raised.as_ref()
    }

    pub fn is_exception_raised(&self) -> bool {
        self.raised.is_some()
    }

    /// Records `error` unless an earlier one is already recorded.
    pub(crate) fn set_raised_exception(&mut self, error: ActivityError) {
        if self.raised.is_none() {
            self.raised = Some(error);
        }
    }

    pub(crate) fn take_raised_exception(&mut self) -> Option<ActivityError> {
        self.raised.take()
    }

    pub(crate) fn clear_raised_exception(&mut self) {
        self.raised = None;
    }

    // -------------------------------------------------------------------------
    // Aspects
    // -------------------------------------------------------------------------

    pub fn advice_result(&self, aspect_id: &str, advice_type: AdviceType) -> Option<&Value> {
        self.advice_results.get(&(aspect_id.to_string(), advice_type))
    }

    pub fn before_advice_result(&self, aspect_id: &str) -> Option<&Value> {
        self.advice_result(aspect_id, AdviceType::Before)
    }

    pub fn after_advice_result(&self, aspect_id: &str) -> Option<&Value> {
        self.advice_result(aspect_id, AdviceType::After)
    }

    pub fn around_advice_result(&self, aspect_id: &str) -> Option<&Value> {
        self.advice_result(aspect_id, AdviceType::Around)
    }

    pub fn finally_advice_result(&self, aspect_id: &str) -> Option<&Value> {
        self.advice_result(aspect_id, AdviceType::Finally)
    }

    pub fn thrown_advice_result(&self, aspect_id: &str) -> Option<&Value> {
        self.advice_result(aspect_id, AdviceType::Thrown)
    }

    pub(crate) fn put_advice_result(&mut self, aspect_id: &str, advice_type: AdviceType, value: Value) {
        self.advice_results
            .insert((aspect_id.to_string(), advice_type), value);
    }

    /// The advice bean instance of `aspect_id`, once its advice has run.
    pub fn advice_bean(&self, aspect_id: &str) -> Option<Arc<dyn Bean>> {
        self.advice_beans.get(aspect_id).cloned()
    }

    pub(crate) fn put_advice_bean(&mut self, aspect_id: &str, bean: Arc<dyn Bean>) {
        self.advice_beans.insert(aspect_id.to_string(), bean);
    }

    /// Weaves `aspect` into the running activity.
    ///
    /// If the aspect's join point has already started, its before advice runs
    /// right after the calling action returns.
    pub fn register_aspect_rule(&mut self, aspect: AspectRule) {
        self.pending_aspects.push(aspect);
    }

    pub(crate) fn take_pending_aspects(&mut self) -> Vec<AspectRule> {
        std::mem::take(&mut self.pending_aspects)
    }

    /// A setting contributed by the aspects advising this translet.
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }

    pub(crate) fn set_settings(&mut self, settings: BTreeMap<String, String>) {
        self.settings = settings;
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    /// Message for the request's locale.
    pub fn message(&self, code: &str, args: &[&str]) -> Option<String> {
        let locale = self.request.locale();
        self.context.messages().message(code, args, locale.as_deref())
    }

    pub fn message_or(&self, code: &str, args: &[&str], default: &str) -> String {
        self.message(code, args)
            .unwrap_or_else(|| default.to_string())
    }
}

impl TokenSource for Translet {
    fn parameter_values(&self, name: &str) -> Option<Vec<String>> {
        self.request.parameter_values(name)
    }

    /// Request attributes first, then the latest action result with that id.
    fn attribute(&self, name: &str) -> Option<Value> {
        self.request
            .attribute(name)
            .or_else(|| self.action_result(name).map(|result| result.to_value()))
    }

    fn property(&self, name: &str) -> Option<String> {
        self.context
            .config()
            .property(name)
            .map(str::to_string)
            .or_else(|| self.setting(name).map(str::to_string))
    }
}

impl fmt::Debug for Translet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translet")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("reserved", &self.reserved.as_ref().map(Response::kind))
            .field("raised", &self.raised.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}
