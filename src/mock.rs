//! # Mock Collaborators
//!
//! Utilities for testing translets without a transport.
//!
//! - [`MockResponseAdapter`] records every response side effect in order, so
//!   tests can assert that a response was committed exactly once.
//! - [`RecordingBean`] records the methods actions invoke and answers them
//!   from queued expectations.
//!
//! # Example
//! ```ignore
//! let bean = RecordingBean::new();
//! bean.expect_call("load").return_ok(json!({"id": 7}));
//! bean.expect_call("save").return_err(Failure::illegal_state("read-only"));
//!
//! // ... register `bean.clone()` and run an activity ...
//!
//! assert_eq!(bean.methods(), vec!["load", "save"]);
//! bean.verify();
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::adapter::ResponseAdapter;
use crate::bean::{Bean, Invocation};
use crate::error::{ActivityError, ActivityResult, Failure};

// =============================================================================
// RESPONSE ADAPTER
// =============================================================================

/// One side effect applied to a [`MockResponseAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    ContentType(String),
    Encoding(String),
    Status(u16),
    Header(String, String),
    Write(String),
    Redirect(String),
    Flush,
}

/// A response adapter that records what the engine does to it.
#[derive(Debug, Default)]
pub struct MockResponseAdapter {
    events: Mutex<Vec<ResponseEvent>>,
    fail_flush: bool,
}

impl MockResponseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `flush` fail.
    pub fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    pub fn events(&self) -> Vec<ResponseEvent> {
        self.events.lock().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ResponseEvent::Write(body) => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ResponseEvent::Redirect(location) => Some(location.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of writes and redirects, i.e. how often a response was committed.
    pub fn commit_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, ResponseEvent::Write(_) | ResponseEvent::Redirect(_)))
            .count()
    }

    pub fn flush_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, ResponseEvent::Flush))
            .count()
    }

    fn record(&self, event: ResponseEvent) {
        self.events.lock().push(event);
    }
}

impl ResponseAdapter for MockResponseAdapter {
    fn content_type(&self) -> Option<String> {
        self.events.lock().iter().rev().find_map(|event| match event {
            ResponseEvent::ContentType(content_type) => Some(content_type.clone()),
            _ => None,
        })
    }

    fn set_content_type(&self, content_type: &str) {
        self.record(ResponseEvent::ContentType(content_type.to_string()));
    }

    fn encoding(&self) -> Option<String> {
        self.events.lock().iter().rev().find_map(|event| match event {
            ResponseEvent::Encoding(encoding) => Some(encoding.clone()),
            _ => None,
        })
    }

    fn set_encoding(&self, encoding: &str) {
        self.record(ResponseEvent::Encoding(encoding.to_string()));
    }

    fn set_status(&self, status: u16) {
        self.record(ResponseEvent::Status(status));
    }

    fn set_header(&self, name: &str, value: &str) {
        self.record(ResponseEvent::Header(name.to_string(), value.to_string()));
    }

    fn write(&self, content: &str) -> ActivityResult<()> {
        self.record(ResponseEvent::Write(content.to_string()));
        Ok(())
    }

    fn redirect(&self, location: &str) -> ActivityResult<()> {
        self.record(ResponseEvent::Redirect(location.to_string()));
        Ok(())
    }

    fn flush(&self) -> ActivityResult<()> {
        self.record(ResponseEvent::Flush);
        if self.fail_flush {
            return Err(ActivityError::Response("flush failed".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// RECORDING BEAN
// =============================================================================

/// A method call seen by a [`RecordingBean`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub arguments: Vec<(String, Value)>,
}

struct Expectation {
    method: String,
    response: Result<Value, Failure>,
}

#[derive(Default)]
struct Recorder {
    calls: Vec<RecordedCall>,
    expectations: VecDeque<Expectation>,
    destroyed: usize,
}

/// A bean that records its calls and answers from queued expectations.
///
/// Each call consumes the first queued expectation for its method; methods
/// without one return `null`. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingBean {
    recorder: Arc<Mutex<Recorder>>,
}

impl RecordingBean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the answer for the next call of `method`.
    pub fn expect_call(&self, method: impl Into<String>) -> CallExpectationBuilder {
        CallExpectationBuilder {
            method: method.into(),
            recorder: Arc::clone(&self.recorder),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.recorder.lock().calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.recorder
            .lock()
            .calls
            .iter()
            .map(|call| call.method.clone())
            .collect()
    }

    pub fn destroy_count(&self) -> usize {
        self.recorder.lock().destroyed
    }

    /// Panics unless every queued expectation was consumed.
    pub fn verify(&self) {
        let recorder = self.recorder.lock();
        if !recorder.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                recorder.expectations.len()
            );
        }
    }
}

impl Bean for RecordingBean {
    fn invoke(&self, method: &str, call: &mut Invocation<'_>) -> ActivityResult<Value> {
        let mut recorder = self.recorder.lock();
        recorder.calls.push(RecordedCall {
            method: method.to_string(),
            arguments: call.arguments().to_vec(),
        });
        let position = recorder
            .expectations
            .iter()
            .position(|expectation| expectation.method == method);
        match position.and_then(|index| recorder.expectations.remove(index)) {
            Some(expectation) => expectation.response.map_err(ActivityError::raise),
            None => Ok(Value::Null),
        }
    }

    fn destroy(&self) {
        self.recorder.lock().destroyed += 1;
    }
}

/// Builder for one queued [`RecordingBean`] answer.
pub struct CallExpectationBuilder {
    method: String,
    recorder: Arc<Mutex<Recorder>>,
}

impl CallExpectationBuilder {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: Value) {
        self.push(Ok(value));
    }

    /// Sets the expectation to raise `failure`.
    pub fn return_err(self, failure: Failure) {
        self.push(Err(failure));
    }

    fn push(self, response: Result<Value, Failure>) {
        self.recorder.lock().expectations.push_back(Expectation {
            method: self.method,
            response,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recording_bean_answers_in_order() {
        let bean = RecordingBean::new();
        bean.expect_call("load").return_ok(json!(1));
        bean.expect_call("load").return_err(Failure::illegal_state("gone"));

        let mut call = Invocation::new(vec![("id".to_string(), json!(7))], Vec::new(), None);
        assert_eq!(bean.invoke("load", &mut call).expect("first answer"), json!(1));
        let err = bean.invoke("load", &mut call).expect_err("second answer");
        assert!(err.type_lineage().contains(&"IllegalStateException"));
        assert_eq!(bean.invoke("other", &mut call).expect("default answer"), Value::Null);

        assert_eq!(bean.methods(), vec!["load", "load", "other"]);
        assert_eq!(bean.calls()[0].arguments, vec![("id".to_string(), json!(7))]);
        bean.verify();
    }

    #[test]
    fn test_mock_response_counts_commits() {
        let response = MockResponseAdapter::new().failing_flush();
        response.set_content_type("text/plain");
        response.write("hello").expect("write");
        response.redirect("/next").expect("redirect");
        assert!(response.flush().is_err());

        assert_eq!(response.commit_count(), 2);
        assert_eq!(response.flush_count(), 1);
        assert_eq!(response.content_type().as_deref(), Some("text/plain"));
        assert_eq!(response.writes(), vec!["hello"]);
        assert_eq!(response.redirects(), vec!["/next"]);
    }
}
