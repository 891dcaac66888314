//! In-memory adapters.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::Value;

use super::{RequestAdapter, ResponseAdapter, SessionAdapter};
use crate::error::{ActivityError, ActivityResult};

#[derive(Debug, Default)]
struct RequestState {
    parameters: BTreeMap<String, Vec<String>>,
    attributes: BTreeMap<String, Value>,
    encoding: Option<String>,
}

/// A request held entirely in memory. Header names are case-insensitive.
#[derive(Debug, Default)]
pub struct BasicRequestAdapter {
    state: RwLock<RequestState>,
    headers: HashMap<String, String>,
    locale: Option<String>,
    accept: Option<String>,
}

impl BasicRequestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.state
            .write()
            .parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.write().attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the content type the client prefers.
    pub fn with_accept(mut self, content_type: impl Into<String>) -> Self {
        self.accept = Some(content_type.into());
        self
    }
}

impl RequestAdapter for BasicRequestAdapter {
    fn parameter_values(&self, name: &str) -> Option<Vec<String>> {
        self.state.read().parameters.get(name).cloned()
    }

    fn set_parameter(&self, name: &str, values: Vec<String>) {
        self.state.write().parameters.insert(name.to_string(), values);
    }

    fn parameter_names(&self) -> Vec<String> {
        self.state.read().parameters.keys().cloned().collect()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.state.read().attributes.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: Value) {
        self.state.write().attributes.insert(name.to_string(), value);
    }

    fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.state.write().attributes.remove(name)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.state.read().attributes.keys().cloned().collect()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    fn locale(&self) -> Option<String> {
        self.locale.clone()
    }

    fn encoding(&self) -> Option<String> {
        self.state.read().encoding.clone()
    }

    fn set_encoding(&self, encoding: &str) {
        self.state.write().encoding = Some(encoding.to_string());
    }

    fn desired_content_type(&self) -> Option<String> {
        self.accept.clone()
    }
}

#[derive(Debug, Default, Clone)]
struct ResponseState {
    body: String,
    content_type: Option<String>,
    encoding: Option<String>,
    status: Option<u16>,
    headers: Vec<(String, String)>,
    redirect: Option<String>,
    flushed: bool,
}

/// Buffers everything written to it.
#[derive(Debug, Default)]
pub struct BasicResponseAdapter {
    state: RwLock<ResponseState>,
}

impl BasicResponseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self) -> String {
        self.state.read().body.clone()
    }

    pub fn status(&self) -> Option<u16> {
        self.state.read().status
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.state.read().headers.clone()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .headers
            .iter()
            .rev()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    pub fn redirect_location(&self) -> Option<String> {
        self.state.read().redirect.clone()
    }

    pub fn is_flushed(&self) -> bool {
        self.state.read().flushed
    }
}

impl ResponseAdapter for BasicResponseAdapter {
    fn content_type(&self) -> Option<String> {
        self.state.read().content_type.clone()
    }

    fn set_content_type(&self, content_type: &str) {
        self.state.write().content_type = Some(content_type.to_string());
    }

    fn encoding(&self) -> Option<String> {
        self.state.read().encoding.clone()
    }

    fn set_encoding(&self, encoding: &str) {
        self.state.write().encoding = Some(encoding.to_string());
    }

    fn set_status(&self, status: u16) {
        self.state.write().status = Some(status);
    }

    fn set_header(&self, name: &str, value: &str) {
        self.state
            .write()
            .headers
            .push((name.to_string(), value.to_string()));
    }

    fn write(&self, content: &str) -> ActivityResult<()> {
        let mut state = self.state.write();
        if state.flushed {
            return Err(ActivityError::Response("response already flushed".to_string()));
        }
        state.body.push_str(content);
        Ok(())
    }

    fn redirect(&self, location: &str) -> ActivityResult<()> {
        let mut state = self.state.write();
        if state.flushed {
            return Err(ActivityError::Response("response already flushed".to_string()));
        }
        state.redirect = Some(location.to_string());
        state.status = Some(302);
        Ok(())
    }

    fn flush(&self) -> ActivityResult<()> {
        self.state.write().flushed = true;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BasicSessionAdapter {
    id: String,
    attributes: RwLock<BTreeMap<String, Value>>,
}

impl BasicSessionAdapter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: RwLock::new(BTreeMap::new()),
        }
    }
}

impl SessionAdapter for BasicSessionAdapter {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.read().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: Value) {
        self.attributes.write().insert(name.to_string(), value);
    }

    fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.attributes.write().remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_are_case_insensitive() {
        let request = BasicRequestAdapter::new()
            .with_header("X-Token", "abc")
            .with_parameter("tag", "a")
            .with_parameter("tag", "b");

        assert_eq!(request.header("x-token").as_deref(), Some("abc"));
        assert_eq!(request.parameter("tag").as_deref(), Some("a"));
        assert_eq!(
            request.parameter_values("tag"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_response_rejects_writes_after_flush() {
        let response = BasicResponseAdapter::new();
        response.write("hello").expect("write");
        response.flush().expect("flush");

        assert_eq!(response.body(), "hello");
        assert!(response.write(" again").is_err());
        assert!(response.redirect("/elsewhere").is_err());
    }
}
