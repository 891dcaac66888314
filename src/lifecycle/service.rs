use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::activity::{Activity, ActivityContext};
use crate::adapter::{BasicRequestAdapter, BasicResponseAdapter, BasicSessionAdapter, ResponseAdapter};
use crate::error::ActivityError;
use crate::rule::MethodType;

/// Errors returned by [`ActivityService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Activity(#[from] ActivityError),

    #[error("Activity worker failed: {0}")]
    Worker(String),
}

/// A request addressed to a translet.
///
/// # Example
/// ```ignore
/// let request = ServiceRequest::new("/orders/${id}")
///     .method(MethodType::Get)
///     .parameter("verbose", "true")
///     .session("s-1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceRequest {
    name: String,
    method: Option<MethodType>,
    parameters: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    attributes: Vec<(String, Value)>,
    locale: Option<String>,
    accept: Option<String>,
    session_id: Option<String>,
}

impl ServiceRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: MethodType) -> Self {
        self.method = Some(method);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// The content type the caller prefers for error responses.
    pub fn accept(mut self, content_type: impl Into<String>) -> Self {
        self.accept = Some(content_type.into());
        self
    }

    /// Joins the session with this id, creating it on first use.
    pub fn session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn into_adapter(self) -> (String, Option<MethodType>, Option<String>, BasicRequestAdapter) {
        let mut adapter = BasicRequestAdapter::new();
        for (name, value) in self.parameters {
            adapter = adapter.with_parameter(name, value);
        }
        for (name, value) in self.headers {
            adapter = adapter.with_header(name, value);
        }
        for (name, value) in self.attributes {
            adapter = adapter.with_attribute(name, value);
        }
        if let Some(locale) = self.locale {
            adapter = adapter.with_locale(locale);
        }
        if let Some(accept) = self.accept {
            adapter = adapter.with_accept(accept);
        }
        (self.name, self.method, self.session_id, adapter)
    }
}

/// What an activity committed, captured from the in-memory response.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub body: String,
    pub content_type: Option<String>,
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub redirect: Option<String>,
    pub process_result: Value,
}

/// Runs activities for async callers.
///
/// Activities are synchronous and bound to their thread, so every request runs
/// on its own blocking worker. Concurrent requests never share a current
/// activity binding or a request scope. Cloning shares the context and sessions.
#[derive(Clone)]
pub struct ActivityService {
    context: Arc<ActivityContext>,
    sessions: Arc<Mutex<HashMap<String, Arc<BasicSessionAdapter>>>>,
}

impl ActivityService {
    pub fn new(context: Arc<ActivityContext>) -> Self {
        Self {
            context,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn context(&self) -> &Arc<ActivityContext> {
        &self.context
    }

    /// Runs `request` on a blocking worker and waits for its response.
    #[instrument(skip(self, request), fields(translet = %request.name))]
    pub async fn handle(&self, request: ServiceRequest) -> Result<ServiceResponse, ServiceError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.run_blocking(request))
            .await
            .map_err(|e| ServiceError::Worker(e.to_string()))?
    }

    /// Runs `request` on the calling thread.
    pub fn run_blocking(&self, request: ServiceRequest) -> Result<ServiceResponse, ServiceError> {
        let (name, method, session_id, adapter) = request.into_adapter();
        let response = Arc::new(BasicResponseAdapter::new());

        let mut activity = Activity::new(Arc::clone(&self.context), Arc::new(adapter))
            .with_response(response.clone());
        if let Some(id) = session_id {
            activity = activity.with_session(self.session(&id));
        }

        let process_result = activity.execute(&name, method)?;
        debug!(translet = %name, status = ?response.status(), "Request served");

        Ok(ServiceResponse {
            body: response.body(),
            content_type: response.content_type(),
            status: response.status(),
            headers: response.headers(),
            redirect: response.redirect_location(),
            process_result: process_result.to_value(),
        })
    }

    /// Drops the session `id`; the next request naming it starts empty.
    ///
    /// Sessions live until invalidated. Returns whether the session existed.
    pub fn invalidate_session(&self, id: &str) -> bool {
        let removed = self.sessions.lock().remove(id).is_some();
        if removed {
            debug!(session = id, "Session invalidated");
        }
        removed
    }

    fn session(&self, id: &str) -> Arc<BasicSessionAdapter> {
        Arc::clone(
            self.sessions
                .lock()
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(BasicSessionAdapter::new(id))),
        )
    }
}

/// Convenience calls over an [`ActivityService`].
///
/// Implementors only provide [`service`](TransletClient::service); `get` and
/// `post` are provided.
#[async_trait]
pub trait TransletClient: Send + Sync {
    fn service(&self) -> &ActivityService;

    /// Runs `name` as a GET request.
    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<ServiceResponse, ServiceError> {
        debug!("Sending request");
        self.service()
            .handle(ServiceRequest::new(name).method(MethodType::Get))
            .await
    }

    /// Runs `name` as a POST request with form parameters.
    #[instrument(skip(self, parameters))]
    async fn post(&self, name: &str, parameters: Vec<(String, String)>) -> Result<ServiceResponse, ServiceError> {
        debug!("Sending request");
        let mut request = ServiceRequest::new(name).method(MethodType::Post);
        for (key, value) in parameters {
            request = request.parameter(key, value);
        }
        self.service().handle(request).await
    }
}

impl TransletClient for ActivityService {
    fn service(&self) -> &ActivityService {
        self
    }
}
