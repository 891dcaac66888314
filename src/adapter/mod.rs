//! # Adapters
//!
//! The engine never touches a transport directly. Requests, responses and
//! sessions are reached through these traits; [`basic`] provides in-memory
//! implementations used by the [service](crate::lifecycle::ActivityService).
//!
//! Adapter methods take `&self`: one adapter is shared by an activity, its
//! includes and its forwards, so implementations use interior mutability.

pub mod basic;

pub use basic::{BasicRequestAdapter, BasicResponseAdapter, BasicSessionAdapter};

use serde_json::Value;

use crate::error::ActivityResult;

pub trait RequestAdapter: Send + Sync {
    fn parameter(&self, name: &str) -> Option<String> {
        self.parameter_values(name)
            .and_then(|values| values.into_iter().next())
    }

    fn parameter_values(&self, name: &str) -> Option<Vec<String>>;

    fn set_parameter(&self, name: &str, values: Vec<String>);

    fn parameter_names(&self) -> Vec<String>;

    fn attribute(&self, name: &str) -> Option<Value>;

    fn set_attribute(&self, name: &str, value: Value);

    fn remove_attribute(&self, name: &str) -> Option<Value>;

    fn attribute_names(&self) -> Vec<String>;

    fn header(&self, name: &str) -> Option<String>;

    fn locale(&self) -> Option<String> {
        None
    }

    fn encoding(&self) -> Option<String>;

    fn set_encoding(&self, encoding: &str);

    /// Content type the client prefers, used to pick an exception response variant.
    fn desired_content_type(&self) -> Option<String> {
        None
    }
}

pub trait ResponseAdapter: Send + Sync {
    fn content_type(&self) -> Option<String>;

    fn set_content_type(&self, content_type: &str);

    fn encoding(&self) -> Option<String>;

    fn set_encoding(&self, encoding: &str);

    fn set_status(&self, status: u16);

    fn set_header(&self, name: &str, value: &str);

    fn write(&self, content: &str) -> ActivityResult<()>;

    fn redirect(&self, location: &str) -> ActivityResult<()>;

    fn flush(&self) -> ActivityResult<()>;
}

pub trait SessionAdapter: Send + Sync {
    fn id(&self) -> String;

    fn attribute(&self, name: &str) -> Option<Value>;

    fn set_attribute(&self, name: &str, value: Value);

    fn remove_attribute(&self, name: &str) -> Option<Value>;
}
