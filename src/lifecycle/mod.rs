//! Runtime front-end and observability.
//!
//! This module contains what an application needs around the engine:
//!
//! - **Serving requests**: [`ActivityService`] runs each request on a Tokio
//!   blocking worker and captures the committed response.
//! - **Client convenience**: [`TransletClient`] adds `get`/`post` helpers to
//!   anything that can reach a service.
//! - **Observability setup**: [`setup_tracing`] initializes logging.

pub mod service;
pub mod tracing;

pub use self::service::*;
pub use self::tracing::*;
