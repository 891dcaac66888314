//! # Activity Engine
//!
//! Turns a translet name into executed actions and a committed response.
//!
//! ## Key Types
//!
//! - [`ActivityContext`]: rules, beans and collaborators shared by all activities.
//! - [`Activity`]: the state machine running one request, its forwards and includes.
//! - [`Translet`]: the per-request facade bean methods work with.
//! - [`ProcessResult`]: the tree of action results a response renders.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let mut activity = Activity::new(context, request).with_response(response);
//! activity.prepare("/orders/list", Some(MethodType::Get))?;
//! activity.perform()?;
//! activity.finish();
//! ```
//!
//! [`Activity::execute`] does all three and always finishes the activity.

mod action;
mod context;
mod core;
mod response;
mod result;
mod translet;

pub use self::context::{ActivityContext, ActivityContextBuilder, CurrentActivity, ResolvedTranslet};
pub use self::core::{Activity, ActivityState, CHARACTER_ENCODING_SETTING};
pub use self::response::{Transformer, ViewDispatcher};
pub use self::result::{ActionResult, ContentResult, ProcessResult, ResultValue, SharedProcessResult};
pub use self::translet::Translet;
