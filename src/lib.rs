#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Translet Engine
//!
//! > **An aspect-oriented request-processing engine in Rust.**
//!
//! A *translet* is a named, declaratively configured unit of request handling:
//! which request items to read, which actions to run and which response to
//! produce. This crate resolves a request name to its translet, runs it through
//! an activity with cross-cutting advice woven in, and commits the response.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Rules are data, activities are behavior
//!
//! Everything a translet does is described by immutable rule values built in
//! code ([`rule`]). One [`ActivityContext`](activity::ActivityContext) holds them
//! and is shared by every request. An [`Activity`](activity::Activity) owns all
//! mutable state of one request, so rules never need locking.
//!
//! ### Aspects instead of inheritance
//!
//! Logging, auditing, transactions and error pages are [`AspectRule`](rule::AspectRule)s.
//! Their pointcuts select translets by name, and their advice runs before,
//! after or finally around one of four join points: the translet, request
//! parsing, content production or response commit.
//!
//! ## 🚀 Core Concepts
//!
//! ### Forward and include
//! A **forward** response re-runs the activity for another translet while
//! keeping the results gathered so far. An **include** action runs another
//! translet as a child activity and nests its results under the action's id.
//!
//! ### Exceptions become responses
//! Every failure is recorded as the translet's *raised exception*. Exception
//! rules, on the translet or on aspects, map exception kinds to handler actions
//! and responses. Only unhandled failures reach the caller.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! [`ActivityError`](error::ActivityError) is a `thiserror` enum. Wrapping
//! variants keep the layer a failure crossed, and
//! [`root_cause`](error::ActivityError::root_cause) finds the original one.
//!
//! ### 2. Concurrency Model
//! Activities are synchronous and single-threaded. The
//! [`ActivityService`](lifecycle::ActivityService) runs each one on a Tokio
//! blocking worker, so many requests run in parallel against one context.
//!
//! ### 3. Observability
//! Every activity runs in a `tracing` span. See the [`lifecycle::tracing`]
//! module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`activity`])
//! - **Role**: The state machine, action executor and response committer.
//! - **Key items**: [`Activity`](activity::Activity), [`Translet`](activity::Translet),
//!   [`ProcessResult`](activity::ProcessResult).
//!
//! ### 2. The Rules ([`rule`], [`aspect`], [`expression`])
//! - **Role**: What translets and aspects declare, how pointcuts match and how
//!   `${param}`, `@{attr}` and `%{property}` tokens evaluate.
//!
//! ### 3. The Collaborators ([`bean`], [`adapter`], [`message`])
//! - **Role**: Beans invoked by actions, request/response/session access and
//!   localized messages.
//!
//! ### 4. The Front-End ([`lifecycle`], [`config`])
//! - **Role**: Serving requests from async code, loading configuration and
//!   setting up logging.
//!
//! ## 🚀 Quick Start
//!
//! ```ignore
//! let context = ActivityContext::builder()
//!     .bean(BeanRule::of("greeter", BeanScope::Singleton, || {
//!         FnBean::new().method("hello", |call| {
//!             Ok(json!(format!("Hello, {}", call.argument_at(0).map(value_to_text).unwrap_or_default())))
//!         })
//!     }))
//!     .translet(
//!         TransletRule::new("/hello")
//!             .content(ActionList::new().action(
//!                 BeanMethodActionRule::new("greeter", "hello")
//!                     .id("greeting")
//!                     .argument(ItemRule::new("name").value("${name:World}")),
//!             ))
//!             .response(TransformRule::json()),
//!     )
//!     .build()?;
//!
//! let service = ActivityService::new(context);
//! let response = service.get("/hello").await?;
//! assert_eq!(response.body, r#"{"greeting":"Hello, World"}"#);
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod activity;
pub mod adapter;
pub mod aspect;
pub mod bean;
pub mod config;
pub mod error;
pub mod expression;
pub mod lifecycle;
pub mod message;
pub mod mock;
pub mod rule;
