//! # Observability & Tracing
//!
//! The [`setup_tracing`] function installs a compact `tracing` subscriber whose
//! verbosity comes from `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Activities**: each one runs inside an `activity` span carrying its id,
//!   include depth and translet name. Forwards and includes are logged at
//!   `info` inside that span.
//! - **Actions and advice**: every executed action and advice at `debug`.
//! - **Failures**: suppressed finally-advice and flush failures at `warn`,
//!   exceptions remapped to a response at `info`, unresolved ones at `error`.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Activity outcomes, forwards and includes
//! RUST_LOG=info cargo run
//!
//! # Every action and advice with its aspect id
//! RUST_LOG=debug cargo run
//!
//! # Registry construction and bean invocations too
//! RUST_LOG=trace cargo run
//!
//! # Only the engine
//! RUST_LOG=translet_engine::activity=debug cargo run
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`** a translet that includes another and then forwards:
//!
//! ```text
//! INFO activity{id=1 depth=0 translet="/orders/checkout"}: Including translet translet="/cart/summary" depth=1
//! INFO activity{id=1 depth=0 translet="/orders/checkout"}: Forwarding from="/orders/checkout" to="/orders/receipt" hop=1
//! ```
//!
//! **With `RUST_LOG=debug`** the same request also shows the advice around it:
//!
//! ```text
//! DEBUG activity{id=1 depth=0 translet="/orders/checkout"}: Executing advice aspect_id="audit" advice=before action=bean#audit(auditor.start)
//! DEBUG activity{id=1 depth=0 translet="/orders/checkout"}: Executing action action=bean#cart(cartService.load)
//! ```

/// Initializes the tracing/logging infrastructure for the application.
///
/// # Example
///
/// ```ignore
/// setup_tracing();
/// tracing::info!("Application started");
/// ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact() // spans render inline, e.g. "activity{id=1}:"
        .init();
}
