//! # Aspects
//!
//! Pointcut matching and the per-translet advice registries built from it.
//!
//! Registries for translets with fixed names are computed once when the
//! [`ActivityContext`](crate::activity::ActivityContext) is built and cached on the
//! rule; every activity works on a [replicated](AdviceRegistries::replicate) copy so
//! aspects registered at run time never leak into other activities. Translets whose
//! names carry path variables get their registries computed per activity against
//! the requested name.

mod pointcut;
mod registry;

pub use pointcut::{NameMatcher, Pointcut, PointcutPattern};
pub use registry::{AdviceRegistries, AdviceUnit, AspectAdviceRuleRegistry};
