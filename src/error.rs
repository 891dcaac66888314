//! # Activity Errors
//!
//! Every failure an activity can surface is an [`ActivityError`].
//!
//! Errors carry a *type lineage* (most specific name first) so exception rules
//! can match a raised error by substring against any of its kinds, the same way
//! a handler declared for a general kind catches every more specific one.
//!
//! Wrapping variants ([`ActivityError::Prepare`], [`ActivityError::ActionExecution`],
//! [`ActivityError::AdviceExecution`]) keep the underlying error as their source;
//! [`ActivityError::root_cause`] walks through them.

use std::fmt;

use crate::rule::{AdviceType, MethodType};

/// Convenience alias used across the engine.
pub type ActivityResult<T> = Result<T, ActivityError>;

/// An application-level failure raised by a bean method or handler.
///
/// The lineage lists the failure's kind followed by the kinds it specializes,
/// e.g. `["InsufficientFundsException", "PaymentException", "RuntimeException"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    lineage: Vec<String>,
    message: String,
}

impl Failure {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            lineage: vec![type_name.into()],
            message: message.into(),
        }
    }

    /// Declares that this failure's kind specializes `super_type`.
    pub fn extends(mut self, super_type: impl Into<String>) -> Self {
        self.lineage.push(super_type.into());
        self
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new("IllegalStateException", message).extends("RuntimeException")
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::new("IllegalArgumentException", message).extends("RuntimeException")
    }

    pub fn type_name(&self) -> &str {
        self.lineage.first().map(String::as_str).unwrap_or("Exception")
    }

    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name(), self.message)
    }
}

/// Errors surfaced by activity preparation, execution and response commit.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActivityError {
    #[error("No translet mapped to '{name}' (method: {method:?})")]
    TransletNotFound {
        name: String,
        method: Option<MethodType>,
    },

    #[error("Failed to prepare activity: {0}")]
    Prepare(#[source] Box<ActivityError>),

    #[error("Failed to perform activity: {0}")]
    Perform(#[source] Box<ActivityError>),

    #[error("Missing mandatory parameters: {}", .0.join(", "))]
    MissingMandatoryParameters(Vec<String>),

    #[error("Missing mandatory attributes: {}", .0.join(", "))]
    MissingMandatoryAttributes(Vec<String>),

    #[error("Failed to execute action {action}: {source}")]
    ActionExecution {
        action: String,
        #[source]
        source: Box<ActivityError>,
    },

    #[error("Failed to execute {advice} advice of aspect '{aspect_id}': {source}")]
    AdviceExecution {
        aspect_id: String,
        advice: AdviceType,
        #[source]
        source: Box<ActivityError>,
    },

    #[error("{0}")]
    Raised(Failure),

    #[error("Illegal rule: {0}")]
    IllegalRule(String),

    #[error("Expression error: {0}")]
    Expression(String),

    #[error("No bean found for '{0}'")]
    BeanNotFound(String),

    #[error("Response error: {0}")]
    Response(String),

    #[error("Forward limit exceeded at '{name}' after {hops} hops")]
    ForwardLimitExceeded { name: String, hops: usize },

    #[error("Activity terminated: {0}")]
    Terminated(String),
}

impl ActivityError {
    /// Raises an application failure.
    pub fn raise(failure: Failure) -> Self {
        Self::Raised(failure)
    }

    /// Signals that the current activity must stop immediately.
    pub fn terminate(reason: impl Into<String>) -> Self {
        Self::Terminated(reason.into())
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.root_cause(), Self::Terminated(_))
    }

    /// Walks through wrapping variants to the error that started the chain.
    ///
    /// `Perform` is not unwrapped: it marks response commit failures and is the
    /// kind callers are expected to see for them.
    pub fn root_cause(&self) -> &ActivityError {
        match self {
            Self::Prepare(inner) => inner.root_cause(),
            Self::ActionExecution { source, .. } | Self::AdviceExecution { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    pub fn into_root_cause(self) -> ActivityError {
        match self {
            Self::Prepare(inner) => (*inner).into_root_cause(),
            Self::ActionExecution { source, .. } | Self::AdviceExecution { source, .. } => {
                (*source).into_root_cause()
            }
            other => other,
        }
    }

    /// Kind names of this error, most specific first, always ending in `Exception`.
    pub fn type_lineage(&self) -> Vec<&str> {
        let own: &[&str] = match self {
            Self::TransletNotFound { .. } => &["TransletNotFoundException", "ActivityException"],
            Self::Prepare(_) => &["ActivityPrepareException", "ActivityException"],
            Self::Perform(_) => &["ActivityPerformException", "ActivityException"],
            Self::MissingMandatoryParameters(_) => &[
                "MissingMandatoryParametersException",
                "RequestException",
                "ActivityException",
            ],
            Self::MissingMandatoryAttributes(_) => &[
                "MissingMandatoryAttributesException",
                "RequestException",
                "ActivityException",
            ],
            Self::ActionExecution { .. } => &["ActionExecutionException", "ActivityException"],
            Self::AdviceExecution { .. } => &["AdviceException", "ActivityException"],
            Self::IllegalRule(_) => &["IllegalRuleException", "ActivityException"],
            Self::Expression(_) => &["ExpressionParserException", "IllegalArgumentException"],
            Self::BeanNotFound(_) => &["BeanNotFoundException", "BeanException"],
            Self::Response(_) => &["ResponseException", "ActivityException"],
            Self::ForwardLimitExceeded { .. } => &["ForwardLimitExceededException", "ActivityException"],
            Self::Terminated(_) => &["ActivityTerminatedException", "ActivityException"],
            Self::Raised(failure) => {
                let mut lineage: Vec<&str> = failure.lineage().iter().map(String::as_str).collect();
                if lineage.last() != Some(&"Exception") {
                    lineage.push("Exception");
                }
                return lineage;
            }
        };
        own.iter().copied().chain(std::iter::once("Exception")).collect()
    }

    /// Distance from the most specific kind to the first kind containing `pattern`.
    pub fn lineage_depth(&self, pattern: &str) -> Option<usize> {
        self.type_lineage().iter().position(|kind| kind.contains(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_action_and_prepare_wrappers() {
        let failure = Failure::new("IllegalStateException", "boom");
        let error = ActivityError::Prepare(Box::new(ActivityError::ActionExecution {
            action: "bean:a.b".to_string(),
            source: Box::new(ActivityError::Raised(failure.clone())),
        }));

        match error.root_cause() {
            ActivityError::Raised(inner) => assert_eq!(inner, &failure),
            other => panic!("unexpected root cause: {other:?}"),
        }
    }

    #[test]
    fn test_raised_lineage_ends_with_exception() {
        let error = ActivityError::raise(Failure::illegal_state("nope"));
        assert_eq!(
            error.type_lineage(),
            vec!["IllegalStateException", "RuntimeException", "Exception"]
        );
        assert_eq!(error.lineage_depth("Runtime"), Some(1));
        assert_eq!(error.lineage_depth("Missing"), None);
    }

    #[test]
    fn test_termination_is_detected_through_wrappers() {
        let error = ActivityError::AdviceExecution {
            aspect_id: "audit".to_string(),
            advice: AdviceType::Before,
            source: Box::new(ActivityError::terminate("stop")),
        };
        assert!(error.is_terminated());
    }
}
