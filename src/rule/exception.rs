use super::action::ActionRule;
use super::response::Response;
use crate::error::ActivityError;

/// Handler for raised errors whose lineage contains one of `exception_types`.
///
/// An empty type list makes this the default handler of its [`ExceptionRule`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionThrownRule {
    exception_types: Vec<String>,
    action: Option<ActionRule>,
    responses: Vec<Response>,
    default_response: Option<Response>,
}

impl ExceptionThrownRule {
    /// Handler for every raised error not claimed by a more specific one.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<'a>(exception_types: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            exception_types: exception_types.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn action(mut self, action: impl Into<ActionRule>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Responses declaring a content type become variants; the first without one is the default.
    pub fn response(mut self, response: impl Into<Response>) -> Self {
        let response = response.into();
        if response.content_type().is_some() {
            self.responses.push(response);
        } else if self.default_response.is_none() {
            self.default_response = Some(response);
        }
        self
    }

    pub fn exception_types(&self) -> &[String] {
        &self.exception_types
    }

    pub fn handler_action(&self) -> Option<&ActionRule> {
        self.action.as_ref()
    }

    /// Variant matching the desired content type, then the default, then the first variant.
    pub fn desired_response(&self, content_type: Option<&str>) -> Option<&Response> {
        content_type
            .and_then(|wanted| {
                self.responses
                    .iter()
                    .find(|response| response.content_type() == Some(wanted))
            })
            .or(self.default_response.as_ref())
            .or_else(|| self.responses.first())
    }

    fn depth(&self, error: &ActivityError) -> Option<usize> {
        self.exception_types
            .iter()
            .filter_map(|pattern| error.lineage_depth(pattern))
            .min()
    }
}

/// Exception handlers of a translet or aspect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionRule {
    thrown_rules: Vec<ExceptionThrownRule>,
    default_rule: Option<ExceptionThrownRule>,
}

impl ExceptionRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thrown(mut self, rule: ExceptionThrownRule) -> Self {
        if rule.exception_types.is_empty() {
            self.default_rule = Some(rule);
        } else {
            self.thrown_rules.push(rule);
        }
        self
    }

    /// Finds the handler for `error`'s root cause.
    ///
    /// The handler whose declared type sits closest to the most specific kind wins;
    /// declaration order breaks ties. The default handler catches everything else.
    pub fn find(&self, error: &ActivityError) -> Option<&ExceptionThrownRule> {
        let cause = error.root_cause();
        let mut best: Option<(usize, &ExceptionThrownRule)> = None;
        for rule in &self.thrown_rules {
            if let Some(depth) = rule.depth(cause) {
                if best.map_or(true, |(best_depth, _)| depth < best_depth) {
                    best = Some((depth, rule));
                }
            }
        }
        best.map(|(_, rule)| rule).or(self.default_rule.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.thrown_rules.is_empty() && self.default_rule.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Failure;
    use crate::rule::TransformRule;

    fn payment_failure() -> ActivityError {
        ActivityError::ActionExecution {
            action: "bean-method(payments.charge)".to_string(),
            source: Box::new(ActivityError::raise(
                Failure::new("InsufficientFundsException", "balance too low")
                    .extends("PaymentException")
                    .extends("RuntimeException"),
            )),
        }
    }

    #[test]
    fn test_most_specific_declared_type_wins() {
        let rule = ExceptionRule::new()
            .thrown(ExceptionThrownRule::on(["RuntimeException"]).response(TransformRule::text("generic")))
            .thrown(ExceptionThrownRule::on(["Payment"]).response(TransformRule::text("payment")));

        let thrown = rule.find(&payment_failure()).expect("a handler");
        assert_eq!(thrown.exception_types(), &["Payment".to_string()]);
    }

    #[test]
    fn test_default_handler_catches_unmatched_errors() {
        let rule = ExceptionRule::new()
            .thrown(ExceptionThrownRule::on(["Timeout"]))
            .thrown(ExceptionThrownRule::new().response(TransformRule::text("fallback")));

        let thrown = rule.find(&payment_failure()).expect("default handler");
        assert!(thrown.exception_types().is_empty());
        assert!(ExceptionRule::new().find(&payment_failure()).is_none());
    }

    #[test]
    fn test_desired_response_prefers_content_type_variant() {
        let thrown = ExceptionThrownRule::new()
            .response(TransformRule::json())
            .response(TransformRule::text("plain").content_type("text/html"));

        let html = thrown.desired_response(Some("text/html")).expect("variant");
        assert_eq!(html.content_type(), Some("text/html"));

        let fallback = thrown.desired_response(Some("text/csv")).expect("fallback");
        assert_eq!(fallback.content_type(), Some("application/json"));
    }
}
