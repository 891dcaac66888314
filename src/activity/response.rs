//! Committing responses through the response adapter.

use serde_json::Value;
use tracing::debug;

use super::translet::Translet;
use crate::adapter::ResponseAdapter;
use crate::error::{ActivityError, ActivityResult};
use crate::expression::{value_to_text, TokenEvaluator};
use crate::rule::{DispatchRule, RedirectRule, Response, TransformFormat, TransformRule};

/// Renders a named view for dispatch responses.
pub trait ViewDispatcher: Send + Sync {
    fn dispatch(
        &self,
        view: &str,
        rule: &DispatchRule,
        translet: &Translet,
        response: &dyn ResponseAdapter,
    ) -> ActivityResult<()>;
}

/// Produces the body of a custom transform response.
pub trait Transformer: Send + Sync {
    fn transform(&self, rule: &TransformRule, translet: &Translet) -> ActivityResult<String>;
}

/// Writes `response` for `translet`. Forward responses are handled by the activity loop.
pub(crate) fn commit(response: &Response, translet: &Translet) -> ActivityResult<()> {
    let Some(adapter) = translet.response_adapter() else {
        debug!(kind = response.kind(), "No response adapter; skipping commit");
        return Ok(());
    };
    let adapter = adapter.as_ref();
    match response {
        Response::Transform(rule) => transform(rule, translet, adapter),
        Response::Dispatch(rule) => dispatch(rule, translet, adapter),
        Response::Redirect(rule) => redirect(rule, translet, adapter),
        Response::Forward(rule) => Err(ActivityError::Response(format!(
            "forward to '{}' cannot be committed as a response",
            rule.translet_name()
        ))),
    }
}

fn apply_encoding(adapter: &dyn ResponseAdapter, declared: Option<&str>, translet: &Translet) {
    if let Some(encoding) = declared.or(translet.response_encoding()) {
        adapter.set_encoding(encoding);
    }
}

fn transform(rule: &TransformRule, translet: &Translet, adapter: &dyn ResponseAdapter) -> ActivityResult<()> {
    if let Some(content_type) = rule.get_content_type() {
        adapter.set_content_type(content_type);
    }
    apply_encoding(adapter, rule.get_encoding(), translet);

    let body = match rule.format() {
        TransformFormat::Json { pretty } => {
            let value = translet.process_result().to_value();
            let rendered = if *pretty {
                serde_json::to_string_pretty(&value)
            } else {
                serde_json::to_string(&value)
            };
            rendered.map_err(|e| ActivityError::Response(format!("failed to render JSON: {e}")))?
        }
        TransformFormat::Text(template) => {
            value_to_text(&TokenEvaluator::new(translet).evaluate(template))
        }
        TransformFormat::Custom(name) => translet
            .context()
            .transformer(name)
            .ok_or_else(|| ActivityError::Response(format!("no transformer named '{name}'")))?
            .transform(rule, translet)?,
    };
    debug!(bytes = body.len(), "Writing transformed response");
    adapter.write(&body)
}

fn dispatch(rule: &DispatchRule, translet: &Translet, adapter: &dyn ResponseAdapter) -> ActivityResult<()> {
    let context = translet.context();
    let name = rule
        .get_dispatcher()
        .or(context.config().default_dispatcher.as_deref())
        .ok_or_else(|| ActivityError::Response("no view dispatcher configured".to_string()))?;
    let dispatcher = context
        .dispatcher(name)
        .ok_or_else(|| ActivityError::Response(format!("no view dispatcher named '{name}'")))?;

    if let Some(content_type) = rule.get_content_type() {
        adapter.set_content_type(content_type);
    }
    apply_encoding(adapter, rule.get_encoding(), translet);

    let view = TokenEvaluator::new(translet)
        .evaluate_string(rule.name())
        .unwrap_or_default();
    debug!(dispatcher = name, view = %view, "Dispatching view");
    dispatcher.dispatch(&view, rule, translet, adapter)
}

fn redirect(rule: &RedirectRule, translet: &Translet, adapter: &dyn ResponseAdapter) -> ActivityResult<()> {
    let url = redirect_url(rule, translet)?;
    debug!(location = %url, "Redirecting");
    adapter.redirect(&url)
}

/// Target plus url-encoded parameters, honoring the null/empty exclusion flags.
pub(crate) fn redirect_url(rule: &RedirectRule, translet: &Translet) -> ActivityResult<String> {
    let evaluator = TokenEvaluator::new(translet);
    let target = evaluator.evaluate_string(rule.target()).unwrap_or_default();
    if target.is_empty() {
        return Err(ActivityError::Response("redirect target is empty".to_string()));
    }

    let mut query = Vec::new();
    for item in rule.parameters() {
        let values: Vec<Option<String>> = match evaluator.evaluate_item(item).unwrap_or(Value::Null) {
            Value::Null => vec![None],
            Value::Array(items) => items
                .iter()
                .map(|value| (!value.is_null()).then(|| value_to_text(value)))
                .collect(),
            other => vec![Some(value_to_text(&other))],
        };
        for value in values {
            match &value {
                None if rule.excludes_null_parameters() => continue,
                Some(text) if text.is_empty() && rule.excludes_empty_parameters() => continue,
                _ => {}
            }
            query.push(format!(
                "{}={}",
                urlencoding::encode(item.name()),
                urlencoding::encode(value.as_deref().unwrap_or_default())
            ));
        }
    }

    if query.is_empty() {
        return Ok(target);
    }
    let separator = if target.contains('?') { '&' } else { '?' };
    Ok(format!("{target}{separator}{}", query.join("&")))
}
