use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use translet_engine::activity::{Activity, ActivityContext, ActivityState};
use translet_engine::adapter::BasicRequestAdapter;
use translet_engine::bean::{Bean, BeanRule, BeanScope, FnBean};
use translet_engine::config::EngineConfig;
use translet_engine::error::{ActivityError, ActivityResult, Failure};
use translet_engine::mock::{MockResponseAdapter, RecordingBean};
use translet_engine::rule::{
    ActionList, AspectRule, BeanMethodActionRule, ChooseRule, EchoActionRule, ExceptionRule,
    ExceptionThrownRule, ForwardRule, IncludeActionRule, ItemRule, MethodType, RedirectRule,
    RequestRule, TransformRule, TransletRule, WhenRule,
};

/// Runs `name` against a fresh mock response and returns the outcome with the activity.
fn run(
    context: &Arc<ActivityContext>,
    name: &str,
    request: BasicRequestAdapter,
) -> (ActivityResult<Value>, Activity, Arc<MockResponseAdapter>) {
    run_with_method(context, name, None, request)
}

fn run_with_method(
    context: &Arc<ActivityContext>,
    name: &str,
    method: Option<MethodType>,
    request: BasicRequestAdapter,
) -> (ActivityResult<Value>, Activity, Arc<MockResponseAdapter>) {
    let response = Arc::new(MockResponseAdapter::new());
    let mut activity = Activity::new(Arc::clone(context), Arc::new(request)).with_response(response.clone());
    let result = activity.execute(name, method).map(|result| result.to_value());
    (result, activity, response)
}

fn body_json(response: &MockResponseAdapter) -> Value {
    let writes = response.writes();
    assert_eq!(writes.len(), 1, "expected exactly one body, got {writes:?}");
    serde_json::from_str(&writes[0]).expect("Response body is not JSON")
}

fn probe_bean() -> FnBean {
    FnBean::new()
        .method("current", |_| {
            Ok(ActivityContext::current_activity()
                .map(|current| json!(current.translet_name))
                .unwrap_or(Value::Null))
        })
        .method("remember", |call| {
            let name = ActivityContext::current_activity()
                .map(|current| current.translet_name)
                .unwrap_or_default();
            call.translet()?.set_attribute("who", name);
            Ok(Value::Null)
        })
}

#[test]
fn test_advice_wraps_content_in_aspect_order() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .aspect(
            AspectRule::builder("outer")
                .order(1)
                .include("/shop/**")
                .before(BeanMethodActionRule::new("log", "outerBefore"))
                .after(BeanMethodActionRule::new("log", "outerAfter"))
                .finally(BeanMethodActionRule::new("log", "outerFinally"))
                .build()
                .expect("Failed to build aspect"),
        )
        .aspect(
            AspectRule::builder("inner")
                .order(2)
                .include("/shop/**")
                .before(BeanMethodActionRule::new("log", "innerBefore"))
                .after(BeanMethodActionRule::new("log", "innerAfter"))
                .finally(BeanMethodActionRule::new("log", "innerFinally"))
                .build()
                .expect("Failed to build aspect"),
        )
        .translet(
            TransletRule::new("/shop/cart")
                .content(ActionList::new().action(BeanMethodActionRule::new("log", "content")))
                .response(TransformRule::text("done")),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/shop/cart", BasicRequestAdapter::new());

    result.expect("Activity failed");
    assert_eq!(
        log.methods(),
        vec![
            "outerBefore",
            "innerBefore",
            "content",
            "innerAfter",
            "outerAfter",
            "innerFinally",
            "outerFinally"
        ]
    );
    assert_eq!(response.writes(), vec!["done"]);
    assert_eq!(response.commit_count(), 1);
    assert_eq!(response.flush_count(), 1);
    assert_eq!(activity.state(), ActivityState::Finished);
}

#[test]
fn test_finally_advice_runs_when_content_fails() {
    let log = RecordingBean::new();
    log.expect_call("content")
        .return_err(Failure::illegal_state("inventory offline"));
    log.expect_call("brokenFinally")
        .return_err(Failure::illegal_argument("cleanup failed"));

    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .aspect(
            AspectRule::builder("audit")
                .before(BeanMethodActionRule::new("log", "before"))
                .after(BeanMethodActionRule::new("log", "after"))
                .finally(BeanMethodActionRule::new("log", "brokenFinally"))
                .finally(BeanMethodActionRule::new("log", "finally"))
                .build()
                .expect("Failed to build aspect"),
        )
        .translet(
            TransletRule::new("/stock")
                .content(ActionList::new().action(BeanMethodActionRule::new("log", "content")))
                .response(TransformRule::json()),
        )
        .build()
        .expect("Failed to build context");

    let (result, _activity, response) = run(&context, "/stock", BasicRequestAdapter::new());

    // The original failure surfaces unwrapped, not the finally advice failure
    match result {
        Err(ActivityError::Raised(failure)) => {
            assert_eq!(failure.type_name(), "IllegalStateException");
            assert_eq!(failure.message(), "inventory offline");
        }
        other => panic!("expected the content failure, got {other:?}"),
    }
    assert_eq!(log.methods(), vec!["before", "content", "finally", "brokenFinally"]);
    assert_eq!(response.commit_count(), 0);
    assert_eq!(response.flush_count(), 1);
    log.verify();
}

#[test]
fn test_exception_rule_remaps_failure_to_redirect() {
    let context = ActivityContext::builder()
        .bean(BeanRule::of("orders", BeanScope::Singleton, || {
            FnBean::new().method("load", |_| {
                Err(ActivityError::raise(
                    Failure::new("OrderLockedException", "order is locked").extends("IllegalStateException"),
                ))
            })
        }))
        .translet(
            TransletRule::new("/orders/view")
                .content(ActionList::new().action(BeanMethodActionRule::new("orders", "load").id("order")))
                .response(TransformRule::json())
                .exception(
                    ExceptionRule::new().thrown(
                        ExceptionThrownRule::on(["IllegalStateException"]).response(
                            RedirectRule::new("/error").parameter(ItemRule::new("reason").value("bad input")),
                        ),
                    ),
                ),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/orders/view", BasicRequestAdapter::new());

    result.expect("Handled exception must not escape");
    assert_eq!(response.redirects(), vec!["/error?reason=bad%20input"]);
    assert_eq!(response.commit_count(), 1);
    let translet = activity.translet().expect("Translet missing");
    assert!(translet.raised_exception().is_none());
}

#[test]
fn test_aspect_exception_rule_records_thrown_advice_result() {
    let context = ActivityContext::builder()
        .bean(BeanRule::of("payments", BeanScope::Singleton, || {
            FnBean::new().method("charge", |_| Err(ActivityError::raise(Failure::illegal_state("declined"))))
        }))
        .aspect(
            AspectRule::builder("guard")
                .exception(
                    ExceptionRule::new().thrown(
                        ExceptionThrownRule::new()
                            .action(EchoActionRule::new().item(ItemRule::new("handled").value("yes")))
                            .response(TransformRule::text("sorry, @{handled}")),
                    ),
                )
                .build()
                .expect("Failed to build aspect"),
        )
        .translet(
            TransletRule::new("/pay")
                .content(ActionList::new().action(BeanMethodActionRule::new("payments", "charge")))
                .response(TransformRule::json()),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/pay", BasicRequestAdapter::new());

    result.expect("Handled exception must not escape");
    assert_eq!(response.writes(), vec!["sorry, yes"]);
    let translet = activity.translet().expect("Translet missing");
    assert_eq!(translet.thrown_advice_result("guard"), Some(&json!({"handled": "yes"})));
}

#[test]
fn test_desired_content_type_selects_exception_response() {
    let context = ActivityContext::builder()
        .bean(BeanRule::of("broken", BeanScope::Singleton, || {
            FnBean::new().method("run", |_| Err(ActivityError::raise(Failure::illegal_state("nope"))))
        }))
        .translet(
            TransletRule::new("/api/run")
                .content(ActionList::new().action(BeanMethodActionRule::new("broken", "run")))
                .response(TransformRule::text("ok"))
                .exception(
                    ExceptionRule::new().thrown(
                        ExceptionThrownRule::new()
                            .response(TransformRule::text("plain error"))
                            .response(TransformRule::text("json error").content_type("application/json")),
                    ),
                ),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, response) = run(
        &context,
        "/api/run",
        BasicRequestAdapter::new().with_accept("application/json"),
    );
    result.expect("Activity failed");
    assert_eq!(response.writes(), vec!["json error"]);

    let (result, _, response) = run(&context, "/api/run", BasicRequestAdapter::new());
    result.expect("Activity failed");
    assert_eq!(response.writes(), vec!["plain error"]);
}

#[test]
fn test_forward_chain_shares_process_result() {
    let context = ActivityContext::builder()
        .bean(BeanRule::of("reader", BeanScope::Singleton, || {
            FnBean::new().method("peek", |call| {
                let translet = call.translet()?;
                let read = |id: &str| {
                    translet
                        .action_result(id)
                        .map(|result| result.to_value())
                        .unwrap_or(Value::Null)
                };
                Ok(json!({"a": read("a"), "b": read("b")}))
            })
        }))
        .translet(
            TransletRule::new("/a")
                .content(ActionList::new().action(EchoActionRule::new().id("a").item(ItemRule::new("x").value("1"))))
                .response(ForwardRule::new("/b")),
        )
        .translet(
            TransletRule::new("/b")
                .content(ActionList::new().action(EchoActionRule::new().id("b").item(ItemRule::new("y").value("2"))))
                .response(ForwardRule::new("/c")),
        )
        .translet(
            TransletRule::new("/c")
                .content(
                    ActionList::new().action(
                        BeanMethodActionRule::new("reader", "peek")
                            .id("seen")
                            .requires_translet(),
                    ),
                )
                .response(TransformRule::json()),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/a", BasicRequestAdapter::new());

    let expected = json!({
        "a": {"x": "1"},
        "b": {"y": "2"},
        "seen": {"a": {"x": "1"}, "b": {"y": "2"}}
    });
    assert_eq!(result.expect("Activity failed"), expected);
    assert_eq!(body_json(&response), expected);
    assert_eq!(activity.forward_hops(), 2);
    assert_eq!(activity.translet().expect("Translet missing").name(), "/c");
}

#[test]
fn test_forward_loop_is_bounded() {
    let context = ActivityContext::builder()
        .config(EngineConfig {
            max_forward_hops: 3,
            ..EngineConfig::default()
        })
        .translet(TransletRule::new("/ping").response(ForwardRule::new("/pong")))
        .translet(TransletRule::new("/pong").response(ForwardRule::new("/ping")))
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/ping", BasicRequestAdapter::new());

    match result {
        Err(ActivityError::ForwardLimitExceeded { hops, .. }) => assert_eq!(hops, 3),
        other => panic!("expected the forward limit, got {other:?}"),
    }
    assert_eq!(activity.forward_hops(), 3);
    assert_eq!(response.commit_count(), 0);
}

#[test]
fn test_include_nests_results_and_restores_current_activity() {
    let context = ActivityContext::builder()
        .bean(BeanRule::of("probe", BeanScope::Singleton, probe_bean))
        .translet(
            TransletRule::new("/page")
                .content(
                    ActionList::new()
                        .action(EchoActionRule::new().id("title").item(ItemRule::new("t").value("Home")))
                        .action(IncludeActionRule::new("/widget").id("widget"))
                        .action(BeanMethodActionRule::new("probe", "current").id("after")),
                )
                .response(TransformRule::json()),
        )
        .translet(
            TransletRule::new("/widget")
                .content(ActionList::new().action(BeanMethodActionRule::new("probe", "current").id("who")))
                .response(TransformRule::text("never committed")),
        )
        .build()
        .expect("Failed to build context");

    let (result, _activity, response) = run(&context, "/page", BasicRequestAdapter::new());

    let expected = json!({
        "title": {"t": "Home"},
        "widget": {"who": "/widget"},
        "after": "/page"
    });
    assert_eq!(result.expect("Activity failed"), expected);
    assert_eq!(body_json(&response), expected);
    assert_eq!(response.flush_count(), 1);
    assert!(ActivityContext::current_activity().is_none());
}

#[test]
fn test_failed_include_restores_parent_binding_for_handler() {
    let context = ActivityContext::builder()
        .bean(BeanRule::of("probe", BeanScope::Singleton, probe_bean))
        .bean(BeanRule::of("broken", BeanScope::Singleton, || {
            FnBean::new().method("run", |_| Err(ActivityError::raise(Failure::illegal_state("widget down"))))
        }))
        .translet(
            TransletRule::new("/page")
                .content(ActionList::new().action(IncludeActionRule::new("/broken").id("x")))
                .response(TransformRule::json())
                .exception(
                    ExceptionRule::new().thrown(
                        ExceptionThrownRule::new()
                            .action(BeanMethodActionRule::new("probe", "remember").requires_translet())
                            .response(TransformRule::text("@{who}")),
                    ),
                ),
        )
        .translet(
            TransletRule::new("/broken")
                .content(ActionList::new().action(BeanMethodActionRule::new("broken", "run"))),
        )
        .build()
        .expect("Failed to build context");

    let (result, _activity, response) = run(&context, "/page", BasicRequestAdapter::new());

    result.expect("Handled exception must not escape");
    assert_eq!(response.writes(), vec!["/page"]);
}

#[test]
fn test_missing_mandatory_parameter_fails_preparation() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .translet(
            TransletRule::new("/users/find")
                .request(RequestRule::new().parameter(ItemRule::new("id").mandatory()))
                .content(ActionList::new().action(BeanMethodActionRule::new("log", "lookup")))
                .response(TransformRule::text("found")),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/users/find", BasicRequestAdapter::new());

    let error = result.expect_err("Missing parameter must fail");
    assert!(matches!(error, ActivityError::Prepare(_)));
    match error.root_cause() {
        ActivityError::MissingMandatoryParameters(names) => assert_eq!(names, &vec!["id".to_string()]),
        other => panic!("expected missing parameters, got {other:?}"),
    }
    assert_eq!(response.commit_count(), 0);
    assert_eq!(activity.state(), ActivityState::Finished);
    assert!(log.calls().is_empty(), "content ran: {:?}", log.methods());

    let (result, _, response) = run(
        &context,
        "/users/find",
        BasicRequestAdapter::new().with_parameter("id", "7"),
    );
    result.expect("Activity failed");
    assert_eq!(response.writes(), vec!["found"]);
}

#[test]
fn test_missing_mandatory_parameter_handled_by_exception_rule() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .translet(
            TransletRule::new("/users/find")
                .request(RequestRule::new().parameter(ItemRule::new("id").mandatory()))
                .content(ActionList::new().action(BeanMethodActionRule::new("log", "lookup")))
                .response(TransformRule::text("found"))
                .exception(
                    ExceptionRule::new().thrown(
                        ExceptionThrownRule::on(["MissingMandatoryParametersException"])
                            .response(TransformRule::text("id required")),
                    ),
                ),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, response) = run(&context, "/users/find", BasicRequestAdapter::new());

    result.expect("Handled exception must not escape");
    assert_eq!(response.writes(), vec!["id required"]);
    assert!(log.calls().is_empty(), "content must not run");
}

#[test]
fn test_declared_parameter_defaults_fill_request() {
    let context = ActivityContext::builder()
        .translet(
            TransletRule::new("/search")
                .request(
                    RequestRule::new()
                        .parameter(ItemRule::new("page").value("${page:1}"))
                        .attribute(ItemRule::new("tags").values(["new", "${tag}"])),
                )
                .content(
                    ActionList::new().action(
                        EchoActionRule::new()
                            .id("query")
                            .item(ItemRule::new("page").value("${page}"))
                            .item(ItemRule::new("tags").value("@{tags}")),
                    ),
                )
                .response(TransformRule::json()),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, _) = run(&context, "/search", BasicRequestAdapter::new().with_parameter("tag", "sale"));

    assert_eq!(
        result.expect("Activity failed"),
        json!({"query": {"page": "1", "tags": ["new", "sale"]}})
    );
}

#[test]
fn test_aspect_registered_at_run_time_runs_its_before_advice() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .bean(BeanRule::of("installer", BeanScope::Singleton, || {
            FnBean::new().method("install", |call| {
                let aspect = AspectRule::builder("late")
                    .before(BeanMethodActionRule::new("log", "lateBefore"))
                    .after(BeanMethodActionRule::new("log", "lateAfter"))
                    .build()?;
                call.translet()?.register_aspect_rule(aspect);
                Ok(Value::Null)
            })
        }))
        .translet(
            TransletRule::new("/setup")
                .content(
                    ActionList::new()
                        .action(BeanMethodActionRule::new("installer", "install").requires_translet())
                        .action(BeanMethodActionRule::new("log", "content")),
                )
                .response(TransformRule::text("ok")),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, _) = run(&context, "/setup", BasicRequestAdapter::new());

    result.expect("Activity failed");
    assert_eq!(log.methods(), vec!["lateBefore", "content", "lateAfter"]);
    assert!(activity.advice_registries().contains("late"));
}

#[test]
fn test_isolated_aspect_registered_at_run_time_is_ignored() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .bean(BeanRule::of("installer", BeanScope::Singleton, || {
            FnBean::new().method("install", |call| {
                let aspect = AspectRule::builder("isolated")
                    .isolated()
                    .before(BeanMethodActionRule::new("log", "isoBefore"))
                    .after(BeanMethodActionRule::new("log", "isoAfter"))
                    .build()?;
                call.translet()?.register_aspect_rule(aspect);
                Ok(Value::Null)
            })
        }))
        .translet(
            TransletRule::new("/setup")
                .content(
                    ActionList::new()
                        .action(BeanMethodActionRule::new("installer", "install").requires_translet())
                        .action(BeanMethodActionRule::new("log", "content")),
                )
                .response(TransformRule::text("ok")),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, _) = run(&context, "/setup", BasicRequestAdapter::new());

    result.expect("Activity failed");
    assert_eq!(log.methods(), vec!["content"]);
    assert!(!activity.advice_registries().contains("isolated"));
}

#[test]
fn test_choose_selects_branch_and_reserves_its_response() {
    let context = ActivityContext::builder()
        .translet(
            TransletRule::new("/greet")
                .content(
                    ActionList::new().action(
                        ChooseRule::new()
                            .when(
                                WhenRule::when("${kind} == 'vip'")
                                    .expect("Invalid condition")
                                    .action(
                                        EchoActionRule::new()
                                            .id("greeting")
                                            .item(ItemRule::new("msg").value("welcome back")),
                                    )
                                    .response(TransformRule::text("vip")),
                            )
                            .when(
                                WhenRule::otherwise().action(
                                    EchoActionRule::new()
                                        .id("greeting")
                                        .item(ItemRule::new("msg").value("hello")),
                                ),
                            ),
                    ),
                )
                .response(TransformRule::text("regular: @{msg}")),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, response) = run(&context, "/greet", BasicRequestAdapter::new().with_parameter("kind", "vip"));
    assert_eq!(
        result.expect("Activity failed"),
        json!({"greeting": {"msg": "welcome back"}})
    );
    assert_eq!(response.writes(), vec!["vip"]);

    let (result, _, response) = run(&context, "/greet", BasicRequestAdapter::new().with_parameter("kind", "guest"));
    assert_eq!(result.expect("Activity failed"), json!({"greeting": {"msg": "hello"}}));
    assert_eq!(response.writes(), vec!["regular: hello"]);
}

#[test]
fn test_redirect_encodes_and_excludes_parameters() {
    let context = ActivityContext::builder()
        .translet(
            TransletRule::new("/find").response(
                RedirectRule::new("/search?x=1")
                    .parameter(ItemRule::new("q").value("${q}"))
                    .parameter(ItemRule::new("empty").value(""))
                    .parameter(ItemRule::new("missing").value("${missing}"))
                    .exclude_null_parameters()
                    .exclude_empty_parameters(),
            ),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, response) = run(&context, "/find", BasicRequestAdapter::new().with_parameter("q", "a b&c"));

    result.expect("Activity failed");
    assert_eq!(response.redirects(), vec!["/search?x=1&q=a%20b%26c"]);
}

#[test]
fn test_request_scoped_bean_destroyed_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicUsize::new(0));
    let (created_hook, destroyed_hook) = (Arc::clone(&created), Arc::clone(&destroyed));

    let context = ActivityContext::builder()
        .bean(BeanRule::new("cart", BeanScope::Request, move || {
            created_hook.fetch_add(1, Ordering::SeqCst);
            let destroyed = Arc::clone(&destroyed_hook);
            Ok(Arc::new(
                FnBean::new()
                    .method("touch", |_| Ok(json!("touched")))
                    .on_destroy(move || {
                        destroyed.fetch_add(1, Ordering::SeqCst);
                    }),
            ) as Arc<dyn Bean>)
        }))
        .translet(
            TransletRule::new("/cart")
                .content(
                    ActionList::new()
                        .action(BeanMethodActionRule::new("cart", "touch").id("first"))
                        .action(IncludeActionRule::new("/cart/summary").id("summary"))
                        .action(BeanMethodActionRule::new("cart", "touch").id("second")),
                )
                .response(TransformRule::json()),
        )
        .translet(
            TransletRule::new("/cart/summary")
                .content(ActionList::new().action(BeanMethodActionRule::new("cart", "touch").id("nested"))),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, _) = run(&context, "/cart", BasicRequestAdapter::new());

    result.expect("Activity failed");
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_request_scope_destroyed_when_preparation_fails() {
    let bean = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("audit", Arc::new(bean.clone())))
        .translet(
            TransletRule::new("/strict")
                .request(RequestRule::new().parameter(ItemRule::new("token").mandatory())),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, _) = run(&context, "/strict", BasicRequestAdapter::new());

    assert!(result.is_err());
    assert!(activity.request_scope().is_destroyed());
}

#[test]
fn test_hidden_actions_leave_no_result() {
    let context = ActivityContext::builder()
        .translet(
            TransletRule::new("/quiet")
                .content(
                    ActionList::new()
                        .action(
                            EchoActionRule::new()
                                .id("secret")
                                .item(ItemRule::new("token").value("abc"))
                                .hidden(),
                        )
                        .action(EchoActionRule::new().id("shown").item(ItemRule::new("token").value("@{token}"))),
                )
                .response(TransformRule::json()),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, _) = run(&context, "/quiet", BasicRequestAdapter::new());

    assert_eq!(result.expect("Activity failed"), json!({"shown": {"token": "abc"}}));
}

#[test]
fn test_path_variables_become_attributes() {
    let context = ActivityContext::builder()
        .translet(
            TransletRule::new("/users/${id}/posts/${post}")
                .content(
                    ActionList::new().action(
                        EchoActionRule::new()
                            .id("target")
                            .item(ItemRule::new("user").value("@{id}"))
                            .item(ItemRule::new("post").value("@{post}")),
                    ),
                )
                .response(TransformRule::json()),
        )
        .build()
        .expect("Failed to build context");

    let (result, _, _) = run(&context, "/users/42/posts/7", BasicRequestAdapter::new());

    assert_eq!(
        result.expect("Activity failed"),
        json!({"target": {"user": "42", "post": "7"}})
    );
}

#[test]
fn test_unknown_translet_is_not_wrapped() {
    let context = ActivityContext::builder().build().expect("Failed to build context");

    let (result, activity, response) = run(&context, "/nowhere", BasicRequestAdapter::new());

    assert!(matches!(result, Err(ActivityError::TransletNotFound { ref name, .. }) if name == "/nowhere"));
    assert_eq!(activity.state(), ActivityState::Finished);
    assert_eq!(response.flush_count(), 1);
}

#[test]
fn test_termination_runs_finally_but_skips_remap() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .bean(BeanRule::of("stopper", BeanScope::Singleton, || {
            FnBean::new().method("stop", |_| Err(ActivityError::terminate("client went away")))
        }))
        .aspect(
            AspectRule::builder("cleanup")
                .finally(BeanMethodActionRule::new("log", "finally"))
                .build()
                .expect("Failed to build aspect"),
        )
        .translet(
            TransletRule::new("/long")
                .content(ActionList::new().action(BeanMethodActionRule::new("stopper", "stop")))
                .response(TransformRule::text("done"))
                .exception(
                    ExceptionRule::new().thrown(ExceptionThrownRule::new().response(TransformRule::text("handled"))),
                ),
        )
        .build()
        .expect("Failed to build context");

    let (result, activity, response) = run(&context, "/long", BasicRequestAdapter::new());

    assert!(matches!(result, Err(ActivityError::Terminated(_))));
    assert_eq!(log.methods(), vec!["finally"]);
    assert_eq!(response.commit_count(), 0);
    let translet = activity.translet().expect("Translet missing");
    assert!(translet.raised_exception().is_none());
}

#[test]
fn test_after_advice_failure_does_not_recommit() {
    let log = RecordingBean::new();
    log.expect_call("after")
        .return_err(Failure::illegal_state("audit store full"));

    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .aspect(
            AspectRule::builder("audit")
                .after(BeanMethodActionRule::new("log", "after"))
                .build()
                .expect("Failed to build aspect"),
        )
        .translet(TransletRule::new("/report").response(TransformRule::text("report")))
        .build()
        .expect("Failed to build context");

    let (result, _, response) = run(&context, "/report", BasicRequestAdapter::new());

    match result {
        Err(ActivityError::Raised(failure)) => assert_eq!(failure.message(), "audit store full"),
        other => panic!("expected the advice failure, got {other:?}"),
    }
    assert_eq!(response.commit_count(), 1);
}

#[test]
fn test_method_and_header_filters_apply_at_execution() {
    let log = RecordingBean::new();
    let context = ActivityContext::builder()
        .bean(BeanRule::instance("log", Arc::new(log.clone())))
        .aspect(
            AspectRule::builder("posts-only")
                .method(MethodType::Post)
                .before(BeanMethodActionRule::new("log", "postOnly"))
                .build()
                .expect("Failed to build aspect"),
        )
        .aspect(
            AspectRule::builder("traced")
                .header("X-Trace")
                .before(BeanMethodActionRule::new("log", "traced"))
                .build()
                .expect("Failed to build aspect"),
        )
        .translet(TransletRule::new("/items").response(TransformRule::text("items")))
        .build()
        .expect("Failed to build context");

    let (result, _, _) = run_with_method(
        &context,
        "/items",
        Some(MethodType::Get),
        BasicRequestAdapter::new().with_header("X-Trace", "1"),
    );
    result.expect("Activity failed");
    assert_eq!(log.methods(), vec!["traced"]);

    let (result, _, _) = run_with_method(&context, "/items", Some(MethodType::Post), BasicRequestAdapter::new());
    result.expect("Activity failed");
    assert_eq!(log.methods(), vec!["traced", "postOnly"]);
}

#[test]
fn test_flush_failure_is_not_fatal() {
    let context = ActivityContext::builder()
        .translet(TransletRule::new("/ping").response(TransformRule::text("pong")))
        .build()
        .expect("Failed to build context");

    let response = Arc::new(MockResponseAdapter::new().failing_flush());
    let mut activity = Activity::new(context, Arc::new(BasicRequestAdapter::new())).with_response(response.clone());

    activity.execute("/ping", None).expect("Activity failed");
    assert_eq!(response.writes(), vec!["pong"]);
    assert_eq!(response.flush_count(), 1);
}

#[test]
fn test_prepare_and_perform_reject_wrong_states() {
    let context = ActivityContext::builder()
        .translet(TransletRule::new("/ping").response(TransformRule::text("pong")))
        .build()
        .expect("Failed to build context");
    let mut activity = Activity::new(context, Arc::new(BasicRequestAdapter::new()));

    assert!(matches!(activity.perform(), Err(ActivityError::Perform(_))));
    activity.prepare("/ping", None).expect("Failed to prepare");
    assert_eq!(activity.state(), ActivityState::Prepared);
    assert!(matches!(activity.prepare("/ping", None), Err(ActivityError::Prepare(_))));
    activity.perform().expect("Failed to perform");
    activity.finish();
    assert_eq!(activity.state(), ActivityState::Finished);
}
