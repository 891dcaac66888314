use std::sync::Arc;

use serde_json::json;
use tracing::{info, info_span, Instrument};
use translet_engine::activity::ActivityContext;
use translet_engine::bean::{BeanRule, BeanScope, FnBean};
use translet_engine::error::{ActivityError, Failure};
use translet_engine::expression::value_to_text;
use translet_engine::lifecycle::{setup_tracing, ActivityService, ServiceRequest, TransletClient};
use translet_engine::rule::{
    ActionList, AspectRule, BeanMethodActionRule, ExceptionRule, ExceptionThrownRule, ForwardRule,
    IncludeActionRule, ItemRule, RedirectRule, TransformRule, TransletRule,
};

fn build_context() -> Result<Arc<ActivityContext>, ActivityError> {
    ActivityContext::builder()
        .bean(BeanRule::of("catalog", BeanScope::Singleton, || {
            FnBean::new()
                .method("find", |call| {
                    let id = call.argument("id").map(value_to_text).unwrap_or_default();
                    if id == "0" {
                        return Err(ActivityError::raise(Failure::illegal_state("product 0 is retired")));
                    }
                    Ok(json!({"id": id, "name": format!("Widget {id}")}))
                })
                .method("featured", |_| Ok(json!(["Widget 1", "Widget 2"])))
        }))
        .bean(BeanRule::of("audit", BeanScope::Request, || {
            FnBean::new()
                .method("start", |_| Ok(json!("started")))
                .method("end", |_| Ok(json!("ended")))
        }))
        .aspect(
            AspectRule::builder("audit")
                .order(1)
                .include("/products/**")
                .advice_bean("audit")
                .before(BeanMethodActionRule::advice("start"))
                .finally(BeanMethodActionRule::advice("end"))
                .build()?,
        )
        .translet(
            TransletRule::new("/products/${id}")
                .content(
                    ActionList::new()
                        .action(
                            BeanMethodActionRule::new("catalog", "find")
                                .id("product")
                                .argument(ItemRule::new("id").value("@{id}")),
                        )
                        .action(IncludeActionRule::new("/products/featured").id("featured")),
                )
                .response(TransformRule::json())
                .exception(
                    ExceptionRule::new().thrown(
                        ExceptionThrownRule::on(["IllegalStateException"])
                            .response(RedirectRule::new("/gone").parameter(ItemRule::new("id").value("@{id}"))),
                    ),
                ),
        )
        .translet(
            TransletRule::new("/products/featured").content(
                ActionList::new().action(BeanMethodActionRule::new("catalog", "featured").id("items")),
            ),
        )
        .translet(TransletRule::new("/home").response(ForwardRule::new("/products/1")))
        .build()
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let context = build_context().map_err(|e| e.to_string())?;
    let service = ActivityService::new(context);

    async {
        let response = service
            .handle(ServiceRequest::new("/products/7"))
            .await
            .map_err(|e| e.to_string())?;
        info!(body = %response.body, "Product page");

        let response = service.get("/home").await.map_err(|e| e.to_string())?;
        info!(body = %response.body, "Home forwarded to product");

        let response = service
            .handle(ServiceRequest::new("/products/0"))
            .await
            .map_err(|e| e.to_string())?;
        info!(redirect = ?response.redirect, "Retired product redirected");
        Ok::<(), String>(())
    }
    .instrument(info_span!("demo"))
    .await
}
