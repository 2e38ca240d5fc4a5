//! Route resolution through to streamed output.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use edge_core::{RenderConfig, RoutingConfig, SiteConfig, TrailingSlash, MARK_ROUTE_MATCHED};
use edge_observability::{RenderMetrics, RenderStatus};
use edge_render::{
    render_slot_to_string, render_to_sink, render_to_string, slot_fn, Child, ComponentInput,
    ComponentInstance, ComponentOutput, FactoryResult, FlushController, HeadItems, RenderContext,
    RenderError, RenderInstruction,
};
use edge_routing::{Params, RouteDefinition, RouteType, Router, RouterMatch};
use futures::channel::mpsc;
use futures::StreamExt;

fn router(config: &RoutingConfig) -> Router {
    let routes = ["/", "/blog/[slug]", "/blog/[...rest]"]
        .iter()
        .map(|route| {
            RouteDefinition::parse(route, RouteType::Page, *route, config.trailing_slash).unwrap()
        })
        .collect();
    Router::new(routes, config).unwrap()
}

fn post_page(ctx: &RenderContext, params: &Params) -> ComponentInstance {
    let slug = params.get("slug").unwrap_or_default().to_string();

    let layout_body = slot_fn(|_| {
        Child::future(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Child::text("Loaded <comments>"))
        })
    });

    ComponentInstance::builder("BlogPost", |ctx: &RenderContext, mut input: ComponentInput| {
        let title = input.props.get("slug").cloned().unwrap_or_default();
        let body = input.slots.take("default", ctx);
        Ok(ComponentOutput::HeadAndContent {
            content: Child::from(vec![
                Child::html("<html><head>"),
                RenderInstruction::maybe_head().into(),
                Child::html("</head><body><h1>"),
                Child::from(title),
                Child::html("</h1>"),
                RenderInstruction::hydration_script().into(),
                body,
                Child::html("</body></html>"),
            ]),
            head: HeadItems::new().with_stylesheet("/blog.css"),
        }
        .into())
    })
    .prop("slug", slug)
    .slot("default", layout_body)
    .build(ctx)
}

#[tokio::test]
async fn test_route_to_streamed_page() {
    let site = SiteConfig::default();
    let router = router(&site.routing);

    let RouterMatch::Match { route, params, .. } = router.match_path("/blog/hello") else {
        panic!("expected a match");
    };
    assert_eq!(route.route(), "/blog/[slug]");
    assert_eq!(params.get("slug"), Some("hello"));

    let ctx = RenderContext::new(
        RenderConfig::default().with_hydration_script("<script>hydrate()</script>"),
    );
    let page = post_page(&ctx, &params);

    let (tx, rx) = mpsc::unbounded();
    let mut summary =
        render_to_sink(&ctx, page.into(), tx, FlushController::from_config(ctx.config()))
            .await
            .unwrap();

    let body = String::from_utf8(rx.collect::<Vec<_>>().await.concat()).unwrap();
    assert_eq!(
        body,
        concat!(
            "<html><head>",
            r#"<link rel="stylesheet" href="/blog.css">"#,
            "</head><body><h1>hello</h1>",
            "<script>hydrate()</script>",
            "Loaded &lt;comments&gt;",
            "</body></html>"
        )
    );
    assert_eq!(summary.stats.bytes_written, body.len());
    assert_eq!(summary.stats.instructions_materialized, 2);

    summary.timing.mark(MARK_ROUTE_MATCHED);
    let metrics = RenderMetrics::from_summary(ctx.request_id(), &summary).with_route(route.route());
    assert_eq!(metrics.status, RenderStatus::Complete);
    assert_eq!(metrics.bytes_written, body.len());
    assert!(metrics.time_to_first_chunk_us.is_some());
}

#[tokio::test]
async fn test_rest_route_and_trailing_slash() {
    let config = RoutingConfig::new().with_trailing_slash(TrailingSlash::Always);
    let router = router(&config);

    match router.match_path("/blog/2024/recap/") {
        RouterMatch::Match { route, params, .. } => {
            assert_eq!(route.route(), "/blog/[...rest]");
            assert_eq!(params.get("rest"), Some("2024/recap"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!router.match_path("/blog/hello").is_match());
}

#[tokio::test]
async fn test_async_sibling_order() {
    let ctx = RenderContext::new(RenderConfig::default());
    let slow = Child::future(async {
        tokio::time::sleep(Duration::from_millis(25)).await;
        Ok(Child::text("A"))
    });
    let output = render_to_string(&ctx, Child::from(vec![slow, Child::text("B")]))
        .await
        .unwrap();
    assert_eq!(output.html, "AB");
}

#[tokio::test]
async fn test_slot_memoization_across_bindings() {
    let ctx = RenderContext::new(RenderConfig::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let producer = slot_fn(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Child::text(format!("render {}", n))
    });

    let shows_slot_twice =
        |ctx: &RenderContext, mut input: ComponentInput| -> Result<FactoryResult, RenderError> {
            let first = input.slots.take("default", ctx);
            let second = input.slots.take("default", ctx);
            Ok(ComponentOutput::direct(vec![first, Child::html("|"), second]).into())
        };

    let a = ComponentInstance::builder("A", shows_slot_twice)
        .slot("default", producer.clone())
        .build(&ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let b = ComponentInstance::builder("B", shows_slot_twice)
        .slot("default", producer)
        .build(&ctx);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let a = render_slot_to_string(&ctx, a.into()).await.unwrap();
    assert_eq!(a.content.as_str(), "render 1|render 3");
    let b = render_slot_to_string(&ctx, b.into()).await.unwrap();
    assert_eq!(b.content.as_str(), "render 2|render 4");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_component_error_reaches_caller() {
    let ctx = RenderContext::new(RenderConfig::default());
    let failing = ComponentInstance::builder("Feed", |_ctx, _input| {
        Ok(FactoryResult::pending(async {
            Err(RenderError::msg("upstream timeout"))
        }))
    })
    .build(&ctx);

    let (tx, rx) = mpsc::unbounded();
    let page = Child::from(vec![Child::html("<main>"), failing.into(), Child::html("</main>")]);
    let err = render_to_sink(&ctx, page, tx, FlushController::default())
        .await
        .unwrap_err();
    assert_eq!(err, RenderError::component("Feed", "upstream timeout"));

    let partial = String::from_utf8(rx.collect::<Vec<_>>().await.concat()).unwrap();
    assert_eq!(partial, "<main>");
}

#[tokio::test]
async fn test_double_slash_never_renders() {
    let router = router(&RoutingConfig::default());
    assert_eq!(
        router.match_path("//evil.example/path"),
        RouterMatch::Redirect {
            location: "/".to_string(),
            status: 301
        }
    );
}
