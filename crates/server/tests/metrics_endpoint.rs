//! Installs the global Prometheus recorder, so it lives in its own test binary.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use resolver::ResolverConfig;
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

#[tokio::test]
async fn metrics_render_after_a_request() {
    let pipeline = ResolverConfig::offline().build_pipeline().unwrap();
    let state = ServerState::with_pipeline(ServerConfig::default(), pipeline).unwrap();
    let app = build_router(Arc::new(state));

    let resolve = Request::builder()
        .method(Method::POST)
        .uri("/api/resolve")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"incidentText":"queue backlog growing"}"#))
        .unwrap();
    let response = app.clone().oneshot(resolve).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let scrape = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(scrape).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("resolver_requests_total"));
}
