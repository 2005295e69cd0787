//! Router-level tests: authentication, request validation and response shape.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use link_scraper::{
    api::routes::create_router,
    batch::BatchOrchestrator,
    config::Config,
    scraper::HttpFetcher,
    AppState,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-api-key";

fn app() -> Router {
    let config = Config::from_vars(|key| match key {
        "API_KEY" => Some(API_KEY.to_string()),
        "REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })
    .expect("config");

    let orchestrator = BatchOrchestrator::new(
        config.batch_config(),
        Arc::new(HttpFetcher::new().expect("client")),
        None,
    );
    create_router(AppState::new(config, orchestrator))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn scrape_request(key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/scrape")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn health_reports_summarizer_capability() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["gemini_configured"], false);
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn scrape_requires_api_key() {
    let body = json!({"links": ["https://a.test"]});
    let (status, body) = send(app(), scrape_request(None, body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing API key");

    let body = json!({"links": ["https://a.test"]});
    let (status, _) = send(app(), scrape_request(Some("wrong"), body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_links_is_bad_request() {
    let (status, body) = send(app(), scrape_request(Some(API_KEY), json!({"links": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "At least one link is required");
}

#[tokio::test]
async fn missing_or_malformed_links_is_bad_request() {
    let (status, body) = send(app(), scrape_request(Some(API_KEY), json!({"raw": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "links field is required and must be an array");

    let body = json!({"links": "https://a.test"});
    let (status, body) = send(app(), scrape_request(Some(API_KEY), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn scrape_returns_per_link_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"<h1>Hello</h1><p>world</p>".to_vec(), "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let links = json!([format!("{}/html", server.uri()), format!("{}/gone", server.uri())]);
    let request = scrape_request(Some(API_KEY), json!({"links": links, "summarize": true}));

    let (status, body) = tokio::time::timeout(Duration::from_secs(10), send(app(), request))
        .await
        .expect("scrape finished");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_processed"], 2);
    assert_eq!(body["successful"], 1);
    assert_eq!(body["failed"], 1);
    // summarize without a provider falls back to extracted text
    assert_eq!(body["degraded"], true);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["content"], "Hello world");
    assert!(results[0]["note"].is_string());

    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["error"], "HTTP 410");
    assert_eq!(results[1]["error_kind"], "http_error");
    assert_eq!(results[1]["status_code"], 410);
}
