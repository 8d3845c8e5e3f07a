#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use furiosa_mock_server::{AppConfig, ModelCatalog, build_router};
use serde_json::Value;
use tower::ServiceExt;

pub const MODEL: &str = "furiosa-ai/Llama-3.1-8B-Instruct-FP8";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// `data:` payloads of an event stream, in order, including the terminator.
    pub fn sse_payloads(&self) -> Vec<String> {
        self.text()
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(str::to_string)
            .collect()
    }

    /// Parsed stream chunks, excluding the terminator.
    pub fn sse_chunks(&self) -> Vec<Value> {
        self.sse_payloads()
            .iter()
            .filter(|payload| payload.as_str() != "[DONE]")
            .map(|payload| serde_json::from_str(payload).expect("chunk is JSON"))
            .collect()
    }
}

pub fn app() -> Router {
    app_with(AppConfig::default())
}

pub fn app_with(config: AppConfig) -> Router {
    let catalog = Arc::new(ModelCatalog::initialize(&config));
    build_router(Arc::new(config), catalog)
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("request");
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send_raw(app, Method::GET, uri, Body::empty()).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> TestResponse {
    let raw = serde_json::to_vec(body).expect("encode");
    send_raw(app, Method::POST, uri, raw).await
}

/// Value of the first sample line starting with `series`.
pub fn metric_value(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .find(|line| line.starts_with(series))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|v| v.parse().ok())
}
