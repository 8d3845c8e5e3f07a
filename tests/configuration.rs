mod common;

use axum::{
    body::Body,
    http::{Method, Request, header},
};
use furiosa_mock_server::AppConfig;
use serde_json::json;

use common::{app_with, get, post_json, send, send_raw};

async fn get_with_origin(app: &axum::Router, uri: &str) -> common::TestResponse {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .expect("request");
    send(app, request).await
}

#[tokio::test]
async fn permissive_cors_adds_allow_origin() {
    let app = app_with(AppConfig {
        cors_permissive: true,
        ..AppConfig::default()
    });
    let response = get_with_origin(&app, "/v1/models").await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn cors_headers_absent_by_default() {
    let app = app_with(AppConfig::default());
    let response = get_with_origin(&app, "/v1/models").await;
    assert_eq!(response.status, 200);
    assert!(
        response
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn served_model_name_is_listed_and_usable() {
    let app = app_with(AppConfig {
        served_model_name: "my-model".to_string(),
        ..AppConfig::default()
    });

    let response = get(&app, "/v1/models/my-model").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json()["id"], "my-model");

    let response = post_json(
        &app,
        "/v1/completions",
        &json!({"model": "my-model", "prompt": "hello"}),
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.json()["model"], "my-model");

    let response = get(&app, "/v1/models/furiosa-llm").await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn request_limit_follows_config() {
    let app = app_with(AppConfig {
        max_request_bytes: 64,
        ..AppConfig::default()
    });
    let body = json!({"model": "furiosa-llm", "prompt": "x".repeat(100)}).to_string();
    let response = send_raw(&app, Method::POST, "/v1/completions", body).await;
    assert_eq!(response.status, 413);
    assert_eq!(response.json()["error"]["code"], "payload_too_large");
}
