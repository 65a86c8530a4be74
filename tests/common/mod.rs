#![allow(dead_code)]

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use ideabank_api::auth::TokenAuthority;
use ideabank_api::config::AppConfig;
use ideabank_api::handlers::HandlerFactory;
use ideabank_api::router::{app, AppState};

pub const PASSWORD: &str = "password123";

/// Router over in-memory storage; every call gets a fresh, empty store
pub fn test_app() -> Router {
    let tokens = TokenAuthority::new("integration-test-secret", Duration::hours(1), Duration::zero(), 5)
        .expect("token authority");
    let factory = HandlerFactory::in_memory(tokens, 10);
    app(AppState::new(factory), &AppConfig::development())
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, body))
}

pub async fn get(app: &Router, path: &str) -> Result<(StatusCode, Value)> {
    send(app, Request::builder().uri(path).body(Body::empty())?).await
}

pub async fn post(app: &Router, path: &str, body: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?;
    send(app, request).await
}

/// Request carrying a bearer token and presenter, as guarded routes expect
pub async fn authorized(
    app: &Router,
    method: &str,
    path: &str,
    token: &Value,
    body: Value,
) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token["token"].as_str().unwrap_or_default()))
        .header("x-presenter", token["presenter"].as_str().unwrap_or_default())
        .body(Body::from(serde_json::to_vec(&body)?))?;
    send(app, request).await
}

/// Create an account and log in as it, returning the `{token, presenter}` body
pub async fn sign_up(app: &Router, display_name: &str) -> Result<Value> {
    let credentials = json!({ "display_name": display_name, "password": PASSWORD });
    let (status, _) = post(app, "/accounts", credentials.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, token) = post(app, "/accounts/authenticate", credentials).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(token)
}

pub async fn create_concept(app: &Router, token: &Value, title: &str) -> Result<(StatusCode, Value)> {
    let author = token["presenter"].as_str().unwrap_or_default().to_string();
    authorized(
        app,
        "POST",
        "/concepts",
        token,
        json!({ "author": author, "title": title, "description": "", "diagram": {} }),
    )
    .await
}
