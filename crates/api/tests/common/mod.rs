#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use esfinteres_api::{build_app, config::AppConfig, routes::auth::SIGNIN_SECRET_HEADER, state::AppState};
use esfinteres_core::store::SHEETS;
use esfinteres_sheets::MemoryWorkbook;

pub const ADMIN_TOKEN: &str = "admin-secret";
pub const CALLBACK_SECRET: &str = "provider-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub book: Arc<MemoryWorkbook>,
}

/// App over an empty in-memory workbook with admin routes and an
/// authenticated sign-in callback.
pub fn test_app() -> TestApp {
    test_app_with(AppConfig {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        signin_callback_secret: Some(CALLBACK_SECRET.to_string()),
        ..AppConfig::default()
    })
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let book = Arc::new(MemoryWorkbook::with_sheets(SHEETS));
    let state = AppState::new(book.clone(), config);
    TestApp {
        router: build_app(state.clone()),
        state,
        book,
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json_body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(json!({})))
}

/// Sign-in callback request as the identity provider sends it.
pub fn signin_request(body: Value) -> Request<Body> {
    let mut req = request(Method::POST, "/auth/signin", None, Some(body));
    req.headers_mut()
        .insert(SIGNIN_SECRET_HEADER, header::HeaderValue::from_static(CALLBACK_SECRET));
    req
}

/// Sign `email` in through the callback and return the session token.
pub async fn sign_in(app: &TestApp, email: &str) -> String {
    let (status, body) = send(
        app,
        signin_request(json!({ "email": email, "name": "Test" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn make_premium(app: &TestApp, email: &str) {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/admin/users/premium",
            Some(ADMIN_TOKEN),
            Some(json!({ "email": email })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upgrade failed: {body}");
}
