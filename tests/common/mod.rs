//! Shared helpers for the HTTP-level integration tests.
#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use cybermuse_sync::api::router;
use cybermuse_sync::build_state;
use cybermuse_sync::config::Settings;
use cybermuse_sync::persist::{JsonFileRepo, MemoryRepo, SnapshotRepo};
use cybermuse_sync::sync::TokenVerifier;

pub const PASSWORD: &str = "sync-test-password";
pub const JWT_SECRET: &str = "integration-jwt-secret";

/// Settings accepting both the shared secret and signed tokens.
pub fn settings() -> Settings {
	Settings {
		password: Some(PASSWORD.to_string()),
		jwt_secret: Some(JWT_SECRET.to_string()),
		..Settings::default()
	}
}

pub fn app(settings: &Settings, repo: Arc<dyn SnapshotRepo>) -> Router {
	let state = build_state(settings, repo).expect("state builds");
	router(state, settings.body_limit_bytes)
}

/// App over JSON snapshot files in `dir`.
pub fn file_app(dir: &std::path::Path) -> Router {
	app(&settings(), Arc::new(JsonFileRepo::new(dir)))
}

/// App over an in-memory backend the test can inspect.
pub fn memory_app() -> (Router, Arc<MemoryRepo>) {
	let repo = Arc::new(MemoryRepo::new());
	(app(&settings(), repo.clone()), repo)
}

pub fn token_for(subject: &str) -> String {
	TokenVerifier::new(JWT_SECRET, None, None)
		.issue(subject, Duration::from_secs(300))
		.expect("token issues")
}

/// Send one request and decode the JSON response (non-JSON bodies come back
/// as a JSON string).
pub async fn send(
	app: &Router,
	method: Method,
	uri: &str,
	credential: Option<&str>,
	body: Option<Value>,
) -> (StatusCode, Value) {
	let mut builder = Request::builder().method(method).uri(uri);
	if let Some(credential) = credential {
		builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", credential));
	}
	let req = match body {
		Some(json) => builder
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(json.to_string()))
			.unwrap(),
		None => builder.body(Body::empty()).unwrap(),
	};

	let resp = app.clone().oneshot(req).await.unwrap();
	let status = resp.status();
	let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
	let value = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes)
			.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
	};
	(status, value)
}

/// Shorthand for calls made with the shared secret.
pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	send(app, method, uri, Some(PASSWORD), body).await
}
