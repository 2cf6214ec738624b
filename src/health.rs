use axum::{
	extract::State,
	http::{StatusCode, header},
	response::IntoResponse,
};

use crate::state::AppState;

/// Liveness endpoint. Sits outside the auth gate and never touches the
/// snapshot store.
pub async fn health() -> impl IntoResponse {
	(StatusCode::OK, "ok")
}

/// `/metrics`: the registry in Prometheus text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
	(
		StatusCode::OK,
		[(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
		state.metrics.encode(),
	)
}
