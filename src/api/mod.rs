//! HTTP surface of the sync server.

pub mod error;
pub mod extract;
pub mod handlers;

use axum::{
	Router,
	extract::DefaultBodyLimit,
	http::{HeaderName, header::AUTHORIZATION},
	routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;

use crate::health;
use crate::state::AppState;

pub use error::ApiError;

/// Build the application router.
///
/// Every sync route authenticates through the [`extract::Authenticated`]
/// extractor; `/health` and `/metrics` are open.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
	Router::new()
		.route("/list", get(handlers::list))
		.route("/collections", get(handlers::collections))
		.route("/upload", put(handlers::upload))
		.route("/download", post(handlers::batch_download))
		.route("/download/{key}", get(handlers::download))
		.route(
			"/download/{collection}/{key}",
			get(handlers::download_in_collection),
		)
		.route("/", delete(handlers::delete))
		.route("/health", get(health::health))
		.route("/metrics", get(health::metrics_handler))
		.layer(DefaultBodyLimit::max(body_limit_bytes))
		.layer(SetSensitiveRequestHeadersLayer::new([
			AUTHORIZATION,
			HeaderName::from_static(extract::SECRET_HEADER),
		]))
		.layer(CorsLayer::permissive())
		.with_state(state)
}
