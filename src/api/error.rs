use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::sync::SyncError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("forbidden")]
	Forbidden,

	#[error("{0}")]
	NotFound(String),

	#[error("{0}")]
	Validation(String),

	#[error("{0}")]
	PayloadTooLarge(String),

	#[error("{0}")]
	UnsupportedMediaType(String),

	/// Details are logged where the failure happens, never returned.
	#[error("internal error")]
	Internal,
}

impl From<SyncError> for ApiError {
	fn from(err: SyncError) -> Self {
		match err {
			SyncError::NotFound(_) | SyncError::CollectionNotFound(_) => {
				ApiError::NotFound(err.to_string())
			}
			SyncError::Validation(msg) => ApiError::Validation(msg),
			SyncError::Persist(e) => {
				log::error!("persistence error: {}", e);
				ApiError::Internal
			}
		}
	}
}

#[derive(Serialize)]
struct ErrorResponse {
	error: &'static str,
	message: String,
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, error) = match &self {
			ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
			ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
			ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
			ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
			ApiError::UnsupportedMediaType(_) => {
				(StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
			}
			ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
		};
		let body = Json(ErrorResponse {
			error,
			message: self.to_string(),
		});
		(status, body).into_response()
	}
}
