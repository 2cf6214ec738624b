use axum::{
	Json,
	extract::{FromRequest, FromRequestParts, Query, Request, rejection::JsonRejection},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
};
use log::warn;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use crate::state::AppState;
use crate::sync::Principal;

/// Header carrying the shared secret for clients that cannot set
/// `Authorization`.
pub const SECRET_HEADER: &str = "x-sync-secret";

/// Pull the credential out of a request: the value after the scheme in
/// `Authorization: <scheme> <credential>`, or the raw `X-Sync-Secret` value.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<&str> {
	if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
		return value.split_whitespace().nth(1);
	}
	headers
		.get(SECRET_HEADER)
		.and_then(|v| v.to_str().ok())
		.map(str::trim)
}

/// A caller admitted by the auth gate. Listed before any body extractor so
/// rejected calls never reach the store or even have their body parsed.
pub struct Authenticated(pub Principal);

impl FromRequestParts<AppState> for Authenticated {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		match state.gate.check(credential_from_headers(&parts.headers)) {
			Ok(principal) => Ok(Self(principal)),
			Err(e) => {
				state.metrics.auth_failures_total.inc();
				warn!("rejected {} {}: {}", parts.method, parts.uri.path(), e);
				Err(ApiError::Forbidden)
			}
		}
	}
}

/// `Json` whose rejections are reported in the API error shape. Oversized
/// bodies and wrong content types keep their own status codes; everything
/// else is a validation error.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		match Json::<T>::from_request(req, state).await {
			Ok(Json(value)) => Ok(Self(value)),
			Err(rejection) => Err(json_rejection(rejection)),
		}
	}
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
	let message = rejection.body_text();
	match rejection.status() {
		StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(message),
		StatusCode::UNSUPPORTED_MEDIA_TYPE => ApiError::UnsupportedMediaType(message),
		_ => ApiError::Validation(message),
	}
}

/// `Query` whose rejections become validation errors in the API error shape.
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		match Query::<T>::from_request_parts(parts, state).await {
			Ok(Query(value)) => Ok(Self(value)),
			Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
		}
	}
}
