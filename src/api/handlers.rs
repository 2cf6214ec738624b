use axum::{
	Json,
	extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::extract::{Authenticated, ValidatedJson, ValidatedQuery};
use crate::persist::StoreId;
use crate::state::AppState;
use crate::sync::{
	BatchGetRequest, Deletion, Document, KeyedDocument, Manifest, Principal, UploadRequest,
};

/// Optional `?collection=` selector shared by the sync routes.
#[derive(Debug, Default, Deserialize)]
pub struct CollectionQuery {
	pub collection: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Success {
	pub success: bool,
}

const SUCCESS: Success = Success { success: true };

fn store(state: &AppState, principal: &Principal, collection: Option<&str>) -> Result<StoreId, ApiError> {
	Ok(state.tenancy.store_for(principal, collection)?)
}

/// `GET /list`
pub async fn list(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
	ValidatedQuery(query): ValidatedQuery<CollectionQuery>,
) -> Result<Json<Manifest>, ApiError> {
	state.metrics.record_request("list");
	let id = store(&state, &principal, query.collection.as_deref())?;
	Ok(Json(state.engine.manifest(&id).await?))
}

/// Named collections in the caller's scope.
#[derive(Debug, Serialize)]
pub struct CollectionList {
	pub collections: Vec<String>,
}

/// `GET /collections`
pub async fn collections(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
) -> Result<Json<CollectionList>, ApiError> {
	state.metrics.record_request("collections");
	let scope = store(&state, &principal, None)?;
	let collections = state.engine.collections(&scope).await?;
	Ok(Json(CollectionList { collections }))
}

/// `PUT /upload` with either `{key, doc}` or `{documents, deletions}`.
pub async fn upload(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
	ValidatedQuery(query): ValidatedQuery<CollectionQuery>,
	ValidatedJson(body): ValidatedJson<UploadRequest>,
) -> Result<Json<Success>, ApiError> {
	state.metrics.record_request("upload");
	let id = store(&state, &principal, query.collection.as_deref())?;
	state.engine.upload(&id, body.into_batch()).await?;
	Ok(Json(SUCCESS))
}

/// `GET /download/{key}`
pub async fn download(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
	Path(key): Path<String>,
) -> Result<Json<Document>, ApiError> {
	state.metrics.record_request("download");
	let id = store(&state, &principal, None)?;
	Ok(Json(state.engine.get(&id, &key).await?))
}

/// `GET /download/{collection}/{key}`
pub async fn download_in_collection(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
	Path((collection, key)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError> {
	state.metrics.record_request("download");
	let id = store(&state, &principal, Some(&collection))?;
	Ok(Json(state.engine.get(&id, &key).await?))
}

/// `POST /download` with `{keys: [...]}`; 404 on the first missing key.
pub async fn batch_download(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
	ValidatedQuery(query): ValidatedQuery<CollectionQuery>,
	ValidatedJson(body): ValidatedJson<BatchGetRequest>,
) -> Result<Json<Vec<KeyedDocument>>, ApiError> {
	state.metrics.record_request("batch_download");
	let id = store(&state, &principal, query.collection.as_deref())?;
	Ok(Json(state.engine.batch_get(&id, &body.keys).await?))
}

/// `DELETE /` with `{key, deletedAt}`.
pub async fn delete(
	State(state): State<AppState>,
	Authenticated(principal): Authenticated,
	ValidatedQuery(query): ValidatedQuery<CollectionQuery>,
	ValidatedJson(body): ValidatedJson<Deletion>,
) -> Result<Json<Success>, ApiError> {
	state.metrics.record_request("delete");
	let id = store(&state, &principal, query.collection.as_deref())?;
	state.engine.delete(&id, &body.key, body.deleted_at).await?;
	Ok(Json(SUCCESS))
}
