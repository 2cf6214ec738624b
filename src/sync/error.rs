use thiserror::Error;

use crate::persist::PersistError;

/// Errors raised by the document and tombstone stores and the engine that
/// drives them.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("document not found: {0}")]
	NotFound(String),

	#[error("collection not found: {0}")]
	CollectionNotFound(String),

	#[error("invalid request: {0}")]
	Validation(String),

	#[error("persistence failure: {0}")]
	Persist(#[from] PersistError),
}
