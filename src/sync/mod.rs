pub mod auth;
pub mod documents;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod tenancy;
pub mod tombstones;
pub mod types;

pub use auth::{AuthError, AuthGate, Claims, Principal, TokenVerifier};
pub use documents::PutOutcome;
pub use engine::SyncEngine;
pub use error::SyncError;
pub use merge::{ConflictPolicy, MergePolicy};
pub use tenancy::Tenancy;
pub use types::{
	BatchGetRequest, CommitSummary, Deletion, Document, DocumentMeta, DocumentUpload,
	KeyedDocument, Manifest, Snapshot, Timestamp, Tombstone, UploadBatch, UploadRequest,
};
