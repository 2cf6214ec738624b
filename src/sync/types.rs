use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::sync::error::SyncError;

/// Client-assigned timestamp, normally milliseconds since the Unix epoch.
///
/// Any JSON number is accepted, fractional ones included, and written back
/// exactly as the client sent it. Ordering is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(Number);

impl Timestamp {
	/// Build from a float; `None` for NaN and infinities, which JSON cannot carry.
	pub fn from_f64(value: f64) -> Option<Self> {
		Number::from_f64(value).map(Self)
	}

	pub fn as_f64(&self) -> f64 {
		self.0.as_f64().unwrap_or_default()
	}
}

impl From<i32> for Timestamp {
	fn from(value: i32) -> Self {
		Self(Number::from(value))
	}
}

impl From<i64> for Timestamp {
	fn from(value: i64) -> Self {
		Self(Number::from(value))
	}
}

impl From<u64> for Timestamp {
	fn from(value: u64) -> Self {
		Self(Number::from(value))
	}
}

/// A stored document: a fixed envelope plus an opaque bag of fields that is
/// preserved verbatim through every read and write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	#[serde(rename = "lastUpdate")]
	pub last_update: Timestamp,
	pub version: i64,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl Document {
	pub fn new(last_update: impl Into<Timestamp>, version: i64) -> Self {
		Self {
			last_update: last_update.into(),
			version,
			fields: Map::new(),
		}
	}

	/// Attach an opaque field (builder style, mostly for tests and demos).
	pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
		self.fields.insert(name.into(), value);
		self
	}
}

/// Deletion record kept in place of a removed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
	#[serde(rename = "deletedAt")]
	pub deleted_at: Timestamp,
}

/// Full durable state of one store. Keys are kept sorted so manifests and
/// snapshot files are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
	#[serde(default)]
	pub documents: BTreeMap<String, Document>,
	#[serde(default)]
	pub deletions: BTreeMap<String, Tombstone>,
}

/// Manifest entry for a live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
	pub key: String,
	#[serde(rename = "lastUpdate")]
	pub last_update: Timestamp,
	pub version: i64,
}

/// A deletion as it appears both in the manifest and in requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
	pub key: String,
	#[serde(rename = "deletedAt")]
	pub deleted_at: Timestamp,
}

/// Reconciliation view returned by `GET /list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
	pub documents: Vec<DocumentMeta>,
	pub deletions: Vec<Deletion>,
}

/// One document upsert: `{key, doc}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpload {
	pub key: String,
	pub doc: Document,
}

/// A batch of upserts and deletions committed as one snapshot revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadBatch {
	#[serde(default)]
	pub documents: Vec<DocumentUpload>,
	#[serde(default)]
	pub deletions: Vec<Deletion>,
}

impl UploadBatch {
	pub fn is_empty(&self) -> bool {
		self.documents.is_empty() && self.deletions.is_empty()
	}

	/// Reject empty keys before the batch reaches any store.
	pub fn validate(&self) -> Result<(), SyncError> {
		for upload in &self.documents {
			check_key(&upload.key)?;
		}
		for deletion in &self.deletions {
			check_key(&deletion.key)?;
		}
		Ok(())
	}
}

impl From<DocumentUpload> for UploadBatch {
	fn from(upload: DocumentUpload) -> Self {
		Self {
			documents: vec![upload],
			deletions: Vec::new(),
		}
	}
}

impl From<Deletion> for UploadBatch {
	fn from(deletion: Deletion) -> Self {
		Self {
			documents: Vec::new(),
			deletions: vec![deletion],
		}
	}
}

/// Body of `PUT /upload`: either a single `{key, doc}` or a batch.
#[derive(Debug, Clone)]
pub enum UploadRequest {
	Single(DocumentUpload),
	Batch(UploadBatch),
}

/// The shape is picked from the top-level fields, so a broken upload reports
/// what is wrong with it instead of failing every variant at once.
impl<'de> Deserialize<'de> for UploadRequest {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		let single = value.get("key").is_some() || value.get("doc").is_some();
		let parsed = if single {
			serde_json::from_value(value).map(UploadRequest::Single)
		} else {
			serde_json::from_value(value).map(UploadRequest::Batch)
		};
		parsed.map_err(|e| {
			let shape = if single { "upload" } else { "upload batch" };
			de::Error::custom(format!("invalid {shape}: {e}"))
		})
	}
}

impl UploadRequest {
	pub fn into_batch(self) -> UploadBatch {
		match self {
			UploadRequest::Single(upload) => upload.into(),
			UploadRequest::Batch(batch) => batch,
		}
	}
}

/// Body of `POST /download`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchGetRequest {
	pub keys: Vec<String>,
}

/// Element of the `POST /download` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedDocument {
	pub key: String,
	pub document: Document,
}

/// Counts reported by a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
	/// Upserts written to the document store.
	pub upserted: usize,
	/// Upserts absorbed by a tombstone or by the conflict policy.
	pub skipped: usize,
	/// Deletions that removed a document or created a tombstone.
	pub deleted: usize,
}

impl CommitSummary {
	pub fn changed(&self) -> bool {
		self.upserted > 0 || self.deleted > 0
	}
}

pub(crate) fn check_key(key: &str) -> Result<(), SyncError> {
	if key.is_empty() {
		return Err(SyncError::Validation("document key must not be empty".to_string()));
	}
	Ok(())
}
