//! Document store operations over a loaded [`Snapshot`].

use crate::sync::error::SyncError;
use crate::sync::types::{Document, DocumentMeta, KeyedDocument, Snapshot};

/// Result of a [`Snapshot::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
	Stored,
	/// The key is tombstoned; deletion is terminal so nothing was written.
	Tombstoned,
}

impl Snapshot {
	/// Fetch a live document.
	pub fn get(&self, key: &str) -> Result<&Document, SyncError> {
		self.documents
			.get(key)
			.ok_or_else(|| SyncError::NotFound(key.to_string()))
	}

	/// Replace the document under `key` wholesale. No comparison against the
	/// stored `lastUpdate` or `version` happens here.
	pub fn put(&mut self, key: String, doc: Document) -> PutOutcome {
		if self.deletions.contains_key(&key) {
			return PutOutcome::Tombstoned;
		}
		self.documents.insert(key, doc);
		PutOutcome::Stored
	}

	/// Drop a live document without recording a tombstone.
	pub fn discard(&mut self, key: &str) -> bool {
		self.documents.remove(key).is_some()
	}

	/// Metadata of every live document, ordered by key.
	pub fn list_documents(&self) -> Vec<DocumentMeta> {
		self.documents
			.iter()
			.map(|(key, doc)| DocumentMeta {
				key: key.clone(),
				last_update: doc.last_update.clone(),
				version: doc.version,
			})
			.collect()
	}

	/// Resolve `keys` in order. The first missing key fails the whole call and
	/// nothing resolved before it is returned.
	pub fn batch_get(&self, keys: &[String]) -> Result<Vec<KeyedDocument>, SyncError> {
		keys.iter()
			.map(|key| {
				self.get(key).map(|doc| KeyedDocument {
					key: key.clone(),
					document: doc.clone(),
				})
			})
			.collect()
	}
}
