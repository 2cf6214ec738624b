use log::debug;
use serde::{Deserialize, Serialize};

use crate::sync::documents::PutOutcome;
use crate::sync::types::{CommitSummary, Document, Snapshot, UploadBatch};

/// How an incoming upsert is weighed against the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
	/// Last write by arrival wins. The server never compares `lastUpdate` or
	/// `version`; conflict resolution is left to clients.
	#[default]
	ArrivalOrder,
	/// Skip an upsert whose `lastUpdate` is strictly older than the stored one.
	NewestLastUpdate,
}

/// Rules applied when a batch of uploads and deletions is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePolicy {
	#[serde(default)]
	pub conflict: ConflictPolicy,
	/// When false, deletes drop the document and leave no tombstone behind.
	#[serde(default = "default_track_tombstones")]
	pub track_tombstones: bool,
}

fn default_track_tombstones() -> bool {
	true
}

impl Default for MergePolicy {
	fn default() -> Self {
		Self {
			conflict: ConflictPolicy::default(),
			track_tombstones: true,
		}
	}
}

impl MergePolicy {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_conflict_policy(mut self, conflict: ConflictPolicy) -> Self {
		self.conflict = conflict;
		self
	}

	pub fn with_tombstones(mut self, track_tombstones: bool) -> Self {
		self.track_tombstones = track_tombstones;
		self
	}

	/// Apply a whole batch to an in-memory snapshot.
	///
	/// Upserts go first in batch order, so the last entry for a duplicated key
	/// wins. Deletions follow, which means a key that is both uploaded and
	/// deleted in the same batch ends up tombstoned.
	pub fn apply(&self, snapshot: &mut Snapshot, batch: UploadBatch) -> CommitSummary {
		let mut summary = CommitSummary::default();

		for upload in batch.documents {
			if !self.accepts(snapshot, &upload.key, &upload.doc) {
				debug!("skipping stale upsert for {}", upload.key);
				summary.skipped += 1;
				continue;
			}
			match snapshot.put(upload.key, upload.doc) {
				PutOutcome::Stored => summary.upserted += 1,
				PutOutcome::Tombstoned => summary.skipped += 1,
			}
		}

		for deletion in batch.deletions {
			let changed = if self.track_tombstones {
				snapshot.delete(&deletion.key, deletion.deleted_at)
			} else {
				snapshot.discard(&deletion.key)
			};
			if changed {
				summary.deleted += 1;
			}
		}

		summary
	}

	fn accepts(&self, snapshot: &Snapshot, key: &str, incoming: &Document) -> bool {
		match self.conflict {
			ConflictPolicy::ArrivalOrder => true,
			ConflictPolicy::NewestLastUpdate => snapshot
				.documents
				.get(key)
				.is_none_or(|stored| incoming.last_update.as_f64() >= stored.last_update.as_f64()),
		}
	}
}
