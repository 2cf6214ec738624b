//! Tombstone store operations. Tombstones share the document snapshot and are
//! never garbage collected.

use std::collections::btree_map::Entry;

use crate::sync::types::{Deletion, Snapshot, Timestamp, Tombstone};

impl Snapshot {
	/// Delete `key`: drop the live document if any and record a tombstone.
	///
	/// The first tombstone for a key wins; later deletes keep the original
	/// `deletedAt`. Keys that were never uploaded are tombstoned as well.
	/// Returns whether the snapshot changed.
	pub fn delete(&mut self, key: &str, deleted_at: impl Into<Timestamp>) -> bool {
		let removed = self.discard(key);
		match self.deletions.entry(key.to_string()) {
			Entry::Vacant(slot) => {
				slot.insert(Tombstone {
					deleted_at: deleted_at.into(),
				});
				true
			}
			Entry::Occupied(_) => removed,
		}
	}

	/// Every tombstone, ordered by key.
	pub fn list_tombstones(&self) -> Vec<Deletion> {
		self.deletions
			.iter()
			.map(|(key, tombstone)| Deletion {
				key: key.clone(),
				deleted_at: tombstone.deleted_at.clone(),
			})
			.collect()
	}
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	use crate::sync::types::{Document, Snapshot, Timestamp};

	#[test]
	fn delete_moves_document_to_tombstone() {
		let mut snap = Snapshot::default();
		snap.put("k".into(), Document::new(100, 1));

		assert!(snap.delete("k", 200));
		assert!(snap.documents.is_empty());
		assert_eq!(snap.deletions["k"].deleted_at, Timestamp::from(200));
	}

	#[test]
	fn first_delete_wins() {
		let mut snap = Snapshot::default();
		assert!(snap.delete("k", 100));
		assert!(!snap.delete("k", 200));
		assert_eq!(snap.deletions["k"].deleted_at, Timestamp::from(100));
	}

	#[test]
	fn unknown_key_is_tombstoned() {
		let mut snap = Snapshot::default();
		assert!(snap.delete("ghost", 50));
		let tombstones = snap.list_tombstones();
		assert_eq!(tombstones.len(), 1);
		assert_eq!(tombstones[0].key, "ghost");
		assert_eq!(tombstones[0].deleted_at, Timestamp::from(50));
	}
}
