use crate::sync::types::{Manifest, Snapshot};

impl From<&Snapshot> for Manifest {
	fn from(snapshot: &Snapshot) -> Self {
		Self {
			documents: snapshot.list_documents(),
			deletions: snapshot.list_tombstones(),
		}
	}
}

/// Build the reconciliation view of a snapshot. Clients diff it against their
/// local state; the server never does.
pub fn build(snapshot: &Snapshot) -> Manifest {
	Manifest::from(snapshot)
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;
	use crate::sync::types::{Deletion, Document, DocumentMeta};
	use serde_json::json;

	#[test]
	fn empty_snapshot_serializes_to_empty_lists() {
		let manifest = build(&Snapshot::default());
		assert_eq!(
			serde_json::to_value(&manifest).unwrap(),
			json!({"documents": [], "deletions": []})
		);
	}

	#[test]
	fn manifest_carries_metadata_only() {
		let mut snap = Snapshot::default();
		snap.put(
			"doc1".into(),
			Document::new(100, 3).with_field("body", json!("large payload")),
		);
		snap.delete("doc2", 90);

		let manifest = build(&snap);
		assert_eq!(
			manifest.documents,
			vec![DocumentMeta {
				key: "doc1".into(),
				last_update: 100.into(),
				version: 3,
			}]
		);
		assert_eq!(
			manifest.deletions,
			vec![Deletion {
				key: "doc2".into(),
				deleted_at: 90.into(),
			}]
		);
		let wire = serde_json::to_value(&manifest).unwrap();
		assert_eq!(wire["documents"][0], json!({"key": "doc1", "lastUpdate": 100, "version": 3}));
		assert_eq!(wire["deletions"][0], json!({"key": "doc2", "deletedAt": 90}));
	}
}
