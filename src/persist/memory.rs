use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{PersistError, SnapshotRepo, StoreId};
use crate::sync::types::Snapshot;

/// In-process snapshot backend for tests and embedded use.
///
/// Counts every load and replace and can be told to fail writes, which lets
/// callers observe whether a code path touched storage at all.
#[derive(Default)]
pub struct MemoryRepo {
	snapshots: Mutex<HashMap<StoreId, Snapshot>>,
	fail_writes: AtomicBool,
	loads: AtomicUsize,
	replaces: AtomicUsize,
}

impl MemoryRepo {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make every subsequent `replace` fail until reset.
	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}

	pub fn load_count(&self) -> usize {
		self.loads.load(Ordering::SeqCst)
	}

	pub fn replace_count(&self) -> usize {
		self.replaces.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SnapshotRepo for MemoryRepo {
	async fn load(&self, id: &StoreId) -> Result<Option<Snapshot>, PersistError> {
		self.loads.fetch_add(1, Ordering::SeqCst);
		let snapshot = self
			.snapshots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(id)
			.cloned();
		// Yield so concurrent writers interleave between load and replace.
		tokio::task::yield_now().await;
		Ok(snapshot)
	}

	async fn replace(&self, id: &StoreId, snapshot: &Snapshot) -> Result<(), PersistError> {
		self.replaces.fetch_add(1, Ordering::SeqCst);
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(PersistError::Unavailable(format!(
				"write to {id} rejected"
			)));
		}
		self.snapshots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(id.clone(), snapshot.clone());
		Ok(())
	}

	async fn collections(&self, tenant: Option<&str>) -> Result<Vec<String>, PersistError> {
		let mut names: Vec<String> = self
			.snapshots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.keys()
			.filter(|id| id.tenant() == tenant)
			.filter_map(|id| id.collection().map(str::to_string))
			.collect();
		names.sort();
		Ok(names)
	}
}
