use log::{error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

use crate::observability::MetricsRegistry;
use crate::persist::{SnapshotRepo, StoreId};
use crate::sync::error::SyncError;
use crate::sync::manifest;
use crate::sync::merge::MergePolicy;
use crate::sync::types::{
	CommitSummary, Deletion, Document, KeyedDocument, Manifest, Snapshot, Timestamp, UploadBatch,
	check_key,
};

/// The sync engine: the one service handlers talk to.
///
/// Reads load the last committed snapshot without locking; the backend's
/// atomic replace guarantees they never observe a partial write. Mutations on
/// one store are serialized by a per-store writer lock held across
/// load, apply and replace, so overlapping batches never overwrite each
/// other's changes. A lock lives in `writers` only while some call holds or
/// waits on it.
pub struct SyncEngine {
	repo: Arc<dyn SnapshotRepo>,
	policy: MergePolicy,
	metrics: Arc<MetricsRegistry>,
	writers: Mutex<HashMap<StoreId, Arc<AsyncMutex<()>>>>,
}

impl SyncEngine {
	pub fn new(repo: Arc<dyn SnapshotRepo>, policy: MergePolicy, metrics: Arc<MetricsRegistry>) -> Self {
		Self {
			repo,
			policy,
			metrics,
			writers: Mutex::new(HashMap::new()),
		}
	}

	pub fn policy(&self) -> &MergePolicy {
		&self.policy
	}

	/// Load a store for reading. A named collection that was never written
	/// does not exist; the default collection is simply empty.
	async fn read(&self, id: &StoreId) -> Result<Snapshot, SyncError> {
		match self.repo.load(id).await? {
			Some(snapshot) => Ok(snapshot),
			None => match id.collection() {
				Some(collection) => Err(SyncError::CollectionNotFound(collection.to_string())),
				None => Ok(Snapshot::default()),
			},
		}
	}

	/// Manifest of the latest committed snapshot. Listing a collection that
	/// does not exist yet yields an empty manifest so clients can push into it.
	pub async fn manifest(&self, id: &StoreId) -> Result<Manifest, SyncError> {
		let snapshot = self.repo.load(id).await?.unwrap_or_default();
		Ok(manifest::build(&snapshot))
	}

	pub async fn get(&self, id: &StoreId, key: &str) -> Result<Document, SyncError> {
		check_key(key)?;
		let snapshot = self.read(id).await?;
		snapshot.get(key).cloned()
	}

	/// All-or-nothing fetch of `keys`, failing on the first missing one.
	pub async fn batch_get(
		&self,
		id: &StoreId,
		keys: &[String],
	) -> Result<Vec<KeyedDocument>, SyncError> {
		for key in keys {
			check_key(key)?;
		}
		if keys.is_empty() {
			return Ok(Vec::new());
		}
		let snapshot = self.read(id).await?;
		snapshot.batch_get(keys)
	}

	/// Named collections visible in the tenant scope of `scope`.
	pub async fn collections(&self, scope: &StoreId) -> Result<Vec<String>, SyncError> {
		Ok(self.repo.collections(scope.tenant()).await?)
	}

	/// Commit a batch of upserts and deletions as one snapshot revision.
	pub async fn upload(&self, id: &StoreId, batch: UploadBatch) -> Result<CommitSummary, SyncError> {
		batch.validate()?;
		if batch.is_empty() {
			return Ok(CommitSummary::default());
		}

		let writer = self.writer(id);
		let result = {
			let _guard = writer.lock().await;
			self.commit(id, batch).await
		};
		drop(writer);
		self.release(id);
		result
	}

	/// Load, apply and replace. Callers hold the store's writer lock.
	async fn commit(&self, id: &StoreId, batch: UploadBatch) -> Result<CommitSummary, SyncError> {
		let mut snapshot = self.repo.load(id).await?.unwrap_or_default();
		let summary = self.policy.apply(&mut snapshot, batch);
		if !summary.changed() {
			self.metrics.upserts_skipped_total.inc_by(summary.skipped as u64);
			return Ok(summary);
		}

		let timer = self.metrics.commit_duration_seconds.start_timer();
		if let Err(e) = self.repo.replace(id, &snapshot).await {
			timer.stop_and_discard();
			self.metrics.commit_failures_total.inc();
			error!("commit to {} aborted: {}", id, e);
			return Err(e.into());
		}
		timer.observe_duration();

		self.metrics.commits_total.inc();
		self.metrics.upserts_total.inc_by(summary.upserted as u64);
		self.metrics.upserts_skipped_total.inc_by(summary.skipped as u64);
		self.metrics.deletions_total.inc_by(summary.deleted as u64);
		info!(
			"committed {}: upserted={} skipped={} deleted={}",
			id, summary.upserted, summary.skipped, summary.deleted
		);
		Ok(summary)
	}

	/// Delete one key. Idempotent: repeating it keeps the first tombstone.
	pub async fn delete(
		&self,
		id: &StoreId,
		key: &str,
		deleted_at: impl Into<Timestamp>,
	) -> Result<CommitSummary, SyncError> {
		let deletion = Deletion {
			key: key.to_string(),
			deleted_at: deleted_at.into(),
		};
		self.upload(id, deletion.into()).await
	}

	fn writer(&self, id: &StoreId) -> Arc<AsyncMutex<()>> {
		let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
		writers.entry(id.clone()).or_default().clone()
	}

	/// Forget the lock for `id` once no other call holds or awaits it. Every
	/// holder owns a clone, so a count of one means only the map is left.
	fn release(&self, id: &StoreId) {
		let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
		if writers.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
			writers.remove(id);
		}
	}
}
