use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use super::{PersistError, SnapshotRepo, StoreId, is_valid_name};
use crate::sync::types::Snapshot;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// JSON snapshot files under a data directory:
///
/// ```text
/// <root>/db.json                               shared store
/// <root>/collections/<collection>.json         shared collection
/// <root>/tenants/<tenant>/db.json              per-subject store
/// <root>/tenants/<tenant>/collections/<c>.json per-subject collection
/// ```
pub struct JsonFileRepo {
	root: PathBuf,
}

impl JsonFileRepo {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Directory holding everything stored for `tenant`.
	fn scope_dir(&self, tenant: Option<&str>) -> PathBuf {
		match tenant {
			Some(tenant) => self.root.join("tenants").join(tenant),
			None => self.root.clone(),
		}
	}

	/// Snapshot file backing `id`.
	pub fn path_for(&self, id: &StoreId) -> PathBuf {
		let mut path = self.scope_dir(id.tenant());
		match id.collection() {
			Some(collection) => {
				path.push("collections");
				path.push(format!("{collection}.json"));
			}
			None => path.push("db.json"),
		}
		path
	}
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
	move |source| PersistError::Io {
		path: path.to_path_buf(),
		source,
	}
}

/// Sibling temp file in the same directory so the final rename stays on one
/// filesystem.
fn temp_path(target: &Path) -> PathBuf {
	let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
	let name = target
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| "snapshot".to_string());
	target.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
	let mut file = File::create(path).await.map_err(io_error(path))?;
	file.write_all(bytes).await.map_err(io_error(path))?;
	file.sync_all().await.map_err(io_error(path))?;
	Ok(())
}

#[async_trait]
impl SnapshotRepo for JsonFileRepo {
	async fn load(&self, id: &StoreId) -> Result<Option<Snapshot>, PersistError> {
		let path = self.path_for(id);
		let bytes = match fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(io_error(&path)(e)),
		};
		serde_json::from_slice(&bytes)
			.map(Some)
			.map_err(|source| PersistError::Decode { path, source })
	}

	async fn replace(&self, id: &StoreId, snapshot: &Snapshot) -> Result<(), PersistError> {
		let path = self.path_for(id);
		if let Some(dir) = path.parent() {
			fs::create_dir_all(dir).await.map_err(io_error(dir))?;
		}

		let bytes = serde_json::to_vec_pretty(snapshot).map_err(PersistError::Encode)?;
		let tmp = temp_path(&path);

		if let Err(e) = write_synced(&tmp, &bytes).await {
			let _ = fs::remove_file(&tmp).await;
			return Err(e);
		}
		if let Err(source) = fs::rename(&tmp, &path).await {
			let _ = fs::remove_file(&tmp).await;
			return Err(PersistError::Io { path, source });
		}

		debug!("committed {} bytes to {}", bytes.len(), path.display());
		Ok(())
	}

	async fn collections(&self, tenant: Option<&str>) -> Result<Vec<String>, PersistError> {
		let dir = self.scope_dir(tenant).join("collections");
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(io_error(&dir)(e)),
		};

		let mut names = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(io_error(&dir))? {
			if !entry.file_type().await.map_err(io_error(&dir))?.is_file() {
				continue;
			}
			let file_name = entry.file_name();
			// Temp files start with a dot and never match the name pattern.
			let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
				continue;
			};
			if is_valid_name(name) {
				names.push(name.to_string());
			}
		}
		names.sort();
		Ok(names)
	}
}
