//! Durable snapshot storage.
//!
//! Every store is persisted as one snapshot that is read whole and replaced
//! whole. Implementations must make `replace` atomic: a failed write leaves
//! the previously committed snapshot readable.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::sync::types::Snapshot;

pub use file::JsonFileRepo;
pub use memory::MemoryRepo;

static NAME_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("static regex is valid"));

#[derive(Debug, Error)]
pub enum PersistError {
	#[error("i/o error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("snapshot {path} is not valid JSON: {source}")]
	Decode {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("failed to encode snapshot: {0}")]
	Encode(#[source] serde_json::Error),

	#[error("snapshot backend unavailable: {0}")]
	Unavailable(String),
}

/// Whether `name` is usable as a tenant or collection segment.
pub(crate) fn is_valid_name(name: &str) -> bool {
	NAME_RE.is_match(name)
}

/// A name that cannot be used as a tenant or collection segment.
#[derive(Debug, Error)]
#[error("invalid {kind} name {name:?}: expected 1-64 characters of [A-Za-z0-9_-]")]
pub struct InvalidName {
	pub kind: &'static str,
	pub name: String,
}

/// Address of one snapshot: an optional tenant and an optional collection.
///
/// Both segments are checked against a filesystem-safe pattern at
/// construction, so backends can turn them into paths directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId {
	tenant: Option<String>,
	collection: Option<String>,
}

impl StoreId {
	pub fn new(tenant: Option<String>, collection: Option<String>) -> Result<Self, InvalidName> {
		for (kind, name) in [("tenant", &tenant), ("collection", &collection)] {
			if let Some(name) = name {
				if !is_valid_name(name) {
					return Err(InvalidName {
						kind,
						name: name.clone(),
					});
				}
			}
		}
		Ok(Self { tenant, collection })
	}

	/// The single-tenant, default-collection store.
	pub fn shared() -> Self {
		Self::default()
	}

	pub fn tenant(&self) -> Option<&str> {
		self.tenant.as_deref()
	}

	pub fn collection(&self) -> Option<&str> {
		self.collection.as_deref()
	}
}

impl fmt::Display for StoreId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}/{}",
			self.tenant.as_deref().unwrap_or("shared"),
			self.collection.as_deref().unwrap_or("default")
		)
	}
}

/// Snapshot persistence backend.
#[async_trait]
pub trait SnapshotRepo: Send + Sync {
	/// Load the last committed snapshot, or `None` if the store has never
	/// been written.
	async fn load(&self, id: &StoreId) -> Result<Option<Snapshot>, PersistError>;

	/// Atomically replace the committed snapshot.
	async fn replace(&self, id: &StoreId, snapshot: &Snapshot) -> Result<(), PersistError>;

	/// Names of the collections under `tenant` (the shared scope when `None`)
	/// that have a committed snapshot, sorted. The default collection is not
	/// listed.
	async fn collections(&self, tenant: Option<&str>) -> Result<Vec<String>, PersistError>;
}
