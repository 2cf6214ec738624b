use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::persist::StoreId;
use crate::sync::auth::Principal;
use crate::sync::error::SyncError;

/// How authenticated callers map onto snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tenancy {
	/// Every caller shares one store.
	#[default]
	Single,
	/// Callers with a token subject get an isolated store; callers without
	/// one (shared secret) use the shared store.
	PerSubject,
}

impl Tenancy {
	/// Resolve the store a call addresses. Collection names are validated
	/// here, before any store access.
	pub fn store_for(
		&self,
		principal: &Principal,
		collection: Option<&str>,
	) -> Result<StoreId, SyncError> {
		let tenant = match (self, principal.subject.as_deref()) {
			(Tenancy::PerSubject, Some(subject)) => Some(tenant_dir(subject)),
			_ => None,
		};
		StoreId::new(tenant, collection.map(str::to_string))
			.map_err(|e| SyncError::Validation(e.to_string()))
	}
}

/// Subjects are arbitrary strings; hash them into a fixed-width directory name.
fn tenant_dir(subject: &str) -> String {
	format!("{:x}", Sha256::digest(subject.as_bytes()))
}
