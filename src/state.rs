use std::sync::Arc;

use crate::observability::MetricsRegistry;
use crate::sync::{AuthGate, SyncEngine, Tenancy};

/// Application state passed to handlers via Axum's `State` extractor.
///
/// The engine owns its own synchronization, so cloning the state per request
/// only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<SyncEngine>,
	pub gate: Arc<AuthGate>,
	pub tenancy: Tenancy,
	pub metrics: Arc<MetricsRegistry>,
}
