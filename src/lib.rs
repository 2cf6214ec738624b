pub mod api;
pub mod config;
pub mod health;
pub mod observability;
pub mod persist;
pub mod state;
pub mod sync;

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use crate::config::Settings;
use crate::observability::MetricsRegistry;
use crate::persist::{JsonFileRepo, SnapshotRepo};
use crate::state::AppState;
use crate::sync::{AuthGate, SyncEngine};

/// Assemble handler state over an arbitrary snapshot backend.
pub fn build_state(settings: &Settings, repo: Arc<dyn SnapshotRepo>) -> Result<AppState> {
	let metrics = Arc::new(MetricsRegistry::new().context("failed to register metrics")?);
	let gate = AuthGate::from_settings(settings).context("auth gate is not configured")?;
	let engine = SyncEngine::new(repo, settings.merge_policy(), metrics.clone());

	Ok(AppState {
		engine: Arc::new(engine),
		gate: Arc::new(gate),
		tenancy: settings.tenancy,
		metrics,
	})
}

/// Serve the sync API over the JSON snapshot files in `settings.data_dir`
/// until SIGINT or SIGTERM.
pub async fn run(settings: Settings) -> Result<()> {
	settings.validate()?;

	tokio::fs::create_dir_all(&settings.data_dir)
		.await
		.with_context(|| format!("failed to create data dir {}", settings.data_dir.display()))?;
	let repo: Arc<dyn SnapshotRepo> = Arc::new(JsonFileRepo::new(&settings.data_dir));
	let state = build_state(&settings, repo)?;
	let app = api::router(state, settings.body_limit_bytes);

	let addr = format!("{}:{}", settings.host, settings.port);
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {}", addr))?;

	info!("Cybermuse Sync Server - version {}", env!("CARGO_PKG_VERSION"));
	info!(
		"listening on {} (data dir {}, tenancy {:?}, tombstones {})",
		listener.local_addr()?,
		settings.data_dir.display(),
		settings.tenancy,
		if settings.track_tombstones { "on" } else { "off" }
	);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error")?;

	info!("shut down cleanly");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			log::error!("failed to listen for SIGINT: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(e) => {
				log::error!("failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => info!("received SIGINT, shutting down..."),
		_ = terminate => info!("received SIGTERM, shutting down..."),
	}
}
