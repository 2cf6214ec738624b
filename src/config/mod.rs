use log::Level;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::sync::{ConflictPolicy, MergePolicy, Tenancy};

/// Runtime configuration for the sync server.
///
/// Values are loaded from (in order): `/etc/cybermuse/sync.json`, the user
/// config folder (optional), an explicit file passed on the command line, and
/// environment variables prefixed with `SYNC_` (e.g. `SYNC_PORT`,
/// `SYNC_JWT_SECRET`, `SYNC_PASSWORD`).
#[derive(Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Settings {
	pub host: String,
	pub port: u16,
	/// Directory holding the snapshot files.
	pub data_dir: PathBuf,
	/// Shared secret accepted as a credential.
	pub password: Option<String>,
	/// HS256 secret for subject-bearing tokens.
	pub jwt_secret: Option<String>,
	pub jwt_issuer: Option<String>,
	pub jwt_audience: Option<String>,
	pub tenancy: Tenancy,
	pub track_tombstones: bool,
	pub conflict_policy: ConflictPolicy,
	pub body_limit_bytes: usize,
	pub log_level: Level,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 31700,
			data_dir: PathBuf::from("./data"),
			password: None,
			jwt_secret: None,
			jwt_issuer: None,
			jwt_audience: None,
			tenancy: Tenancy::Single,
			track_tombstones: true,
			conflict_policy: ConflictPolicy::ArrivalOrder,
			body_limit_bytes: 16 * 1024 * 1024,
			log_level: Level::Info,
		}
	}
}

impl fmt::Debug for Settings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
		f.debug_struct("Settings")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("data_dir", &self.data_dir)
			.field("password", &redact(&self.password))
			.field("jwt_secret", &redact(&self.jwt_secret))
			.field("jwt_issuer", &self.jwt_issuer)
			.field("jwt_audience", &self.jwt_audience)
			.field("tenancy", &self.tenancy)
			.field("track_tombstones", &self.track_tombstones)
			.field("conflict_policy", &self.conflict_policy)
			.field("body_limit_bytes", &self.body_limit_bytes)
			.field("log_level", &self.log_level)
			.finish()
	}
}

impl Settings {
	pub fn merge_policy(&self) -> MergePolicy {
		MergePolicy::new()
			.with_conflict_policy(self.conflict_policy)
			.with_tombstones(self.track_tombstones)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.password.is_none() && self.jwt_secret.is_none() {
			return Err(SettingsError::NoCredentials);
		}
		Ok(())
	}
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("configuration error: {0}")]
	Config(#[from] config::ConfigError),

	#[error("invalid value {value:?} for {var}")]
	InvalidEnv { var: &'static str, value: String },

	#[error("no credential configured: set SYNC_PASSWORD and/or SYNC_JWT_SECRET")]
	NoCredentials,
}

pub fn load() -> Result<Settings, SettingsError> {
	load_with(None)
}

/// Load settings, layering `extra` (when given, required to exist) above the
/// system and user config files.
pub fn load_with(extra: Option<&Path>) -> Result<Settings, SettingsError> {
	let mut builder = config::Config::builder()
		.add_source(config::File::with_name("/etc/cybermuse/sync.json").required(false));

	if let Some(folder) = dirs::config_dir() {
		let user_config_path = folder.join("cybermuse").join("sync.json");
		builder = builder.add_source(config::File::from(user_config_path).required(false));
	}
	if let Some(path) = extra {
		builder = builder.add_source(config::File::from(path).required(true));
	}

	builder = builder.add_source(
		config::Environment::with_prefix("SYNC")
			.prefix_separator("_")
			.separator("__"),
	);

	let mut s: Settings = builder.build()?.try_deserialize()?;

	// Explicit overrides for the variables operators set most. The `config`
	// environment source is skipped for values it would coerce (numeric
	// passwords lose leading zeros, for instance).
	overlay_string("SYNC_HOST", &mut s.host);
	overlay_parsed("SYNC_PORT", &mut s.port)?;
	if let Some(dir) = env_value("SYNC_DATA_DIR") {
		s.data_dir = PathBuf::from(dir);
	}
	overlay_optional("SYNC_PASSWORD", &mut s.password);
	overlay_optional("SYNC_JWT_SECRET", &mut s.jwt_secret);
	overlay_optional("SYNC_JWT_ISSUER", &mut s.jwt_issuer);
	overlay_optional("SYNC_JWT_AUDIENCE", &mut s.jwt_audience);
	overlay_parsed("SYNC_TRACK_TOMBSTONES", &mut s.track_tombstones)?;
	overlay_parsed("SYNC_BODY_LIMIT_BYTES", &mut s.body_limit_bytes)?;
	overlay_parsed("SYNC_LOG_LEVEL", &mut s.log_level)?;

	// Empty strings from files or the environment mean "unset".
	for secret in [
		&mut s.password,
		&mut s.jwt_secret,
		&mut s.jwt_issuer,
		&mut s.jwt_audience,
	] {
		if secret.as_deref() == Some("") {
			*secret = None;
		}
	}

	Ok(s)
}

fn env_value(var: &str) -> Option<String> {
	std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn overlay_string(var: &str, target: &mut String) {
	if let Some(v) = env_value(var) {
		*target = v;
	}
}

fn overlay_optional(var: &str, target: &mut Option<String>) {
	if let Some(v) = env_value(var) {
		*target = Some(v);
	}
}

fn overlay_parsed<T: FromStr>(var: &'static str, target: &mut T) -> Result<(), SettingsError> {
	if let Some(value) = env_value(var) {
		*target = value
			.parse()
			.map_err(|_| SettingsError::InvalidEnv { var, value })?;
	}
	Ok(())
}
