use prometheus::{
	Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "cybermuse_sync";

/// Central registry for all Prometheus metrics
pub struct MetricsRegistry {
	registry: Registry,

	// Request metrics
	pub requests_total: IntCounterVec,
	pub auth_failures_total: IntCounter,

	// Commit metrics
	pub commits_total: IntCounter,
	pub commit_failures_total: IntCounter,
	pub commit_duration_seconds: Histogram,
	pub upserts_total: IntCounter,
	pub upserts_skipped_total: IntCounter,
	pub deletions_total: IntCounter,
}

fn counter(name: &str, help: &str) -> prometheus::Result<IntCounter> {
	IntCounter::with_opts(Opts::new(name, help).namespace(NAMESPACE))
}

impl MetricsRegistry {
	pub fn new() -> prometheus::Result<Self> {
		let registry = Registry::new();

		let requests_total = IntCounterVec::new(
			Opts::new("requests_total", "Authenticated sync requests by operation")
				.namespace(NAMESPACE),
			&["operation"],
		)?;
		let auth_failures_total =
			counter("auth_failures_total", "Requests rejected by the auth gate")?;

		let commits_total = counter("commits_total", "Snapshot revisions committed")?;
		let commit_failures_total =
			counter("commit_failures_total", "Batches aborted by a persistence failure")?;
		let commit_duration_seconds = Histogram::with_opts(
			HistogramOpts::new(
				"commit_duration_seconds",
				"Time spent writing a snapshot revision",
			)
			.namespace(NAMESPACE)
			.buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
		)?;
		let upserts_total = counter("upserts_total", "Documents written by committed batches")?;
		let upserts_skipped_total = counter(
			"upserts_skipped_total",
			"Upserts absorbed by a tombstone or the conflict policy",
		)?;
		let deletions_total = counter("deletions_total", "Deletions that changed a snapshot")?;

		registry.register(Box::new(requests_total.clone()))?;
		registry.register(Box::new(auth_failures_total.clone()))?;
		registry.register(Box::new(commits_total.clone()))?;
		registry.register(Box::new(commit_failures_total.clone()))?;
		registry.register(Box::new(commit_duration_seconds.clone()))?;
		registry.register(Box::new(upserts_total.clone()))?;
		registry.register(Box::new(upserts_skipped_total.clone()))?;
		registry.register(Box::new(deletions_total.clone()))?;

		Ok(Self {
			registry,
			requests_total,
			auth_failures_total,
			commits_total,
			commit_failures_total,
			commit_duration_seconds,
			upserts_total,
			upserts_skipped_total,
			deletions_total,
		})
	}

	/// Count one authenticated request for `operation`.
	pub fn record_request(&self, operation: &str) {
		self.requests_total.with_label_values(&[operation]).inc();
	}

	/// Encode metrics in Prometheus text format
	pub fn encode(&self) -> String {
		let encoder = TextEncoder::new();
		let metric_families = self.registry.gather();
		match encoder.encode_to_string(&metric_families) {
			Ok(s) => s,
			Err(e) => {
				log::error!("failed to encode metrics: {}", e);
				String::new()
			}
		}
	}
}
