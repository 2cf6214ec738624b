use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use cybermuse_sync::sync::TokenVerifier;
use cybermuse_sync::{config, observability, run};

#[derive(Parser)]
#[command(
	name = "cybermuse-sync",
	version,
	about = "Cybermuse Sync - document sync server with tombstoned deletes"
)]
struct Cli {
	/// Additional JSON/TOML config file layered over the system and user files
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Run the sync server (default)
	Serve,
	/// Sign an access token for a subject with the configured JWT secret
	IssueToken {
		/// Subject identity; selects the tenant store in per-subject mode
		#[arg(long)]
		subject: String,
		/// Token lifetime in seconds
		#[arg(long, default_value_t = 86_400)]
		ttl_secs: u64,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	let settings = config::load_with(cli.config.as_deref()).context("failed to load config")?;

	match cli.command.unwrap_or(Commands::Serve) {
		Commands::Serve => {
			observability::init_logging(settings.log_level)?;
			run(settings).await
		}
		Commands::IssueToken { subject, ttl_secs } => {
			let verifier = TokenVerifier::from_settings(&settings)
				.context("SYNC_JWT_SECRET must be set to issue tokens")?;
			let token = verifier.issue(&subject, Duration::from_secs(ttl_secs))?;
			println!("{}", token);
			Ok(())
		}
	}
}
