//! Main entry point for the Handoff relayer service.
//!
//! Builds a settlement instance from configuration and exposes it over an
//! HTTP API. The node submits settlements as its configured account, keeps
//! receipts of the settlements it committed and journals every committed
//! engine event to storage.

use clap::Parser;
use handoff_config::Config;
use handoff_core::{BuilderError, HandoffBuilder, HandoffFactories, RelayerContext};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

mod apis;
mod journal;
mod server;
#[cfg(test)]
mod testing;

/// Command-line arguments for the relayer service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "HANDOFF_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[derive(Debug, Error)]
enum ServiceError {
	#[error("Configuration error: {0}")]
	Config(#[from] handoff_config::ConfigError),
	#[error("Failed to build relayer: {0}")]
	Builder(#[from] BuilderError),
	#[error("Server error: {0}")]
	Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started relayer");

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.handoff.id);

	let context = build_relayer(config.clone()).await?;

	let journal = tokio::spawn(journal::record_events(context.clone()));
	let cleanup = tokio::spawn(journal::cleanup_loop(
		context.storage.clone(),
		Duration::from_secs(config.storage.cleanup_interval_seconds),
	));

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, context) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown requested");
				}
			}
		},
		None => {
			tracing::warn!("API server disabled - relayer will not accept settlements");
			tokio::signal::ctrl_c().await?;
		},
	}

	journal.abort();
	cleanup.abort();
	tracing::info!("Stopped relayer");
	Ok(())
}

/// Wires every registered chain, account and storage implementation into
/// the builder; the configuration selects the primaries.
async fn build_relayer(config: Config) -> Result<RelayerContext, BuilderError> {
	let factories = HandoffFactories::registered();

	tracing::debug!(
		chain = factories.chain_factories.len(),
		account = factories.account_factories.len(),
		storage = factories.storage_factories.len(),
		"Registered implementations"
	);

	HandoffBuilder::new(config).build(factories).await
}
