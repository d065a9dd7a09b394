//! Builder for composing a relayer node from pluggable implementations.
//!
//! Each component section of the configuration names a primary
//! implementation and carries one table per implementation. The builder
//! instantiates every implementation that has a factory, keeps the primary
//! one and wires the results into a [`RelayerContext`].

use crate::engine::HandoffEngine;
use alloy_primitives::Address;
use handoff_account::{AccountError, AccountFactory, AccountInterface, AccountService};
use handoff_chain::{ChainError, ChainFactory, ChainInterface, ChainService};
use handoff_config::Config;
use handoff_storage::{StorageError, StorageFactory, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a relayer node.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for each component, keyed by implementation name.
pub struct HandoffFactories<CF, AF, SF> {
	pub chain_factories: HashMap<String, CF>,
	pub account_factories: HashMap<String, AF>,
	pub storage_factories: HashMap<String, SF>,
}

impl HandoffFactories<ChainFactory, AccountFactory, StorageFactory> {
	/// Every implementation the backend crates register.
	pub fn registered() -> Self {
		fn named<F>(entries: Vec<(&'static str, F)>) -> HashMap<String, F> {
			entries
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect()
		}

		Self {
			chain_factories: named(handoff_chain::get_all_implementations()),
			account_factories: named(handoff_account::get_all_implementations()),
			storage_factories: named(handoff_storage::get_all_implementations()),
		}
	}
}

/// Everything a running relayer node needs.
#[derive(Clone)]
pub struct RelayerContext {
	pub engine: Arc<HandoffEngine>,
	pub chain: ChainService,
	pub account: Arc<AccountService>,
	pub storage: Arc<StorageService>,
	/// Address the node submits settlements as.
	pub relayer: Address,
}

pub struct HandoffBuilder {
	config: Config,
}

impl HandoffBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub async fn build<CF, AF, SF>(
		self,
		factories: HandoffFactories<CF, AF, SF>,
	) -> Result<RelayerContext, BuilderError>
	where
		CF: Fn(&toml::Value) -> Result<Box<dyn ChainInterface>, ChainError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let account_backend = load_primary(
			"account",
			&self.config.account.primary,
			&self.config.account.implementations,
			&factories.account_factories,
		)?;
		let account = Arc::new(AccountService::new(account_backend));

		// Fetch the relayer address once during initialization
		let relayer = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get relayer address");
			BuilderError::Config(format!("Failed to get relayer address: {}", e))
		})?;

		let host: Arc<dyn ChainInterface> = load_primary(
			"chain",
			&self.config.chain.primary,
			&self.config.chain.implementations,
			&factories.chain_factories,
		)?
		.into();
		let chain = ChainService::new(host);

		if chain.chain_id() != self.config.handoff.chain_id {
			return Err(BuilderError::Config(format!(
				"Host chain id {} does not match configured chain id {}",
				chain.chain_id(),
				self.config.handoff.chain_id
			)));
		}

		let engine = HandoffEngine::new(&self.config.handoff, chain.clone())
			.map_err(|e| BuilderError::Config(format!("Failed to create engine: {}", e)))?;

		if !engine.is_relayer(relayer) {
			tracing::warn!(
				relayer = %relayer,
				"Configured account is not an authorized relayer - settlements will be rejected"
			);
		}

		tracing::info!(
			id = %self.config.handoff.id,
			chain_id = engine.chain_id(),
			instance = %engine.instance(),
			relayer = %relayer,
			"Settlement instance ready"
		);

		Ok(RelayerContext {
			engine: Arc::new(engine),
			chain,
			account,
			storage,
			relayer,
		})
	}
}

/// Instantiates every configured implementation that has a factory and
/// returns the primary one.
fn load_primary<T, E, F>(
	component: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				// Validation already happened in the factory
				loaded.insert(name.clone(), implementation);
				tracing::info!(component, implementation = %name, enabled = %(name == primary), "Loaded");
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"no {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}
