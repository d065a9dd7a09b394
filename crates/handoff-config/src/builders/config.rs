//! Fluent builder for `Config` instances with development defaults.

use crate::{
	AccountConfig, ApiConfig, ChainConfig, Config, HandoffConfig, StorageConfig,
};
use handoff_types::{Address, ReceivedAmountPolicy};
use std::collections::HashMap;

/// Builder for `Config` with defaults matching a local development node.
///
/// The account, chain and storage sections default to the `local` and
/// `memory` backends with empty implementation tables.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	id: String,
	chain_id: u64,
	address: Address,
	owner: Address,
	permit2: Address,
	relayers: Vec<Address>,
	blacklist: Vec<Address>,
	received_amount: ReceivedAmountPolicy,
	chain_implementation: toml::Value,
	account_implementation: toml::Value,
	storage_primary: String,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			id: "handoff-test".to_string(),
			chain_id: 31337,
			address: Address::repeat_byte(0xaa),
			owner: Address::repeat_byte(0x01),
			permit2: Address::repeat_byte(0xbb),
			relayers: Vec::new(),
			blacklist: Vec::new(),
			received_amount: ReceivedAmountPolicy::Requested,
			chain_implementation: toml::Value::Table(toml::map::Map::new()),
			account_implementation: toml::Value::Table(toml::map::Map::new()),
			storage_primary: "memory".to_string(),
			api: None,
		}
	}

	pub fn id(mut self, id: impl Into<String>) -> Self {
		self.id = id.into();
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Sets the settlement instance address.
	pub fn address(mut self, address: Address) -> Self {
		self.address = address;
		self
	}

	pub fn owner(mut self, owner: Address) -> Self {
		self.owner = owner;
		self
	}

	pub fn permit2(mut self, permit2: Address) -> Self {
		self.permit2 = permit2;
		self
	}

	pub fn relayers(mut self, relayers: Vec<Address>) -> Self {
		self.relayers = relayers;
		self
	}

	pub fn blacklist(mut self, blacklist: Vec<Address>) -> Self {
		self.blacklist = blacklist;
		self
	}

	pub fn received_amount(mut self, policy: ReceivedAmountPolicy) -> Self {
		self.received_amount = policy;
		self
	}

	/// Sets the `[chain.implementations.local]` table.
	pub fn chain_implementation(mut self, table: toml::Value) -> Self {
		self.chain_implementation = table;
		self
	}

	/// Sets the `[account.implementations.local]` table.
	pub fn account_implementation(mut self, table: toml::Value) -> Self {
		self.account_implementation = table;
		self
	}

	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config` without running validation.
	pub fn build(self) -> Config {
		let empty = || toml::Value::Table(toml::map::Map::new());
		Config {
			handoff: HandoffConfig {
				id: self.id,
				chain_id: self.chain_id,
				address: self.address,
				owner: self.owner,
				permit2: self.permit2,
				relayers: self.relayers,
				blacklist: self.blacklist,
				received_amount: self.received_amount,
			},
			chain: ChainConfig {
				primary: "local".to_string(),
				implementations: HashMap::from([(
					"local".to_string(),
					self.chain_implementation,
				)]),
			},
			account: AccountConfig {
				primary: "local".to_string(),
				implementations: HashMap::from([(
					"local".to_string(),
					self.account_implementation,
				)]),
			},
			storage: StorageConfig {
				implementations: HashMap::from([(self.storage_primary.clone(), empty())]),
				primary: self.storage_primary,
				cleanup_interval_seconds: 60,
			},
			api: self.api,
		}
	}
}
