//! Configuration module for the Handoff relayer.
//!
//! Loads the relayer configuration from TOML, resolving `${VAR}` and
//! `${VAR:-default}` environment references before parsing, and validates
//! the result so that a misconfigured node refuses to start.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use handoff_types::{Address, ReceivedAmountPolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for a Handoff relayer node.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Settlement instance this node submits to.
	pub handoff: HandoffConfig,
	/// Execution host the engine calls external programs through.
	pub chain: ChainConfig,
	/// Key the node signs and submits with.
	pub account: AccountConfig,
	/// Receipt and event persistence.
	pub storage: StorageConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity and initial state of the settlement instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandoffConfig {
	/// Unique identifier for this node, used in logs.
	pub id: String,
	/// Chain id bound into the signing domain and namespaced ids.
	pub chain_id: u64,
	/// Address of the settlement instance (the `verifyingContract`).
	pub address: Address,
	/// Initial owner.
	pub owner: Address,
	/// Address of the delegated allowance registry.
	pub permit2: Address,
	/// Relayers authorized at deployment.
	#[serde(default)]
	pub relayers: Vec<Address>,
	/// Parties blacklisted at deployment.
	#[serde(default)]
	pub blacklist: Vec<Address>,
	/// How the ledger fills in the received amount.
	#[serde(default)]
	pub received_amount: ReceivedAmountPolicy,
}

/// Configuration for the execution host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of chain implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	pub cleanup_interval_seconds: u64,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
	pub allowed_headers: Vec<String>,
	pub allowed_methods: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();

		let value = match (std::env::var(var_name), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name
				)));
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse order to keep earlier offsets valid
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

fn validate_backend_section(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		loader::load(Path::new(path)).await
	}

	/// Checks cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		let handoff = &self.handoff;
		if handoff.id.is_empty() {
			return Err(ConfigError::Validation("Handoff ID cannot be empty".into()));
		}
		if handoff.chain_id == 0 {
			return Err(ConfigError::Validation(
				"handoff.chain_id must be greater than 0".into(),
			));
		}
		for (field, value) in [
			("address", handoff.address),
			("owner", handoff.owner),
			("permit2", handoff.permit2),
		] {
			if value.is_zero() {
				return Err(ConfigError::Validation(format!(
					"handoff.{} cannot be the zero address",
					field
				)));
			}
		}

		let mut seen = HashSet::new();
		for relayer in &handoff.relayers {
			if relayer.is_zero() {
				return Err(ConfigError::Validation(
					"handoff.relayers cannot contain the zero address".into(),
				));
			}
			if !seen.insert(*relayer) {
				return Err(ConfigError::Validation(format!(
					"Duplicate relayer {} in handoff.relayers",
					relayer
				)));
			}
		}
		if handoff.blacklist.iter().any(|a| a.is_zero()) {
			return Err(ConfigError::Validation(
				"handoff.blacklist cannot contain the zero address".into(),
			));
		}

		validate_backend_section("chain", &self.chain.primary, &self.chain.implementations)?;
		validate_backend_section(
			"account",
			&self.account.primary,
			&self.account.implementations,
		)?;
		validate_backend_section(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;

		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation(
					"api.port must be non-zero when the API is enabled".into(),
				));
			}
			if api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"api.timeout_seconds must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) const BASE_CONFIG: &str = r#"
[handoff]
id = "handoff-test"
chain_id = 31337
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
owner = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
permit2 = "0x000000000022D473030F116dDEE9F6B43aC78BA3"
relayers = ["0x70997970C51812dc3A010C7d01b50e0d17dc79C8"]

[chain]
primary = "local"
[chain.implementations.local]
timestamp = 1700000000

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("HANDOFF_TEST_HOST", "localhost");
		std::env::set_var("HANDOFF_TEST_PORT", "5432");

		let input = "host = \"${HANDOFF_TEST_HOST}:${HANDOFF_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("HANDOFF_TEST_HOST");
		std::env::remove_var("HANDOFF_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${HANDOFF_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${HANDOFF_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("HANDOFF_MISSING_VAR"));
	}

	#[test]
	fn test_base_config_parses_with_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.handoff.chain_id, 31337);
		assert_eq!(config.handoff.relayers.len(), 1);
		assert!(config.handoff.blacklist.is_empty());
		assert_eq!(
			config.handoff.received_amount,
			ReceivedAmountPolicy::Requested
		);
		assert!(config.api.is_none());
	}

	#[test]
	fn test_received_amount_policy_parses() {
		let config_str = BASE_CONFIG.replace(
			"relayers = [",
			"received_amount = \"measured\"\nrelayers = [",
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(
			config.handoff.received_amount,
			ReceivedAmountPolicy::Measured
		);
	}

	#[test]
	fn test_zero_owner_rejected() {
		let config_str = BASE_CONFIG.replace(
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
			"0x0000000000000000000000000000000000000000",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("handoff.owner"));
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let config_str = BASE_CONFIG.replace("chain_id = 31337", "chain_id = 0");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("chain_id"));
	}

	#[test]
	fn test_duplicate_relayer_rejected() {
		let config_str = BASE_CONFIG.replace(
			"relayers = [\"0x70997970C51812dc3A010C7d01b50e0d17dc79C8\"]",
			"relayers = [\"0x70997970C51812dc3A010C7d01b50e0d17dc79C8\", \"0x70997970c51812dc3a010c7d01b50e0d17dc79c8\"]",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Duplicate relayer"));
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"redis\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'redis' not found in implementations"));
	}

	#[test]
	fn test_bad_address_is_parse_error() {
		let config_str = BASE_CONFIG.replace(
			"0x5FbDB2315678afecb367f032d93F642f64180aa3",
			"0x5FbDB2315678",
		);
		assert!(matches!(
			Config::from_str(&config_str),
			Err(ConfigError::Parse(_))
		));
	}

	#[test]
	fn test_api_defaults() {
		let config_str = format!("{}\n[api]\nenabled = true\n", BASE_CONFIG);
		let config: Config = config_str.parse().unwrap();
		let api = config.api.unwrap();
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 3000);
		assert_eq!(api.max_request_size, 1024 * 1024);
	}

	#[test]
	fn test_zero_api_timeout_rejected() {
		let config_str = format!(
			"{}\n[api]\nenabled = true\ntimeout_seconds = 0\n",
			BASE_CONFIG
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("timeout_seconds must be greater than 0"));
	}
}
