//! Execution host module for the Handoff settlement system.
//!
//! The settlement engine never touches token balances directly. Every
//! external effect goes through a [`ChainInterface`]: ABI-encoded calls into
//! token and registry programs, native value transfers, and the snapshot
//! frames that make a whole settlement commit or roll back as one unit.
//!
//! The in-process [`implementations::local::LocalChain`] is the development
//! host used by the relayer binary and by the engine's tests.

use alloy_primitives::{
	aliases::{U160, U48},
	Address, Bytes, U256,
};
use alloy_sol_types::SolCall;
use handoff_types::{
	contracts::{IAllowanceTransfer, IERC20},
	ConfigSchema, ImplementationRegistry,
};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Programs that can be deployed on the local chain.
pub mod programs;

/// Identifier of an open snapshot frame.
pub type SnapshotId = u64;

/// Errors that can occur while executing against the host.
#[derive(Debug, Error)]
pub enum ChainError {
	/// The called program aborted. All of its effects were rolled back.
	#[error("Execution reverted: {0}")]
	Reverted(String),
	/// A program was re-entered while it was still executing.
	#[error("Re-entrant call into {0}")]
	ReentrantCall(Address),
	#[error("Insufficient native balance: available {available}, requested {requested}")]
	InsufficientNativeBalance { available: U256, requested: U256 },
	/// The snapshot does not exist or is not the innermost open frame.
	#[error("Unknown snapshot {0}")]
	UnknownSnapshot(SnapshotId),
	/// Returned data could not be decoded as the expected type.
	#[error("Undecodable return data: {0}")]
	Decode(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Synchronous execution host.
///
/// All methods run to completion without suspending. Calls are atomic per
/// call: a call that returns an error leaves no effects behind. Snapshots
/// nest; `release` commits the innermost frame into its parent and
/// `revert_to` discards everything since the frame was opened.
pub trait ChainInterface: Send + Sync {
	/// Returns the configuration schema for this host implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	fn chain_id(&self) -> u64;

	/// Current block timestamp in seconds.
	fn timestamp(&self) -> u64;

	/// Whether executable code is deployed at `address`.
	fn has_code(&self, address: Address) -> bool;

	/// Calls `target` with ABI-encoded `calldata` on behalf of `caller`.
	///
	/// Calling an address without code succeeds with empty return data.
	fn call(&self, caller: Address, target: Address, calldata: &[u8])
		-> Result<Bytes, ChainError>;

	fn native_balance(&self, account: Address) -> U256;

	fn transfer_native(&self, from: Address, to: Address, amount: U256)
		-> Result<(), ChainError>;

	/// Opens a new snapshot frame.
	fn snapshot(&self) -> SnapshotId;

	/// Rolls back every effect since `id` was opened and closes the frame.
	fn revert_to(&self, id: SnapshotId) -> Result<(), ChainError>;

	/// Keeps the effects since `id` was opened and closes the frame.
	fn release(&self, id: SnapshotId) -> Result<(), ChainError>;
}

/// Type alias for chain factory functions.
pub type ChainFactory = fn(&toml::Value) -> Result<Box<dyn ChainInterface>, ChainError>;

/// Registry trait for chain implementations.
pub trait ChainRegistry: ImplementationRegistry<Factory = ChainFactory> {}

/// Get all registered chain implementations.
pub fn get_all_implementations() -> Vec<(&'static str, ChainFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service wrapping the primary host with typed call helpers.
#[derive(Clone)]
pub struct ChainService {
	host: Arc<dyn ChainInterface>,
}

impl ChainService {
	pub fn new(host: Arc<dyn ChainInterface>) -> Self {
		Self { host }
	}

	/// Underlying host.
	pub fn host(&self) -> &Arc<dyn ChainInterface> {
		&self.host
	}

	pub fn chain_id(&self) -> u64 {
		self.host.chain_id()
	}

	pub fn timestamp(&self) -> u64 {
		self.host.timestamp()
	}

	pub fn has_code(&self, address: Address) -> bool {
		self.host.has_code(address)
	}

	pub fn call(
		&self,
		caller: Address,
		target: Address,
		calldata: &[u8],
	) -> Result<Bytes, ChainError> {
		self.host.call(caller, target, calldata)
	}

	/// Encodes `call`, executes it and decodes the declared return values.
	pub fn call_typed<C: SolCall>(
		&self,
		caller: Address,
		target: Address,
		call: &C,
	) -> Result<C::Return, ChainError> {
		let output = self.host.call(caller, target, &call.abi_encode())?;
		C::abi_decode_returns(&output, true)
			.map_err(|e| ChainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
	}

	pub fn native_balance(&self, account: Address) -> U256 {
		self.host.native_balance(account)
	}

	pub fn transfer_native(
		&self,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<(), ChainError> {
		self.host.transfer_native(from, to, amount)
	}

	pub fn snapshot(&self) -> SnapshotId {
		self.host.snapshot()
	}

	pub fn revert_to(&self, id: SnapshotId) -> Result<(), ChainError> {
		self.host.revert_to(id)
	}

	pub fn release(&self, id: SnapshotId) -> Result<(), ChainError> {
		self.host.release(id)
	}

	/// ERC-20 balance of `account`.
	pub fn token_balance(&self, token: Address, account: Address) -> Result<U256, ChainError> {
		let ret = self.call_typed(
			Address::ZERO,
			token,
			&IERC20::balanceOfCall { account },
		)?;
		Ok(ret._0)
	}

	/// ERC-20 allowance granted by `owner` to `spender`.
	pub fn token_allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ChainError> {
		let ret = self.call_typed(
			Address::ZERO,
			token,
			&IERC20::allowanceCall { owner, spender },
		)?;
		Ok(ret._0)
	}

	/// Registry allowance as `(amount, expiration, nonce)`.
	pub fn registry_allowance(
		&self,
		registry: Address,
		user: Address,
		token: Address,
		spender: Address,
	) -> Result<(U160, U48, U48), ChainError> {
		let ret = self.call_typed(
			Address::ZERO,
			registry,
			&IAllowanceTransfer::allowanceCall {
				user,
				token,
				spender,
			},
		)?;
		Ok((ret.amount, ret.expiration, ret.nonce))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::local::LocalChain;
	use crate::programs::Erc20Token;

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["local"]);
	}

	#[test]
	fn test_typed_helpers_read_token_state() {
		let chain = Arc::new(LocalChain::new(31337, 1_700_000_000));
		let token = Address::repeat_byte(0x70);
		let holder = Address::repeat_byte(0x01);
		let spender = Address::repeat_byte(0x02);

		chain.deploy(
			token,
			Erc20Token::new("Test Token").with_balance(holder, U256::from(500)),
		);
		let service = ChainService::new(chain.clone());

		assert_eq!(
			service.token_balance(token, holder).unwrap(),
			U256::from(500)
		);
		assert_eq!(
			service.token_allowance(token, holder, spender).unwrap(),
			U256::ZERO
		);
		assert_eq!(service.chain_id(), 31337);
	}

	#[test]
	fn test_typed_call_on_empty_account_fails_to_decode() {
		let chain = Arc::new(LocalChain::new(1, 0));
		let service = ChainService::new(chain);

		let err = service
			.token_balance(Address::repeat_byte(0x99), Address::ZERO)
			.unwrap_err();
		assert!(matches!(err, ChainError::Decode(_)));
	}
}
