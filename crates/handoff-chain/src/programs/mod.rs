//! Programs executable on the local chain.
//!
//! A program owns its storage and handles ABI-encoded calls. Programs can
//! call other programs through the host in their [`CallContext`]. The host
//! rejects a call into a program that is already executing.

use crate::{ChainError, ChainInterface};
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use std::any::Any;

mod allowance_registry;
mod erc20;

pub use allowance_registry::AllowanceRegistry;
pub use erc20::{Erc20Token, ReturnStyle};

/// Execution context handed to a program for one call.
pub struct CallContext<'a> {
	/// Host the program runs on, for nested calls.
	pub host: &'a dyn ChainInterface,
	/// Immediate caller.
	pub caller: Address,
	/// Address the program is deployed at.
	pub this: Address,
	pub chain_id: u64,
	pub timestamp: u64,
}

/// A deployable program.
pub trait Program: Send {
	/// Handles one ABI-encoded call.
	///
	/// A program returning an error must treat the call as aborted; the host
	/// rolls back whatever state the call touched.
	fn execute(&mut self, ctx: &CallContext<'_>, calldata: &[u8]) -> Result<Bytes, ChainError>;

	/// Copies the program's storage for the host's snapshot journal.
	fn snapshot(&self) -> Box<dyn Program>;

	fn as_any(&self) -> &dyn Any;

	fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Aborts the current call with a reason.
pub(crate) fn revert<T>(reason: impl Into<String>) -> Result<T, ChainError> {
	Err(ChainError::Reverted(reason.into()))
}

/// ABI-encodes a single return value.
pub(crate) fn encode_return<T: SolValue>(value: T) -> Bytes {
	Bytes::from(value.abi_encode())
}
