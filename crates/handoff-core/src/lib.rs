//! Core settlement engine for the Handoff system.
//!
//! Settles token transfers from a user to an offramp provider using an
//! off-line authorization the user signed, submitted on the user's behalf by
//! an authorized relayer. The engine is composed of five parts:
//!
//! - [`verifier`]: EIP-712 digests for both request shapes and signer recovery
//! - [`adapters::permit`]: applies the signed allowance grant, tolerating front-running
//! - [`adapters::transfer`]: token transfers that accept non-conforming return data
//! - [`state::ledger`]: one record per namespaced transaction id, plus token volume
//! - [`state::access`]: ownership, relayer allow-list, blacklist and pause flag
//!
//! [`engine::HandoffEngine`] wires them together. Every public operation is
//! synchronous and atomic: it either commits all of its effects, including
//! effects on external programs, or none of them.

use alloy_primitives::{Address, B256, U256};
use handoff_chain::ChainError;
use thiserror::Error;

pub mod adapters;
pub mod builder;
pub mod engine;
pub mod guard;
pub mod state;
pub mod verifier;

pub use builder::{BuilderError, HandoffBuilder, HandoffFactories, RelayerContext};
pub use engine::{event_bus::EventBus, HandoffEngine, SettlementOutcome};

/// Errors returned by engine operations.
///
/// Every error aborts the whole invocation; nothing it changed persists.
#[derive(Debug, Error)]
pub enum HandoffError {
	/// Caller is not an authorized relayer, or not the owner.
	#[error("Access denied for {0}")]
	AccessDenied(Address),
	#[error("Settlement is paused")]
	Paused,
	#[error("Settlement is not paused")]
	NotPaused,
	/// Owner or provider of the request is blacklisted.
	#[error("Blacklisted party {0}")]
	BlacklistedParty(Address),
	/// Recovered signer does not match the claimed owner.
	#[error("Invalid signature")]
	InvalidSignature,
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// Namespaced id already recorded.
	#[error("Duplicate transaction {0}")]
	DuplicateTransaction(B256),
	/// Permit attempt and allowance fallback both failed (direct token flow).
	#[error("Permit failed")]
	PermitFailed,
	/// Grant attempt and allowance fallback both failed (registry flow).
	#[error("Permit2 failed")]
	Permit2Failed,
	#[error("Insufficient balance: available {available}, requested {requested}")]
	InsufficientBalance { available: U256, requested: U256 },
	/// The token transfer did not satisfy the success predicate.
	#[error("Transfer failed")]
	TransferFailed,
	#[error("Relayer not found: {0}")]
	RelayerNotFound(Address),
	#[error("Relayer already exists: {0}")]
	RelayerAlreadyExists(Address),
	#[error("Zero address")]
	ZeroAddress,
	/// A mutating operation was entered while another was in flight on
	/// the same thread.
	#[error("Re-entrant call")]
	Reentrancy,
	#[error("Volume overflow for token {0}")]
	VolumeOverflow(Address),
	/// The execution host failed outside any adapter's success predicate.
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
}

impl HandoffError {
	/// Stable machine-readable code.
	pub fn code(&self) -> &'static str {
		match self {
			HandoffError::AccessDenied(_) => "ACCESS_DENIED",
			HandoffError::Paused => "PAUSED",
			HandoffError::NotPaused => "NOT_PAUSED",
			HandoffError::BlacklistedParty(_) => "BLACKLISTED_PARTY",
			HandoffError::InvalidSignature => "INVALID_SIGNATURE",
			HandoffError::InvalidRequest(_) => "INVALID_REQUEST",
			HandoffError::DuplicateTransaction(_) => "DUPLICATE_TRANSACTION",
			HandoffError::PermitFailed => "PERMIT_FAILED",
			HandoffError::Permit2Failed => "PERMIT2_FAILED",
			HandoffError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
			HandoffError::TransferFailed => "TRANSFER_FAILED",
			HandoffError::RelayerNotFound(_) => "RELAYER_NOT_FOUND",
			HandoffError::RelayerAlreadyExists(_) => "RELAYER_ALREADY_EXISTS",
			HandoffError::ZeroAddress => "ZERO_ADDRESS",
			HandoffError::Reentrancy => "REENTRANCY",
			HandoffError::VolumeOverflow(_) => "VOLUME_OVERFLOW",
			HandoffError::Chain(_) => "CHAIN_ERROR",
		}
	}
}
