//! Event types emitted by the settlement engine.
//!
//! Events form an append-only log. An invocation that aborts emits nothing;
//! a committed invocation appends its events in emission order.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all settlement engine events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum HandoffEvent {
	/// A settlement has been committed.
	Completed {
		token: Address,
		user: Address,
		provider: Address,
		amount: U256,
		id: B256,
	},
	/// Native value has been received by the settlement instance.
	NativeReceived { sender: Address, amount: U256 },
	/// The owner withdrew native value.
	NativeTransferred { recipient: Address, amount: U256 },
	/// The owner withdrew tokens.
	TokenTransferred {
		recipient: Address,
		token: Address,
		amount: U256,
	},
	Blacklisted { user: Address },
	UnBlacklisted { user: Address },
	RelayerAdded { relayer: Address },
	RelayerRemoved { relayer: Address },
	OwnershipTransferred {
		previous_owner: Address,
		new_owner: Address,
	},
	Paused { account: Address },
	Unpaused { account: Address },
}

impl HandoffEvent {
	/// Event name as it appears in logs.
	pub fn name(&self) -> &'static str {
		match self {
			HandoffEvent::Completed { .. } => "Completed",
			HandoffEvent::NativeReceived { .. } => "NativeReceived",
			HandoffEvent::NativeTransferred { .. } => "NativeTransferred",
			HandoffEvent::TokenTransferred { .. } => "TokenTransferred",
			HandoffEvent::Blacklisted { .. } => "Blacklisted",
			HandoffEvent::UnBlacklisted { .. } => "UnBlacklisted",
			HandoffEvent::RelayerAdded { .. } => "RelayerAdded",
			HandoffEvent::RelayerRemoved { .. } => "RelayerRemoved",
			HandoffEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
			HandoffEvent::Paused { .. } => "Paused",
			HandoffEvent::Unpaused { .. } => "Unpaused",
		}
	}
}
