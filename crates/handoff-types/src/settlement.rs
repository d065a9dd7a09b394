//! Settlement ledger records.

use crate::SettlementFlow;
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// One committed settlement, keyed by its namespaced transaction id.
///
/// Records are written once and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
	/// Namespaced transaction id.
	pub id: B256,
	pub user: Address,
	pub provider: Address,
	pub token: Address,
	pub requested_amount: U256,
	/// Amount credited to the provider, see [`ReceivedAmountPolicy`].
	pub received_amount: U256,
	pub exists: bool,
}

/// How `received_amount` is filled in when a settlement is recorded.
///
/// Fee-on-transfer and rebasing tokens can deliver less than requested.
/// `Requested` keeps the historical behaviour of copying the requested
/// amount; `Measured` records the provider's balance delta across the
/// transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivedAmountPolicy {
	#[default]
	Requested,
	Measured,
}

/// Receipt persisted by the relayer service after a committed settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
	pub flow: SettlementFlow,
	pub relayer: Address,
	pub record: SettlementRecord,
	/// Host timestamp at which the settlement committed.
	pub settled_at: u64,
}
