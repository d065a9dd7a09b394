//! Transaction ledger and per-token volume.

use crate::HandoffError;
use alloy_primitives::{keccak256, Address, B256, U256};
use handoff_types::SettlementRecord;
use std::collections::HashMap;

/// Binds a caller-supplied id to the signing user, the settlement instance
/// and the chain: `keccak256(rawId ‖ user ‖ instance ‖ uint256(chainId))`.
pub fn namespaced_id(raw_id: B256, user: Address, instance: Address, chain_id: u64) -> B256 {
	let mut packed = Vec::with_capacity(32 + 20 + 20 + 32);
	packed.extend_from_slice(raw_id.as_slice());
	packed.extend_from_slice(user.as_slice());
	packed.extend_from_slice(instance.as_slice());
	packed.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
	keccak256(packed)
}

/// Settlement records keyed by namespaced id, and cumulative volume per token.
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
	records: HashMap<B256, SettlementRecord>,
	volume: HashMap<Address, U256>,
}

impl TransactionLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn ensure_unused(&self, id: &B256) -> Result<(), HandoffError> {
		if self.records.get(id).is_some_and(|record| record.exists) {
			return Err(HandoffError::DuplicateTransaction(*id));
		}
		Ok(())
	}

	/// Inserts a new record and adds its requested amount to the token volume.
	///
	/// Nothing is written unless both the duplicate and overflow checks pass.
	pub fn record(&mut self, record: SettlementRecord) -> Result<(), HandoffError> {
		let volume = self.prepare(&record)?;
		self.insert(record, volume);
		Ok(())
	}

	/// Runs the duplicate and overflow checks for `record` without writing,
	/// returning the token volume after it.
	pub fn prepare(&self, record: &SettlementRecord) -> Result<U256, HandoffError> {
		self.ensure_unused(&record.id)?;
		self.total_volume(&record.token)
			.checked_add(record.requested_amount)
			.ok_or(HandoffError::VolumeOverflow(record.token))
	}

	/// Writes a record checked by [`prepare`](Self::prepare) along with the
	/// volume it returned.
	pub fn insert(&mut self, record: SettlementRecord, volume: U256) {
		self.volume.insert(record.token, volume);
		self.records.insert(record.id, record);
	}

	pub fn get(&self, id: &B256) -> Option<&SettlementRecord> {
		self.records.get(id)
	}

	pub fn total_volume(&self, token: &Address) -> U256 {
		self.volume.get(token).copied().unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
