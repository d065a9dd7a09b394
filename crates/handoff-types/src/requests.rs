//! Signed request shapes accepted by the settlement flows.
//!
//! Both requests carry the settlement metadata (provider and the caller
//! supplied transaction id) next to the allowance authorization the owner
//! signed for the token or for the allowance registry. The owner signs the
//! whole request a second time under the Handoff EIP-712 domain; that
//! signature travels next to the request and is not part of it.

use alloy_primitives::{
	aliases::{U160, U48},
	Address, Bytes, B256, U256,
};
use serde::{Deserialize, Serialize};

/// Allowance-by-signature authorization applied directly against the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardPermitRequest {
	/// Token being settled. Must implement `permit`.
	pub token: Address,
	/// Token holder and signer of both the permit and the request.
	pub owner: Address,
	/// Spender named in the permit; must be the settlement instance.
	pub spender: Address,
	/// Amount granted by the permit and moved to the provider.
	pub value: U256,
	/// Permit deadline, enforced by the token.
	pub deadline: U256,
	/// Permit signature recovery id.
	pub v: u8,
	/// Permit signature `r`.
	pub r: B256,
	/// Permit signature `s`.
	pub s: B256,
	/// Offramp provider receiving the funds.
	pub provider: Address,
	/// Caller supplied transaction identifier.
	pub transaction_id: B256,
}

/// Allowance details inside a delegated-allowance grant.
///
/// Field widths follow the registry's `PermitDetails` layout: `amount` is a
/// uint160, `expiration` and `nonce` are uint48 values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDetails {
	pub token: Address,
	pub amount: U160,
	pub expiration: U48,
	pub nonce: U48,
}

/// Allowance grant routed through the external allowance registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedAllowanceRequest {
	/// Token holder and signer.
	pub owner: Address,
	/// Allowance the owner grants through the registry.
	pub permit: PermitDetails,
	/// Spender named in the grant; must be the settlement instance.
	pub spender: Address,
	/// Deadline of the registry signature.
	pub sig_deadline: U256,
	/// Owner's signature over the registry's own typed data.
	pub signature: Bytes,
	/// Offramp provider receiving the funds.
	pub provider: Address,
	/// Caller supplied transaction identifier.
	pub transaction_id: B256,
}

impl DelegatedAllowanceRequest {
	/// Token moved by this request.
	pub fn token(&self) -> Address {
		self.permit.token
	}

	/// Requested amount widened to 256 bits.
	pub fn amount(&self) -> U256 {
		U256::from(self.permit.amount)
	}
}

/// The two settlement flows, used for logging and receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementFlow {
	/// Permit applied directly against the token.
	StandardPermit,
	/// Grant applied through the allowance registry.
	DelegatedAllowance,
}

impl SettlementFlow {
	pub fn as_str(&self) -> &'static str {
		match self {
			SettlementFlow::StandardPermit => "standard_permit",
			SettlementFlow::DelegatedAllowance => "delegated_allowance",
		}
	}
}

impl std::fmt::Display for SettlementFlow {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
