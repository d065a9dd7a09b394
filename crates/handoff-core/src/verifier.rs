//! EIP-712 signature verification for the two request shapes.
//!
//! Both requests are signed under the domain
//! `("Handoff", "1", chainId, instance)`. The struct hashes reproduce the
//! off-line signer's layout exactly: field order, `bytes` hashed to a word,
//! and the nested `PermitDetails` hashed on its own first.

use crate::HandoffError;
use alloy_primitives::{keccak256, Address, B256};
use handoff_types::{
	utils::{
		compute_domain_hash, compute_final_digest, hash_permit_details, recover_signer,
		Eip712AbiEncoder, NAME_HANDOFF, PERMIT2_REQUEST_TYPE, PERMIT_DETAILS_TYPE,
		PERMIT_REQUEST_TYPE, VERSION_HANDOFF,
	},
	DelegatedAllowanceRequest, StandardPermitRequest,
};

/// Verifier bound to one settlement instance's signing domain.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier {
	domain_separator: B256,
}

impl SignatureVerifier {
	pub fn new(chain_id: u64, instance: Address) -> Self {
		Self {
			domain_separator: compute_domain_hash(NAME_HANDOFF, VERSION_HANDOFF, chain_id, &instance),
		}
	}

	pub fn domain_separator(&self) -> B256 {
		self.domain_separator
	}

	pub fn standard_permit_digest(&self, request: &StandardPermitRequest) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(PERMIT_REQUEST_TYPE.as_bytes()));
		enc.push_address(&request.token);
		enc.push_address(&request.owner);
		enc.push_address(&request.spender);
		enc.push_u256(request.value);
		enc.push_u256(request.deadline);
		enc.push_u8(request.v);
		enc.push_b256(&request.r);
		enc.push_b256(&request.s);
		enc.push_address(&request.provider);
		enc.push_b256(&request.transaction_id);

		compute_final_digest(&self.domain_separator, &keccak256(enc.finish()))
	}

	pub fn delegated_allowance_digest(&self, request: &DelegatedAllowanceRequest) -> B256 {
		let type_string = format!("{}{}", PERMIT2_REQUEST_TYPE, PERMIT_DETAILS_TYPE);
		let permit = &request.permit;

		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(type_string.as_bytes()));
		enc.push_address(&request.owner);
		enc.push_b256(&hash_permit_details(
			&permit.token,
			permit.amount,
			permit.expiration,
			permit.nonce,
		));
		enc.push_address(&request.spender);
		enc.push_u256(request.sig_deadline);
		enc.push_bytes(&request.signature);
		enc.push_address(&request.provider);
		enc.push_b256(&request.transaction_id);

		compute_final_digest(&self.domain_separator, &keccak256(enc.finish()))
	}

	pub fn verify_standard_permit(
		&self,
		request: &StandardPermitRequest,
		signature: &[u8],
	) -> Result<(), HandoffError> {
		Self::check_signer(
			&self.standard_permit_digest(request),
			signature,
			request.owner,
		)
	}

	pub fn verify_delegated_allowance(
		&self,
		request: &DelegatedAllowanceRequest,
		signature: &[u8],
	) -> Result<(), HandoffError> {
		Self::check_signer(
			&self.delegated_allowance_digest(request),
			signature,
			request.owner,
		)
	}

	fn check_signer(digest: &B256, signature: &[u8], owner: Address) -> Result<(), HandoffError> {
		match recover_signer(digest, signature) {
			Some(signer) if signer == owner => Ok(()),
			_ => Err(HandoffError::InvalidSignature),
		}
	}
}
