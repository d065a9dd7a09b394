//! Delegated allowance registry compatible with Permit2's `AllowanceTransfer`.
//!
//! Owners approve the registry once on each token, then grant per-spender
//! allowances by signature. Spenders pull funds through the registry, which
//! calls `transferFrom` on the token with itself as the spender.

use super::{revert, CallContext, Program};
use crate::ChainError;
use alloy_primitives::{
	aliases::{U160, U48},
	keccak256, Address, Bytes, B256, U256,
};
use alloy_sol_types::{SolCall, SolInterface, SolValue};
use handoff_types::{
	contracts::{IAllowanceTransfer, IERC20},
	utils::{
		compute_final_digest, compute_unversioned_domain_hash, hash_permit_details,
		recover_signer, Eip712AbiEncoder, NAME_PERMIT2, PERMIT_DETAILS_TYPE, PERMIT_SINGLE_TYPE,
	},
};
use std::any::Any;
use std::collections::HashMap;

/// Allowance packed per `(owner, token, spender)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedAllowance {
	pub amount: U160,
	pub expiration: U48,
	pub nonce: U48,
}

/// Permit2-style allowance registry program.
#[derive(Debug, Clone, Default)]
pub struct AllowanceRegistry {
	allowances: HashMap<(Address, Address, Address), PackedAllowance>,
}

impl AllowanceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allowance(&self, owner: Address, token: Address, spender: Address) -> PackedAllowance {
		self.allowances
			.get(&(owner, token, spender))
			.copied()
			.unwrap_or_default()
	}

	/// Domain separator of the registry deployed at `this`.
	pub fn domain_separator(chain_id: u64, this: Address) -> B256 {
		compute_unversioned_domain_hash(NAME_PERMIT2, chain_id, &this)
	}

	/// Digest an owner signs to grant `permit_single`.
	pub fn permit_digest(
		chain_id: u64,
		this: Address,
		permit_single: &IAllowanceTransfer::PermitSingle,
	) -> B256 {
		let details = &permit_single.details;
		let type_string = format!("{}{}", PERMIT_SINGLE_TYPE, PERMIT_DETAILS_TYPE);

		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(type_string.as_bytes()));
		enc.push_b256(&hash_permit_details(
			&details.token,
			details.amount,
			details.expiration,
			details.nonce,
		));
		enc.push_address(&permit_single.spender);
		enc.push_u256(permit_single.sigDeadline);
		let struct_hash = keccak256(enc.finish());

		compute_final_digest(&Self::domain_separator(chain_id, this), &struct_hash)
	}

	fn permit(
		&mut self,
		ctx: &CallContext<'_>,
		call: IAllowanceTransfer::permitCall,
	) -> Result<Bytes, ChainError> {
		let permit = &call.permitSingle;
		if U256::from(ctx.timestamp) > permit.sigDeadline {
			return revert("SignatureExpired");
		}

		let key = (call.owner, permit.details.token, permit.spender);
		let current = self.allowance(call.owner, permit.details.token, permit.spender);
		if current.nonce != permit.details.nonce {
			return revert("InvalidNonce");
		}

		let digest = Self::permit_digest(ctx.chain_id, ctx.this, permit);
		match recover_signer(&digest, &call.signature) {
			Some(signer) if signer == call.owner => {},
			_ => return revert("InvalidSigner"),
		}

		// A zero expiration means the allowance lasts for the current block only
		let expiration = if permit.details.expiration == U48::ZERO {
			U48::from(ctx.timestamp)
		} else {
			permit.details.expiration
		};

		self.allowances.insert(
			key,
			PackedAllowance {
				amount: permit.details.amount,
				expiration,
				nonce: current.nonce + U48::from(1u64),
			},
		);
		Ok(Bytes::new())
	}

	fn transfer_from(
		&mut self,
		ctx: &CallContext<'_>,
		call: IAllowanceTransfer::transferFromCall,
	) -> Result<Bytes, ChainError> {
		let key = (call.from, call.token, ctx.caller);
		let mut allowed = self.allowance(call.from, call.token, ctx.caller);

		if U256::from(ctx.timestamp) > U256::from(allowed.expiration) {
			return revert("AllowanceExpired");
		}
		if allowed.amount != U160::MAX {
			if allowed.amount < call.amount {
				return revert("InsufficientAllowance");
			}
			allowed.amount -= call.amount;
			self.allowances.insert(key, allowed);
		}

		let transfer = IERC20::transferFromCall {
			from: call.from,
			to: call.to,
			amount: U256::from(call.amount),
		};
		let output = ctx.host.call(ctx.this, call.token, &transfer.abi_encode())?;
		let returned_true = output.len() == 32 && U256::from_be_slice(&output) == U256::from(1);
		if !(returned_true || (output.is_empty() && ctx.host.has_code(call.token))) {
			return revert("TRANSFER_FROM_FAILED");
		}
		Ok(Bytes::new())
	}
}

impl Program for AllowanceRegistry {
	fn execute(&mut self, ctx: &CallContext<'_>, calldata: &[u8]) -> Result<Bytes, ChainError> {
		use IAllowanceTransfer::IAllowanceTransferCalls;

		match IAllowanceTransferCalls::abi_decode(calldata, true) {
			Ok(IAllowanceTransferCalls::permit(call)) => self.permit(ctx, call),
			Ok(IAllowanceTransferCalls::transferFrom(call)) => self.transfer_from(ctx, call),
			Ok(IAllowanceTransferCalls::allowance(call)) => {
				let packed = self.allowance(call.user, call.token, call.spender);
				Ok(Bytes::from(
					(
						U256::from(packed.amount),
						U256::from(packed.expiration),
						U256::from(packed.nonce),
					)
						.abi_encode(),
				))
			},
			Err(_) => revert("unknown selector"),
		}
	}

	fn snapshot(&self) -> Box<dyn Program> {
		Box::new(self.clone())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}
