//! ERC-20 token with EIP-2612 permit and configurable quirks.

use super::{encode_return, revert, CallContext, Program};
use crate::ChainError;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolInterface, SolValue};
use handoff_types::{
	contracts::{IERC20, IERC20Permit},
	utils::{
		compute_domain_hash, compute_final_digest, join_signature, recover_signer,
		Eip712AbiEncoder, ERC20_PERMIT_TYPE,
	},
};
use serde::Deserialize;
use std::any::Any;
use std::collections::HashMap;

/// What `transfer` and `transferFrom` return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStyle {
	/// Moves funds and returns `true`.
	#[default]
	Standard,
	/// Moves funds and returns no data.
	Missing,
	/// Returns `false` without moving funds.
	False,
}

/// ERC-20 token program.
///
/// The permit domain is `(name, "1", chainId, token address)`. A non-zero
/// `fee_bps` burns that share of every transfer, so the recipient receives
/// less than the amount debited from the sender.
#[derive(Debug, Clone)]
pub struct Erc20Token {
	name: String,
	balances: HashMap<Address, U256>,
	allowances: HashMap<(Address, Address), U256>,
	nonces: HashMap<Address, U256>,
	return_style: ReturnStyle,
	fee_bps: u16,
}

impl Erc20Token {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			balances: HashMap::new(),
			allowances: HashMap::new(),
			nonces: HashMap::new(),
			return_style: ReturnStyle::Standard,
			fee_bps: 0,
		}
	}

	pub fn with_return_style(mut self, style: ReturnStyle) -> Self {
		self.return_style = style;
		self
	}

	/// Sets the transfer fee in basis points, capped at 10000.
	pub fn with_fee_bps(mut self, fee_bps: u16) -> Self {
		self.fee_bps = fee_bps.min(10_000);
		self
	}

	pub fn with_balance(mut self, holder: Address, amount: U256) -> Self {
		self.mint(holder, amount);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn mint(&mut self, to: Address, amount: U256) {
		let balance = self.balances.entry(to).or_default();
		*balance = balance.saturating_add(amount);
	}

	pub fn balance_of(&self, account: Address) -> U256 {
		self.balances.get(&account).copied().unwrap_or_default()
	}

	pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
		self.allowances
			.get(&(owner, spender))
			.copied()
			.unwrap_or_default()
	}

	pub fn nonce(&self, owner: Address) -> U256 {
		self.nonces.get(&owner).copied().unwrap_or_default()
	}

	/// EIP-712 domain separator for permits against the token at `this`.
	pub fn domain_separator(&self, chain_id: u64, this: Address) -> B256 {
		compute_domain_hash(&self.name, "1", chain_id, &this)
	}

	/// Digest an owner signs to grant `spender` an allowance of `value`.
	#[allow(clippy::too_many_arguments)]
	pub fn permit_digest(
		&self,
		chain_id: u64,
		this: Address,
		owner: Address,
		spender: Address,
		value: U256,
		nonce: U256,
		deadline: U256,
	) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(ERC20_PERMIT_TYPE.as_bytes()));
		enc.push_address(&owner);
		enc.push_address(&spender);
		enc.push_u256(value);
		enc.push_u256(nonce);
		enc.push_u256(deadline);
		let struct_hash = keccak256(enc.finish());
		compute_final_digest(&self.domain_separator(chain_id, this), &struct_hash)
	}

	fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), ChainError> {
		let available = self.balance_of(from);
		if available < amount {
			return revert("ERC20InsufficientBalance");
		}
		let fee = amount.saturating_mul(U256::from(self.fee_bps)) / U256::from(10_000u64);
		self.balances.insert(from, available - amount);
		let credited = self.balance_of(to).saturating_add(amount - fee);
		self.balances.insert(to, credited);
		Ok(())
	}

	fn spend_allowance(
		&mut self,
		owner: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), ChainError> {
		let current = self.allowance(owner, spender);
		if current == U256::MAX {
			return Ok(());
		}
		if current < amount {
			return revert("ERC20InsufficientAllowance");
		}
		self.allowances.insert((owner, spender), current - amount);
		Ok(())
	}

	/// Return data for a transfer that moved funds.
	fn transfer_output(&self) -> Bytes {
		match self.return_style {
			ReturnStyle::Standard => encode_return(true),
			ReturnStyle::Missing => Bytes::new(),
			ReturnStyle::False => encode_return(false),
		}
	}

	fn execute_erc20(
		&mut self,
		ctx: &CallContext<'_>,
		call: IERC20::IERC20Calls,
	) -> Result<Bytes, ChainError> {
		use IERC20::IERC20Calls;

		match call {
			IERC20Calls::balanceOf(c) => Ok(encode_return(self.balance_of(c.account))),
			IERC20Calls::allowance(c) => Ok(encode_return(self.allowance(c.owner, c.spender))),
			IERC20Calls::approve(c) => {
				self.allowances.insert((ctx.caller, c.spender), c.amount);
				Ok(encode_return(true))
			},
			IERC20Calls::transfer(c) => {
				if self.return_style == ReturnStyle::False {
					return Ok(self.transfer_output());
				}
				self.move_balance(ctx.caller, c.to, c.amount)?;
				Ok(self.transfer_output())
			},
			IERC20Calls::transferFrom(c) => {
				if self.return_style == ReturnStyle::False {
					return Ok(self.transfer_output());
				}
				self.spend_allowance(c.from, ctx.caller, c.amount)?;
				self.move_balance(c.from, c.to, c.amount)?;
				Ok(self.transfer_output())
			},
		}
	}

	fn execute_permit(
		&mut self,
		ctx: &CallContext<'_>,
		call: IERC20Permit::IERC20PermitCalls,
	) -> Result<Bytes, ChainError> {
		use IERC20Permit::IERC20PermitCalls;

		match call {
			IERC20PermitCalls::permit(c) => {
				if U256::from(ctx.timestamp) > c.deadline {
					return revert("ERC2612ExpiredSignature");
				}
				let nonce = self.nonce(c.owner);
				let digest = self.permit_digest(
					ctx.chain_id,
					ctx.this,
					c.owner,
					c.spender,
					c.value,
					nonce,
					c.deadline,
				);
				let signature = join_signature(c.v, &c.r, &c.s);
				match recover_signer(&digest, &signature) {
					Some(signer) if signer == c.owner => {},
					_ => return revert("ERC2612InvalidSigner"),
				}
				self.nonces.insert(c.owner, nonce + U256::from(1));
				self.allowances.insert((c.owner, c.spender), c.value);
				Ok(Bytes::new())
			},
			IERC20PermitCalls::nonces(c) => Ok(encode_return(self.nonce(c.owner))),
			IERC20PermitCalls::DOMAIN_SEPARATOR(_) => Ok(Bytes::from(
				self.domain_separator(ctx.chain_id, ctx.this).abi_encode(),
			)),
		}
	}
}

impl Program for Erc20Token {
	fn execute(&mut self, ctx: &CallContext<'_>, calldata: &[u8]) -> Result<Bytes, ChainError> {
		if let Ok(call) = IERC20::IERC20Calls::abi_decode(calldata, true) {
			return self.execute_erc20(ctx, call);
		}
		if let Ok(call) = IERC20Permit::IERC20PermitCalls::abi_decode(calldata, true) {
			return self.execute_permit(ctx, call);
		}
		revert("unknown selector")
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
