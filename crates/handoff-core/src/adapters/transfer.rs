//! Token transfers that tolerate non-conforming return data.
//!
//! A transfer succeeds when the call did not abort and either returned
//! exactly one word equal to `1`, or returned nothing while the target has
//! code. Tokens that omit the return value pass; calls into empty accounts
//! and tokens returning `false` fail.

use crate::HandoffError;
use alloy_primitives::{aliases::U160, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use handoff_chain::{ChainError, ChainService};
use handoff_types::contracts::{IAllowanceTransfer, IERC20};

/// Success predicate for a low-level token call.
pub fn transfer_succeeded(result: &Result<Bytes, ChainError>, has_code: bool) -> bool {
	match result {
		Ok(data) if data.is_empty() => has_code,
		Ok(data) => data.len() == 32 && U256::from_be_slice(data) == U256::from(1),
		Err(_) => false,
	}
}

fn checked_call(
	chain: &ChainService,
	caller: Address,
	target: Address,
	calldata: &[u8],
) -> Result<(), HandoffError> {
	let result = chain.call(caller, target, calldata);
	if let Err(ChainError::ReentrantCall(program)) = &result {
		tracing::warn!(program = %program, "Transfer re-entered a program");
	}
	if transfer_succeeded(&result, chain.has_code(target)) {
		return Ok(());
	}
	tracing::debug!(
		target = %target,
		result = ?result,
		"Transfer rejected by success predicate"
	);
	Err(HandoffError::TransferFailed)
}

/// `token.transfer(to, amount)` on behalf of `from`.
pub fn safe_transfer(
	chain: &ChainService,
	from: Address,
	token: Address,
	to: Address,
	amount: U256,
) -> Result<(), HandoffError> {
	let calldata = IERC20::transferCall { to, amount }.abi_encode();
	checked_call(chain, from, token, &calldata)
}

/// `token.transferFrom(from, to, amount)` with `spender` as the caller.
pub fn safe_transfer_from(
	chain: &ChainService,
	spender: Address,
	token: Address,
	from: Address,
	to: Address,
	amount: U256,
) -> Result<(), HandoffError> {
	let calldata = IERC20::transferFromCall { from, to, amount }.abi_encode();
	checked_call(chain, spender, token, &calldata)
}

/// Pulls `amount` of `token` from `from` to `to` through the allowance
/// registry, with `spender` as the registry caller.
pub fn registry_transfer_from(
	chain: &ChainService,
	spender: Address,
	registry: Address,
	token: Address,
	from: Address,
	to: Address,
	amount: U160,
) -> Result<(), HandoffError> {
	let calldata = IAllowanceTransfer::transferFromCall {
		from,
		to,
		amount,
		token,
	}
	.abi_encode();
	checked_call(chain, spender, registry, &calldata)
}
