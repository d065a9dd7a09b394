//! Applies signed allowance grants with front-run resilience.
//!
//! Anyone who sees a signed grant can submit it first. The grant then fails
//! when the relayer applies it, yet the allowance it created is in place.
//! So the outcome of the attempt is never trusted on its own: after trying
//! to apply the grant, the current allowance is read once and the step
//! succeeds exactly when that allowance covers the requested amount.

use crate::HandoffError;
use alloy_primitives::{aliases::U160, Address, U256};
use alloy_sol_types::SolCall;
use handoff_chain::ChainService;
use handoff_types::{
	contracts::{IAllowanceTransfer, IERC20Permit},
	DelegatedAllowanceRequest, StandardPermitRequest,
};

/// Outcome of the grant attempt, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermitPath {
	/// The grant was applied by this invocation.
	Applied,
	/// The grant failed but an existing allowance covers the amount.
	Fallback,
}

/// Applies the EIP-2612 permit in `request` with `instance` as the caller.
///
/// Fails with [`HandoffError::PermitFailed`] if the token allowance for
/// `instance` is below `request.value` afterwards.
pub fn secure_standard_permit(
	chain: &ChainService,
	instance: Address,
	request: &StandardPermitRequest,
) -> Result<PermitPath, HandoffError> {
	let call = IERC20Permit::permitCall {
		owner: request.owner,
		spender: request.spender,
		value: request.value,
		deadline: request.deadline,
		v: request.v,
		r: request.r,
		s: request.s,
	};
	let attempt = chain.call(instance, request.token, &call.abi_encode());

	let allowance = chain
		.token_allowance(request.token, request.owner, instance)
		.unwrap_or(U256::ZERO);
	decide(attempt.is_ok(), allowance >= request.value, HandoffError::PermitFailed)
}

/// Applies the registry grant in `request` with `instance` as the caller.
///
/// Fails with [`HandoffError::Permit2Failed`] if the registry allowance for
/// `(owner, token, instance)` is below the permitted amount afterwards.
pub fn secure_delegated_allowance(
	chain: &ChainService,
	instance: Address,
	registry: Address,
	request: &DelegatedAllowanceRequest,
) -> Result<PermitPath, HandoffError> {
	let permit = &request.permit;
	let call = IAllowanceTransfer::permitCall {
		owner: request.owner,
		permitSingle: IAllowanceTransfer::PermitSingle {
			details: IAllowanceTransfer::PermitDetails {
				token: permit.token,
				amount: permit.amount,
				expiration: permit.expiration,
				nonce: permit.nonce,
			},
			spender: request.spender,
			sigDeadline: request.sig_deadline,
		},
		signature: request.signature.clone(),
	};
	let attempt = chain.call(instance, registry, &call.abi_encode());

	let (allowed, _, _) = chain
		.registry_allowance(registry, request.owner, permit.token, instance)
		.unwrap_or((U160::ZERO, Default::default(), Default::default()));
	decide(attempt.is_ok(), allowed >= permit.amount, HandoffError::Permit2Failed)
}

fn decide(applied: bool, covered: bool, failure: HandoffError) -> Result<PermitPath, HandoffError> {
	match (applied, covered) {
		(_, false) => Err(failure),
		(true, true) => Ok(PermitPath::Applied),
		(false, true) => {
			tracing::debug!("Grant attempt failed, existing allowance covers the amount");
			Ok(PermitPath::Fallback)
		},
	}
}
