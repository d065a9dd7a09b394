mod common;

use alloy_primitives::{Address, U256};
use common::*;
use handoff_chain::programs::{Erc20Token, ReturnStyle};
use handoff_core::HandoffError;
use handoff_types::ReceivedAmountPolicy;

fn token(style: ReturnStyle) -> Erc20Token {
	Erc20Token::new(TOKEN_NAME).with_return_style(style)
}

#[test]
fn test_token_without_return_value_settles() {
	let h = Harness::with_token(token(ReturnStyle::Missing), ReceivedAmountPolicy::Requested);
	let (request, signature) = h.standard_request(100, tx(0x31));

	h.engine
		.settle_standard_permit(RELAYER, &request, &signature)
		.unwrap();
	assert_eq!(h.balance(PROVIDER), U256::from(100));
}

#[test]
fn test_token_returning_false_rolls_back_everything() {
	let h = Harness::with_token(token(ReturnStyle::False), ReceivedAmountPolicy::Requested);
	let (request, signature) = h.standard_request(100, tx(0x32));

	assert!(matches!(
		h.engine.settle_standard_permit(RELAYER, &request, &signature),
		Err(HandoffError::TransferFailed)
	));

	// The permit applied inside the settlement is undone with it
	assert_eq!(h.permit_nonce(h.user.address()), U256::ZERO);
	assert_eq!(
		h.service
			.token_allowance(TOKEN, h.user.address(), INSTANCE)
			.unwrap(),
		U256::ZERO
	);
	assert_eq!(h.engine.total_volume(TOKEN), U256::ZERO);
	assert_eq!(h.completed_count(), 0);
}

#[test]
fn test_token_without_code_is_rejected() {
	let h = Harness::new();
	let (mut request, _) = h.standard_request(100, tx(0x33));
	request.token = Address::repeat_byte(0x99);
	let signature = h.sign_standard(&h.user, &request);

	let result = h.engine.settle_standard_permit(RELAYER, &request, &signature);
	assert!(matches!(result, Err(HandoffError::PermitFailed)));
	assert_eq!(h.engine.total_volume(request.token), U256::ZERO);
}

#[test]
fn test_fee_on_transfer_records_requested_amount_by_default() {
	let fee_token = Erc20Token::new(TOKEN_NAME).with_fee_bps(100);
	let h = Harness::with_token(fee_token, ReceivedAmountPolicy::Requested);
	let (request, signature) = h.standard_request(1_000, tx(0x34));

	let outcome = h
		.engine
		.settle_standard_permit(RELAYER, &request, &signature)
		.unwrap();

	assert_eq!(h.balance(PROVIDER), U256::from(990));
	assert_eq!(outcome.record.received_amount, U256::from(1_000));
	assert_eq!(h.engine.total_volume(TOKEN), U256::from(1_000));
}

#[test]
fn test_fee_on_transfer_measured_policy_records_delta() {
	let fee_token = Erc20Token::new(TOKEN_NAME).with_fee_bps(100);
	let h = Harness::with_token(fee_token, ReceivedAmountPolicy::Measured);
	let (request, signature) = h.standard_request(1_000, tx(0x35));

	let outcome = h
		.engine
		.settle_standard_permit(RELAYER, &request, &signature)
		.unwrap();

	assert_eq!(outcome.record.requested_amount, U256::from(1_000));
	assert_eq!(outcome.record.received_amount, U256::from(990));
	// Volume counts what was requested
	assert_eq!(h.engine.total_volume(TOKEN), U256::from(1_000));
}
