mod common;

use alloy_primitives::{address, Address, U256};
use alloy_sol_types::SolCall;
use common::*;
use handoff_chain::programs::{Erc20Token, ReturnStyle};
use handoff_core::HandoffError;
use handoff_types::{contracts::IERC20, HandoffEvent, ReceivedAmountPolicy};

const SENDER: Address = address!("5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e");
const TREASURY: Address = address!("7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e");

#[test]
fn test_native_receive_and_withdraw() {
	let h = Harness::new();
	h.chain.set_native_balance(SENDER, U256::from(10));

	h.engine.receive_native(SENDER, U256::from(4)).unwrap();
	assert_eq!(h.service.native_balance(INSTANCE), U256::from(4));
	assert!(matches!(
		h.engine.events().last(),
		Some(HandoffEvent::NativeReceived { sender, amount })
			if *sender == SENDER && *amount == U256::from(4)
	));

	assert!(matches!(
		h.engine.withdraw_native(RELAYER, TREASURY, U256::from(1)),
		Err(HandoffError::AccessDenied(_))
	));
	match h.engine.withdraw_native(OWNER, TREASURY, U256::from(5)) {
		Err(HandoffError::InsufficientBalance {
			available,
			requested,
		}) => {
			assert_eq!(available, U256::from(4));
			assert_eq!(requested, U256::from(5));
		},
		other => panic!("unexpected result {:?}", other),
	}

	h.engine
		.withdraw_native(OWNER, TREASURY, U256::from(4))
		.unwrap();
	assert_eq!(h.service.native_balance(TREASURY), U256::from(4));
	assert_eq!(h.service.native_balance(INSTANCE), U256::ZERO);
	assert!(matches!(
		h.engine.events().last(),
		Some(HandoffEvent::NativeTransferred { recipient, .. }) if *recipient == TREASURY
	));
}

#[test]
fn test_receive_more_than_sender_holds_fails() {
	let h = Harness::new();
	h.chain.set_native_balance(SENDER, U256::from(1));

	assert!(matches!(
		h.engine.receive_native(SENDER, U256::from(2)),
		Err(HandoffError::Chain(_))
	));
	assert_eq!(h.service.native_balance(SENDER), U256::from(1));
}

fn fund_instance(h: &Harness, amount: u64) {
	let transfer = IERC20::transferCall {
		to: INSTANCE,
		amount: U256::from(amount),
	};
	h.service
		.call(h.user.address(), TOKEN, &transfer.abi_encode())
		.unwrap();
}

#[test]
fn test_stray_tokens_can_be_recovered() {
	let h = Harness::new();
	fund_instance(&h, 250);

	assert!(matches!(
		h.engine
			.withdraw_token(OWNER, TOKEN, TREASURY, U256::from(251)),
		Err(HandoffError::InsufficientBalance { .. })
	));
	h.engine
		.withdraw_token(OWNER, TOKEN, TREASURY, U256::from(250))
		.unwrap();

	assert_eq!(h.balance(TREASURY), U256::from(250));
	assert!(matches!(
		h.engine.events().last(),
		Some(HandoffEvent::TokenTransferred { recipient, token, amount })
			if *recipient == TREASURY && *token == TOKEN && *amount == U256::from(250)
	));
}

#[test]
fn test_token_withdrawal_checks_transfer_result() {
	let false_token = Erc20Token::new(TOKEN_NAME)
		.with_return_style(ReturnStyle::False)
		.with_balance(INSTANCE, U256::from(50));
	let h = Harness::with_token(false_token, ReceivedAmountPolicy::Requested);

	assert!(matches!(
		h.engine.withdraw_token(OWNER, TOKEN, TREASURY, U256::from(50)),
		Err(HandoffError::TransferFailed)
	));
	assert_eq!(h.balance(INSTANCE), U256::from(50));
}

#[test]
fn test_withdrawals_are_owner_only_even_when_paused() {
	let h = Harness::new();
	fund_instance(&h, 10);
	h.engine.pause(OWNER).unwrap();

	assert!(matches!(
		h.engine.withdraw_token(RELAYER, TOKEN, TREASURY, U256::from(10)),
		Err(HandoffError::AccessDenied(_))
	));
	h.engine
		.withdraw_token(OWNER, TOKEN, TREASURY, U256::from(10))
		.unwrap();
}
