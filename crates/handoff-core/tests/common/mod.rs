//! Shared fixture for settlement scenarios on a local chain.

#![allow(dead_code)]

use alloy_primitives::{
	address,
	aliases::{U160, U48},
	Address, Bytes, B256, U256,
};
use alloy_sol_types::SolCall;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use handoff_chain::{
	implementations::local::LocalChain,
	programs::{AllowanceRegistry, Erc20Token, Program},
	ChainInterface, ChainService,
};
use handoff_config::builders::ConfigBuilder;
use handoff_core::{verifier::SignatureVerifier, HandoffEngine};
use handoff_types::{
	contracts::{IAllowanceTransfer, IERC20Permit, IERC20},
	DelegatedAllowanceRequest, PermitDetails, ReceivedAmountPolicy, StandardPermitRequest,
};
use std::sync::Arc;

pub const CHAIN_ID: u64 = 31337;
pub const START_TIME: u64 = 1_700_000_000;
pub const DEADLINE: u64 = START_TIME + 3_600;

pub const INSTANCE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const PERMIT2: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");
pub const TOKEN: Address = address!("7070707070707070707070707070707070707070");
pub const TOKEN_NAME: &str = "Test USD";
pub const OWNER: Address = address!("0101010101010101010101010101010101010101");
pub const RELAYER: Address = address!("0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e");
pub const PROVIDER: Address = address!("9090909090909090909090909090909090909090");

pub const USER_FUNDS: u64 = 1_000_000;

pub struct Harness {
	pub chain: Arc<LocalChain>,
	pub service: ChainService,
	pub engine: Arc<HandoffEngine>,
	pub user: PrivateKeySigner,
}

impl Harness {
	/// Standard token, requested-amount policy.
	pub fn new() -> Self {
		Self::with_token(Erc20Token::new(TOKEN_NAME), ReceivedAmountPolicy::Requested)
	}

	/// Deploys `token` at [`TOKEN`] with the user funded.
	pub fn with_token(token: Erc20Token, policy: ReceivedAmountPolicy) -> Self {
		let user = PrivateKeySigner::random();
		let token = token.with_balance(user.address(), U256::from(USER_FUNDS));
		Self::with_program(token, policy, user)
	}

	/// Deploys an arbitrary program at [`TOKEN`].
	pub fn with_program(
		program: impl Program + 'static,
		policy: ReceivedAmountPolicy,
		user: PrivateKeySigner,
	) -> Self {
		Self::with_host(program, policy, user, |chain| chain as Arc<dyn ChainInterface>)
	}

	/// Like [`with_program`](Self::with_program), with the engine talking to
	/// the local chain through `wrap`.
	pub fn with_host(
		program: impl Program + 'static,
		policy: ReceivedAmountPolicy,
		user: PrivateKeySigner,
		wrap: impl FnOnce(Arc<LocalChain>) -> Arc<dyn ChainInterface>,
	) -> Self {
		let chain = Arc::new(LocalChain::new(CHAIN_ID, START_TIME));
		chain.deploy(TOKEN, program);
		chain.deploy(PERMIT2, AllowanceRegistry::new());
		let service = ChainService::new(wrap(chain.clone()));

		let config = ConfigBuilder::new()
			.chain_id(CHAIN_ID)
			.address(INSTANCE)
			.owner(OWNER)
			.permit2(PERMIT2)
			.relayers(vec![RELAYER])
			.received_amount(policy)
			.build();
		let engine = HandoffEngine::new(&config.handoff, service.clone()).unwrap();

		Self {
			chain,
			service,
			engine: Arc::new(engine),
			user,
		}
	}

	pub fn balance(&self, account: Address) -> U256 {
		self.service.token_balance(TOKEN, account).unwrap()
	}

	pub fn permit_nonce(&self, owner: Address) -> U256 {
		self.service
			.call_typed(Address::ZERO, TOKEN, &IERC20Permit::noncesCall { owner })
			.unwrap()
			._0
	}

	/// Builds a standard-permit request for `value`, with the token permit
	/// and the request both signed by the user.
	pub fn standard_request(&self, value: u64, transaction_id: B256) -> (StandardPermitRequest, Bytes) {
		self.standard_request_from(&self.user, value, transaction_id)
	}

	pub fn standard_request_from(
		&self,
		signer: &PrivateKeySigner,
		value: u64,
		transaction_id: B256,
	) -> (StandardPermitRequest, Bytes) {
		let owner = signer.address();
		let value = U256::from(value);
		let deadline = U256::from(DEADLINE);
		let digest = Erc20Token::new(TOKEN_NAME).permit_digest(
			CHAIN_ID,
			TOKEN,
			owner,
			INSTANCE,
			value,
			self.permit_nonce(owner),
			deadline,
		);
		let permit_signature = signer.sign_hash_sync(&digest).unwrap().as_bytes();

		let request = StandardPermitRequest {
			token: TOKEN,
			owner,
			spender: INSTANCE,
			value,
			deadline,
			v: permit_signature[64],
			r: B256::from_slice(&permit_signature[..32]),
			s: B256::from_slice(&permit_signature[32..64]),
			provider: PROVIDER,
			transaction_id,
		};
		let signature = self.sign_standard(signer, &request);
		(request, signature)
	}

	pub fn sign_standard(&self, signer: &PrivateKeySigner, request: &StandardPermitRequest) -> Bytes {
		let digest = SignatureVerifier::new(CHAIN_ID, INSTANCE).standard_permit_digest(request);
		Bytes::from(signer.sign_hash_sync(&digest).unwrap().as_bytes().to_vec())
	}

	/// Creates a new user holding `amount` tokens taken from the main user.
	pub fn funded_user(&self, amount: u64) -> PrivateKeySigner {
		let signer = PrivateKeySigner::random();
		let transfer = IERC20::transferCall {
			to: signer.address(),
			amount: U256::from(amount),
		};
		self.service
			.call(self.user.address(), TOKEN, &transfer.abi_encode())
			.unwrap();
		signer
	}

	/// Approves the registry on the token for the user, once.
	pub fn approve_registry(&self) {
		let approve = IERC20::approveCall {
			spender: PERMIT2,
			amount: U256::MAX,
		};
		self.service
			.call(self.user.address(), TOKEN, &approve.abi_encode())
			.unwrap();
	}

	/// Builds a delegated-allowance request for `amount` with a registry
	/// grant signed by the user.
	pub fn delegated_request(
		&self,
		amount: u64,
		nonce: u64,
		transaction_id: B256,
	) -> (DelegatedAllowanceRequest, Bytes) {
		let owner = self.user.address();
		let details = PermitDetails {
			token: TOKEN,
			amount: U160::from(amount),
			expiration: U48::from(DEADLINE),
			nonce: U48::from(nonce),
		};
		let permit_single = IAllowanceTransfer::PermitSingle {
			details: (&details).into(),
			spender: INSTANCE,
			sigDeadline: U256::from(DEADLINE),
		};
		let grant_digest = AllowanceRegistry::permit_digest(CHAIN_ID, PERMIT2, &permit_single);
		let grant = self.user.sign_hash_sync(&grant_digest).unwrap();

		let request = DelegatedAllowanceRequest {
			owner,
			permit: details,
			spender: INSTANCE,
			sig_deadline: U256::from(DEADLINE),
			signature: Bytes::from(grant.as_bytes().to_vec()),
			provider: PROVIDER,
			transaction_id,
		};
		let digest = SignatureVerifier::new(CHAIN_ID, INSTANCE).delegated_allowance_digest(&request);
		let signature = Bytes::from(self.user.sign_hash_sync(&digest).unwrap().as_bytes().to_vec());
		(request, signature)
	}

	pub fn completed_count(&self) -> usize {
		self.engine
			.events()
			.iter()
			.filter(|event| event.name() == "Completed")
			.count()
	}
}

pub fn tx(byte: u8) -> B256 {
	B256::repeat_byte(byte)
}
