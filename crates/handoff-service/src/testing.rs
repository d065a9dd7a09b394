//! Relayer context over a local chain for handler and journal tests.

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use handoff_account::{implementations::local::LocalWallet, AccountService};
use handoff_chain::{
	implementations::local::LocalChain,
	programs::{AllowanceRegistry, Erc20Token},
	ChainService,
};
use handoff_config::builders::ConfigBuilder;
use handoff_core::{verifier::SignatureVerifier, HandoffEngine, RelayerContext};
use handoff_storage::{implementations::memory::MemoryStorage, StorageService};
use handoff_types::{SecretString, StandardPermitRequest};
use std::sync::Arc;

pub const CHAIN_ID: u64 = 31337;
pub const START_TIME: u64 = 1_700_000_000;
pub const INSTANCE: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const PERMIT2: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");
pub const TOKEN: Address = address!("7070707070707070707070707070707070707070");
pub const OWNER: Address = address!("0101010101010101010101010101010101010101");
pub const PROVIDER: Address = address!("9090909090909090909090909090909090909090");

const TOKEN_NAME: &str = "Test USD";
const RELAYER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub struct TestNode {
	pub context: RelayerContext,
	pub user: PrivateKeySigner,
}

impl TestNode {
	pub fn new() -> Self {
		let user = PrivateKeySigner::random();
		let chain = Arc::new(LocalChain::new(CHAIN_ID, START_TIME));
		chain.deploy(
			TOKEN,
			Erc20Token::new(TOKEN_NAME).with_balance(user.address(), U256::from(1_000_000)),
		);
		chain.deploy(PERMIT2, AllowanceRegistry::new());
		let chain = ChainService::new(chain);

		let wallet = LocalWallet::new(&SecretString::from(RELAYER_KEY)).unwrap();
		let relayer: PrivateKeySigner = RELAYER_KEY.parse().unwrap();
		let relayer = relayer.address();

		let config = ConfigBuilder::new()
			.chain_id(CHAIN_ID)
			.address(INSTANCE)
			.owner(OWNER)
			.permit2(PERMIT2)
			.relayers(vec![relayer])
			.build();
		let engine = HandoffEngine::new(&config.handoff, chain.clone()).unwrap();

		Self {
			context: RelayerContext {
				engine: Arc::new(engine),
				chain,
				account: Arc::new(AccountService::new(Box::new(wallet))),
				storage: Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
				relayer,
			},
			user,
		}
	}

	/// Signs a standard-permit request for `value` from a user with no
	/// prior permits.
	pub fn standard_request(&self, value: u64, tx: u8) -> (StandardPermitRequest, Bytes) {
		let owner = self.user.address();
		let value = U256::from(value);
		let deadline = U256::from(START_TIME + 3_600);
		let digest = Erc20Token::new(TOKEN_NAME).permit_digest(
			CHAIN_ID,
			TOKEN,
			owner,
			INSTANCE,
			value,
			U256::ZERO,
			deadline,
		);
		let permit = self.user.sign_hash_sync(&digest).unwrap().as_bytes();

		let request = StandardPermitRequest {
			token: TOKEN,
			owner,
			spender: INSTANCE,
			value,
			deadline,
			v: permit[64],
			r: B256::from_slice(&permit[..32]),
			s: B256::from_slice(&permit[32..64]),
			provider: PROVIDER,
			transaction_id: B256::repeat_byte(tx),
		};
		let digest = SignatureVerifier::new(CHAIN_ID, INSTANCE).standard_permit_digest(&request);
		let signature = Bytes::from(self.user.sign_hash_sync(&digest).unwrap().as_bytes().to_vec());
		(request, signature)
	}
}
