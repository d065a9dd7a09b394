//! Generic EIP-712 utilities shared across Handoff.
//!
//! These helpers provide:
//! - Domain hash computation (with and without a version field)
//! - Final digest computation (0x1901 || domainHash || structHash)
//! - A minimal ABI encoder for the static EIP-712 field types used by the
//!   settlement requests, the EIP-2612 permit and the Permit2 grant

use alloy_primitives::{
	aliases::{U160, U48},
	keccak256, Address, B256, U256,
};

/// Domain type carrying a version, used by Handoff and EIP-2612 tokens.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
/// Domain type without a version, used by the Permit2 registry.
pub const DOMAIN_TYPE_NO_VERSION: &str =
	"EIP712Domain(string name,uint256 chainId,address verifyingContract)";

pub const NAME_HANDOFF: &str = "Handoff";
pub const VERSION_HANDOFF: &str = "1";
pub const NAME_PERMIT2: &str = "Permit2";

/// Handoff request wrapping an EIP-2612 permit.
pub const PERMIT_REQUEST_TYPE: &str = "PermitRequest(address token,address owner,address spender,uint256 value,uint256 deadline,uint8 v,bytes32 r,bytes32 s,address provider,bytes32 transactionId)";
/// Handoff request wrapping a Permit2 grant. References [`PERMIT_DETAILS_TYPE`].
pub const PERMIT2_REQUEST_TYPE: &str = "Permit2Request(address owner,PermitDetails permit,address spender,uint256 sigDeadline,bytes signature,address provider,bytes32 transactionId)";
pub const PERMIT_DETAILS_TYPE: &str =
	"PermitDetails(address token,uint160 amount,uint48 expiration,uint48 nonce)";
/// Permit2 single-token grant. References [`PERMIT_DETAILS_TYPE`].
pub const PERMIT_SINGLE_TYPE: &str =
	"PermitSingle(PermitDetails details,address spender,uint256 sigDeadline)";
/// EIP-2612 permit.
pub const ERC20_PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

/// Compute EIP-712 domain hash including the version field.
pub fn compute_domain_hash(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
	enc.push_b256(&keccak256(name.as_bytes()));
	enc.push_b256(&keccak256(version.as_bytes()));
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Compute EIP-712 domain hash for domains that omit the version field.
pub fn compute_unversioned_domain_hash(
	name: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE_NO_VERSION.as_bytes()));
	enc.push_b256(&keccak256(name.as_bytes()));
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Hash of the `PermitDetails` sub-structure, shared by the Handoff request
/// and the Permit2 grant.
pub fn hash_permit_details(token: &Address, amount: U160, expiration: U48, nonce: U48) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(PERMIT_DETAILS_TYPE.as_bytes()));
	enc.push_address(token);
	enc.push_u160(amount);
	enc.push_u48(expiration);
	enc.push_u48(nonce);
	keccak256(enc.finish())
}

/// Minimal ABI encoder for static types used in EIP-712 struct hashing.
///
/// Every value occupies one 32-byte word. Dynamic `bytes` are represented by
/// their keccak256 hash, nested structs by their struct hash.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u160(&mut self, v: U160) {
		self.push_u256(U256::from(v));
	}

	pub fn push_u48(&mut self, v: U48) {
		self.push_u256(U256::from(v));
	}

	pub fn push_u8(&mut self, v: u8) {
		let mut word = [0u8; 32];
		word[31] = v;
		self.buf.extend_from_slice(&word);
	}

	/// Encodes a dynamic `bytes` member as keccak256 of its contents.
	pub fn push_bytes(&mut self, v: &[u8]) {
		self.push_b256(&keccak256(v));
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
