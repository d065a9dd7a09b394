//! Utility functions shared across the Handoff crates.
//!
//! Covers EIP-712 hashing primitives, signer recovery, id formatting and the
//! wall-clock timestamp.

pub mod eip712;
pub mod formatting;
pub mod helpers;
pub mod signature;

pub use eip712::{
	compute_domain_hash, compute_final_digest, compute_unversioned_domain_hash,
	hash_permit_details, Eip712AbiEncoder, DOMAIN_TYPE, DOMAIN_TYPE_NO_VERSION, ERC20_PERMIT_TYPE,
	NAME_HANDOFF, NAME_PERMIT2, PERMIT2_REQUEST_TYPE, PERMIT_DETAILS_TYPE, PERMIT_REQUEST_TYPE,
	PERMIT_SINGLE_TYPE, VERSION_HANDOFF,
};
pub use formatting::{truncate_id, without_0x_prefix};
pub use helpers::current_timestamp;
pub use signature::{join_signature, recover_signer};
