//! ECDSA signature parsing and signer recovery over EIP-712 digests.

use alloy_primitives::{uint, Address, PrimitiveSignature, B256, U256};

/// Half the secp256k1 group order. Signatures with a larger `s` are the
/// malleable twin of a canonical signature and are rejected.
const SECP256K1N_HALF: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Joins split `(v, r, s)` components into the 65-byte `r || s || v` layout.
pub fn join_signature(v: u8, r: &B256, s: &B256) -> [u8; 65] {
	let mut raw = [0u8; 65];
	raw[..32].copy_from_slice(r.as_slice());
	raw[32..64].copy_from_slice(s.as_slice());
	raw[64] = v;
	raw
}

/// Recovers the address that signed `digest`.
///
/// Accepts 65-byte `r || s || v` signatures with `v` in {0, 1, 27, 28}.
/// Returns `None` for malformed input, high-`s` signatures, or when
/// recovery fails.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Option<Address> {
	if signature.len() != 65 || !matches!(signature[64], 0 | 1 | 27 | 28) {
		return None;
	}
	let sig = PrimitiveSignature::from_raw(signature).ok()?;
	if sig.s() > SECP256K1N_HALF {
		return None;
	}
	sig.recover_address_from_prehash(digest).ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_malformed_signatures_are_rejected() {
		let digest = B256::repeat_byte(0x42);

		assert_eq!(recover_signer(&digest, &[]), None);
		assert_eq!(recover_signer(&digest, &[0u8; 64]), None);

		let mut bad_v = [1u8; 65];
		bad_v[64] = 29;
		assert_eq!(recover_signer(&digest, &bad_v), None);

		let high_s = join_signature(27, &B256::repeat_byte(0x11), &B256::repeat_byte(0xff));
		assert_eq!(recover_signer(&digest, &high_s), None);
	}

	#[test]
	fn test_join_signature_layout() {
		let raw = join_signature(28, &B256::repeat_byte(0x01), &B256::repeat_byte(0x02));
		assert_eq!(raw[0], 0x01);
		assert_eq!(raw[32], 0x02);
		assert_eq!(raw[64], 28);
	}
}
