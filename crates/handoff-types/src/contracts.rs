//! Solidity interface definitions for the external token programs.
//!
//! Contains the minimal ABI surface the settlement engine calls into:
//! - [`IERC20`] for transfers and balance reads
//! - [`IERC20Permit`] for EIP-2612 allowance-by-signature
//! - [`IAllowanceTransfer`] for the delegated allowance registry (Permit2)

use alloy_sol_types::sol;

sol! {
	/// Minimal ERC-20 interface.
	///
	/// `transfer` and `transferFrom` are declared with a `bool` return, but
	/// callers must not rely on it being present.
	#[allow(missing_docs)]
	#[derive(Debug)]
	interface IERC20 {
		function balanceOf(address account) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
		function transfer(address to, uint256 amount) external returns (bool);
		function transferFrom(address from, address to, uint256 amount) external returns (bool);
	}
}

sol! {
	/// EIP-2612 permit extension.
	///
	/// Reference: <https://eips.ethereum.org/EIPS/eip-2612>
	#[allow(missing_docs)]
	#[allow(clippy::too_many_arguments)]
	#[derive(Debug)]
	interface IERC20Permit {
		function permit(
			address owner,
			address spender,
			uint256 value,
			uint256 deadline,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external;
		function nonces(address owner) external view returns (uint256);
		function DOMAIN_SEPARATOR() external view returns (bytes32);
	}
}

sol! {
	/// Allowance half of the Permit2 registry.
	///
	/// Reference: <https://github.com/Uniswap/permit2>
	#[allow(missing_docs)]
	#[derive(Debug)]
	interface IAllowanceTransfer {
		struct PermitDetails {
			address token;
			uint160 amount;
			uint48 expiration;
			uint48 nonce;
		}

		struct PermitSingle {
			PermitDetails details;
			address spender;
			uint256 sigDeadline;
		}

		function permit(address owner, PermitSingle permitSingle, bytes signature) external;
		function allowance(address user, address token, address spender)
			external
			view
			returns (uint160 amount, uint48 expiration, uint48 nonce);
		function transferFrom(address from, address to, uint160 amount, address token) external;
	}
}

impl From<&crate::PermitDetails> for IAllowanceTransfer::PermitDetails {
	fn from(details: &crate::PermitDetails) -> Self {
		Self {
			token: details.token,
			amount: details.amount,
			expiration: details.expiration,
			nonce: details.nonce,
		}
	}
}
