//! Adapters between the engine and external token programs.

pub mod permit;
pub mod transfer;

pub use permit::{secure_delegated_allowance, secure_standard_permit, PermitPath};
pub use transfer::{registry_transfer_from, safe_transfer, safe_transfer_from, transfer_succeeded};
