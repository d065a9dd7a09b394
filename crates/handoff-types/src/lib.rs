//! Common types module for the Handoff settlement system.
//!
//! This module defines the data model shared by every Handoff component:
//! the two signed request shapes, settlement records, emitted events, the
//! ABI surface of the external token programs and the EIP-712 helpers used
//! to hash requests exactly the way off-line signers do.

/// API types for the relayer HTTP endpoints.
pub mod api;
/// Solidity interface definitions for the external token programs.
pub mod contracts;
/// Events emitted by the settlement engine.
pub mod events;
/// Implementation registry for pluggable backends.
pub mod registry;
/// Signed request shapes accepted by the settlement flows.
pub mod requests;
/// Secret string wrapper for private keys.
pub mod secret_string;
/// Settlement ledger records.
pub mod settlement;
/// Storage namespaces.
pub mod storage;
/// Utility functions for hashing and formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use api::*;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use requests::*;
pub use secret_string::SecretString;
pub use settlement::*;
pub use storage::*;
pub use utils::{current_timestamp, truncate_id};
pub use validation::*;
