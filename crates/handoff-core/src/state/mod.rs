//! Engine-owned state.
//!
//! Everything the engine persists between invocations lives in
//! [`EngineState`]. It is mutated only through engine operations.

pub mod access;
pub mod ledger;

pub use access::{AccessControl, RelayerSet};
pub use ledger::{namespaced_id, TransactionLedger};

use handoff_types::HandoffEvent;

/// Authoritative state of one settlement instance.
#[derive(Debug, Clone)]
pub struct EngineState {
	pub access: AccessControl,
	pub ledger: TransactionLedger,
	/// Append-only log of committed events.
	pub events: Vec<HandoffEvent>,
}

impl EngineState {
	pub fn new(access: AccessControl) -> Self {
		Self {
			access,
			ledger: TransactionLedger::new(),
			events: Vec::new(),
		}
	}
}
