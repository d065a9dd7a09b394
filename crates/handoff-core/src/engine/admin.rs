//! Owner-only administration.
//!
//! Administrative operations touch only engine state, so they need no host
//! snapshot. They stay available while settlement is paused.

use super::HandoffEngine;
use crate::state::AccessControl;
use crate::HandoffError;
use alloy_primitives::Address;
use handoff_types::HandoffEvent;

impl HandoffEngine {
	pub fn add_relayer(&self, caller: Address, relayer: Address) -> Result<(), HandoffError> {
		self.administer(caller, "add_relayer", |access| {
			Ok(vec![access.add_relayer(relayer)?])
		})
	}

	pub fn remove_relayer(&self, caller: Address, relayer: Address) -> Result<(), HandoffError> {
		self.administer(caller, "remove_relayer", |access| {
			Ok(vec![access.remove_relayer(relayer)?])
		})
	}

	/// Blacklists every address in `accounts` not already listed.
	pub fn blacklist(&self, caller: Address, accounts: &[Address]) -> Result<(), HandoffError> {
		self.administer(caller, "blacklist", |access| access.blacklist(accounts))
	}

	/// Removing an address that is not listed succeeds without an event.
	pub fn un_blacklist(&self, caller: Address, account: Address) -> Result<(), HandoffError> {
		self.administer(caller, "un_blacklist", |access| {
			Ok(access.un_blacklist(account).into_iter().collect())
		})
	}

	pub fn pause(&self, caller: Address) -> Result<(), HandoffError> {
		self.administer(caller, "pause", |access| Ok(vec![access.pause(caller)?]))
	}

	pub fn unpause(&self, caller: Address) -> Result<(), HandoffError> {
		self.administer(caller, "unpause", |access| Ok(vec![access.unpause(caller)?]))
	}

	pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), HandoffError> {
		self.administer(caller, "transfer_ownership", |access| {
			Ok(vec![access.transfer_ownership(new_owner)?])
		})
	}

	/// Leaves the instance without an owner. Owner-only operations are
	/// unavailable afterwards.
	pub fn renounce_ownership(&self, caller: Address) -> Result<(), HandoffError> {
		self.administer(caller, "renounce_ownership", |access| {
			Ok(vec![access.renounce_ownership()])
		})
	}

	fn administer(
		&self,
		caller: Address,
		operation: &'static str,
		apply: impl FnOnce(&mut AccessControl) -> Result<Vec<HandoffEvent>, HandoffError>,
	) -> Result<(), HandoffError> {
		let _entered = self.guard.enter()?;

		let events = {
			let mut state = self.state();
			let result = match state.access.ensure_owner(caller) {
				Ok(()) => apply(&mut state.access),
				Err(e) => Err(e),
			};
			match result {
				Ok(events) => {
					state.events.extend(events.iter().cloned());
					events
				},
				Err(e) => {
					tracing::warn!(operation, caller = %caller, error = %e, "Administrative call rejected");
					return Err(e);
				},
			}
		};

		self.publish(&events);
		tracing::info!(operation, caller = %caller, events = events.len(), "Administrative call applied");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::{HandoffEngine, HandoffError};
	use alloy_primitives::Address;
	use handoff_chain::{implementations::local::LocalChain, ChainService};
	use handoff_config::builders::ConfigBuilder;
	use handoff_types::HandoffEvent;
	use std::sync::Arc;

	fn owner() -> Address {
		Address::repeat_byte(0x01)
	}

	fn engine() -> HandoffEngine {
		let config = ConfigBuilder::new().build();
		let chain = ChainService::new(Arc::new(LocalChain::new(config.handoff.chain_id, 0)));
		HandoffEngine::new(&config.handoff, chain).unwrap()
	}

	#[test]
	fn test_non_owner_is_denied() {
		let engine = engine();
		let stranger = Address::repeat_byte(0x42);

		assert!(matches!(
			engine.add_relayer(stranger, stranger),
			Err(HandoffError::AccessDenied(a)) if a == stranger
		));
		assert!(matches!(
			engine.pause(stranger),
			Err(HandoffError::AccessDenied(_))
		));
		assert!(!engine.is_relayer(stranger));
		assert!(!engine.paused());
	}

	#[test]
	fn test_relayer_lifecycle() {
		let engine = engine();
		let relayer = Address::repeat_byte(0x0e);

		engine.add_relayer(owner(), relayer).unwrap();
		assert!(engine.is_relayer(relayer));
		assert!(matches!(
			engine.add_relayer(owner(), relayer),
			Err(HandoffError::RelayerAlreadyExists(_))
		));
		assert!(matches!(
			engine.add_relayer(owner(), Address::ZERO),
			Err(HandoffError::ZeroAddress)
		));

		engine.remove_relayer(owner(), relayer).unwrap();
		assert!(!engine.is_relayer(relayer));
		assert!(matches!(
			engine.remove_relayer(owner(), relayer),
			Err(HandoffError::RelayerNotFound(_))
		));
	}

	#[test]
	fn test_pause_toggles_and_emits() {
		let engine = engine();
		let before = engine.events().len();

		engine.pause(owner()).unwrap();
		assert!(engine.paused());
		assert!(matches!(engine.pause(owner()), Err(HandoffError::Paused)));

		engine.unpause(owner()).unwrap();
		assert!(matches!(engine.unpause(owner()), Err(HandoffError::NotPaused)));

		let events = engine.events();
		assert_eq!(events.len(), before + 2);
		assert!(matches!(events[before], HandoffEvent::Paused { account } if account == owner()));
		assert!(matches!(events[before + 1], HandoffEvent::Unpaused { .. }));
		assert!(matches!(
			engine.events_since(before + 1).as_slice(),
			[HandoffEvent::Unpaused { .. }]
		));
		assert!(engine.events_since(before + 5).is_empty());
	}

	#[test]
	fn test_blacklist_batch() {
		let engine = engine();
		let a = Address::repeat_byte(0x0a);
		let b = Address::repeat_byte(0x0b);
		let before = engine.events().len();

		engine.blacklist(owner(), &[a, b, a]).unwrap();
		assert!(engine.is_blacklisted(a) && engine.is_blacklisted(b));
		assert_eq!(engine.events().len(), before + 2);

		assert!(matches!(
			engine.blacklist(owner(), &[Address::repeat_byte(0x0c), Address::ZERO]),
			Err(HandoffError::ZeroAddress)
		));
		assert!(!engine.is_blacklisted(Address::repeat_byte(0x0c)));

		engine.un_blacklist(owner(), a).unwrap();
		engine.un_blacklist(owner(), a).unwrap();
		assert!(!engine.is_blacklisted(a));
		assert_eq!(engine.events().len(), before + 3);
	}

	#[test]
	fn test_ownership_handover_and_renounce() {
		let engine = engine();
		let next = Address::repeat_byte(0x02);

		assert!(matches!(
			engine.transfer_ownership(owner(), Address::ZERO),
			Err(HandoffError::ZeroAddress)
		));
		engine.transfer_ownership(owner(), next).unwrap();
		assert_eq!(engine.owner(), next);
		assert!(engine.pause(owner()).is_err());

		engine.renounce_ownership(next).unwrap();
		assert_eq!(engine.owner(), Address::ZERO);
		assert!(matches!(
			engine.pause(Address::ZERO),
			Err(HandoffError::AccessDenied(_))
		));
	}
}
