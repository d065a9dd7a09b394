//! Ownership, relayer allow-list, blacklist and pause flag.
//!
//! Each mutator validates its input completely before touching state and
//! returns the events it produced, so callers can discard them on abort.

use crate::HandoffError;
use alloy_primitives::Address;
use handoff_types::HandoffEvent;
use std::collections::{HashMap, HashSet};

/// Ordered relayer allow-list.
///
/// `index` maps every member to its position in `members`; the two are
/// always consistent and an address appears at most once.
#[derive(Debug, Clone, Default)]
pub struct RelayerSet {
	members: Vec<Address>,
	index: HashMap<Address, usize>,
}

impl RelayerSet {
	pub fn contains(&self, relayer: &Address) -> bool {
		self.index.contains_key(relayer)
	}

	pub fn as_slice(&self) -> &[Address] {
		&self.members
	}

	pub fn len(&self) -> usize {
		self.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	fn insert(&mut self, relayer: Address) -> Result<(), HandoffError> {
		if relayer == Address::ZERO {
			return Err(HandoffError::ZeroAddress);
		}
		if self.contains(&relayer) {
			return Err(HandoffError::RelayerAlreadyExists(relayer));
		}
		self.index.insert(relayer, self.members.len());
		self.members.push(relayer);
		Ok(())
	}

	/// Swap-and-pop removal. The last member takes the removed slot.
	fn remove(&mut self, relayer: Address) -> Result<(), HandoffError> {
		let position = self
			.index
			.remove(&relayer)
			.ok_or(HandoffError::RelayerNotFound(relayer))?;
		self.members.swap_remove(position);
		if let Some(moved) = self.members.get(position) {
			self.index.insert(*moved, position);
		}
		Ok(())
	}
}

/// Access-control state of one settlement instance.
#[derive(Debug, Clone)]
pub struct AccessControl {
	owner: Address,
	relayers: RelayerSet,
	blacklist: HashSet<Address>,
	paused: bool,
}

impl AccessControl {
	pub fn new(owner: Address) -> Self {
		Self {
			owner,
			relayers: RelayerSet::default(),
			blacklist: HashSet::new(),
			paused: false,
		}
	}

	pub fn owner(&self) -> Address {
		self.owner
	}

	pub fn relayers(&self) -> &RelayerSet {
		&self.relayers
	}

	pub fn is_relayer(&self, account: &Address) -> bool {
		self.relayers.contains(account)
	}

	pub fn is_blacklisted(&self, account: &Address) -> bool {
		self.blacklist.contains(account)
	}

	pub fn paused(&self) -> bool {
		self.paused
	}

	/// Fails unless `caller` is the owner. A renounced owner matches nobody.
	pub fn ensure_owner(&self, caller: Address) -> Result<(), HandoffError> {
		if self.owner == Address::ZERO || caller != self.owner {
			return Err(HandoffError::AccessDenied(caller));
		}
		Ok(())
	}

	pub fn ensure_relayer(&self, caller: Address) -> Result<(), HandoffError> {
		if !self.is_relayer(&caller) {
			return Err(HandoffError::AccessDenied(caller));
		}
		Ok(())
	}

	pub fn ensure_not_paused(&self) -> Result<(), HandoffError> {
		if self.paused {
			return Err(HandoffError::Paused);
		}
		Ok(())
	}

	/// Fails with the first blacklisted party, in argument order.
	pub fn ensure_not_blacklisted(&self, parties: &[Address]) -> Result<(), HandoffError> {
		match parties.iter().find(|party| self.is_blacklisted(party)) {
			Some(party) => Err(HandoffError::BlacklistedParty(*party)),
			None => Ok(()),
		}
	}

	pub fn add_relayer(&mut self, relayer: Address) -> Result<HandoffEvent, HandoffError> {
		self.relayers.insert(relayer)?;
		Ok(HandoffEvent::RelayerAdded { relayer })
	}

	pub fn remove_relayer(&mut self, relayer: Address) -> Result<HandoffEvent, HandoffError> {
		self.relayers.remove(relayer)?;
		Ok(HandoffEvent::RelayerRemoved { relayer })
	}

	/// Blacklists every new address in `accounts`.
	///
	/// Already-blacklisted entries are skipped without an event. A null
	/// address anywhere in the batch rejects the whole batch.
	pub fn blacklist(&mut self, accounts: &[Address]) -> Result<Vec<HandoffEvent>, HandoffError> {
		if accounts.contains(&Address::ZERO) {
			return Err(HandoffError::ZeroAddress);
		}
		Ok(accounts
			.iter()
			.filter(|account| self.blacklist.insert(**account))
			.map(|user| HandoffEvent::Blacklisted { user: *user })
			.collect())
	}

	/// Removes `account` from the blacklist. Returns `None` if it was not listed.
	pub fn un_blacklist(&mut self, account: Address) -> Option<HandoffEvent> {
		self.blacklist
			.remove(&account)
			.then_some(HandoffEvent::UnBlacklisted { user: account })
	}

	pub fn pause(&mut self, account: Address) -> Result<HandoffEvent, HandoffError> {
		self.ensure_not_paused()?;
		self.paused = true;
		Ok(HandoffEvent::Paused { account })
	}

	pub fn unpause(&mut self, account: Address) -> Result<HandoffEvent, HandoffError> {
		if !self.paused {
			return Err(HandoffError::NotPaused);
		}
		self.paused = false;
		Ok(HandoffEvent::Unpaused { account })
	}

	pub fn transfer_ownership(&mut self, new_owner: Address) -> Result<HandoffEvent, HandoffError> {
		if new_owner == Address::ZERO {
			return Err(HandoffError::ZeroAddress);
		}
		Ok(self.set_owner(new_owner))
	}

	/// Sets the owner to the null address, disabling owner-only operations.
	pub fn renounce_ownership(&mut self) -> HandoffEvent {
		self.set_owner(Address::ZERO)
	}

	fn set_owner(&mut self, new_owner: Address) -> HandoffEvent {
		let previous_owner = std::mem::replace(&mut self.owner, new_owner);
		HandoffEvent::OwnershipTransferred {
			previous_owner,
			new_owner,
		}
	}
}
