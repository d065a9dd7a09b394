//! Settlement engine.
//!
//! [`HandoffEngine`] composes the access-control state, the signature
//! verifier, the permit and transfer adapters and the ledger. Every mutating
//! operation runs inside the call-depth guard and inside a host snapshot, so
//! it commits as a unit or leaves no trace on the engine or on the token
//! programs it called.

pub mod admin;
pub mod event_bus;

use crate::adapters::{
	registry_transfer_from, safe_transfer, safe_transfer_from, secure_delegated_allowance,
	secure_standard_permit, PermitPath,
};
use crate::guard::ReentrancyGuard;
use crate::state::{namespaced_id, AccessControl, EngineState};
use crate::verifier::SignatureVerifier;
use crate::HandoffError;
use alloy_primitives::{Address, B256, U256};
use event_bus::EventBus;
use handoff_chain::ChainService;
use handoff_config::HandoffConfig;
use handoff_types::{
	truncate_id, DelegatedAllowanceRequest, HandoffEvent, ReceivedAmountPolicy, SettlementFlow,
	SettlementRecord, StandardPermitRequest,
};
use std::sync::{Mutex, MutexGuard};

/// Capacity of the committed-event broadcast channel.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Result of a committed settlement.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
	pub flow: SettlementFlow,
	pub record: SettlementRecord,
	/// Events the settlement appended, in emission order.
	pub events: Vec<HandoffEvent>,
}

/// Flow-independent view of a settlement request.
struct Settlement {
	flow: SettlementFlow,
	token: Address,
	owner: Address,
	spender: Address,
	provider: Address,
	amount: U256,
	transaction_id: B256,
}

impl From<&StandardPermitRequest> for Settlement {
	fn from(request: &StandardPermitRequest) -> Self {
		Self {
			flow: SettlementFlow::StandardPermit,
			token: request.token,
			owner: request.owner,
			spender: request.spender,
			provider: request.provider,
			amount: request.value,
			transaction_id: request.transaction_id,
		}
	}
}

impl From<&DelegatedAllowanceRequest> for Settlement {
	fn from(request: &DelegatedAllowanceRequest) -> Self {
		Self {
			flow: SettlementFlow::DelegatedAllowance,
			token: request.token(),
			owner: request.owner,
			spender: request.spender,
			provider: request.provider,
			amount: request.amount(),
			transaction_id: request.transaction_id,
		}
	}
}

/// One settlement instance.
pub struct HandoffEngine {
	/// Address of this instance: the permit spender and EIP-712 verifying contract.
	instance: Address,
	chain_id: u64,
	/// Delegated allowance registry.
	permit2: Address,
	received_amount: ReceivedAmountPolicy,
	chain: ChainService,
	verifier: SignatureVerifier,
	guard: ReentrancyGuard,
	state: Mutex<EngineState>,
	event_bus: EventBus,
}

impl HandoffEngine {
	/// Creates an instance with the initial owner, relayers and blacklist
	/// from `settings`. The chain id is taken from the host.
	pub fn new(settings: &HandoffConfig, chain: ChainService) -> Result<Self, HandoffError> {
		if settings.address == Address::ZERO || settings.owner == Address::ZERO {
			return Err(HandoffError::ZeroAddress);
		}

		let mut access = AccessControl::new(settings.owner);
		let mut genesis = vec![HandoffEvent::OwnershipTransferred {
			previous_owner: Address::ZERO,
			new_owner: settings.owner,
		}];
		for relayer in &settings.relayers {
			genesis.push(access.add_relayer(*relayer)?);
		}
		genesis.extend(access.blacklist(&settings.blacklist)?);

		let mut state = EngineState::new(access);
		state.events = genesis;

		let chain_id = chain.chain_id();
		Ok(Self {
			instance: settings.address,
			chain_id,
			permit2: settings.permit2,
			received_amount: settings.received_amount,
			verifier: SignatureVerifier::new(chain_id, settings.address),
			chain,
			guard: ReentrancyGuard::new(),
			state: Mutex::new(state),
			event_bus: EventBus::new(EVENT_BUS_CAPACITY),
		})
	}

	/// Settles a request whose allowance comes from an EIP-2612 permit.
	///
	/// `caller` must be a relayer. `signature` is the owner's signature over
	/// the request under the Handoff domain.
	pub fn settle_standard_permit(
		&self,
		caller: Address,
		request: &StandardPermitRequest,
		signature: &[u8],
	) -> Result<SettlementOutcome, HandoffError> {
		self.settle(
			caller,
			Settlement::from(request),
			|| self.verifier.verify_standard_permit(request, signature),
			|| secure_standard_permit(&self.chain, self.instance, request),
			|| {
				safe_transfer_from(
					&self.chain,
					self.instance,
					request.token,
					request.owner,
					request.provider,
					request.value,
				)
			},
		)
	}

	/// Settles a request whose allowance comes from the delegated registry.
	pub fn settle_delegated_allowance(
		&self,
		caller: Address,
		request: &DelegatedAllowanceRequest,
		signature: &[u8],
	) -> Result<SettlementOutcome, HandoffError> {
		self.settle(
			caller,
			Settlement::from(request),
			|| self.verifier.verify_delegated_allowance(request, signature),
			|| secure_delegated_allowance(&self.chain, self.instance, self.permit2, request),
			|| {
				registry_transfer_from(
					&self.chain,
					self.instance,
					self.permit2,
					request.permit.token,
					request.owner,
					request.provider,
					request.permit.amount,
				)
			},
		)
	}

	fn settle(
		&self,
		caller: Address,
		settlement: Settlement,
		verify: impl FnOnce() -> Result<(), HandoffError>,
		permit: impl FnOnce() -> Result<PermitPath, HandoffError>,
		transfer: impl FnOnce() -> Result<(), HandoffError>,
	) -> Result<SettlementOutcome, HandoffError> {
		let _entered = self.guard.enter()?;

		match self.execute_settlement(caller, &settlement, verify, permit, transfer) {
			Ok(outcome) => {
				self.publish(&outcome.events);
				tracing::info!(
					flow = %settlement.flow,
					id = %truncate_id(&outcome.record.id.to_string()),
					token = %settlement.token,
					owner = %settlement.owner,
					provider = %settlement.provider,
					amount = %settlement.amount,
					received = %outcome.record.received_amount,
					"Settlement committed"
				);
				Ok(outcome)
			},
			Err(e) => {
				tracing::warn!(
					flow = %settlement.flow,
					relayer = %caller,
					owner = %settlement.owner,
					error = %e,
					"Settlement rejected"
				);
				Err(e)
			},
		}
	}

	fn execute_settlement(
		&self,
		caller: Address,
		settlement: &Settlement,
		verify: impl FnOnce() -> Result<(), HandoffError>,
		permit: impl FnOnce() -> Result<PermitPath, HandoffError>,
		transfer: impl FnOnce() -> Result<(), HandoffError>,
	) -> Result<SettlementOutcome, HandoffError> {
		{
			let state = self.state();
			state.access.ensure_not_paused()?;
			state.access.ensure_relayer(caller)?;
			state
				.access
				.ensure_not_blacklisted(&[settlement.owner, settlement.provider])?;
		}
		verify()?;
		self.validate(settlement)?;

		let id = namespaced_id(
			settlement.transaction_id,
			settlement.owner,
			self.instance,
			self.chain_id,
		);
		self.state().ledger.ensure_unused(&id)?;

		let (record, volume) = self.atomically(|| {
			let path = permit()?;
			tracing::debug!(id = %truncate_id(&id.to_string()), path = ?path, "Allowance secured");

			let balance_before = self.provider_balance(settlement)?;
			transfer()?;
			let received_amount = match balance_before {
				Some(before) => self
					.chain
					.token_balance(settlement.token, settlement.provider)?
					.saturating_sub(before),
				None => settlement.amount,
			};

			let record = SettlementRecord {
				id,
				user: settlement.owner,
				provider: settlement.provider,
				token: settlement.token,
				requested_amount: settlement.amount,
				received_amount,
				exists: true,
			};
			let volume = self.state().ledger.prepare(&record)?;
			Ok((record, volume))
		})?;

		// The host effects are committed; engine state follows.
		let events = vec![HandoffEvent::Completed {
			token: settlement.token,
			user: settlement.owner,
			provider: settlement.provider,
			amount: settlement.amount,
			id,
		}];
		let mut state = self.state();
		state.ledger.insert(record.clone(), volume);
		state.events.extend(events.iter().cloned());
		drop(state);

		Ok(SettlementOutcome {
			flow: settlement.flow,
			record,
			events,
		})
	}

	fn validate(&self, settlement: &Settlement) -> Result<(), HandoffError> {
		let reason = if settlement.token == Address::ZERO {
			"token is the zero address"
		} else if settlement.provider == Address::ZERO {
			"provider is the zero address"
		} else if settlement.amount.is_zero() {
			"amount is zero"
		} else if settlement.spender != self.instance {
			"spender is not this settlement instance"
		} else if settlement.owner == settlement.provider {
			"owner and provider are the same"
		} else {
			return Ok(());
		};
		Err(HandoffError::InvalidRequest(reason.to_string()))
	}

	/// Provider balance before the transfer, when the policy measures it.
	fn provider_balance(&self, settlement: &Settlement) -> Result<Option<U256>, HandoffError> {
		match self.received_amount {
			ReceivedAmountPolicy::Requested => Ok(None),
			ReceivedAmountPolicy::Measured => Ok(Some(
				self.chain
					.token_balance(settlement.token, settlement.provider)?,
			)),
		}
	}

	/// Accepts `amount` of native value sent by `sender`.
	pub fn receive_native(&self, sender: Address, amount: U256) -> Result<(), HandoffError> {
		let _entered = self.guard.enter()?;
		self.atomically(|| {
			self.chain.transfer_native(sender, self.instance, amount)?;
			Ok(())
		})?;
		self.commit(vec![HandoffEvent::NativeReceived { sender, amount }]);
		Ok(())
	}

	/// Sends `amount` of the instance's native balance to `recipient`. Owner only.
	pub fn withdraw_native(
		&self,
		caller: Address,
		recipient: Address,
		amount: U256,
	) -> Result<(), HandoffError> {
		let _entered = self.guard.enter()?;
		self.state().access.ensure_owner(caller)?;
		if recipient == Address::ZERO {
			return Err(HandoffError::ZeroAddress);
		}

		let available = self.chain.native_balance(self.instance);
		if available < amount {
			return Err(HandoffError::InsufficientBalance {
				available,
				requested: amount,
			});
		}
		self.atomically(|| {
			self.chain.transfer_native(self.instance, recipient, amount)?;
			Ok(())
		})?;

		self.commit(vec![HandoffEvent::NativeTransferred { recipient, amount }]);
		tracing::info!(recipient = %recipient, amount = %amount, "Native funds withdrawn");
		Ok(())
	}

	/// Sends `amount` of `token` held by the instance to `recipient`. Owner only.
	pub fn withdraw_token(
		&self,
		caller: Address,
		token: Address,
		recipient: Address,
		amount: U256,
	) -> Result<(), HandoffError> {
		let _entered = self.guard.enter()?;
		self.state().access.ensure_owner(caller)?;
		if recipient == Address::ZERO || token == Address::ZERO {
			return Err(HandoffError::ZeroAddress);
		}

		let available = self.chain.token_balance(token, self.instance)?;
		if available < amount {
			return Err(HandoffError::InsufficientBalance {
				available,
				requested: amount,
			});
		}
		self.atomically(|| safe_transfer(&self.chain, self.instance, token, recipient, amount))?;

		self.commit(vec![HandoffEvent::TokenTransferred {
			recipient,
			token,
			amount,
		}]);
		tracing::info!(token = %token, recipient = %recipient, amount = %amount, "Tokens withdrawn");
		Ok(())
	}

	/// Runs `f` inside a host snapshot: released when `f` succeeds, reverted
	/// when it fails.
	fn atomically<T>(
		&self,
		f: impl FnOnce() -> Result<T, HandoffError>,
	) -> Result<T, HandoffError> {
		let snapshot = self.chain.snapshot();
		match f() {
			Ok(value) => match self.chain.release(snapshot) {
				Ok(()) => Ok(value),
				Err(e) => {
					if let Err(revert) = self.chain.revert_to(snapshot) {
						tracing::error!(snapshot, error = %revert, "Host frame left open");
					}
					Err(e.into())
				},
			},
			Err(e) => {
				self.chain.revert_to(snapshot)?;
				Err(e)
			},
		}
	}

	/// Appends events to the log and publishes them.
	fn commit(&self, events: Vec<HandoffEvent>) {
		self.state().events.extend(events.iter().cloned());
		self.publish(&events);
	}

	fn publish(&self, events: &[HandoffEvent]) {
		for event in events {
			self.event_bus.publish(event.clone());
		}
	}

	fn state(&self) -> MutexGuard<'_, EngineState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn get_relayers(&self) -> Vec<Address> {
		self.state().access.relayers().as_slice().to_vec()
	}

	pub fn is_relayer(&self, account: Address) -> bool {
		self.state().access.is_relayer(&account)
	}

	pub fn is_blacklisted(&self, account: Address) -> bool {
		self.state().access.is_blacklisted(&account)
	}

	pub fn paused(&self) -> bool {
		self.state().access.paused()
	}

	pub fn owner(&self) -> Address {
		self.state().access.owner()
	}

	pub fn get_settlement(&self, id: &B256) -> Option<SettlementRecord> {
		self.state().ledger.get(id).cloned()
	}

	pub fn total_volume(&self, token: Address) -> U256 {
		self.state().ledger.total_volume(&token)
	}

	pub fn domain_separator(&self) -> B256 {
		self.verifier.domain_separator()
	}

	/// Namespaced id `raw_id` resolves to for `user` on this instance.
	pub fn namespaced_id(&self, raw_id: B256, user: Address) -> B256 {
		namespaced_id(raw_id, user, self.instance, self.chain_id)
	}

	/// The committed event log, oldest first.
	pub fn events(&self) -> Vec<HandoffEvent> {
		self.state().events.clone()
	}

	/// The committed events from log index `start` on.
	pub fn events_since(&self, start: usize) -> Vec<HandoffEvent> {
		self.state().events.get(start..).unwrap_or_default().to_vec()
	}

	/// Subscribes to events as they are committed.
	pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<HandoffEvent> {
		self.event_bus.subscribe()
	}

	pub fn instance(&self) -> Address {
		self.instance
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn permit2(&self) -> Address {
		self.permit2
	}

	pub fn chain(&self) -> &ChainService {
		&self.chain
	}
}
