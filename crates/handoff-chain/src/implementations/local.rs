//! In-process development chain.
//!
//! Programs live in memory and execute synchronously. Every call runs in its
//! own snapshot frame, so a program that returns an error leaves no trace,
//! and callers can open outer frames that span several calls.
//!
//! Snapshots are copy-on-touch: the first time a program or the native
//! balance table is touched inside a frame, its prior state is saved in that
//! frame. Reverting restores the saved copies; releasing hands them to the
//! parent frame unless the parent already holds an older copy.

use crate::programs::{AllowanceRegistry, CallContext, Erc20Token, Program, ReturnStyle};
use crate::{ChainError, ChainInterface, SnapshotId};
use alloy_primitives::{Address, Bytes, U256};
use handoff_types::{
	current_timestamp, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema,
	ValidationError,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};

type ProgramSlot = Arc<Mutex<Box<dyn Program>>>;

/// Saved state for one open snapshot frame.
struct Frame {
	id: SnapshotId,
	programs: HashMap<Address, Box<dyn Program>>,
	native: Option<HashMap<Address, U256>>,
}

#[derive(Default)]
struct Journal {
	frames: Vec<Frame>,
	next_id: SnapshotId,
}

/// Locks a mutex, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory chain executing [`Program`]s.
pub struct LocalChain {
	chain_id: u64,
	timestamp: AtomicU64,
	programs: RwLock<HashMap<Address, ProgramSlot>>,
	native: Mutex<HashMap<Address, U256>>,
	journal: Mutex<Journal>,
}

impl LocalChain {
	pub fn new(chain_id: u64, timestamp: u64) -> Self {
		Self {
			chain_id,
			timestamp: AtomicU64::new(timestamp),
			programs: RwLock::new(HashMap::new()),
			native: Mutex::new(HashMap::new()),
			journal: Mutex::new(Journal::default()),
		}
	}

	/// Deploys `program` at `address`, replacing any previous code there.
	pub fn deploy(&self, address: Address, program: impl Program + 'static) {
		let slot: ProgramSlot = Arc::new(Mutex::new(Box::new(program)));
		self.programs
			.write()
			.unwrap_or_else(|e| e.into_inner())
			.insert(address, slot);
		tracing::debug!(address = %address, "Deployed program");
	}

	pub fn set_timestamp(&self, timestamp: u64) {
		self.timestamp.store(timestamp, Ordering::SeqCst);
	}

	pub fn advance_time(&self, seconds: u64) {
		self.timestamp.fetch_add(seconds, Ordering::SeqCst);
	}

	/// Sets a native balance directly, outside any snapshot frame.
	pub fn set_native_balance(&self, account: Address, amount: U256) {
		lock(&self.native).insert(account, amount);
	}

	/// Runs `f` against the program at `address` if it is a `T`.
	///
	/// Mutations made here bypass the snapshot journal. Returns `None` when
	/// there is no program of that type at `address` or it is executing.
	pub fn inspect<T: Program + 'static, R>(
		&self,
		address: Address,
		f: impl FnOnce(&mut T) -> R,
	) -> Option<R> {
		let slot = self.slot(address)?;
		let mut guard = slot.try_lock().ok()?;
		guard.as_any_mut().downcast_mut::<T>().map(f)
	}

	fn slot(&self, address: Address) -> Option<ProgramSlot> {
		self.programs
			.read()
			.unwrap_or_else(|e| e.into_inner())
			.get(&address)
			.cloned()
	}

	/// Saves the program's current state in the innermost frame if this is
	/// its first touch there.
	fn touch_program(&self, address: Address, program: &dyn Program) {
		let mut journal = lock(&self.journal);
		if let Some(frame) = journal.frames.last_mut() {
			frame
				.programs
				.entry(address)
				.or_insert_with(|| program.snapshot());
		}
	}

	fn touch_native(&self, native: &HashMap<Address, U256>) {
		let mut journal = lock(&self.journal);
		if let Some(frame) = journal.frames.last_mut() {
			if frame.native.is_none() {
				frame.native = Some(native.clone());
			}
		}
	}

	fn execute(
		&self,
		slot: &ProgramSlot,
		caller: Address,
		target: Address,
		calldata: &[u8],
	) -> Result<Bytes, ChainError> {
		let mut program = match slot.try_lock() {
			Ok(guard) => guard,
			Err(TryLockError::WouldBlock) => return Err(ChainError::ReentrantCall(target)),
			Err(TryLockError::Poisoned(e)) => e.into_inner(),
		};
		self.touch_program(target, &**program);

		let ctx = CallContext {
			host: self,
			caller,
			this: target,
			chain_id: self.chain_id,
			timestamp: self.timestamp(),
		};
		program.execute(&ctx, calldata)
	}

	fn restore(&self, frames: Vec<Frame>) -> Result<(), ChainError> {
		// Innermost first, so the oldest saved copy is applied last
		for frame in frames.into_iter().rev() {
			for (address, saved) in frame.programs {
				let Some(slot) = self.slot(address) else {
					continue;
				};
				let mut program = slot
					.try_lock()
					.map_err(|_| ChainError::ReentrantCall(address))?;
				*program = saved;
			}
			if let Some(saved) = frame.native {
				*lock(&self.native) = saved;
			}
		}
		Ok(())
	}
}

impl ChainInterface for LocalChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalChainSchema)
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn timestamp(&self) -> u64 {
		self.timestamp.load(Ordering::SeqCst)
	}

	fn has_code(&self, address: Address) -> bool {
		self.slot(address).is_some()
	}

	fn call(
		&self,
		caller: Address,
		target: Address,
		calldata: &[u8],
	) -> Result<Bytes, ChainError> {
		let Some(slot) = self.slot(target) else {
			return Ok(Bytes::new());
		};

		let frame = self.snapshot();
		match self.execute(&slot, caller, target, calldata) {
			Ok(output) => {
				self.release(frame)?;
				Ok(output)
			},
			Err(e) => {
				self.revert_to(frame)?;
				tracing::trace!(target = %target, error = %e, "Call reverted");
				Err(e)
			},
		}
	}

	fn native_balance(&self, account: Address) -> U256 {
		lock(&self.native)
			.get(&account)
			.copied()
			.unwrap_or_default()
	}

	fn transfer_native(&self, from: Address, to: Address, amount: U256) -> Result<(), ChainError> {
		let mut native = lock(&self.native);
		let available = native.get(&from).copied().unwrap_or_default();
		if available < amount {
			return Err(ChainError::InsufficientNativeBalance {
				available,
				requested: amount,
			});
		}
		self.touch_native(&native);
		native.insert(from, available - amount);
		let credited = native.get(&to).copied().unwrap_or_default().saturating_add(amount);
		native.insert(to, credited);
		Ok(())
	}

	fn snapshot(&self) -> SnapshotId {
		let mut journal = lock(&self.journal);
		let id = journal.next_id;
		journal.next_id += 1;
		journal.frames.push(Frame {
			id,
			programs: HashMap::new(),
			native: None,
		});
		id
	}

	fn revert_to(&self, id: SnapshotId) -> Result<(), ChainError> {
		let discarded = {
			let mut journal = lock(&self.journal);
			let position = journal
				.frames
				.iter()
				.position(|f| f.id == id)
				.ok_or(ChainError::UnknownSnapshot(id))?;
			journal.frames.split_off(position)
		};
		self.restore(discarded)
	}

	fn release(&self, id: SnapshotId) -> Result<(), ChainError> {
		let mut journal = lock(&self.journal);
		if journal.frames.last().map(|f| f.id) != Some(id) {
			return Err(ChainError::UnknownSnapshot(id));
		}
		let Some(frame) = journal.frames.pop() else {
			return Err(ChainError::UnknownSnapshot(id));
		};
		if let Some(parent) = journal.frames.last_mut() {
			for (address, saved) in frame.programs {
				parent.programs.entry(address).or_insert(saved);
			}
			if parent.native.is_none() {
				parent.native = frame.native;
			}
		}
		Ok(())
	}
}

/// Configuration schema for the local chain.
pub struct LocalChainSchema;

impl LocalChainSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		LocalChainSchema.validate(config)
	}
}

/// Accepts a table mapping address strings to decimal amount strings or integers.
fn validate_balance_table(value: &toml::Value) -> Result<(), String> {
	let table = value.as_table().ok_or("balances must be a table")?;
	for (holder, amount) in table {
		Address::from_str(holder).map_err(|e| format!("Invalid holder '{}': {}", holder, e))?;
		parse_amount(amount)?;
	}
	Ok(())
}

fn parse_amount(value: &toml::Value) -> Result<U256, String> {
	match value {
		toml::Value::String(s) => {
			U256::from_str_radix(s, 10).map_err(|e| format!("Invalid amount '{}': {}", s, e))
		},
		toml::Value::Integer(i) if *i >= 0 => Ok(U256::from(*i as u64)),
		other => Err(format!("Invalid amount: {}", other)),
	}
}

impl ConfigSchema for LocalChainSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let token_schema = Schema::new(
			vec![
				Field::new("address", FieldType::Address),
				Field::new("name", FieldType::String),
			],
			vec![
				Field::new("return_style", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some("standard" | "missing" | "false") => Ok(()),
						_ => Err("return_style must be one of standard, missing, false".into()),
					}
				}),
				Field::new(
					"fee_bps",
					FieldType::Integer {
						min: Some(0),
						max: Some(10_000),
					},
				),
				Field::new("balances", FieldType::Table(Schema::new(vec![], vec![])))
					.with_validator(validate_balance_table),
			],
		);

		let schema = Schema::new(
			vec![Field::new(
				"chain_id",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
			vec![
				Field::new(
					"timestamp",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new("permit2", FieldType::Address),
				Field::new("native_balances", FieldType::Table(Schema::new(vec![], vec![])))
					.with_validator(validate_balance_table),
				Field::new("tokens", FieldType::Array(Box::new(FieldType::Table(token_schema)))),
			],
		);

		schema.validate(config)
	}
}

fn config_error(e: impl std::fmt::Display) -> ChainError {
	ChainError::Configuration(e.to_string())
}

fn parse_address(value: Option<&toml::Value>) -> Result<Option<Address>, ChainError> {
	value
		.and_then(|v| v.as_str())
		.map(|s| Address::from_str(s).map_err(config_error))
		.transpose()
}

fn parse_balances(value: Option<&toml::Value>) -> Result<Vec<(Address, U256)>, ChainError> {
	let Some(table) = value.and_then(|v| v.as_table()) else {
		return Ok(Vec::new());
	};
	table
		.iter()
		.map(|(holder, amount)| {
			let holder = Address::from_str(holder).map_err(config_error)?;
			let amount = parse_amount(amount).map_err(config_error)?;
			Ok((holder, amount))
		})
		.collect()
}

/// Factory function to create a local chain from its genesis configuration.
///
/// Configuration parameters:
/// - `chain_id`: chain id reported by the host (required)
/// - `timestamp`: initial block timestamp, defaults to the wall clock
/// - `permit2`: address to deploy the allowance registry at
/// - `native_balances`: table of address to amount
/// - `tokens`: array of `{address, name, return_style, fee_bps, balances}`
pub fn create_local_chain(config: &toml::Value) -> Result<Box<dyn ChainInterface>, ChainError> {
	LocalChainSchema::validate_config(config)
		.map_err(|e| ChainError::Configuration(format!("Invalid configuration: {}", e)))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.ok_or_else(|| ChainError::Configuration("chain_id is required".into()))? as u64;
	let timestamp = config
		.get("timestamp")
		.and_then(|v| v.as_integer())
		.map(|t| t as u64)
		.unwrap_or_else(current_timestamp);

	let chain = LocalChain::new(chain_id, timestamp);

	if let Some(registry) = parse_address(config.get("permit2"))? {
		chain.deploy(registry, AllowanceRegistry::new());
	}

	for (holder, amount) in parse_balances(config.get("native_balances"))? {
		chain.set_native_balance(holder, amount);
	}

	let tokens = config
		.get("tokens")
		.and_then(|v| v.as_array())
		.cloned()
		.unwrap_or_default();
	for token_config in &tokens {
		let address = parse_address(token_config.get("address"))?
			.ok_or_else(|| ChainError::Configuration("token address is required".into()))?;
		let name = token_config
			.get("name")
			.and_then(|v| v.as_str())
			.unwrap_or_default();
		let return_style = match token_config.get("return_style").and_then(|v| v.as_str()) {
			Some(style) => ReturnStyle::deserialize_str(style)?,
			None => ReturnStyle::Standard,
		};
		let fee_bps = token_config
			.get("fee_bps")
			.and_then(|v| v.as_integer())
			.unwrap_or(0) as u16;

		let mut token = Erc20Token::new(name)
			.with_return_style(return_style)
			.with_fee_bps(fee_bps);
		for (holder, amount) in parse_balances(token_config.get("balances"))? {
			token.mint(holder, amount);
		}
		chain.deploy(address, token);
		tracing::info!(token = %address, name = %name, "Genesis token deployed");
	}

	Ok(Box::new(chain))
}

impl ReturnStyle {
	fn deserialize_str(style: &str) -> Result<Self, ChainError> {
		serde::Deserialize::deserialize(toml::Value::String(style.to_string())).map_err(config_error)
	}
}

/// Registry for the local chain implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::ChainFactory;

	fn factory() -> Self::Factory {
		create_local_chain
	}
}

impl crate::ChainRegistry for Registry {}
