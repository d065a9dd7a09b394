//! Call-depth guard for mutating engine operations.
//!
//! At most one mutating operation is in flight at a time. Any attempt to
//! enter while one is in flight fails immediately, whether it comes from a
//! program calling back on the same thread or from a thread that program
//! spawned. Ordering between independent callers is theirs to impose; the
//! HTTP service queues its calls before they reach the engine.

use crate::HandoffError;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
	entered: AtomicBool,
}

impl ReentrancyGuard {
	pub fn new() -> Self {
		Self::default()
	}

	/// Enters the guard, or fails with [`HandoffError::Reentrancy`] while
	/// another entry is live.
	pub fn enter(&self) -> Result<Entered<'_>, HandoffError> {
		if self.entered.swap(true, Ordering::Acquire) {
			return Err(HandoffError::Reentrancy);
		}
		Ok(Entered { guard: self })
	}

	/// Whether an operation is in flight.
	pub fn is_entered(&self) -> bool {
		self.entered.load(Ordering::Acquire)
	}
}

/// Proof of entry. Leaving the scope releases the guard.
pub struct Entered<'a> {
	guard: &'a ReentrancyGuard,
}

impl Drop for Entered<'_> {
	fn drop(&mut self) {
		self.guard.entered.store(false, Ordering::Release);
	}
}
