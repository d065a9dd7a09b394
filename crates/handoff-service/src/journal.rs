//! Background tasks that keep storage in step with the engine.

use handoff_core::RelayerContext;
use handoff_storage::StorageService;
use handoff_types::{HandoffEvent, StorageKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Mirrors the engine's event log under [`StorageKey::Events`].
///
/// Each event is stored under its zero-padded log index, so lexical order is
/// commit order. The broadcast only signals that the log grew; what gets
/// written is read back from the log past a cursor, so events committed
/// before the subscription or skipped by a lagging receiver are still
/// journaled exactly once.
pub async fn record_events(context: RelayerContext) {
	let mut receiver = context.engine.subscribe();
	let mut cursor = 0;
	catch_up(&context, &mut cursor).await;

	loop {
		match receiver.recv().await {
			Ok(_) => {},
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event journal lagged behind the engine");
			},
			Err(RecvError::Closed) => {
				tracing::info!("Event bus closed, journal stopping");
				break;
			},
		}
		catch_up(&context, &mut cursor).await;
	}
}

async fn catch_up(context: &RelayerContext, cursor: &mut usize) {
	for event in context.engine.events_since(*cursor) {
		write_event(&context.storage, *cursor, &event).await;
		*cursor += 1;
	}
}

async fn write_event(storage: &StorageService, index: usize, event: &HandoffEvent) {
	let id = format!("{:020}", index);

	if let Err(e) = storage.store(StorageKey::Events, &id, event).await {
		tracing::warn!(index = %id, error = %e, "Failed to journal event");
	}
}

/// Periodically drops expired storage entries.
pub async fn cleanup_loop(storage: Arc<StorageService>, interval: Duration) {
	let mut ticker = tokio::time::interval(interval);

	loop {
		ticker.tick().await;
		match storage.cleanup_expired().await {
			Ok(0) => {},
			Ok(removed) => tracing::debug!(removed, "Removed expired storage entries"),
			Err(e) => tracing::warn!(error = %e, "Storage cleanup failed"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{TestNode, OWNER};
	use alloy_primitives::Address;

	async fn journaled(storage: &StorageService, sequence: u64) -> Option<HandoffEvent> {
		storage
			.retrieve(StorageKey::Events, &format!("{:020}", sequence))
			.await
			.ok()
	}

	async fn wait_for(storage: &StorageService, index: u64) -> Option<HandoffEvent> {
		for _ in 0..100 {
			if let Some(event) = journaled(storage, index).await {
				return Some(event);
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		None
	}

	#[tokio::test]
	async fn test_journal_writes_genesis_then_committed_events() {
		let node = TestNode::new();
		let task = tokio::spawn(record_events(node.context.clone()));

		// Genesis: ownership plus one relayer.
		let genesis = node.context.engine.events().len() as u64;
		assert_eq!(genesis, 2);

		let (request, signature) = node.standard_request(250, 0x44);
		let relayer = node.context.relayer;
		let engine = node.context.engine.clone();
		tokio::task::spawn_blocking(move || {
			engine.settle_standard_permit(relayer, &request, &signature)
		})
		.await
		.unwrap()
		.unwrap();

		let completed = wait_for(&node.context.storage, genesis).await;
		task.abort();

		assert!(matches!(
			journaled(&node.context.storage, 0).await,
			Some(HandoffEvent::OwnershipTransferred { new_owner, .. }) if new_owner == OWNER
		));
		assert!(matches!(completed, Some(HandoffEvent::Completed { .. })));
	}

	#[tokio::test]
	async fn test_journal_records_admin_events() {
		let node = TestNode::new();
		let task = tokio::spawn(record_events(node.context.clone()));
		let genesis = node.context.engine.events().len() as u64;
		let relayer = Address::repeat_byte(0x77);

		node.context.engine.add_relayer(OWNER, relayer).unwrap();

		let added = wait_for(&node.context.storage, genesis).await;
		task.abort();

		assert!(matches!(
			added,
			Some(HandoffEvent::RelayerAdded { relayer: r }) if r == relayer
		));
	}

	#[tokio::test]
	async fn test_events_before_start_are_written_once() {
		let node = TestNode::new();
		let early = Address::repeat_byte(0x21);
		let late = Address::repeat_byte(0x22);
		node.context.engine.add_relayer(OWNER, early).unwrap();

		let task = tokio::spawn(record_events(node.context.clone()));
		let early_index = node.context.engine.events().len() as u64 - 1;
		assert!(wait_for(&node.context.storage, early_index).await.is_some());

		node.context.engine.add_relayer(OWNER, late).unwrap();
		let late_event = wait_for(&node.context.storage, early_index + 1).await;
		tokio::time::sleep(Duration::from_millis(50)).await;
		task.abort();

		assert!(matches!(
			journaled(&node.context.storage, early_index).await,
			Some(HandoffEvent::RelayerAdded { relayer }) if relayer == early
		));
		assert!(matches!(
			late_event,
			Some(HandoffEvent::RelayerAdded { relayer }) if relayer == late
		));
		assert!(journaled(&node.context.storage, early_index + 2).await.is_none());
	}

	#[tokio::test]
	async fn test_lagging_journal_leaves_no_gaps() {
		let node = TestNode::new();
		let task = tokio::spawn(record_events(node.context.clone()));
		let genesis = node.context.engine.events().len() as u64;
		assert!(wait_for(&node.context.storage, genesis - 1).await.is_some());

		// More events than the bus holds, with no await in between.
		let accounts: Vec<Address> = (1..=1_100u64)
			.map(|i| Address::left_padding_from(&i.to_be_bytes()))
			.collect();
		for account in &accounts {
			node.context.engine.blacklist(OWNER, &[*account]).unwrap();
		}

		let last = genesis + accounts.len() as u64 - 1;
		assert!(wait_for(&node.context.storage, last).await.is_some());
		task.abort();

		for (offset, account) in accounts.iter().enumerate().step_by(97) {
			assert!(matches!(
				journaled(&node.context.storage, genesis + offset as u64).await,
				Some(HandoffEvent::Blacklisted { user }) if user == *account
			));
		}
		assert!(journaled(&node.context.storage, last + 1).await.is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_cleanup_loop_keeps_running() {
		let node = TestNode::new();
		let task = tokio::spawn(cleanup_loop(
			node.context.storage.clone(),
			Duration::from_secs(60),
		));

		tokio::time::advance(Duration::from_secs(180)).await;
		assert!(!task.is_finished());
		task.abort();
	}
}
