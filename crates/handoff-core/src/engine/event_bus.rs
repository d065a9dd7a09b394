//! Broadcast channel for committed engine events.
//!
//! Only committed events are published. Subscribers that fall behind lose
//! the oldest events; the engine's own log keeps the complete history.

use handoff_types::HandoffEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<HandoffEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<HandoffEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event. Having no subscribers is not an error.
	pub fn publish(&self, event: HandoffEvent) {
		let _ = self.sender.send(event);
	}
}
