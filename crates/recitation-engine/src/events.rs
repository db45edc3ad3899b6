//! Engine event bus for observer subscriptions.
//!
//! Replaces per-callback registration with a single typed broadcast
//! stream; UI layers subscribe and render, they never drive playback
//! through it.

use tokio::sync::broadcast;

use recitation_types::{EntryId, ItemId};

use crate::engine::EngineState;

/// Event payloads published by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The playback state machine moved to a new state.
    StateChanged { state: EngineState },
    /// One logical count completed for the owning entry (autopilot only).
    CountIncremented { group: EntryId },
    /// A different item (or repeat of the current one) is now current.
    ItemChanged {
        item: ItemId,
        current_repeat: u32,
        total_repeats: u32,
    },
    /// Items completed out of the total queue length.
    SessionProgress { current: usize, total: usize },
    /// Raw playback position forwarded from the transport.
    Position {
        elapsed_ms: u64,
        duration_ms: Option<u64>,
    },
    /// Advisory: an item could not be loaded or played.
    LoadWarning { item: ItemId, reason: String },
    /// The queue was discarded; no item is current.
    SessionCleared,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus with a bounded broadcast channel.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn state_changed(&self, state: EngineState) {
        let _ = self.sender.send(EngineEvent::StateChanged { state });
    }

    pub(crate) fn count_incremented(&self, group: EntryId) {
        let _ = self.sender.send(EngineEvent::CountIncremented { group });
    }

    pub(crate) fn item_changed(&self, item: ItemId, current_repeat: u32, total_repeats: u32) {
        let _ = self.sender.send(EngineEvent::ItemChanged {
            item,
            current_repeat,
            total_repeats,
        });
    }

    pub(crate) fn session_progress(&self, current: usize, total: usize) {
        let _ = self.sender.send(EngineEvent::SessionProgress { current, total });
    }

    pub(crate) fn position(&self, elapsed_ms: u64, duration_ms: Option<u64>) {
        let _ = self.sender.send(EngineEvent::Position {
            elapsed_ms,
            duration_ms,
        });
    }

    pub(crate) fn load_warning(&self, item: ItemId, reason: String) {
        let _ = self.sender.send(EngineEvent::LoadWarning { item, reason });
    }

    pub(crate) fn session_cleared(&self) {
        let _ = self.sender.send(EngineEvent::SessionCleared);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.count_incremented(EntryId::new("e1"));
        bus.session_progress(1, 3);

        assert_eq!(
            receiver.try_recv().unwrap(),
            EngineEvent::CountIncremented {
                group: EntryId::new("e1")
            }
        );
        assert_eq!(
            receiver.try_recv().unwrap(),
            EngineEvent::SessionProgress { current: 1, total: 3 }
        );
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.session_cleared();
    }
}
