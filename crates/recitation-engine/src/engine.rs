//! Recitation playback state machine.
//!
//! Tracks the current queue position and repeat count, drives
//! load/play/repeat/advance transitions, and publishes engine events.
//! All public operations complete their state transition synchronously
//! under one internal lock; status samples and the advance timer are
//! the only asynchronous inputs.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use recitation_types::{
    AudioManifest, EntryId, PlaybackMode, ReciterId, RepeatLimit, SessionEntry, SessionKind,
    TransportSample,
};

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};
use crate::media_session::{ControlPolicy, MediaSessionSurface, MetadataResolver};
use crate::pause::pause_for;
use crate::queue::{self, QueueItem};
use crate::resolve::{self, AudioCache};
use crate::timer::AdvanceScheduler;
use crate::track_end::is_track_end;
use crate::transport::{AudioTransport, TransportError};

/// High-level engine state visible to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing in flight. Initial state and the result of `dismiss`/`stop`.
    Idle,
    /// Resolving and handing a file to the transport.
    Loading,
    Playing,
    Paused,
    /// Waiting out the inter-item pause.
    Advancing,
    /// Queue exhausted; terminal until a new queue is built.
    Completed,
}

/// Snapshot of the engine position for UI polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: EngineState,
    pub queue_index: usize,
    pub current_repeat: u32,
    pub queue_len: usize,
}

struct EngineInner {
    queue: Vec<QueueItem>,
    index: usize,
    current_repeat: u32,
    state: EngineState,
    mode: PlaybackMode,
    repeat_limit: RepeatLimit,
    reciter: Option<ReciterId>,
    transport: Option<Arc<dyn AudioTransport>>,
    metadata: Option<Arc<dyn MetadataResolver>>,
    /// Re-entrancy guard: end-of-track handling runs once per loaded item
    /// even under a burst of post-end samples.
    handling_end: bool,
    /// Invalidates stale advance timers after cancel/navigation.
    advance_generation: u64,
}

/// The sequencing engine. Exactly one instance runs per application;
/// construct it at the composition root and hand clones to the layers
/// that need it.
#[derive(Clone)]
pub struct RecitationEngine {
    inner: Arc<Mutex<EngineInner>>,
    events: EventBus,
    cache: Arc<dyn AudioCache>,
    scheduler: Arc<dyn AdvanceScheduler>,
    surface: Arc<dyn MediaSessionSurface>,
    config: EngineConfig,
}

impl RecitationEngine {
    pub fn new(
        cache: Arc<dyn AudioCache>,
        scheduler: Arc<dyn AdvanceScheduler>,
        surface: Arc<dyn MediaSessionSurface>,
        config: EngineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                queue: Vec::new(),
                index: 0,
                current_repeat: 0,
                state: EngineState::Idle,
                mode: PlaybackMode::default(),
                repeat_limit: RepeatLimit::default(),
                reciter: None,
                transport: None,
                metadata: None,
                handling_end: false,
                advance_generation: 0,
            })),
            events: EventBus::new(),
            cache,
            scheduler,
            surface,
            config,
        }
    }

    /// Subscribe to the engine event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Bind a live audio transport handle. Binding does not resume a
    /// prior queue; callers rebuild after a remount.
    pub fn bind_transport(&self, transport: Arc<dyn AudioTransport>) {
        let mut inner = self.inner.lock().unwrap();
        inner.transport = Some(transport);
    }

    /// Tear down the bound transport. Performs a full `stop`.
    pub fn release_transport(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.stop_locked(&mut inner);
        inner.transport = None;
    }

    pub fn set_mode(&self, mode: PlaybackMode) {
        let mut inner = self.inner.lock().unwrap();
        debug!(?mode, "playback mode set");
        inner.mode = mode;
    }

    pub fn set_repeat_limit(&self, limit: RepeatLimit) {
        let mut inner = self.inner.lock().unwrap();
        debug!(?limit, "repeat limit set");
        inner.repeat_limit = limit;
    }

    pub fn set_metadata_resolver(&self, resolver: Arc<dyn MetadataResolver>) {
        let mut inner = self.inner.lock().unwrap();
        inner.metadata = Some(resolver);
    }

    /// Replace the session queue. Resets the position to the start; no
    /// file I/O happens until playback.
    pub fn build_queue(
        &self,
        entries: &[SessionEntry],
        manifest: &AudioManifest,
        reciter: ReciterId,
        kind: SessionKind,
    ) {
        let mut inner = self.inner.lock().unwrap();
        self.cancel_advance(&mut inner);
        inner.queue = queue::build_queue(entries, manifest, kind);
        inner.index = 0;
        inner.current_repeat = 0;
        inner.handling_end = false;
        inner.reciter = Some(reciter);
        debug!(items = inner.queue.len(), ?kind, "session queue built");
        self.set_state(&mut inner, EngineState::Idle);
    }

    /// Start (or re-enter) playback at the current position.
    pub fn play(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.is_empty() {
            debug!("play ignored: no queue");
            return;
        }
        // Completed is terminal for this queue; a new build starts over.
        if inner.state == EngineState::Completed {
            debug!("play ignored: session completed");
            return;
        }
        self.cancel_advance(&mut inner);
        let index = inner.index;
        self.load_and_start(&mut inner, index);
    }

    /// Pause the transport. No-op unless currently playing.
    pub fn pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != EngineState::Playing {
            return;
        }
        if let Some(transport) = inner.transport.as_ref() {
            if let Err(e) = transport.pause() {
                warn!(error = ?e, "transport pause failed");
            }
        }
        self.set_state(&mut inner, EngineState::Paused);
    }

    /// Resume the transport. No-op unless currently paused. Does not
    /// re-resolve the file or reset the repeat count.
    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != EngineState::Paused {
            return;
        }
        if let Some(transport) = inner.transport.as_ref() {
            if let Err(e) = transport.resume() {
                warn!(error = ?e, "transport resume failed");
            }
        }
        self.set_state(&mut inner, EngineState::Playing);
    }

    /// Seek within the current item while playing or paused.
    pub fn seek_to_ms(&self, ms: u64) {
        let inner = self.inner.lock().unwrap();
        if !matches!(inner.state, EngineState::Playing | EngineState::Paused) {
            return;
        }
        if let Some(transport) = inner.transport.as_ref() {
            if let Err(e) = transport.seek_ms(ms) {
                warn!(error = ?e, ms, "transport seek failed");
            }
        }
    }

    /// Advance to the next queue item; at the last index the session
    /// completes instead.
    pub fn next(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.is_empty() {
            return;
        }
        self.cancel_advance(&mut inner);
        inner.handling_end = false;
        if inner.index + 1 >= inner.queue.len() {
            self.complete(&mut inner);
            return;
        }
        inner.index += 1;
        inner.current_repeat = 0;
        let index = inner.index;
        self.load_and_start(&mut inner, index);
    }

    /// Go back one queue item; at index 0 the current item restarts.
    pub fn previous(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.is_empty() {
            return;
        }
        self.cancel_advance(&mut inner);
        inner.handling_end = false;
        inner.index = inner.index.saturating_sub(1);
        inner.current_repeat = 0;
        let index = inner.index;
        self.load_and_start(&mut inner, index);
    }

    /// Jump to the first queue slot of `group`, offset into its rotation
    /// by `count_hint` so resuming mid-rotation lands on the right
    /// sub-text.
    pub fn jump_to(&self, group: &EntryId, count_hint: u32) {
        let mut inner = self.inner.lock().unwrap();
        let Some(first) = inner.queue.iter().position(|item| &item.group_id == group) else {
            warn!(group = %group, "jump target not in queue");
            return;
        };
        self.cancel_advance(&mut inner);
        inner.handling_end = false;
        let slots = inner.queue[first].rotation_slots.max(1);
        let offset = count_hint.min(slots - 1) as usize;
        inner.index = (first + offset).min(inner.queue.len() - 1);
        inner.current_repeat = 0;
        let index = inner.index;
        self.load_and_start(&mut inner, index);
    }

    /// Collapse the session UI: stop audio and release the lock screen
    /// but keep the queue and position for a later `play`.
    pub fn dismiss(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.cancel_advance(&mut inner);
        inner.handling_end = false;
        self.surface.release();
        if let Some(transport) = inner.transport.as_ref() {
            if let Err(e) = transport.pause() {
                debug!(error = ?e, "transport pause on dismiss failed");
            }
        }
        self.set_state(&mut inner, EngineState::Idle);
    }

    /// End the session: `dismiss` plus discarding the queue entirely.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.stop_locked(&mut inner);
    }

    /// Feed one transport status sample. Forwards the position to
    /// observers and derives natural end-of-track while playing.
    pub fn on_status(&self, sample: TransportSample) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != EngineState::Playing {
            return;
        }
        self.events
            .position(sample.elapsed_ms.unwrap_or(0), sample.duration_ms);
        if !inner.handling_end && is_track_end(&sample, self.config.end_tolerance_ms) {
            inner.handling_end = true;
            self.handle_track_end(&mut inner);
        }
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().unwrap().state
    }

    pub fn current_index(&self) -> usize {
        self.inner.lock().unwrap().index
    }

    pub fn current_repeat(&self) -> u32 {
        self.inner.lock().unwrap().current_repeat
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// `true` while a session is in flight (loading, playing, paused, or
    /// waiting out a pause).
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            EngineState::Loading | EngineState::Playing | EngineState::Paused | EngineState::Advancing
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().unwrap();
        SessionSnapshot {
            state: inner.state,
            queue_index: inner.index,
            current_repeat: inner.current_repeat,
            queue_len: inner.queue.len(),
        }
    }

    fn stop_locked(&self, inner: &mut EngineInner) {
        self.cancel_advance(inner);
        inner.handling_end = false;
        self.surface.release();
        if let Some(transport) = inner.transport.as_ref() {
            if let Err(e) = transport.stop() {
                debug!(error = ?e, "transport stop failed");
            }
        }
        inner.queue.clear();
        inner.index = 0;
        inner.current_repeat = 0;
        self.events.session_cleared();
        self.set_state(inner, EngineState::Idle);
    }

    fn set_state(&self, inner: &mut EngineInner, state: EngineState) {
        if inner.state == state {
            return;
        }
        debug!(from = ?inner.state, to = ?state, "state transition");
        inner.state = state;
        self.events.state_changed(state);
    }

    fn cancel_advance(&self, inner: &mut EngineInner) {
        inner.advance_generation += 1;
        self.scheduler.cancel();
    }

    /// Load and start the item at `start`. Unplayable items are skipped
    /// silently in autopilot; in manual/off mode the engine settles into
    /// idle at the blocked position so the user sees what is stuck.
    fn load_and_start(&self, inner: &mut EngineInner, start: usize) {
        let Some(reciter) = inner.reciter.clone() else {
            return;
        };
        let mut idx = start;
        loop {
            if idx >= inner.queue.len() {
                self.complete(inner);
                return;
            }
            inner.index = idx;
            inner.handling_end = false;
            self.set_state(inner, EngineState::Loading);
            let path = resolve::resolve_for_play(self.cache.as_ref(), &reciter, &mut inner.queue[idx]);
            let outcome = match path {
                Some(path) => match inner.transport.as_ref() {
                    Some(transport) => transport.play(path).map_err(describe),
                    None => Err("no transport bound".to_string()),
                },
                None => Err("audio unavailable".to_string()),
            };
            match outcome {
                Ok(()) => {
                    let item = &inner.queue[idx];
                    let (item_id, current_repeat, total_repeats) =
                        (item.item_id.clone(), inner.current_repeat, item.total_repeats);
                    self.set_state(inner, EngineState::Playing);
                    self.events.item_changed(item_id, current_repeat, total_repeats);
                    self.activate_media_session(inner);
                    self.prefetch_next(inner, &reciter);
                    return;
                }
                Err(reason) => {
                    let item = &inner.queue[idx];
                    warn!(item = %item.item_id, reason = %reason, "item not playable");
                    self.events.load_warning(item.item_id.clone(), reason);
                    match inner.mode {
                        PlaybackMode::Autopilot => {
                            idx += 1;
                            inner.current_repeat = 0;
                        }
                        PlaybackMode::Manual | PlaybackMode::Off => {
                            self.set_state(inner, EngineState::Idle);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One natural completion of the current item has been detected.
    fn handle_track_end(&self, inner: &mut EngineInner) {
        inner.current_repeat += 1;
        let item = inner.queue[inner.index].clone();
        debug!(
            item = %item.item_id,
            repeat = inner.current_repeat,
            target = item.total_repeats,
            "track ended"
        );
        if inner.mode == PlaybackMode::Autopilot {
            self.events.count_incremented(item.group_id.clone());
        }
        let effective = inner.repeat_limit.effective(item.total_repeats);
        if inner.current_repeat < effective {
            self.replay_current(inner, &item);
            return;
        }
        if inner.index + 1 >= inner.queue.len() {
            self.complete(inner);
            return;
        }
        let duration_ms = item.audio.as_ref().map(|a| a.duration_ms).unwrap_or(0);
        let pause_ms = pause_for(duration_ms, &self.config.pause);
        self.set_state(inner, EngineState::Advancing);
        inner.advance_generation += 1;
        let generation = inner.advance_generation;
        let engine = self.clone();
        debug!(pause_ms, "scheduling advance");
        self.scheduler
            .schedule(pause_ms, Box::new(move || engine.advance_elapsed(generation)));
    }

    /// Replay the same file from position 0 without re-resolving it.
    fn replay_current(&self, inner: &mut EngineInner, item: &QueueItem) {
        self.set_state(inner, EngineState::Loading);
        let replay = match inner.transport.as_ref() {
            Some(transport) => transport.seek_ms(0).and_then(|_| transport.resume()),
            None => Err(TransportError::Offline),
        };
        match replay {
            Ok(()) => {
                inner.handling_end = false;
                self.set_state(inner, EngineState::Playing);
                self.events
                    .item_changed(item.item_id.clone(), inner.current_repeat, item.total_repeats);
            }
            Err(e) => {
                let reason = describe(e);
                warn!(item = %item.item_id, reason = %reason, "replay failed");
                self.events.load_warning(item.item_id.clone(), reason);
                match inner.mode {
                    PlaybackMode::Autopilot => {
                        inner.current_repeat = 0;
                        let next = inner.index + 1;
                        self.load_and_start(inner, next);
                    }
                    PlaybackMode::Manual | PlaybackMode::Off => {
                        self.set_state(inner, EngineState::Idle);
                    }
                }
            }
        }
    }

    /// The inter-item pause elapsed; commit the position change and
    /// either keep going (autopilot) or settle at the new item.
    fn advance_elapsed(&self, generation: u64) {
        let mut inner = self.inner.lock().unwrap();
        if inner.advance_generation != generation || inner.state != EngineState::Advancing {
            debug!("stale advance timer ignored");
            return;
        }
        inner.index += 1;
        inner.current_repeat = 0;
        inner.handling_end = false;
        let (index, total) = (inner.index, inner.queue.len());
        self.events.session_progress(index, total);
        if let Some(item) = inner.queue.get(index) {
            self.events.item_changed(item.item_id.clone(), 0, item.total_repeats);
        }
        match inner.mode {
            PlaybackMode::Autopilot => self.load_and_start(&mut inner, index),
            PlaybackMode::Manual | PlaybackMode::Off => {
                self.set_state(&mut inner, EngineState::Idle)
            }
        }
    }

    fn complete(&self, inner: &mut EngineInner) {
        if inner.state == EngineState::Completed {
            return;
        }
        self.cancel_advance(inner);
        inner.handling_end = false;
        let total = inner.queue.len();
        self.surface.release();
        self.events.session_progress(total, total);
        self.set_state(inner, EngineState::Completed);
    }

    fn activate_media_session(&self, inner: &EngineInner) {
        let (Some(resolver), Some(reciter)) = (inner.metadata.as_ref(), inner.reciter.as_ref())
        else {
            return;
        };
        let item = &inner.queue[inner.index];
        let metadata = resolver.resolve(&item.item_id, reciter);
        self.surface.activate(metadata, ControlPolicy::recitation());
    }

    fn prefetch_next(&self, inner: &mut EngineInner, reciter: &ReciterId) {
        let next = inner.index + 1;
        if let Some(item) = inner.queue.get_mut(next) {
            resolve::prefetch(self.cache.as_ref(), reciter, item);
        }
    }
}

fn describe(e: TransportError) -> String {
    match e {
        TransportError::Offline => "transport offline".to_string(),
        TransportError::Failed(reason) => format!("transport failed: {reason}"),
    }
}
