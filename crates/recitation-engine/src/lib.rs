//! Guided-recitation audio sequencing engine.
//!
//! Drives synchronized playback through an ordered queue of recitation
//! items: repeats each item to its target count, inserts calibrated
//! pauses between items, recovers from missing audio, and publishes
//! engine events to observers. Audio output, on-disk caching, and
//! lock-screen surfaces are collaborator traits supplied by the host.

pub mod config;
pub mod engine;
pub mod events;
pub mod media_session;
pub mod pause;
pub mod queue;
pub mod resolve;
pub mod timer;
pub mod track_end;
pub mod transport;

pub use config::{EngineConfig, PauseTiers};
pub use engine::{EngineState, RecitationEngine, SessionSnapshot};
pub use events::{EngineEvent, EventBus};
pub use media_session::{ControlPolicy, MediaSessionSurface, MetadataResolver, NullMediaSession};
pub use queue::{QueueItem, ResolveState};
pub use resolve::AudioCache;
pub use timer::{AdvanceScheduler, ThreadScheduler};
pub use transport::{AudioTransport, ChannelTransport, TransportCommand, TransportError};
