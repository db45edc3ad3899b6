//! Lock-screen / media-session integration.
//!
//! The engine activates the host surface on every successful load and
//! releases it when nothing can play. Seeking within a recitation item
//! is not a meaningful user action, so seek affordances stay disabled.

use recitation_types::{ItemId, ReciterId, TrackMetadata};

/// Remote-control affordances exposed on the host media surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlPolicy {
    pub seek_forward: bool,
    pub seek_backward: bool,
}

impl ControlPolicy {
    /// Policy for recitation playback: repeats are engine-driven, so
    /// both seek directions are off.
    pub fn recitation() -> Self {
        Self {
            seek_forward: false,
            seek_backward: false,
        }
    }
}

/// Resolves human-readable metadata for the currently playing item.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, item: &ItemId, reciter: &ReciterId) -> TrackMetadata;
}

impl<F> MetadataResolver for F
where
    F: Fn(&ItemId, &ReciterId) -> TrackMetadata + Send + Sync,
{
    fn resolve(&self, item: &ItemId, reciter: &ReciterId) -> TrackMetadata {
        self(item, reciter)
    }
}

/// Host media-session surface (lock screen, notification controls).
pub trait MediaSessionSurface: Send + Sync {
    fn activate(&self, metadata: TrackMetadata, policy: ControlPolicy);
    fn release(&self);
}

/// No-op surface for hosts without lock-screen integration.
pub struct NullMediaSession;

impl MediaSessionSurface for NullMediaSession {
    fn activate(&self, _metadata: TrackMetadata, _policy: ControlPolicy) {}

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recitation_policy_disables_seeking() {
        let policy = ControlPolicy::recitation();
        assert!(!policy.seek_forward);
        assert!(!policy.seek_backward);
    }

    #[test]
    fn closures_act_as_resolvers() {
        let resolver = |item: &ItemId, reciter: &ReciterId| TrackMetadata {
            title: format!("Thikr {item}"),
            artist: reciter.as_str().to_string(),
        };
        let metadata = resolver.resolve(&ItemId::new("a1"), &ReciterId::new("r1"));
        assert_eq!(metadata.title, "Thikr a1");
        assert_eq!(metadata.artist, "r1");
    }
}
