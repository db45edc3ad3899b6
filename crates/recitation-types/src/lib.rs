use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of one audio clip within a reciter's manifest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a recitation entry in a session definition.
///
/// Stable across repeats and rotation; the visual counter is keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a reciter whose audio manifest is in use.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReciterId(pub String);

impl ReciterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReciterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which daily session a queue is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Morning,
    Evening,
}

/// One downloadable audio clip referenced from a manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    /// Download URL for the clip.
    pub url: String,
    /// Expected file size in bytes (verified by the cache layer).
    pub size_bytes: u64,
    /// Nominal clip duration in milliseconds.
    pub duration_ms: u64,
}

/// Per-reciter manifest mapping item ids to audio files.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AudioManifest {
    pub files: HashMap<ItemId, AudioFile>,
}

impl AudioManifest {
    pub fn get(&self, item: &ItemId) -> Option<&AudioFile> {
        self.files.get(item)
    }
}

/// Session-kind-aware audio binding for a simple entry.
///
/// The same logical entry can map to different clips in the morning and
/// evening sessions; either side may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioBinding {
    pub morning: Option<ItemId>,
    pub evening: Option<ItemId>,
}

impl AudioBinding {
    pub fn for_kind(&self, kind: SessionKind) -> Option<&ItemId> {
        match kind {
            SessionKind::Morning => self.morning.as_ref(),
            SessionKind::Evening => self.evening.as_ref(),
        }
    }
}

/// Fixed rotation of sub-texts for a grouped entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRotation {
    /// Sub-text audio ids in display order.
    pub sub_text_ids: Vec<ItemId>,
    /// How many sub-texts one round cycles through.
    pub items_per_round: u32,
}

/// One recitation entry in an ordered session definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: EntryId,
    /// Position within the session (entries are sorted by this).
    pub order: u32,
    /// Target recitation count for the entry.
    pub count: u32,
    /// Audio ids for simple entries.
    #[serde(default)]
    pub audio: AudioBinding,
    /// Rotation description; present for grouped entries.
    #[serde(default)]
    pub group: Option<GroupRotation>,
}

/// Playback philosophy governing what happens at item boundaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Natural completion repeats/advances on its own and drives the counter.
    Autopilot,
    /// Boundaries are reported; the user's taps drive the counter.
    Manual,
    #[default]
    Off,
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autopilot" => Ok(Self::Autopilot),
            "manual" => Ok(Self::Manual),
            "off" => Ok(Self::Off),
            other => Err(format!("unknown playback mode: {other}")),
        }
    }
}

/// Per-item cap on how many consecutive plays actually happen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatLimit {
    /// Play out each item's full repeat target.
    #[default]
    All,
    /// Cap each item at this many plays.
    Capped(u32),
}

impl RepeatLimit {
    /// Effective plays for an item with the given repeat target.
    pub fn effective(&self, total_repeats: u32) -> u32 {
        match self {
            Self::All => total_repeats,
            Self::Capped(cap) => (*cap).min(total_repeats).max(1),
        }
    }
}

impl FromStr for RepeatLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        s.parse::<u32>()
            .map(Self::Capped)
            .map_err(|_| format!("repeat limit must be 'all' or a positive integer, got: {s}"))
    }
}

/// One position/duration/playing sample reported by the audio transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSample {
    /// `true` while the transport is actively producing audio.
    pub playing: bool,
    /// Elapsed playback time in milliseconds, if known.
    pub elapsed_ms: Option<u64>,
    /// Total media duration in milliseconds, if known.
    pub duration_ms: Option<u64>,
}

/// Human-readable metadata for lock-screen / media-session surfaces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_limit_all_keeps_target() {
        assert_eq!(RepeatLimit::All.effective(5), 5);
    }

    #[test]
    fn repeat_limit_caps_target() {
        assert_eq!(RepeatLimit::Capped(2).effective(5), 2);
        assert_eq!(RepeatLimit::Capped(9).effective(5), 5);
    }

    #[test]
    fn repeat_limit_never_drops_below_one_play() {
        assert_eq!(RepeatLimit::Capped(0).effective(5), 1);
    }

    #[test]
    fn audio_binding_selects_by_session_kind() {
        let binding = AudioBinding {
            morning: Some(ItemId::new("m-1")),
            evening: None,
        };
        assert_eq!(
            binding.for_kind(SessionKind::Morning),
            Some(&ItemId::new("m-1"))
        );
        assert_eq!(binding.for_kind(SessionKind::Evening), None);
    }

    #[test]
    fn playback_mode_parses_known_names() {
        assert_eq!("autopilot".parse::<PlaybackMode>(), Ok(PlaybackMode::Autopilot));
        assert_eq!("manual".parse::<PlaybackMode>(), Ok(PlaybackMode::Manual));
        assert!("turbo".parse::<PlaybackMode>().is_err());
    }

    #[test]
    fn repeat_limit_parses_all_and_numbers() {
        assert_eq!("all".parse::<RepeatLimit>(), Ok(RepeatLimit::All));
        assert_eq!("3".parse::<RepeatLimit>(), Ok(RepeatLimit::Capped(3)));
        assert!("sometimes".parse::<RepeatLimit>().is_err());
    }
}
