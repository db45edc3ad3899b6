//! Session queue construction.
//!
//! Flattens ordered recitation entries plus a resolved manifest into a
//! linear sequence of playable items. No I/O happens here; local paths
//! are resolved lazily at playback time.

use std::path::{Path, PathBuf};

use recitation_types::{AudioFile, AudioManifest, EntryId, ItemId, SessionEntry, SessionKind};

/// Resolution state of an item's on-disk audio path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResolveState {
    #[default]
    Unresolved,
    Resolved(PathBuf),
}

impl ResolveState {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Unresolved => None,
            Self::Resolved(path) => Some(path),
        }
    }
}

/// One playable unit of the session queue.
///
/// Queue order is fixed once built; only `resolved` mutates afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueItem {
    /// Owning recitation entry (stable across repeats/rotation).
    pub group_id: EntryId,
    /// Audio content for this slot.
    pub item_id: ItemId,
    /// Consecutive plays that make up one logical count (>= 1).
    pub total_repeats: u32,
    /// Rotation width of the owning entry (1 for simple entries).
    pub rotation_slots: u32,
    /// Manifest reference; `None` when no audio exists for this slot.
    pub audio: Option<AudioFile>,
    /// Lazily resolved local path; repeat plays reuse it.
    pub resolved: ResolveState,
}

/// Flatten session entries into a linear queue.
///
/// Simple entries emit one item repeated `count` times; grouped entries
/// emit `ceil(count / items_per_round)` rounds of their rotation with
/// one play per slot, so the displayed text cycles deterministically.
pub fn build_queue(
    entries: &[SessionEntry],
    manifest: &AudioManifest,
    kind: SessionKind,
) -> Vec<QueueItem> {
    let mut ordered: Vec<&SessionEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.order);

    let mut queue = Vec::new();
    for entry in ordered {
        match entry.group.as_ref() {
            Some(group) => {
                let per_round = (group.items_per_round.max(1) as usize).min(group.sub_text_ids.len());
                if per_round == 0 {
                    continue;
                }
                let rounds = entry.count.max(1).div_ceil(per_round as u32);
                for _ in 0..rounds {
                    for item_id in group.sub_text_ids.iter().take(per_round) {
                        queue.push(QueueItem {
                            group_id: entry.id.clone(),
                            item_id: item_id.clone(),
                            total_repeats: 1,
                            rotation_slots: per_round as u32,
                            audio: manifest.get(item_id).cloned(),
                            resolved: ResolveState::Unresolved,
                        });
                    }
                }
            }
            None => {
                let binding = entry.audio.for_kind(kind);
                let item_id = binding
                    .cloned()
                    .unwrap_or_else(|| ItemId::new(entry.id.as_str()));
                queue.push(QueueItem {
                    group_id: entry.id.clone(),
                    item_id: item_id.clone(),
                    total_repeats: entry.count.max(1),
                    rotation_slots: 1,
                    audio: binding.and_then(|id| manifest.get(id)).cloned(),
                    resolved: ResolveState::Unresolved,
                });
            }
        }
    }
    queue
}
