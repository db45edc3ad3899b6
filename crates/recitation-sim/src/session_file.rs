//! Session definition files for the simulator.
//!
//! A session file describes the recitation entries, the reciter, and
//! the simulated clip catalog in one TOML document.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use recitation_types::{
    AudioBinding, AudioFile, AudioManifest, EntryId, GroupRotation, ItemId, ReciterId,
    SessionEntry,
};

#[derive(Debug, Deserialize)]
pub struct SessionFile {
    pub reciter: String,
    #[serde(default)]
    pub entries: Vec<EntryDef>,
    #[serde(default)]
    pub clips: Vec<ClipDef>,
}

#[derive(Debug, Deserialize)]
pub struct EntryDef {
    pub id: String,
    pub order: u32,
    pub count: u32,
    pub morning: Option<String>,
    pub evening: Option<String>,
    /// Sub-text clip ids; non-empty marks the entry as grouped.
    #[serde(default)]
    pub group: Vec<String>,
    pub items_per_round: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClipDef {
    pub item: String,
    pub duration_ms: u64,
    /// Present on the simulated device; `false` exercises the
    /// missing-audio paths.
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

pub struct LoadedSession {
    pub reciter: ReciterId,
    pub entries: Vec<SessionEntry>,
    pub manifest: AudioManifest,
    /// Clip ids present on the simulated device.
    pub available: Vec<ItemId>,
}

pub fn load(path: &Path) -> Result<LoadedSession> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read session file {}", path.display()))?;
    let file: SessionFile =
        toml::from_str(&raw).with_context(|| format!("parse session file {}", path.display()))?;
    Ok(convert(file))
}

fn convert(file: SessionFile) -> LoadedSession {
    let entries = file
        .entries
        .into_iter()
        .map(|def| {
            let group = (!def.group.is_empty()).then(|| GroupRotation {
                items_per_round: def.items_per_round.unwrap_or(def.group.len() as u32),
                sub_text_ids: def.group.into_iter().map(ItemId::new).collect(),
            });
            SessionEntry {
                id: EntryId::new(def.id),
                order: def.order,
                count: def.count,
                audio: AudioBinding {
                    morning: def.morning.map(ItemId::new),
                    evening: def.evening.map(ItemId::new),
                },
                group,
            }
        })
        .collect();

    let mut manifest = AudioManifest::default();
    let mut available = Vec::new();
    for clip in file.clips {
        let item = ItemId::new(clip.item);
        manifest.files.insert(
            item.clone(),
            AudioFile {
                url: format!("sim://{item}"),
                size_bytes: 0,
                duration_ms: clip.duration_ms,
            },
        );
        if clip.available {
            available.push(item);
        }
    }

    LoadedSession {
        reciter: ReciterId::new(file.reciter),
        entries,
        manifest,
        available,
    }
}
