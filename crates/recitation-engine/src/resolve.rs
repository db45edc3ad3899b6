//! On-disk audio resolution.
//!
//! Cache lookups are cheap and never touch the network; downloads are
//! a single blocking attempt and happen only for the item about to play.

use std::path::PathBuf;

use recitation_types::{ItemId, ReciterId};
use tracing::debug;

use crate::queue::{QueueItem, ResolveState};

/// Host-supplied download/cache manager for recitation audio.
pub trait AudioCache: Send + Sync {
    /// Cache lookup only; must not touch the network.
    fn local_path(&self, reciter: &ReciterId, item: &ItemId) -> Option<PathBuf>;

    /// Blocking fetch-and-cache. One attempt; `None` on failure.
    fn download(
        &self,
        reciter: &ReciterId,
        item: &ItemId,
        url: &str,
        expected_size: u64,
    ) -> Option<PathBuf>;
}

/// Resolve the local path for an item that is about to play, downloading
/// on a cache miss. The result is written back so repeats skip this.
pub(crate) fn resolve_for_play(
    cache: &dyn AudioCache,
    reciter: &ReciterId,
    item: &mut QueueItem,
) -> Option<PathBuf> {
    if let ResolveState::Resolved(path) = &item.resolved {
        return Some(path.clone());
    }
    let audio = item.audio.as_ref()?;
    let path = cache.local_path(reciter, &item.item_id).or_else(|| {
        debug!(item = %item.item_id, "cache miss; requesting download");
        cache.download(reciter, &item.item_id, &audio.url, audio.size_bytes)
    });
    if let Some(path) = path.as_ref() {
        item.resolved = ResolveState::Resolved(path.clone());
    }
    path
}

/// Speculative one-item lookahead. Cache lookup only; never downloads,
/// so it cannot stall the caller.
pub(crate) fn prefetch(cache: &dyn AudioCache, reciter: &ReciterId, item: &mut QueueItem) {
    if matches!(item.resolved, ResolveState::Resolved(_)) || item.audio.is_none() {
        return;
    }
    if let Some(path) = cache.local_path(reciter, &item.item_id) {
        item.resolved = ResolveState::Resolved(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recitation_types::AudioFile;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCache {
        cached: HashMap<ItemId, PathBuf>,
        downloadable: HashMap<ItemId, PathBuf>,
        lookups: Mutex<Vec<ItemId>>,
        downloads: Mutex<Vec<ItemId>>,
    }

    impl AudioCache for RecordingCache {
        fn local_path(&self, _reciter: &ReciterId, item: &ItemId) -> Option<PathBuf> {
            self.lookups.lock().unwrap().push(item.clone());
            self.cached.get(item).cloned()
        }

        fn download(
            &self,
            _reciter: &ReciterId,
            item: &ItemId,
            _url: &str,
            _expected_size: u64,
        ) -> Option<PathBuf> {
            self.downloads.lock().unwrap().push(item.clone());
            self.downloadable.get(item).cloned()
        }
    }

    fn item(id: &str, with_audio: bool) -> QueueItem {
        QueueItem {
            group_id: recitation_types::EntryId::new("e1"),
            item_id: ItemId::new(id),
            total_repeats: 1,
            rotation_slots: 1,
            audio: with_audio.then(|| AudioFile {
                url: format!("https://cdn/{id}.mp3"),
                size_bytes: 1024,
                duration_ms: 10_000,
            }),
            resolved: ResolveState::Unresolved,
        }
    }

    #[test]
    fn play_resolution_prefers_cache_over_download() {
        let mut cache = RecordingCache::default();
        cache.cached.insert(ItemId::new("a"), PathBuf::from("/cache/a.mp3"));
        let reciter = ReciterId::new("r1");
        let mut queue_item = item("a", true);

        let path = resolve_for_play(&cache, &reciter, &mut queue_item);

        assert_eq!(path, Some(PathBuf::from("/cache/a.mp3")));
        assert!(cache.downloads.lock().unwrap().is_empty());
        assert_eq!(queue_item.resolved.path(), Some(PathBuf::from("/cache/a.mp3").as_path()));
    }

    #[test]
    fn play_resolution_downloads_on_miss() {
        let mut cache = RecordingCache::default();
        cache
            .downloadable
            .insert(ItemId::new("a"), PathBuf::from("/cache/a.mp3"));
        let reciter = ReciterId::new("r1");
        let mut queue_item = item("a", true);

        let path = resolve_for_play(&cache, &reciter, &mut queue_item);

        assert_eq!(path, Some(PathBuf::from("/cache/a.mp3")));
        assert_eq!(cache.downloads.lock().unwrap().len(), 1);
    }

    #[test]
    fn resolved_items_skip_further_lookups() {
        let cache = RecordingCache::default();
        let reciter = ReciterId::new("r1");
        let mut queue_item = item("a", true);
        queue_item.resolved = ResolveState::Resolved(PathBuf::from("/cache/a.mp3"));

        let path = resolve_for_play(&cache, &reciter, &mut queue_item);

        assert_eq!(path, Some(PathBuf::from("/cache/a.mp3")));
        assert!(cache.lookups.lock().unwrap().is_empty());
    }

    #[test]
    fn items_without_audio_resolve_to_none() {
        let cache = RecordingCache::default();
        let reciter = ReciterId::new("r1");
        let mut queue_item = item("a", false);
        assert_eq!(resolve_for_play(&cache, &reciter, &mut queue_item), None);
        assert!(cache.lookups.lock().unwrap().is_empty());
    }

    #[test]
    fn prefetch_never_downloads() {
        let mut cache = RecordingCache::default();
        cache
            .downloadable
            .insert(ItemId::new("a"), PathBuf::from("/cache/a.mp3"));
        let reciter = ReciterId::new("r1");
        let mut queue_item = item("a", true);

        prefetch(&cache, &reciter, &mut queue_item);

        assert!(cache.downloads.lock().unwrap().is_empty());
        assert_eq!(queue_item.resolved, ResolveState::Unresolved);
    }

    #[test]
    fn prefetch_records_cache_hits() {
        let mut cache = RecordingCache::default();
        cache.cached.insert(ItemId::new("a"), PathBuf::from("/cache/a.mp3"));
        let reciter = ReciterId::new("r1");
        let mut queue_item = item("a", true);

        prefetch(&cache, &reciter, &mut queue_item);

        assert_eq!(queue_item.resolved, ResolveState::Resolved(PathBuf::from("/cache/a.mp3")));
    }
}
