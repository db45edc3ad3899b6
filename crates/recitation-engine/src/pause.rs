//! Inter-item pause selection.
//!
//! Short recitations need less catch-up time before the next item than
//! long ones; the pause is sized to the item that just finished.

use crate::config::PauseTiers;

/// Pick the pause (ms) to insert after an item of the given nominal
/// duration. Applied only between distinct queue items, never between
/// repeats of the same item.
pub fn pause_for(duration_ms: u64, tiers: &PauseTiers) -> u64 {
    if duration_ms < tiers.short_below_ms {
        tiers.short_pause_ms
    } else if duration_ms < tiers.long_below_ms {
        tiers.medium_pause_ms
    } else {
        tiers.long_pause_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_items_use_short_pause() {
        let tiers = PauseTiers::default();
        assert_eq!(pause_for(5_000, &tiers), tiers.short_pause_ms);
    }

    #[test]
    fn medium_items_use_medium_pause() {
        let tiers = PauseTiers::default();
        assert_eq!(pause_for(40_000, &tiers), tiers.medium_pause_ms);
    }

    #[test]
    fn long_items_use_long_pause() {
        let tiers = PauseTiers::default();
        assert_eq!(pause_for(200_000, &tiers), tiers.long_pause_ms);
    }

    #[test]
    fn thresholds_are_exclusive_below() {
        let tiers = PauseTiers::default();
        assert_eq!(pause_for(tiers.short_below_ms - 1, &tiers), tiers.short_pause_ms);
        assert_eq!(pause_for(tiers.short_below_ms, &tiers), tiers.medium_pause_ms);
        assert_eq!(pause_for(tiers.long_below_ms - 1, &tiers), tiers.medium_pause_ms);
        assert_eq!(pause_for(tiers.long_below_ms, &tiers), tiers.long_pause_ms);
    }

    #[test]
    fn unknown_duration_counts_as_short() {
        let tiers = PauseTiers::default();
        assert_eq!(pause_for(0, &tiers), tiers.short_pause_ms);
    }
}
