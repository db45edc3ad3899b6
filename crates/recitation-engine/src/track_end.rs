//! Natural end-of-track detection.
//!
//! The transport has no explicit finished signal; the engine derives it
//! from periodic status samples.

use recitation_types::TransportSample;

/// `true` when a sample indicates the track has played out: the
/// transport reports not-playing with the position within `tolerance_ms`
/// of the total duration.
pub fn is_track_end(sample: &TransportSample, tolerance_ms: u64) -> bool {
    if sample.playing {
        return false;
    }
    let (Some(elapsed), Some(duration)) = (sample.elapsed_ms, sample.duration_ms) else {
        return false;
    };
    duration > 0 && elapsed.saturating_add(tolerance_ms) >= duration
}
