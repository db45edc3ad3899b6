//! Simulated playback worker.
//!
//! Stands in for a real decoder/output stack: a worker thread advances
//! a playback clock on a fixed tick and reports position samples to the
//! caller, which derives repeats and advancement from them exactly as
//! it would with live audio.

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use recitation_engine::TransportCommand;
use recitation_types::TransportSample;

const TICK_MS: u64 = 50;
const FALLBACK_DURATION_MS: u64 = 3_000;

/// Handle for sending playback commands to the simulated player thread.
pub struct SimPlayerHandle {
    pub cmd_tx: Sender<TransportCommand>,
    join: JoinHandle<()>,
}

impl SimPlayerHandle {
    pub fn shutdown(self) {
        let _ = self.cmd_tx.send(TransportCommand::Quit);
        let _ = self.join.join();
    }
}

struct Track {
    duration_ms: u64,
    elapsed_ms: f64,
    playing: bool,
}

/// Spawn the simulated player thread. `speed` scales the simulated
/// clock against wall time; `on_sample` receives one status sample per
/// tick while a clip is loaded.
pub fn spawn_sim_player<F>(
    durations: HashMap<PathBuf, u64>,
    speed: f64,
    on_sample: F,
) -> SimPlayerHandle
where
    F: Fn(TransportSample) + Send + 'static,
{
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    let speed = speed.max(0.01);
    let join = std::thread::spawn(move || player_thread_main(durations, speed, on_sample, cmd_rx));
    SimPlayerHandle { cmd_tx, join }
}

fn player_thread_main<F>(
    durations: HashMap<PathBuf, u64>,
    speed: f64,
    on_sample: F,
    cmd_rx: Receiver<TransportCommand>,
) where
    F: Fn(TransportSample) + Send + 'static,
{
    let mut current: Option<Track> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(TICK_MS)) {
            Ok(TransportCommand::Play { path }) => {
                let duration_ms = durations.get(&path).copied().unwrap_or_else(|| {
                    warn!(path = %path.display(), "unknown clip; using fallback duration");
                    FALLBACK_DURATION_MS
                });
                debug!(path = %path.display(), duration_ms, "sim play");
                current = Some(Track {
                    duration_ms,
                    elapsed_ms: 0.0,
                    playing: true,
                });
            }
            Ok(TransportCommand::Pause) => {
                if let Some(track) = current.as_mut() {
                    track.playing = false;
                }
            }
            Ok(TransportCommand::Resume) => {
                if let Some(track) = current.as_mut() {
                    track.playing = true;
                }
            }
            Ok(TransportCommand::Seek { ms }) => {
                if let Some(track) = current.as_mut() {
                    track.elapsed_ms = ms.min(track.duration_ms) as f64;
                }
            }
            Ok(TransportCommand::Stop) => {
                current = None;
            }
            Ok(TransportCommand::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(track) = current.as_mut() {
            if track.playing {
                track.elapsed_ms += TICK_MS as f64 * speed;
                if track.elapsed_ms >= track.duration_ms as f64 {
                    track.elapsed_ms = track.duration_ms as f64;
                    track.playing = false;
                }
            }
            on_sample(TransportSample {
                playing: track.playing,
                elapsed_ms: Some(track.elapsed_ms as u64),
                duration_ms: Some(track.duration_ms),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_player(
        durations: HashMap<PathBuf, u64>,
        speed: f64,
    ) -> (SimPlayerHandle, Receiver<TransportSample>) {
        let (sample_tx, sample_rx) = crossbeam_channel::unbounded();
        let handle = spawn_sim_player(durations, speed, move |sample| {
            let _ = sample_tx.send(sample);
        });
        (handle, sample_rx)
    }

    #[test]
    fn clock_runs_to_the_end_of_the_clip() {
        let durations = HashMap::from([(PathBuf::from("/sim/a.mp3"), 200)]);
        let (handle, sample_rx) = start_player(durations, 20.0);
        handle
            .cmd_tx
            .send(TransportCommand::Play {
                path: PathBuf::from("/sim/a.mp3"),
            })
            .unwrap();

        let mut ended = false;
        for _ in 0..50 {
            let sample = sample_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if !sample.playing && sample.elapsed_ms == Some(200) {
                assert_eq!(sample.duration_ms, Some(200));
                ended = true;
                break;
            }
        }
        assert!(ended, "clip never reached its end");
        handle.shutdown();
    }

    #[test]
    fn pause_freezes_the_clock_and_seek_moves_it() {
        let durations = HashMap::from([(PathBuf::from("/sim/a.mp3"), 60_000)]);
        let (handle, sample_rx) = start_player(durations, 1.0);
        handle
            .cmd_tx
            .send(TransportCommand::Play {
                path: PathBuf::from("/sim/a.mp3"),
            })
            .unwrap();
        handle.cmd_tx.send(TransportCommand::Pause).unwrap();

        let paused_at = loop {
            let sample = sample_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if !sample.playing {
                break sample.elapsed_ms;
            }
        };
        let next = sample_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(!next.playing);
        assert_eq!(next.elapsed_ms, paused_at);

        handle.cmd_tx.send(TransportCommand::Seek { ms: 5_000 }).unwrap();
        let moved = loop {
            let sample = sample_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            if sample.elapsed_ms == Some(5_000) {
                break sample;
            }
        };
        assert!(!moved.playing);
        handle.shutdown();
    }
}
