//! `recitation-sim` — drive the sequencing engine against a simulated
//! player.
//!
//! Loads a session definition, builds the queue, and runs it end to end
//! with a clock-based stand-in for the real audio stack. Useful for
//! watching the engine's event stream and timing behavior at any speed.

mod session_file;
mod sim_player;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use recitation_engine::{
    AudioCache, ChannelTransport, EngineConfig, EngineEvent, EngineState, MetadataResolver,
    NullMediaSession, RecitationEngine, ThreadScheduler,
};
use recitation_types::{ItemId, PlaybackMode, ReciterId, RepeatLimit, SessionKind, TrackMetadata};

#[derive(Parser, Debug)]
#[command(name = "recitation-sim")]
struct Args {
    /// Session definition file (TOML)
    #[arg(long)]
    session: PathBuf,

    /// Optional engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Session to build: morning or evening
    #[arg(long, default_value = "morning")]
    kind: String,

    /// Playback mode: autopilot, manual, or off
    #[arg(long, default_value = "autopilot")]
    mode: PlaybackMode,

    /// Per-item repeat cap: "all" or a number
    #[arg(long, default_value = "all")]
    repeat_limit: RepeatLimit,

    /// Simulated clock multiplier (10 = ten times faster than wall time)
    #[arg(long, default_value_t = 10.0)]
    speed: f64,
}

/// Cache stand-in: clips marked available resolve instantly; everything
/// else misses, and the simulator has no network to download from.
struct SimCache {
    available: HashSet<ItemId>,
}

impl SimCache {
    fn path_for(item: &ItemId) -> PathBuf {
        PathBuf::from(format!("/sim/{item}.mp3"))
    }
}

impl AudioCache for SimCache {
    fn local_path(&self, _reciter: &ReciterId, item: &ItemId) -> Option<PathBuf> {
        self.available.contains(item).then(|| Self::path_for(item))
    }

    fn download(
        &self,
        _reciter: &ReciterId,
        item: &ItemId,
        _url: &str,
        _expected_size: u64,
    ) -> Option<PathBuf> {
        tracing::debug!(item = %item, "simulated download miss");
        None
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let kind = parse_kind(&args.kind)?;
    let session = session_file::load(&args.session)?;
    let config = match args.config.as_ref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let durations: HashMap<PathBuf, u64> = session
        .manifest
        .files
        .iter()
        .map(|(item, file)| (SimCache::path_for(item), file.duration_ms))
        .collect();
    let cache = Arc::new(SimCache {
        available: session.available.iter().cloned().collect(),
    });

    let engine = RecitationEngine::new(
        cache,
        Arc::new(ThreadScheduler::new()),
        Arc::new(NullMediaSession),
        config,
    );
    let resolver: Arc<dyn MetadataResolver> =
        Arc::new(|item: &ItemId, reciter: &ReciterId| TrackMetadata {
            title: format!("Thikr {item}"),
            artist: reciter.as_str().to_string(),
        });
    engine.set_metadata_resolver(resolver);
    engine.set_mode(args.mode);
    engine.set_repeat_limit(args.repeat_limit);

    let status_engine = engine.clone();
    let player = sim_player::spawn_sim_player(durations, args.speed, move |sample| {
        status_engine.on_status(sample)
    });
    engine.bind_transport(Arc::new(ChannelTransport::new(player.cmd_tx.clone())));

    spawn_event_logger(engine.clone(), args.mode);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("install ctrl-c handler")?;
    }

    tracing::info!(
        reciter = %session.reciter,
        entries = session.entries.len(),
        ?kind,
        mode = ?args.mode,
        "starting simulated session"
    );
    engine.build_queue(&session.entries, &session.manifest, session.reciter.clone(), kind);
    engine.play();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!("interrupted; stopping session");
            engine.stop();
            break;
        }
        match engine.state() {
            EngineState::Completed => {
                tracing::info!("session completed");
                break;
            }
            EngineState::Idle if engine.queue_len() == 0 => break,
            _ => {}
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    engine.release_transport();
    player.shutdown();
    Ok(())
}

fn parse_kind(raw: &str) -> Result<SessionKind> {
    match raw {
        "morning" => Ok(SessionKind::Morning),
        "evening" => Ok(SessionKind::Evening),
        other => anyhow::bail!("unknown session kind: {other}"),
    }
}

/// Log the engine event stream. Outside autopilot the simulator also
/// plays the reciter's part: it taps play whenever the engine settles
/// at the next item, and gives up if the same item blocks twice.
fn spawn_event_logger(engine: RecitationEngine, mode: PlaybackMode) {
    let mut rx = engine.subscribe();
    std::thread::spawn(move || {
        let mut last_idle_index: Option<usize> = None;
        loop {
            match rx.blocking_recv() {
                Ok(event) => {
                    log_event(&event);
                    if mode == PlaybackMode::Autopilot {
                        continue;
                    }
                    if let EngineEvent::StateChanged {
                        state: EngineState::Idle,
                    } = event
                    {
                        if engine.queue_len() == 0 {
                            continue;
                        }
                        let index = engine.current_index();
                        if last_idle_index == Some(index) {
                            tracing::warn!(index, "item is stuck; ending session");
                            engine.stop();
                            continue;
                        }
                        last_idle_index = Some(index);
                        std::thread::sleep(Duration::from_millis(200));
                        engine.play();
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::Position {
            elapsed_ms,
            duration_ms,
        } => tracing::trace!(elapsed_ms, ?duration_ms, "position"),
        EngineEvent::StateChanged { state } => tracing::info!(?state, "state changed"),
        EngineEvent::CountIncremented { group } => tracing::info!(group = %group, "count"),
        EngineEvent::ItemChanged {
            item,
            current_repeat,
            total_repeats,
        } => tracing::info!(item = %item, current_repeat, total_repeats, "item changed"),
        EngineEvent::SessionProgress { current, total } => {
            tracing::info!(current, total, "progress")
        }
        EngineEvent::LoadWarning { item, reason } => {
            tracing::warn!(item = %item, reason = %reason, "load warning")
        }
        EngineEvent::SessionCleared => tracing::info!("session cleared"),
    }
}
