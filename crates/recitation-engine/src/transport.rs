//! Audio transport abstraction.
//!
//! Implementations forward playback commands to the host's audio stack;
//! the engine owns all transport mutations and observes progress through
//! status samples fed back via `RecitationEngine::on_status`.

use std::path::PathBuf;

use crossbeam_channel::Sender;

#[derive(Debug)]
pub enum TransportError {
    /// The transport handle is gone (worker exited, screen unmounted).
    Offline,
    /// The transport rejected or failed the command.
    Failed(String),
}

/// Playback command surface the engine drives.
pub trait AudioTransport: Send + Sync {
    /// Load the file and start playback from the beginning.
    fn play(&self, path: PathBuf) -> Result<(), TransportError>;
    fn pause(&self) -> Result<(), TransportError>;
    fn resume(&self) -> Result<(), TransportError>;
    /// Seek to an absolute position in the loaded file.
    fn seek_ms(&self, ms: u64) -> Result<(), TransportError>;
    fn stop(&self) -> Result<(), TransportError>;
}

/// Commands understood by channel-backed transport workers.
#[derive(Debug)]
pub enum TransportCommand {
    Play { path: PathBuf },
    Pause,
    Resume,
    Seek { ms: u64 },
    Stop,
    Quit,
}

/// Transport that dispatches commands to a worker thread over a channel.
#[derive(Clone)]
pub struct ChannelTransport {
    cmd_tx: Sender<TransportCommand>,
}

impl ChannelTransport {
    pub fn new(cmd_tx: Sender<TransportCommand>) -> Self {
        Self { cmd_tx }
    }
}

impl AudioTransport for ChannelTransport {
    fn play(&self, path: PathBuf) -> Result<(), TransportError> {
        self.cmd_tx
            .send(TransportCommand::Play { path })
            .map_err(|_| TransportError::Offline)
    }

    fn pause(&self) -> Result<(), TransportError> {
        self.cmd_tx
            .send(TransportCommand::Pause)
            .map_err(|_| TransportError::Offline)
    }

    fn resume(&self) -> Result<(), TransportError> {
        self.cmd_tx
            .send(TransportCommand::Resume)
            .map_err(|_| TransportError::Offline)
    }

    fn seek_ms(&self, ms: u64) -> Result<(), TransportError> {
        self.cmd_tx
            .send(TransportCommand::Seek { ms })
            .map_err(|_| TransportError::Offline)
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.cmd_tx
            .send(TransportCommand::Stop)
            .map_err(|_| TransportError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn channel_transport_forwards_commands() {
        let (tx, rx) = unbounded();
        let transport = ChannelTransport::new(tx);

        transport.play(PathBuf::from("/cache/a.mp3")).unwrap();
        transport.seek_ms(1500).unwrap();
        transport.pause().unwrap();

        assert!(matches!(rx.try_recv(), Ok(TransportCommand::Play { path }) if path == PathBuf::from("/cache/a.mp3")));
        assert!(matches!(rx.try_recv(), Ok(TransportCommand::Seek { ms: 1500 })));
        assert!(matches!(rx.try_recv(), Ok(TransportCommand::Pause)));
    }

    #[test]
    fn disconnected_worker_reports_offline() {
        let (tx, rx) = unbounded();
        drop(rx);
        let transport = ChannelTransport::new(tx);
        assert!(matches!(
            transport.play(PathBuf::from("/cache/a.mp3")),
            Err(TransportError::Offline)
        ));
    }
}
