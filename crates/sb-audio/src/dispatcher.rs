//! Best-effort sound dispatch over a ranked list of backends.

use std::time::Duration;

use crate::cpal_backend::CpalOutput;
use crate::system_player::{PlayerCommand, SystemPlayer};
use crate::traits::{AudioError, PlaybackBackend};

/// Attempts to bring up one backend.
pub type BackendProbe = Box<dyn FnOnce() -> Result<Box<dyn PlaybackBackend>, AudioError>>;

/// Shown by front ends when no backend could be started.
pub const SILENT_NOTICE: &str = "No audio output available; running as a visual-only metronome.";

/// Fire-and-forget playback. Call-time failures are logged and counted,
/// never returned.
pub struct Dispatcher {
    backend: Option<Box<dyn PlaybackBackend>>,
    failures: u64,
}

impl Dispatcher {
    /// Probe the built-in backends in priority order.
    ///
    /// Rank 2, playing straight from memory through an OS facility, has no
    /// backend in this build and is skipped.
    pub fn probe_default(players: &[PlayerCommand], grace: Duration) -> Self {
        let players = players.to_vec();
        let probes: Vec<BackendProbe> = vec![
            Box::new(|| CpalOutput::open().map(|o| Box::new(o) as Box<dyn PlaybackBackend>)),
            Box::new(move || {
                SystemPlayer::probe(&players, grace).map(|p| Box::new(p) as Box<dyn PlaybackBackend>)
            }),
        ];
        Self::from_probes(probes)
    }

    /// Keep the first probe that succeeds; fall back to silence.
    pub fn from_probes(probes: Vec<BackendProbe>) -> Self {
        for (rank, probe) in probes.into_iter().enumerate() {
            match probe() {
                Ok(backend) => {
                    log::info!("audio backend: {}", backend.name());
                    return Self::with_backend(backend);
                }
                Err(e) => log::debug!("audio backend #{} unavailable: {}", rank + 1, e),
            }
        }
        log::warn!("{}", SILENT_NOTICE);
        Self::silent()
    }

    pub fn with_backend(backend: Box<dyn PlaybackBackend>) -> Self {
        Self { backend: Some(backend), failures: 0 }
    }

    pub fn silent() -> Self {
        Self { backend: None, failures: 0 }
    }

    pub fn play(&mut self, wav: &[u8]) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if let Err(e) = backend.play(wav) {
            self.failures += 1;
            log::debug!("{} playback failed: {}", backend.name(), e);
        }
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    pub fn is_silent(&self) -> bool {
        self.backend.is_none()
    }

    pub fn notice(&self) -> Option<&'static str> {
        self.is_silent().then_some(SILENT_NOTICE)
    }

    /// Number of `play` calls whose backend reported an error.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
