//! Engine configuration and YAML persistence.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sb_audio::PlayerCommand;
use sb_ir::DEFAULT_LANE_NOTES;
use serde::{Deserialize, Serialize};

/// Tunables the controller reads at construction.
///
/// Every field has a default, so a partial YAML file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tempo in beats per minute (clamped to 40..=208 when applied)
    pub bpm: f32,
    /// Synthesizer waveform name; unknown names fall back to sine
    pub waveform: String,
    /// One note name per lane, lowest lane first
    pub lane_notes: Vec<String>,
    /// Sample rate of synthesized sounds
    pub sample_rate: u32,
    /// Peak amplitude of synthesized notes (0.0..=1.0)
    pub amplitude: f32,
    /// Click on empty bar starts
    pub accent_downbeats: bool,
    pub accent_amplitude: f32,
    /// Pitch a captured sample is assumed to have
    pub reference_hz: f32,
    /// Rate requested from the microphone
    pub capture_sample_rate: u32,
    /// External players, probed in order
    pub players: Vec<PlayerCommand>,
    /// Seconds before a player's temporary file is deleted
    pub temp_file_grace_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: 100.0,
            waveform: "sine".to_string(),
            lane_notes: DEFAULT_LANE_NOTES.iter().map(|n| n.to_string()).collect(),
            sample_rate: 44_100,
            amplitude: 0.28,
            accent_downbeats: true,
            accent_amplitude: 0.6,
            reference_hz: 440.0,
            capture_sample_rate: 44_100,
            players: PlayerCommand::defaults(),
            temp_file_grace_secs: 5,
        }
    }
}

/// Read the engine config at `path`.
///
/// Falls back to the defaults when the file cannot be read or parsed.
pub fn load_config(path: &Path) -> EngineConfig {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("no config at {}, starting with defaults", path.display());
            return EngineConfig::default();
        }
        Err(e) => {
            log::warn!("cannot read {} ({}), starting with defaults", path.display(), e);
            return EngineConfig::default();
        }
    };

    match serde_yaml::from_str::<EngineConfig>(&contents) {
        Ok(config) => {
            log::info!(
                "config {}: {} BPM, {} wave, lanes {}",
                path.display(),
                config.bpm,
                config.waveform,
                config.lane_notes.join("/")
            );
            config
        }
        Err(e) => {
            log::warn!("ignoring {}: {}", path.display(), e);
            EngineConfig::default()
        }
    }
}

/// Write `config` to `path` as YAML, creating missing directories.
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let yaml = serde_yaml::to_string(config).context("encoding engine config")?;
    fs::write(path, yaml).with_context(|| format!("writing {}", path.display()))?;
    log::debug!("config written to {}", path.display());
    Ok(())
}
