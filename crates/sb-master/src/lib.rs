//! Headless controller for the staffbeat sequencer.
//!
//! Owns the grid, the lane map, the transport and the audio side, and
//! exposes the calls an editing front end needs. The host drives time by
//! calling [`Controller::pump`] from its own loop.

mod capture;
pub mod config;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sb_audio::Dispatcher;
use sb_engine::{lane_frequency, synthesize, Scheduler, SynthParams};

// Re-export common types so callers don't need the lower crates directly.
pub use capture::{CaptureError, CaptureJob, CaptureWorker, CapturedSample, SampleSlot};
pub use config::{load_config, save_config, EngineConfig};
pub use sb_audio::{AudioError, BackendProbe, PlaybackBackend, PlayerCommand, SILENT_NOTICE};
pub use sb_engine::{clamp_bpm, TransportState, Trigger, TriggerSource};
pub use sb_ir::{
    slot_of, Edit, Grid, GridCoord, GridError, LaneMap, LaneMapError, SymbolKind, Waveform, BARS,
    LANES, SUBDIVISIONS_PER_BAR, TOTAL_POSITIONS,
};

/// Length of a lane preview tone.
const PREVIEW_SECS: f32 = 0.4;
const PREVIEW_AMPLITUDE: f32 = 0.3;

/// Headless sequencer controller.
pub struct Controller {
    grid: Grid,
    lanes: LaneMap,
    bpm: f32,
    waveform: Waveform,
    scheduler: Scheduler,
    dispatcher: Dispatcher,
    samples: Arc<SampleSlot>,
    capture: CaptureWorker,
    config: EngineConfig,
    origin: Instant,
}

impl Controller {
    /// Build a controller and probe for an audio backend.
    pub fn new(config: EngineConfig) -> Self {
        let grace = Duration::from_secs(config.temp_file_grace_secs);
        let dispatcher = Dispatcher::probe_default(&config.players, grace);
        Self::with_dispatcher(config, dispatcher)
    }

    /// Build a controller around an existing dispatcher.
    pub fn with_dispatcher(config: EngineConfig, dispatcher: Dispatcher) -> Self {
        let samples = Arc::new(SampleSlot::new());
        let mut controller = Self {
            grid: Grid::new(),
            lanes: LaneMap::default(),
            bpm: clamp_bpm(config.bpm),
            waveform: Waveform::default(),
            scheduler: Scheduler::new(),
            dispatcher,
            capture: CaptureWorker::new(samples.clone()),
            samples,
            config,
            origin: Instant::now(),
        };
        controller.scheduler.set_accent_downbeats(controller.config.accent_downbeats);
        let waveform = controller.config.waveform.clone();
        controller.set_waveform(&waveform);
        let notes = controller.config.lane_notes.clone();
        let _ = controller.set_lane_map(&notes);
        controller
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Grid editing ---

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn place(&mut self, coord: GridCoord, kind: SymbolKind) -> Result<Option<SymbolKind>, GridError> {
        self.grid.place(coord, kind)
    }

    pub fn erase(&mut self, coord: GridCoord) -> Result<Option<SymbolKind>, GridError> {
        self.grid.erase(coord)
    }

    pub fn get(&self, coord: GridCoord) -> Result<Option<SymbolKind>, GridError> {
        self.grid.get(coord)
    }

    pub fn symbols_at(&self, bar: u8, subdivision: u8) -> Result<Vec<(u8, SymbolKind)>, GridError> {
        self.grid.symbols_at(bar, subdivision)
    }

    pub fn apply(&mut self, edit: &Edit) -> Result<Option<SymbolKind>, GridError> {
        self.grid.apply(edit)
    }

    // --- Sound settings ---

    pub fn lane_map(&self) -> &LaneMap {
        &self.lanes
    }

    /// Replace the lane map. A list of the wrong length leaves the current
    /// map in place.
    pub fn set_lane_map<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), LaneMapError> {
        match LaneMap::from_names(names) {
            Ok(lanes) => {
                self.lanes = lanes;
                Ok(())
            }
            Err(e) => {
                log::warn!("lane map rejected: {}", e);
                Err(e)
            }
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Set the tempo, clamped to the supported range. Takes effect from the
    /// next tick.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.bpm = clamp_bpm(bpm);
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, name: &str) {
        self.waveform = Waveform::from_name(name).unwrap_or_else(|| {
            log::warn!("unknown waveform {:?}, using sine", name);
            Waveform::Sine
        });
    }

    // --- Transport ---

    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    /// Start or resume with the first tick due at `now`.
    pub fn play_at(&mut self, now: Instant) {
        let now_ms = self.millis(now);
        self.scheduler.play(now_ms);
        log::debug!("transport: playing from {}", self.scheduler.position());
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
        log::debug!("transport: paused at {}", self.scheduler.position());
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
        log::debug!("transport: stopped");
    }

    pub fn seek(&mut self, pos: usize) {
        self.scheduler.seek(pos);
    }

    pub fn current_position(&self) -> usize {
        self.scheduler.position()
    }

    pub fn transport_state(&self) -> TransportState {
        self.scheduler.state()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// Ticks executed since construction.
    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    /// Run everything due at `now` and dispatch its sounds.
    ///
    /// Returns the triggers that fired, in dispatch order.
    pub fn pump(&mut self, now: Instant) -> Vec<Trigger> {
        let now_ms = self.millis(now);
        let triggers = self.scheduler.advance(now_ms, &self.grid, &self.lanes, self.bpm);
        for trigger in &triggers {
            let wav = self.render(trigger);
            self.dispatcher.play(&wav);
        }
        triggers
    }

    /// Time until `pump` next has work, or `None` when nothing is pending.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        let deadline = self.scheduler.next_deadline()?;
        Some(Duration::from_millis(deadline.saturating_sub(self.millis(now))))
    }

    fn millis(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_millis() as u64
    }

    fn render(&self, trigger: &Trigger) -> Vec<u8> {
        match (trigger.source, self.samples.current()) {
            (TriggerSource::Note { .. }, Some(sample)) => {
                let ratio = trigger.frequency as f64 / self.config.reference_hz as f64;
                sb_formats::resample_wav(&sample.wav, ratio).into_owned()
            }
            (TriggerSource::Note { .. }, None) => self.synth(
                self.waveform,
                trigger.frequency,
                trigger.seconds,
                self.config.amplitude,
            ),
            (TriggerSource::Accent, _) => self.synth(
                Waveform::Click,
                trigger.frequency,
                trigger.seconds,
                self.config.accent_amplitude,
            ),
        }
    }

    fn synth(&self, waveform: Waveform, frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<u8> {
        let params = SynthParams {
            waveform,
            frequency,
            duration_secs,
            sample_rate: self.config.sample_rate,
            amplitude,
        };
        sb_formats::samples_to_wav(&synthesize(&params), self.config.sample_rate)
    }

    // --- Previews ---

    /// Container for a short tone at `lane`'s pitch in the current waveform.
    pub fn render_preview(&self, lane: u8) -> Vec<u8> {
        let frequency = lane_frequency(lane as usize, &self.lanes);
        self.synth(self.waveform, frequency, PREVIEW_SECS, PREVIEW_AMPLITUDE)
    }

    /// Play a short tone at `lane`'s pitch.
    pub fn preview(&mut self, lane: u8) {
        let wav = self.render_preview(lane);
        self.dispatcher.play(&wav);
    }

    // --- Captured sample ---

    pub fn captured_sample(&self) -> Option<Arc<CapturedSample>> {
        self.samples.current()
    }

    /// Play the captured sample unpitched. Returns `false` if there is none.
    pub fn play_captured_sample(&mut self) -> bool {
        match self.samples.current() {
            Some(sample) => {
                self.dispatcher.play(&sample.wav);
                true
            }
            None => false,
        }
    }

    /// Go back to the synthesizer.
    pub fn clear_captured_sample(&mut self) {
        self.samples.clear();
    }

    /// Use a buffer recorded elsewhere as the captured sample.
    pub fn submit_captured_buffer(&mut self, pcm: &[i16], sample_rate: u32) -> Result<(), CaptureError> {
        self.capture.submit(pcm, sample_rate)
    }

    /// Record from the default microphone on a background thread.
    ///
    /// The duration is clamped to 100..=3000 ms. The result replaces the
    /// captured sample once the recording finishes.
    pub fn record_microphone(&mut self, duration: Duration) -> Result<CaptureJob, CaptureError> {
        let rate = self.config.capture_sample_rate;
        self.capture.start(move || sb_audio::record_mono(duration, rate))
    }

    pub fn capture_in_progress(&self) -> bool {
        self.capture.is_busy()
    }

    // --- Audio status ---

    /// Informational notice when no audio backend is available.
    pub fn audio_notice(&self) -> Option<&'static str> {
        self.dispatcher.notice()
    }

    pub fn audio_backend(&self) -> Option<&str> {
        self.dispatcher.backend_name()
    }

    /// Dispatches whose backend reported an error.
    pub fn dispatch_failures(&self) -> u64 {
        self.dispatcher.failures()
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
