//! Captured Sample storage and the background capture worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use sb_audio::AudioError;

/// Error type for capture requests.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Another capture is still running
    #[error("a capture is already in progress")]
    Busy,
    /// The recording held no samples
    #[error("captured buffer is empty")]
    Empty,
    /// The input device failed
    #[error("capture device error: {0}")]
    Device(#[from] AudioError),
    /// The worker thread could not be started
    #[error("could not start capture worker: {0}")]
    Spawn(std::io::Error),
    /// The worker thread panicked before publishing
    #[error("capture worker panicked")]
    WorkerPanicked,
}

/// A finished recording, stored as a mono PCM16 WAV container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedSample {
    pub wav: Vec<u8>,
    pub sample_rate: u32,
}

impl CapturedSample {
    pub fn from_pcm(pcm: &[i16], sample_rate: u32) -> Result<Self, CaptureError> {
        if pcm.is_empty() {
            return Err(CaptureError::Empty);
        }
        Ok(Self {
            wav: sb_formats::samples_to_wav(pcm, sample_rate),
            sample_rate,
        })
    }
}

/// Single-writer slot holding the current Captured Sample.
///
/// Readers clone the `Arc`; a publish swaps the whole handle.
#[derive(Debug, Default)]
pub struct SampleSlot {
    current: Mutex<Option<Arc<CapturedSample>>>,
}

impl SampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<CapturedSample>> {
        self.lock().clone()
    }

    pub fn publish(&self, sample: CapturedSample) {
        *self.lock() = Some(Arc::new(sample));
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<CapturedSample>>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Serializes capture requests and publishes their results.
pub struct CaptureWorker {
    busy: Arc<AtomicBool>,
    slot: Arc<SampleSlot>,
}

/// Clears the busy flag when dropped, including during a panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CaptureWorker {
    pub fn new(slot: Arc<SampleSlot>) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            slot,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Result<BusyGuard, CaptureError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CaptureError::Busy)?;
        Ok(BusyGuard(self.busy.clone()))
    }

    /// Publish a buffer recorded elsewhere.
    pub fn submit(&self, pcm: &[i16], sample_rate: u32) -> Result<(), CaptureError> {
        let _guard = self.acquire()?;
        publish(&self.slot, pcm, sample_rate)
    }

    /// Run `record` on a worker thread and publish what it returns.
    pub fn start<F>(&self, record: F) -> Result<CaptureJob, CaptureError>
    where
        F: FnOnce() -> Result<(Vec<i16>, u32), AudioError> + Send + 'static,
    {
        let guard = self.acquire()?;
        let slot = self.slot.clone();
        let handle = thread::Builder::new()
            .name("sb-capture".into())
            .spawn(move || -> Result<(), CaptureError> {
                let _guard = guard;
                let (pcm, sample_rate) = record()?;
                publish(&slot, &pcm, sample_rate)
            })
            .map_err(CaptureError::Spawn)?;
        Ok(CaptureJob { handle })
    }
}

fn publish(slot: &SampleSlot, pcm: &[i16], sample_rate: u32) -> Result<(), CaptureError> {
    let sample = CapturedSample::from_pcm(pcm, sample_rate)?;
    log::info!("captured sample published: {} samples at {} Hz", pcm.len(), sample_rate);
    slot.publish(sample);
    Ok(())
}

/// Handle to a running capture.
pub struct CaptureJob {
    handle: JoinHandle<Result<(), CaptureError>>,
}

impl CaptureJob {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the capture has been published or has failed.
    pub fn wait(self) -> Result<(), CaptureError> {
        self.handle.join().map_err(|_| CaptureError::WorkerPanicked)?
    }
}
