//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::traits::{AudioError, PlaybackBackend};

/// Voices waiting to be picked up by the device callback.
const VOICE_QUEUE_LEN: usize = 32;
/// Voices the callback mixes at once.
const MAX_VOICES: usize = 16;

type ActiveVoices = heapless::Vec<Voice, MAX_VOICES>;

/// One dispatched sound, already at the device rate.
struct Voice {
    samples: Vec<f32>,
    cursor: usize,
}

impl Voice {
    fn from_wav(wav: &[u8], device_rate: u32) -> Result<Self, AudioError> {
        let decoded = sb_formats::unwrap_wav(wav)?;
        let mut samples = decoded.samples();
        if decoded.sample_rate != device_rate && decoded.sample_rate > 0 {
            let ratio = device_rate as f64 / decoded.sample_rate as f64;
            samples = sb_engine::resample_nearest(&samples, ratio);
        }
        Ok(Self {
            samples: samples.iter().map(|&s| s as f32 / 32768.0).collect(),
            cursor: 0,
        })
    }

    fn next_sample(&mut self) -> f32 {
        match self.samples.get(self.cursor) {
            Some(&s) => {
                self.cursor += 1;
                s
            }
            None => 0.0,
        }
    }

    fn is_done(&self) -> bool {
        self.cursor >= self.samples.len()
    }
}

/// Producer half of a voice channel, owned by the thread that plays sounds.
///
/// Voices travel to the [`VoiceMixer`] through one ring and come back through
/// another once finished, so their buffers are freed here rather than on the
/// audio thread.
pub struct VoiceQueue {
    device_rate: u32,
    outgoing: HeapProd<Voice>,
    retired: HeapCons<Voice>,
}

/// Consumer half of a voice channel. Runs inside the device callback and
/// never allocates or frees.
pub struct VoiceMixer {
    incoming: HeapCons<Voice>,
    retired: HeapProd<Voice>,
    active: ActiveVoices,
}

/// Create a linked queue and mixer for a device running at `device_rate`.
pub fn voice_channel(device_rate: u32) -> (VoiceQueue, VoiceMixer) {
    let (outgoing, incoming) = HeapRb::<Voice>::new(VOICE_QUEUE_LEN).split();
    // Every voice in flight fits, so retiring never has to wait
    let (retired_tx, retired_rx) = HeapRb::<Voice>::new(VOICE_QUEUE_LEN + MAX_VOICES).split();
    (
        VoiceQueue { device_rate, outgoing, retired: retired_rx },
        VoiceMixer { incoming, retired: retired_tx, active: ActiveVoices::new() },
    )
}

impl VoiceQueue {
    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }

    /// Decode a container and queue it for mixing. Empty sounds are dropped.
    pub fn queue_wav(&mut self, wav: &[u8]) -> Result<(), AudioError> {
        self.reclaim();
        let voice = Voice::from_wav(wav, self.device_rate)?;
        if voice.is_done() {
            return Ok(());
        }
        self.outgoing
            .try_push(voice)
            .map_err(|_| AudioError::Playback("voice queue full".to_string()))
    }

    /// Free voices the mixer has finished with. Returns how many there were.
    pub fn reclaim(&mut self) -> usize {
        self.retired.pop_iter().count()
    }
}

impl VoiceMixer {
    /// Fill an interleaved buffer with the sum of all active voices.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        while !self.active.is_full() {
            match self.incoming.try_pop() {
                Some(voice) => {
                    let _ = self.active.push(voice);
                }
                None => break,
            }
        }
        mix_into(&mut self.active, data, channels);
        retire_finished(&mut self.active, &mut self.retired);
    }

    pub fn active_voices(&self) -> usize {
        self.active.len()
    }
}

/// In-process playback through the default output device.
///
/// Each `play` decodes the container on the caller's thread and queues it as
/// a voice; the device callback sums every active voice.
pub struct CpalOutput {
    _stream: Stream,
    queue: VoiceQueue,
}

impl CpalOutput {
    /// Open the default output device and start a silent stream.
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Mono voices are copied to both channels of a stereo stream
        config.channels = 2;

        let (queue, mixer) = voice_channel(config.sample_rate.0);
        let stream = build_stream(&device, &config, mixer)?;

        Ok(Self { _stream: stream, queue })
    }

    pub fn sample_rate(&self) -> u32 {
        self.queue.device_rate()
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    mut mixer: VoiceMixer,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                mixer.render(data, channels);
            },
            |err| log::warn!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

    stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
    Ok(stream)
}

/// Sum the active voices into an interleaved buffer.
fn mix_into(active: &mut ActiveVoices, data: &mut [f32], channels: usize) {
    for chunk in data.chunks_mut(channels.max(1)) {
        let mut mixed = 0.0f32;
        for voice in active.iter_mut() {
            mixed += voice.next_sample();
        }
        let mixed = mixed.clamp(-1.0, 1.0);
        for sample in chunk.iter_mut() {
            *sample = mixed;
        }
    }
}

/// Move finished voices into the return ring. A voice that does not fit
/// stays active and is retried on the next callback.
fn retire_finished(active: &mut ActiveVoices, retired: &mut HeapProd<Voice>) {
    let mut i = 0;
    while i < active.len() {
        if !active[i].is_done() {
            i += 1;
            continue;
        }
        let voice = active.swap_remove(i);
        if let Err(voice) = retired.try_push(voice) {
            let _ = active.push(voice);
            break;
        }
    }
}

impl PlaybackBackend for CpalOutput {
    fn name(&self) -> &str {
        "cpal"
    }

    fn play(&mut self, wav: &[u8]) -> Result<(), AudioError> {
        self.queue.queue_wav(wav)
    }
}
