//! Blocking microphone capture.

use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};

use crate::traits::AudioError;

pub const MIN_CAPTURE: Duration = Duration::from_millis(100);
pub const MAX_CAPTURE: Duration = Duration::from_millis(3000);

/// Extra wait for a device that delivers late before giving up.
const CAPTURE_SLACK: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn clamp_capture_duration(duration: Duration) -> Duration {
    duration.clamp(MIN_CAPTURE, MAX_CAPTURE)
}

/// Record `duration` of audio from the default input device.
///
/// Only the first channel is kept. The device runs at `preferred_rate` when
/// it supports it, otherwise at its default rate; the rate actually used is
/// returned with the samples. Blocks for the whole recording.
pub fn record_mono(duration: Duration, preferred_rate: u32) -> Result<(Vec<i16>, u32), AudioError> {
    let duration = clamp_capture_duration(duration);

    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(AudioError::NoDevice)?;
    let (config, format) = input_config(&device, preferred_rate)?;
    let sample_rate = config.sample_rate.0;

    let wanted = (sample_rate as u128 * duration.as_millis() / 1000) as usize;
    let rb = HeapRb::<i16>::new(wanted.max(1));
    let (producer, mut consumer) = rb.split();

    let stream = match format {
        SampleFormat::F32 => build_input::<f32>(&device, &config, producer)?,
        SampleFormat::I16 => build_input::<i16>(&device, &config, producer)?,
        SampleFormat::U16 => build_input::<u16>(&device, &config, producer)?,
        other => {
            return Err(AudioError::DeviceInit(format!("unsupported sample format {:?}", other)))
        }
    };
    stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;

    let mut samples = Vec::with_capacity(wanted);
    let deadline = Instant::now() + duration + CAPTURE_SLACK;
    while samples.len() < wanted && Instant::now() < deadline {
        samples.extend(consumer.pop_iter());
        thread::sleep(POLL_INTERVAL);
    }
    drop(stream);
    samples.extend(consumer.pop_iter());
    samples.truncate(wanted);

    log::debug!("captured {} samples at {} Hz", samples.len(), sample_rate);
    Ok((samples, sample_rate))
}

fn input_config(device: &Device, preferred_rate: u32) -> Result<(StreamConfig, SampleFormat), AudioError> {
    let preferred = device
        .supported_input_configs()
        .map_err(|e| AudioError::DeviceInit(e.to_string()))?
        .find(|range| {
            range.min_sample_rate().0 <= preferred_rate && preferred_rate <= range.max_sample_rate().0
        })
        .map(|range| range.with_sample_rate(SampleRate(preferred_rate)));

    let supported = match preferred {
        Some(config) => config,
        None => device
            .default_input_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?,
    };
    let format = supported.sample_format();
    Ok((supported.into(), format))
}

fn build_input<T>(
    device: &Device,
    config: &StreamConfig,
    mut producer: HeapProd<i16>,
) -> Result<Stream, AudioError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    // Full buffer means the recording is complete
                    let _ = producer.try_push(<i16 as Sample>::from_sample(frame[0]));
                }
            },
            |err| log::warn!("capture stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))
}
