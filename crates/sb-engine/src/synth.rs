//! Waveform synthesis into mono PCM16.
//!
//! Tones are computed per sample from absolute time rather than a running
//! phase, so every buffer starts at phase zero. Pitched shapes get a short
//! linear attack/release envelope; the click shape is a noise burst with
//! its own exponential decay.

use alloc::vec::Vec;
use core::f64::consts::TAU;

use sb_ir::Waveform;

/// Sample rate used when the host has no preference.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

const ATTACK_SECS: f64 = 0.005;
const RELEASE_SECS: f64 = 0.02;
/// Decay constant for the click envelope `exp(-k * i / n)`.
const CLICK_DECAY: f64 = 6.0;

/// Everything needed to render one buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthParams {
    pub waveform: Waveform,
    pub frequency: f32,
    pub duration_secs: f32,
    pub sample_rate: u32,
    pub amplitude: f32,
}

impl SynthParams {
    /// Number of samples the buffer will hold. Never zero.
    pub fn sample_count(&self) -> usize {
        let secs = self.duration_secs as f64;
        if !secs.is_finite() || secs <= 0.0 {
            return 1;
        }
        ((secs * self.sample_rate.max(1) as f64) as usize).max(1)
    }
}

/// Render a buffer, drawing click noise from a fresh generator.
#[cfg(feature = "std")]
pub fn synthesize(params: &SynthParams) -> Vec<i16> {
    synthesize_with_rng(params, &mut fastrand::Rng::new())
}

/// Render a buffer with an explicit noise source.
pub fn synthesize_with_rng(params: &SynthParams, rng: &mut fastrand::Rng) -> Vec<i16> {
    let n = params.sample_count();
    let amplitude = params.amplitude as f64;

    if params.waveform == Waveform::Click {
        return (0..n)
            .map(|i| {
                let env = libm::exp(-CLICK_DECAY * i as f64 / n as f64);
                let noise = rng.f64() * 2.0 - 1.0;
                quantize(noise * env * amplitude)
            })
            .collect();
    }

    let sample_rate = params.sample_rate.max(1) as f64;
    let freq = params.frequency as f64;
    let envelope = Envelope::new(n, sample_rate);

    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let value = oscillator(params.waveform, freq, t);
            quantize(value * envelope.gain(i) * amplitude)
        })
        .collect()
}

fn oscillator(waveform: Waveform, freq: f64, t: f64) -> f64 {
    match waveform {
        Waveform::Sine => libm::sin(TAU * freq * t),
        Waveform::Square => {
            if libm::sin(TAU * freq * t) >= 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Saw => saw(freq, t),
        Waveform::Triangle => 2.0 * libm::fabs(saw(freq, t)) - 1.0,
        Waveform::Click => 0.0,
    }
}

fn saw(freq: f64, t: f64) -> f64 {
    let cycles = freq * t;
    2.0 * (cycles - libm::floor(cycles)) - 1.0
}

/// Clamp to [-1, 1] and truncate to signed 16-bit.
fn quantize(value: f64) -> i16 {
    let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
    (value * 32767.0) as i16
}

/// Linear attack/release ramps measured in samples.
struct Envelope {
    len: usize,
    attack: usize,
    release: usize,
}

impl Envelope {
    fn new(len: usize, sample_rate: f64) -> Self {
        let mut attack = (ATTACK_SECS * sample_rate) as usize;
        let mut release = (RELEASE_SECS * sample_rate) as usize;
        // Short buffers share their length between the ramps in proportion.
        if attack + release > len {
            let total = attack + release;
            attack = attack * len / total;
            release = len - attack;
        }
        Self { len, attack, release }
    }

    fn gain(&self, i: usize) -> f64 {
        let mut gain = 1.0;
        if i < self.attack {
            gain = i as f64 / self.attack as f64;
        }
        let remaining = self.len - i;
        if remaining <= self.release {
            gain = f64::min(gain, remaining as f64 / self.release as f64);
        }
        gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(waveform: Waveform, frequency: f32, duration_secs: f32) -> SynthParams {
        SynthParams {
            waveform,
            frequency,
            duration_secs,
            sample_rate: DEFAULT_SAMPLE_RATE,
            amplitude: 0.5,
        }
    }

    fn render(p: &SynthParams) -> Vec<i16> {
        synthesize_with_rng(p, &mut fastrand::Rng::with_seed(1))
    }

    #[cfg(feature = "std")]
    #[test]
    fn fresh_generator_renders_the_same_length() {
        let p = params(Waveform::Click, 440.0, 0.06);
        assert_eq!(synthesize(&p).len(), render(&p).len());
    }

    #[test]
    fn length_follows_duration() {
        let pcm = render(&params(Waveform::Sine, 440.0, 0.5));
        assert_eq!(pcm.len(), 22_050);
    }

    #[test]
    fn degenerate_durations_give_one_sample() {
        for secs in [0.0, -1.0, f32::NAN, 1e-9] {
            let pcm = render(&params(Waveform::Saw, 440.0, secs));
            assert_eq!(pcm.len(), 1, "duration {}", secs);
        }
    }

    #[test]
    fn amplitude_is_respected_and_clamped() {
        let quiet = render(&params(Waveform::Square, 220.0, 0.2));
        let peak = quiet.iter().map(|s| s.saturating_abs()).max().unwrap();
        assert!(peak <= (0.5 * 32767.0) as i16 + 1);
        assert!(peak >= (0.5 * 32767.0) as i16 - 1);

        let loud = render(&SynthParams { amplitude: 4.0, ..params(Waveform::Square, 220.0, 0.2) });
        let peak = loud.iter().map(|s| s.saturating_abs()).max().unwrap();
        assert_eq!(peak, 32767);
    }

    #[test]
    fn envelope_starts_and_ends_silent() {
        let pcm = render(&params(Waveform::Square, 440.0, 0.3));
        assert_eq!(pcm[0], 0);
        assert!(pcm.last().unwrap().saturating_abs() < 200);
        // Mid-buffer square runs at full gain.
        assert_eq!(pcm[pcm.len() / 2].saturating_abs(), (0.5 * 32767.0) as i16);
    }

    #[test]
    fn envelope_fits_short_buffers() {
        let env = Envelope::new(100, 44_100.0);
        assert!(env.attack + env.release <= 100);
        assert_eq!(env.gain(0), 0.0);
        assert!(env.gain(99) > 0.0);
    }

    #[test]
    fn saw_and_triangle_shapes() {
        assert_eq!(saw(1.0, 0.0), -1.0);
        assert!((saw(1.0, 0.5) - 0.0).abs() < 1e-12);
        assert_eq!(oscillator(Waveform::Triangle, 1.0, 0.0), 1.0);
        assert!((oscillator(Waveform::Triangle, 1.0, 0.25) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn click_ignores_frequency_and_decays() {
        let p = params(Waveform::Click, 100.0, 0.1);
        let a = synthesize_with_rng(&p, &mut fastrand::Rng::with_seed(7));
        let b = synthesize_with_rng(&SynthParams { frequency: 9000.0, ..p }, &mut fastrand::Rng::with_seed(7));
        assert_eq!(a, b);

        let energy = |s: &[i16]| s.iter().map(|v| (*v as i64).abs()).sum::<i64>();
        let quarter = a.len() / 4;
        assert!(energy(&a[..quarter]) > energy(&a[a.len() - quarter..]) * 4);
    }
}
