//! Nearest-neighbour resampling.
//!
//! The output holds `len * ratio` samples, so pitch and duration move
//! together: at an unchanged sample rate a ratio of 2.0 lasts twice as long
//! and sounds an octave lower. Used both to pitch a captured sample and to
//! match an output device's sample rate.

use alloc::vec::Vec;

/// Largest accepted ratio. Higher ratios are clamped to it, which bounds the
/// output at sixteen times the input length.
pub const MAX_RESAMPLE_RATIO: f64 = 16.0;

/// Step through `samples` by `1 / ratio`, taking the sample at the floor of
/// the running index until it passes the end.
///
/// Non-positive or non-finite ratios step by 1.0 and return a copy. Ratios
/// above [`MAX_RESAMPLE_RATIO`] are clamped to it.
pub fn resample_nearest(samples: &[i16], ratio: f64) -> Vec<i16> {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio.min(MAX_RESAMPLE_RATIO)
    } else {
        1.0
    };
    let step = 1.0 / ratio;
    let n = samples.len();

    let expected = (n as f64 * ratio) as usize;
    let mut out = Vec::with_capacity(expected.saturating_add(1));
    let mut index = 0.0_f64;
    loop {
        let i = index as usize;
        if i >= n {
            break;
        }
        out.push(samples[i]);
        index += step;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<i16> {
        (0..n as i16).collect()
    }

    #[test]
    fn unit_ratio_is_identity() {
        let input = ramp(1000);
        assert_eq!(resample_nearest(&input, 1.0), input);
    }

    #[test]
    fn half_ratio_skips_every_other() {
        let out = resample_nearest(&ramp(10), 0.5);
        assert_eq!(out, [0, 2, 4, 6, 8]);
    }

    #[test]
    fn double_ratio_repeats_each_sample() {
        let out = resample_nearest(&ramp(3), 2.0);
        assert_eq!(out, [0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn output_length_scales_with_ratio() {
        let input = ramp(4410);
        for ratio in [0.25, 0.7, 1.3, 1.5, 3.0] {
            let expected = input.len() as f64 * ratio;
            let got = resample_nearest(&input, ratio).len() as f64;
            assert!((got - expected).abs() <= 1.5, "ratio {}: {} vs {}", ratio, got, expected);
        }
    }

    #[test]
    fn bad_ratios_copy_input() {
        let input = ramp(16);
        assert_eq!(resample_nearest(&input, 0.0), input);
        assert_eq!(resample_nearest(&input, -2.0), input);
        assert_eq!(resample_nearest(&input, f64::NAN), input);
    }

    #[test]
    fn huge_ratios_are_capped() {
        let input = ramp(4);
        let capped = resample_nearest(&input, MAX_RESAMPLE_RATIO);
        assert_eq!(capped.len(), 64);

        // "A99" over a 440 Hz reference
        assert_eq!(resample_nearest(&input, 4.0e28), capped);
        assert_eq!(resample_nearest(&input, f64::MAX), capped);
        assert_eq!(resample_nearest(&input, 65_536.0).len(), 64);
    }

    #[test]
    fn tiny_ratios_keep_the_first_sample() {
        assert_eq!(resample_nearest(&ramp(100), 1e-300), [0]);
    }

    #[test]
    fn empty_input() {
        assert!(resample_nearest(&[], 2.0).is_empty());
    }
}
