//! Channel mixing and sample-rate conversion.
//!
//! Captured audio is normalised to mono at the configured rate before it is
//! encoded; playback converts the decoded clip to the output device's rate.
//! Both directions use linear interpolation.

/// Mix interleaved multi-channel audio down to mono by averaging channels.
///
/// * `channels == 1` returns the input unchanged.
/// * `channels == 0` returns an empty vector.
///
/// ```rust
/// use artwork_audio::audio::downmix;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Duplicate mono samples across `channels` interleaved channels.
pub fn upmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let n = channels.max(1) as usize;
    samples
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(n))
        .collect()
}

/// Resample mono `samples` from `from_rate` Hz to `to_rate` Hz.
///
/// Equal rates return a copy; empty input or a zero rate returns an empty
/// vector.  Output length is `ceil(len * to_rate / from_rate)`.
///
/// ```rust
/// use artwork_audio::audio::resample;
///
/// let hi = vec![0.5_f32; 480];
/// assert_eq!(resample(&hi, 48_000, 16_000).len(), 160);
/// ```
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 / ratio;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            match samples.get(idx + 1) {
                Some(&next) => samples[idx] * (1.0 - frac) + next * frac,
                None => samples[idx],
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_mono_is_identity() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix(&input, 1), input);
    }

    #[test]
    fn downmix_stereo_averages() {
        let out = downmix(&[1.0, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels() {
        assert!(downmix(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn upmix_repeats_each_sample() {
        assert_eq!(upmix(&[0.1, 0.2], 2), vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(upmix(&[0.3], 0), vec![0.3]);
    }

    #[test]
    fn same_rate_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn downsample_length() {
        assert_eq!(resample(&vec![0.0; 480], 48_000, 16_000).len(), 160);
        let out = resample(&vec![0.0; 44_100], 44_100, 16_000);
        assert!(out.len().abs_diff(16_000) <= 1, "got {}", out.len());
    }

    #[test]
    fn upsample_length() {
        assert_eq!(resample(&vec![0.0; 80], 8_000, 16_000).len(), 160);
        assert_eq!(resample(&vec![0.0; 160], 16_000, 48_000).len(), 480);
    }

    #[test]
    fn constant_signal_keeps_amplitude() {
        for &s in &resample(&vec![0.5; 480], 48_000, 16_000) {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
        for &s in &resample(&vec![-0.25; 100], 16_000, 44_100) {
            assert!((s + 0.25).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert!(resample(&[], 48_000, 16_000).is_empty());
        assert!(resample(&[1.0], 0, 16_000).is_empty());
    }
}
