//! WAV container encoding and decoding via `hound`.
//!
//! Recordings are uploaded as 16-bit PCM mono WAV.  [`normalize`] turns a
//! raw capture into that canonical form; if tagging the container fails it
//! falls back to headerless PCM and says so in the content type.

use std::io::Cursor;

use bytes::Bytes;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::AudioError;

/// MIME type used when the WAV container could not be written.
pub const RAW_PCM_CONTENT_TYPE: &str = "application/octet-stream";

/// Mono audio with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// A recording ready for upload.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Encode mono samples as a 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a WAV file into mono samples, downmixing if needed.
pub fn decode_wav(bytes: &[u8]) -> Result<PcmClip, AudioError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(PcmClip {
        samples: super::downmix(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
    })
}

/// Convert a capture into the canonical upload encoding.
///
/// Resamples to `target_rate` and writes WAV tagged `content_type`.  A
/// container failure is not fatal: the samples are sent as raw
/// little-endian 16-bit PCM tagged [`RAW_PCM_CONTENT_TYPE`].
pub fn normalize(clip: &PcmClip, target_rate: u32, content_type: &str) -> EncodedAudio {
    let samples = super::resample(&clip.samples, clip.sample_rate, target_rate);

    match encode_wav(&samples, target_rate) {
        Ok(bytes) => EncodedAudio {
            bytes: Bytes::from(bytes),
            content_type: content_type.to_string(),
        },
        Err(e) => {
            log::warn!("audio: WAV encoding failed ({e}); sending raw PCM");
            let raw: Vec<u8> = samples
                .iter()
                .flat_map(|&s| to_i16(s).to_le_bytes())
                .collect();
            EncodedAudio {
                bytes: Bytes::from(raw),
                content_type: RAW_PCM_CONTENT_TYPE.to_string(),
            }
        }
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn wav_header_is_riff() {
        let bytes = encode_wav(&[0.0; 16], 16_000).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 16 * 2);
    }

    #[test]
    fn decode_recovers_encoded_samples() {
        let input = sine(400, 16_000);
        let clip = decode_wav(&encode_wav(&input, 16_000).unwrap()).unwrap();

        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.samples.len(), input.len());
        for (a, b) in input.iter().zip(&clip.samples) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn decode_downmixes_stereo() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut w = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..10 {
                w.write_sample(i16::MAX).unwrap();
                w.write_sample(0_i16).unwrap();
            }
            w.finalize().unwrap();
        }

        let clip = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(clip.samples.len(), 10);
        assert!(clip.samples.iter().all(|s| (s - 0.5).abs() < 1e-3));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_wav(b"definitely not audio"), Err(AudioError::Wav(_))));
    }

    #[test]
    fn normalize_resamples_and_tags() {
        let clip = PcmClip {
            samples: sine(4_800, 48_000),
            sample_rate: 48_000,
        };
        let encoded = normalize(&clip, 16_000, "audio/wav");
        assert_eq!(encoded.content_type, "audio/wav");

        let decoded = decode_wav(&encoded.bytes).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.samples.len(), 1_600);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        assert_eq!(to_i16(2.0), i16::MAX);
        assert_eq!(to_i16(-2.0), -i16::MAX);
    }
}
