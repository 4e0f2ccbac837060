//! Waveform provider - click buffer synthesis and sample decoding
//!
//! This module supplies the fixed-length mono buffers the pattern sequencer
//! plays for the accent, tick and subdivision roles. Key features:
//! - Pure sine synthesis at an arbitrary frequency (zero frequency = silence)
//! - 16-bit PCM decoding, WAV-aware with a headerless raw fallback
//! - Float to PCM16 encoding with gain, used by every sink backend
//! - Pure functions (no side effects, deterministic output)
//!
//! Buffers are generated or decoded when a sound-role selection changes and
//! cached per role; nothing here runs per tick.

use std::f64::consts::PI;
use std::io::Cursor;

/// Peak value used for PCM16 normalization on both decode and encode
const PCM16_SCALE: f32 = 32_767.0;

/// Synthesize a pure sine tone.
///
/// # Arguments
/// * `frames` - Number of samples to generate
/// * `sample_rate` - Sample rate in Hz (typically 48000)
/// * `frequency_hz` - Tone frequency; `0.0` yields silence, the conventional
///   fallback buffer for a disabled role
///
/// # Returns
/// A `Vec<f32>` of exactly `frames` samples in [-1.0, 1.0]
pub fn sine_wave(frames: usize, sample_rate: u32, frequency_hz: f64) -> Vec<f32> {
    if frequency_hz == 0.0 {
        return vec![0.0; frames];
    }

    let step = 2.0 * PI * frequency_hz / sample_rate as f64;
    (0..frames).map(|i| (step * i as f64).sin() as f32).collect()
}

/// Decode a sampled click asset to normalized mono samples.
///
/// Accepts either a WAV container (parsed with hound; 16-bit integer data,
/// first channel of multi-channel files) or a headerless dump of
/// little-endian signed 16-bit PCM, which is what the legacy sound assets
/// actually are. Samples are normalized by 32767.
///
/// Empty or malformed input yields an empty buffer; this function never
/// fails. The sequencer treats missing frames as silence, so a bad asset
/// degrades to a quiet role rather than broken playback.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    if bytes.is_empty() {
        return Vec::new();
    }

    if let Some(samples) = decode_wav(bytes) {
        return samples;
    }

    decode_raw_pcm16(bytes)
}

/// Parse a WAV container; `None` when the bytes are not a decodable 16-bit WAV
fn decode_wav(bytes: &[u8]) -> Option<Vec<f32>> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return None;
    }

    let channels = spec.channels.max(1) as usize;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .step_by(channels)
        .map_while(Result::ok)
        .map(|s| s as f32 / PCM16_SCALE)
        .collect();
    Some(samples)
}

/// Interpret the whole payload as headerless little-endian PCM16 pairs;
/// a trailing odd byte is ignored
fn decode_raw_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE)
        .collect()
}

/// Convert one float sample to a signed 16-bit PCM frame with gain applied.
///
/// `round(sample * gain * 32767)`, saturating at the i16 range.
#[inline]
pub fn pcm16_frame(sample: f32, gain: f32) -> i16 {
    let scaled = (sample * gain * PCM16_SCALE).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Encode float samples as little-endian 16-bit PCM bytes with gain applied.
///
/// Gain 0.0 yields all-zero bytes regardless of waveform content.
pub fn encode_pcm16(samples: &[f32], gain: f32) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        encoded.extend_from_slice(&pcm16_frame(sample, gain).to_le_bytes());
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_sine_wave_length_and_range() {
        let buf = sine_wave(3_000, 48_000, 10_000.0);
        assert_eq!(buf.len(), 3_000);
        for (i, &sample) in buf.iter().enumerate() {
            assert!(
                (-1.0..=1.0).contains(&sample),
                "Sample {} at index {} is out of range [-1.0, 1.0]",
                sample,
                i
            );
        }
    }

    #[test]
    fn test_sine_wave_deterministic() {
        let a = sine_wave(3_000, 48_000, 3_000.0);
        let b = sine_wave(3_000, 48_000, 3_000.0);
        assert_eq!(a, b, "Synthesis should be deterministic");
    }

    #[test]
    fn test_sine_wave_zero_frequency_is_silence() {
        let buf = sine_wave(512, 48_000, 0.0);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_decode_empty_input_yields_empty_buffer() {
        assert!(decode_pcm16(&[]).is_empty());
    }

    #[test]
    fn test_decode_raw_pcm16() {
        // 0, i16::MAX, i16::MIN as little-endian pairs
        let bytes = [0x00, 0x00, 0xFF, 0x7F, 0x00, 0x80];
        let samples = decode_pcm16(&bytes);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 1.0).abs() < 1e-6);
        assert!(samples[2] < -1.0); // -32768/32767 slightly exceeds -1
    }

    #[test]
    fn test_decode_ignores_trailing_odd_byte() {
        let samples = decode_pcm16(&[0x00, 0x40, 0x7F]);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_decode_wav_matches_raw_payload() {
        let pcm: Vec<i16> = vec![0, 1_000, -1_000, 16_384, -16_384, 32_767];
        let from_wav = decode_pcm16(&wav_bytes(&pcm));

        let mut raw = Vec::new();
        for &s in &pcm {
            raw.extend_from_slice(&s.to_le_bytes());
        }
        let from_raw = decode_pcm16(&raw);

        assert_eq!(from_wav, from_raw, "WAV payload should decode identically");
    }

    #[test]
    fn test_encode_decode_roundtrip_within_quantization_error() {
        let original = sine_wave(2_048, 48_000, 440.0);
        let decoded = decode_pcm16(&encode_pcm16(&original, 1.0));

        assert_eq!(decoded.len(), original.len());
        for (i, (&a, &b)) in original.iter().zip(decoded.iter()).enumerate() {
            assert!(
                (a - b).abs() <= 1.0 / PCM16_SCALE,
                "Sample {} differs beyond quantization error: {} vs {}",
                i,
                a,
                b
            );
        }
    }

    #[test]
    fn test_pcm16_frame_saturates() {
        assert_eq!(pcm16_frame(1.0, 1.0), 32_767);
        assert_eq!(pcm16_frame(-1.0, 1.0), -32_767);
        assert_eq!(pcm16_frame(4.0, 1.0), i16::MAX);
        assert_eq!(pcm16_frame(-4.0, 1.0), i16::MIN);
    }

    #[test]
    fn test_zero_gain_encodes_all_zero_bytes() {
        let loud = sine_wave(1_024, 48_000, 10_000.0);
        let encoded = encode_pcm16(&loud, 0.0);
        assert_eq!(encoded.len(), 2_048);
        assert!(encoded.iter().all(|&b| b == 0));
    }
}
