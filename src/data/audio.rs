// ============================================================
// Layer 4 — Audio Loading
// ============================================================
// Decodes WAV files into mono f32 signals at the configured
// target sample rate:
//
//   .wav ──hound──► interleaved samples
//        ──downmix──► mono
//        ──linear resample──► target_sr
//        ──pad / crop──► fixed length (max_length * target_sr)
//
// Integer PCM is scaled into [-1, 1] by the format's full-scale
// value.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::domain::traits::Signal;

/// Settings that determine the shape of every loaded signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub target_sr:  u32,
    pub signal_len: usize,
}

impl AudioFormat {
    /// `max_length` seconds at `target_sr` Hz.
    pub fn new(max_length: f64, target_sr: u32) -> Self {
        let signal_len = (max_length * target_sr as f64).round() as usize;
        Self { target_sr, signal_len }
    }
}

/// Read a WAV file and return a fixed-length mono signal.
pub fn load_wav(path: &Path, format: AudioFormat) -> Result<Signal> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Cannot open WAV file '{}'", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("Corrupt float samples in '{}'", path.display()))?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                bail!("Unsupported bits_per_sample {bits} in '{}'", path.display());
            }
            let full_scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("Corrupt PCM samples in '{}'", path.display()))?
        }
    };

    let mono = to_mono(&samples, spec.channels as usize);
    let mut signal = resample_linear(&mono, spec.sample_rate, format.target_sr);
    signal.resize(format.signal_len, 0.0);
    Ok(signal)
}

/// Average interleaved channels into one.
pub fn to_mono(samples: &[f32], channels: usize) -> Signal {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Signal {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio      = to_rate as f64 / from_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last       = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let src  = i as f64 / ratio;
            let lo   = (src.floor() as usize).min(last);
            let hi   = (lo + 1).min(last);
            let frac = (src - lo as f64) as f32;
            samples[lo] * (1.0 - frac) + samples[hi] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn format_length_is_seconds_times_rate() {
        assert_eq!(AudioFormat::new(3.0, 16_000).signal_len, 48_000);
    }

    #[test]
    fn stereo_is_downmixed() {
        assert_eq!(to_mono(&[1.0, 3.0, -1.0, 1.0], 2), vec![2.0, 0.0]);
    }

    #[test]
    fn resampling_changes_length_by_ratio() {
        let out = resample_linear(&[0.0; 100], 8_000, 16_000);
        assert_eq!(out.len(), 200);
        let same = resample_linear(&[1.0, 2.0], 16_000, 16_000);
        assert_eq!(same, vec![1.0, 2.0]);
    }

    #[test]
    fn load_wav_pads_to_fixed_length() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("clip.wav");
        write_wav(&path, 8, 1, &[16384, -16384, 0, 0]);

        let signal = load_wav(&path, AudioFormat { target_sr: 8, signal_len: 6 }).unwrap();
        assert_eq!(signal.len(), 6);
        assert!((signal[0] - 0.5).abs() < 1e-4);
        assert!((signal[1] + 0.5).abs() < 1e-4);
        assert_eq!(signal[5], 0.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let fmt = AudioFormat::new(1.0, 8);
        assert!(load_wav(Path::new("/nonexistent/clip.wav"), fmt).is_err());
    }
}
