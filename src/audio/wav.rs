//! WAV reading and writing with hound
//!
//! [`HoundBackend`] keeps the source's sample format and bit depth, so a trim
//! through it is lossless.

use super::traits::TrimBackend;
use crate::error::{Result, StemcutError};
use crate::types::{AudioClip, ClipSamples};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::debug;

/// WAV-only backend that preserves the sample format
#[derive(Debug, Default)]
pub struct HoundBackend;

impl HoundBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TrimBackend for HoundBackend {
    fn load(&self, path: &Path) -> Result<AudioClip> {
        let mut reader = WavReader::open(path)
            .map_err(|e| StemcutError::trim(path, format!("Failed to open WAV: {}", e)))?;
        let spec = reader.spec();

        debug!(
            "Loading WAV: {} @ {}Hz, {} channels, {}-bit {:?}",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );

        let samples = match spec.sample_format {
            SampleFormat::Int => ClipSamples::Int(
                reader
                    .samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| StemcutError::trim(path, format!("Failed to read samples: {}", e)))?,
            ),
            SampleFormat::Float => ClipSamples::Float(
                reader
                    .samples::<f32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| StemcutError::trim(path, format!("Failed to read samples: {}", e)))?,
            ),
        };

        Ok(AudioClip {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        })
    }

    fn write(&self, clip: &AudioClip, path: &Path) -> Result<()> {
        write_wav(clip, path)
    }

    fn name(&self) -> &'static str {
        "hound"
    }
}

/// Write a clip as WAV in the clip's own sample format
///
/// Float clips are always written as 32-bit float.
pub fn write_wav(clip: &AudioClip, path: &Path) -> Result<()> {
    let write_error = |e: hound::Error| StemcutError::trim(path, format!("Failed to write WAV: {}", e));

    let spec = match clip.samples {
        ClipSamples::Int(_) => WavSpec {
            channels: clip.channels,
            sample_rate: clip.sample_rate,
            bits_per_sample: clip.bits_per_sample,
            sample_format: SampleFormat::Int,
        },
        ClipSamples::Float(_) => WavSpec {
            channels: clip.channels,
            sample_rate: clip.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(write_error)?;

    match &clip.samples {
        ClipSamples::Int(samples) => {
            for &sample in samples {
                writer.write_sample(sample).map_err(write_error)?;
            }
        }
        ClipSamples::Float(samples) => {
            for &sample in samples {
                writer.write_sample(sample).map_err(write_error)?;
            }
        }
    }

    writer.finalize().map_err(write_error)?;

    debug!("Wrote {:.2}s to {}", clip.duration(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeRange;
    use tempfile::TempDir;

    fn write_ramp(path: &Path, channels: u16, sample_rate: u32, seconds: u32) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for frame in 0..(sample_rate * seconds) {
            for ch in 0..channels {
                writer.write_sample(((frame % 1000) as i16) * (ch as i16 + 1)).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_keeps_native_rate_and_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.wav");
        write_ramp(&path, 2, 8000, 2);

        let clip = HoundBackend::new().load(&path).unwrap();
        assert_eq!(clip.sample_rate, 8000);
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.bits_per_sample, 16);
        assert_eq!(clip.frames(), 16000);
        assert!(matches!(clip.samples, ClipSamples::Int(_)));
    }

    #[test]
    fn test_slice_is_sample_exact() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        write_ramp(&input, 1, 1000, 5);

        let backend = HoundBackend::new();
        let clip = backend.load(&input).unwrap();
        let cut = backend.slice(&clip, TimeRange::new(1, 3).unwrap());
        backend.write(&cut, &output).unwrap();

        let mut reader = WavReader::open(&output).unwrap();
        assert_eq!(reader.spec().sample_rate, 1000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 2000);
        // Frame 1000 of the ramp wraps back to 0
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], 1);
    }

    #[test]
    fn test_load_rejects_non_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not RIFF data").unwrap();

        let err = HoundBackend::new().load(&path).unwrap_err();
        assert!(matches!(err, StemcutError::TrimError { .. }));
    }

    #[test]
    fn test_float_clip_written_as_32_bit_float() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("float.wav");
        let clip = AudioClip {
            samples: ClipSamples::Float(vec![0.0, 0.5, -0.5, 0.25]),
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 32,
        };
        write_wav(&clip, &path).unwrap();

        let reloaded = HoundBackend::new().load(&path).unwrap();
        assert_eq!(reloaded, clip);
    }
}
