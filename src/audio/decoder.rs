//! Audio decoding using symphonia
//!
//! Decodes any container symphonia can probe to interleaved f32 samples at the
//! file's own sample rate. No resampling or channel mixing happens here.

use super::traits::TrimBackend;
use super::wav::write_wav;
use crate::error::{Result, StemcutError};
use crate::types::{AudioClip, ClipSamples};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB)
/// Prevents OOM on extremely large files
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Backend decoding with symphonia and writing 32-bit float WAV
#[derive(Debug, Default)]
pub struct SymphoniaBackend;

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TrimBackend for SymphoniaBackend {
    fn load(&self, path: &Path) -> Result<AudioClip> {
        decode(path)
    }

    fn write(&self, clip: &AudioClip, path: &Path) -> Result<()> {
        write_wav(clip, path)
    }

    fn name(&self) -> &'static str {
        "symphonia"
    }
}

/// Decode an audio file to an interleaved f32 clip at its native rate
pub fn decode(path: &Path) -> Result<AudioClip> {
    // Check file size before attempting to decode
    let metadata = std::fs::metadata(path)
        .map_err(|e| StemcutError::trim(path, format!("Failed to read file metadata: {}", e)))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(StemcutError::trim(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| StemcutError::trim(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| StemcutError::trim(path, format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| StemcutError::trim(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| StemcutError::trim(path, "Could not determine sample rate"))?;
    let mut channels = codec_params.channels.map(|c| c.count());

    debug!(
        "Decoding: {} @ {}Hz, {:?} channels",
        path.display(),
        sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| StemcutError::trim(path, format!("Failed to create decoder: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(StemcutError::trim(path, format!("Failed to read packet: {}", e)));
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(StemcutError::trim(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        // Some codecs only reveal the channel layout on the first packet
        if channels.is_none() {
            channels = Some(spec.channels.count());
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        all_samples.extend_from_slice(sample_buf.samples());
    }

    let channels = channels.unwrap_or(2);
    if channels == 0 || channels > u16::MAX as usize {
        return Err(StemcutError::trim(path, format!("Unsupported channel count {}", channels)));
    }

    debug!(
        "Decoded {} frames ({:.2}s)",
        all_samples.len() / channels,
        all_samples.len() as f64 / channels as f64 / sample_rate as f64
    );

    Ok(AudioClip {
        samples: ClipSamples::Float(all_samples),
        channels: channels as u16,
        sample_rate,
        bits_per_sample: 32,
    })
}
