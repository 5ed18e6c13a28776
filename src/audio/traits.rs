//! Trimming backend abstraction
//!
//! A backend knows how to load a file into an [`AudioClip`] at its native
//! sample rate and how to write a clip back out. Slicing is shared.

use crate::error::Result;
use crate::types::{AudioClip, TimeRange};
use std::path::Path;

/// Audio load/slice/write capability used by the trimmer
pub trait TrimBackend: Send + Sync {
    /// Load the whole file without resampling
    fn load(&self, path: &Path) -> Result<AudioClip>;

    /// Keep the frames of `range`, truncated to the available audio
    fn slice(&self, clip: &AudioClip, range: TimeRange) -> AudioClip {
        let frames = range.to_frames(clip.sample_rate, clip.frames());
        clip.slice_frames(frames)
    }

    /// Write `clip` to `path`
    fn write(&self, clip: &AudioClip, path: &Path) -> Result<()>;

    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;
}
