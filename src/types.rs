//! Core data types for stemcut
//!
//! These types represent the domain model and flow through the pipeline.

use crate::error::{Result, StemcutError};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Job
// =============================================================================

/// One unit of work: fetch `source_reference`, cut `[start, end)` and split it.
///
/// Built once from CLI input and the interactive prompt, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Remote source reference handed to the downloader (usually a URL)
    pub source_reference: String,
    /// Name every artifact of this job is keyed by
    pub output_name: String,
    /// Inclusive start of the range to keep, in seconds
    pub start_seconds: i64,
    /// Exclusive end of the range to keep, in seconds
    pub end_seconds: i64,
}

impl Job {
    pub fn new(
        source_reference: impl Into<String>,
        output_name: impl Into<String>,
        start_seconds: i64,
        end_seconds: i64,
    ) -> Self {
        Self {
            source_reference: source_reference.into(),
            output_name: output_name.into(),
            start_seconds,
            end_seconds,
        }
    }

    /// Check `start >= 0 && end > start`
    pub fn validate_range(&self) -> Result<TimeRange> {
        TimeRange::new(self.start_seconds, self.end_seconds)
    }
}

/// A validated closed-open range of whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: u64,
    end: u64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if start < 0 || end <= start {
            return Err(StemcutError::InvalidRange { start, end });
        }
        Ok(Self {
            start: start as u64,
            end: end as u64,
        })
    }

    pub fn start_seconds(&self) -> u64 {
        self.start
    }

    pub fn end_seconds(&self) -> u64 {
        self.end
    }

    /// Convert to a frame range at `sample_rate`, clamped to `total_frames`
    ///
    /// The end is truncated to the available audio, never padded.
    pub fn to_frames(&self, sample_rate: u32, total_frames: usize) -> std::ops::Range<usize> {
        let rate = sample_rate as u64;
        let start = self.start.saturating_mul(rate).min(total_frames as u64) as usize;
        let end = self.end.saturating_mul(rate).min(total_frames as u64) as usize;
        start..end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}s, {}s)", self.start, self.end)
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// Pipeline stage that produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Acquired,
    Trimmed,
    Separated,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 3] = [Stage::Acquired, Stage::Trimmed, Stage::Separated];

    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        match self {
            Stage::Acquired => 1,
            Stage::Trimmed => 2,
            Stage::Separated => 3,
        }
    }

    /// Human readable label used in status lines
    pub fn label(self) -> &'static str {
        match self {
            Stage::Acquired => "Downloading",
            Stage::Trimmed => "Trimming",
            Stage::Separated => "Separating",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.number(), Stage::ALL.len(), self.label())
    }
}

/// What an artifact contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The full mix (acquired or trimmed)
    MonoMix,
    VocalTrack,
    InstrumentalTrack,
}

/// A file produced by exactly one stage and handed on by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub stage: Stage,
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(stage: Stage, path: PathBuf, kind: ArtifactKind) -> Self {
        Self { stage, path, kind }
    }
}

/// The two terminal artifacts of a successful separation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedPair {
    pub vocals: Artifact,
    pub instrumental: Artifact,
}

/// Completion record for one stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    /// Files the stage produced
    pub outputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

// =============================================================================
// Audio clip
// =============================================================================

/// Interleaved samples in the representation they were read in
#[derive(Debug, Clone, PartialEq)]
pub enum ClipSamples {
    /// Integer PCM, values in the range of `bits_per_sample`
    Int(Vec<i32>),
    /// Float PCM normalized to [-1.0, 1.0]
    Float(Vec<f32>),
}

impl ClipSamples {
    pub fn len(&self) -> usize {
        match self {
            ClipSamples::Int(s) => s.len(),
            ClipSamples::Float(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded audio at its native sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: ClipSamples,
    pub channels: u16,
    /// Sample rate in Hz, as found in the source file
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioClip {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        // Guard against division by zero - use 0 duration for invalid sample rate
        if self.sample_rate > 0 {
            self.frames() as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    /// Copy out the frames in `range`
    pub fn slice_frames(&self, range: std::ops::Range<usize>) -> AudioClip {
        let channels = self.channels as usize;
        let end = range.end.min(self.frames());
        let start = range.start.min(end);
        let (from, to) = (start * channels, end * channels);

        let samples = match &self.samples {
            ClipSamples::Int(s) => ClipSamples::Int(s[from..to].to_vec()),
            ClipSamples::Float(s) => ClipSamples::Float(s[from..to].to_vec()),
        };

        AudioClip {
            samples,
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_rejects_bad_bounds() {
        assert!(TimeRange::new(-1, 10).is_err());
        assert!(TimeRange::new(10, 10).is_err());
        assert!(TimeRange::new(10, 3).is_err());
        assert!(TimeRange::new(0, 1).is_ok());
    }

    #[test]
    fn test_job_validate_range() {
        let job = Job::new("https://example.com/v", "song", 5, 2);
        match job.validate_range() {
            Err(StemcutError::InvalidRange { start, end }) => {
                assert_eq!((start, end), (5, 2));
            }
            other => panic!("expected InvalidRange, got {:?}", other),
        }
    }

    #[test]
    fn test_to_frames_truncates_past_end() {
        let range = TimeRange::new(3, 20).unwrap();
        // 10 seconds at 100 Hz
        assert_eq!(range.to_frames(100, 1000), 300..1000);
    }

    #[test]
    fn test_to_frames_start_past_end_is_empty() {
        let range = TimeRange::new(30, 40).unwrap();
        let frames = range.to_frames(100, 1000);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_slice_frames_stereo() {
        let clip = AudioClip {
            samples: ClipSamples::Int(vec![1, -1, 2, -2, 3, -3, 4, -4]),
            channels: 2,
            sample_rate: 4,
            bits_per_sample: 16,
        };
        assert_eq!(clip.frames(), 4);
        assert!((clip.duration() - 1.0).abs() < 1e-9);

        let cut = clip.slice_frames(1..3);
        assert_eq!(cut.samples, ClipSamples::Int(vec![2, -2, 3, -3]));
        assert_eq!(cut.frames(), 2);
        assert_eq!(cut.sample_rate, 4);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Acquired.to_string(), "[1/3] Downloading");
        assert_eq!(Stage::Separated.to_string(), "[3/3] Separating");
    }
}
