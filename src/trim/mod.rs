//! Trimming stage
//!
//! Cuts `[start, end)` out of the acquired file at its native sample rate and
//! writes it to `trimmed/<name>_trimmed.wav`. An end past the source duration
//! is truncated, not rejected.

use crate::audio::TrimBackend;
use crate::error::{describe_io_error, Result, StemcutError};
use crate::progress::StageProgress;
use crate::types::{Artifact, ArtifactKind, Stage, TimeRange};
use crate::workspace::{ensure_dir, Workspace};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extracts a time range from an acquired artifact
pub struct Trimmer {
    backend: Arc<dyn TrimBackend>,
    workspace: Workspace,
    show_progress: bool,
}

impl Trimmer {
    pub fn new(backend: Arc<dyn TrimBackend>, workspace: &Workspace, show_progress: bool) -> Self {
        Self {
            backend,
            workspace: workspace.clone(),
            show_progress,
        }
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Write the slice `range` of `acquired` to `trimmed/<output_name>_trimmed.wav`
    pub fn trim(&self, acquired: &Artifact, range: TimeRange, output_name: &str) -> Result<Artifact> {
        if acquired.stage != Stage::Acquired {
            return Err(StemcutError::trim(
                &acquired.path,
                format!("Expected an acquired artifact, got {:?}", acquired.stage),
            ));
        }

        let progress = StageProgress::start(Stage::Trimmed, self.show_progress);
        match self.trim_inner(acquired, range, output_name) {
            Ok(artifact) => {
                progress.finish();
                Ok(artifact)
            }
            Err(e) => {
                progress.abandon();
                Err(e)
            }
        }
    }

    fn trim_inner(&self, acquired: &Artifact, range: TimeRange, output_name: &str) -> Result<Artifact> {
        debug!("Trimming {} {} with {}", acquired.path.display(), range, self.backend.name());

        let clip = self.backend.load(&acquired.path)?;
        if clip.sample_rate == 0 || clip.channels == 0 {
            return Err(StemcutError::trim(&acquired.path, "Source reports no sample rate or channels"));
        }

        let source_duration = clip.duration();
        let cut = self.backend.slice(&clip, range);

        if cut.frames() == 0 {
            return Err(StemcutError::trim(
                &acquired.path,
                format!(
                    "Start {}s is past the end of the source ({:.2}s); nothing to keep",
                    range.start_seconds(),
                    source_duration
                ),
            ));
        }

        if range.end_seconds() as f64 > source_duration {
            warn!(
                "End {}s is past the end of the source ({:.2}s); keeping the available audio",
                range.end_seconds(),
                source_duration
            );
        }

        let trimmed_dir = self.workspace.trimmed_dir();
        ensure_dir(&trimmed_dir).map_err(|e| {
            StemcutError::trim(
                &trimmed_dir,
                format!("Cannot create output directory: {}", describe_io_error(&trimmed_dir, &e)),
            )
        })?;
        let output = self.workspace.trimmed_path(output_name);

        if let Err(e) = self.backend.write(&cut, &output) {
            // Never leave a half-written file behind
            if output.exists() {
                if let Err(remove_err) = std::fs::remove_file(&output) {
                    warn!("Could not remove partial file {}: {}", output.display(), remove_err);
                }
            }
            return Err(e);
        }

        info!(
            "Kept {:.2}s of {:.2}s at {}Hz",
            cut.duration(),
            source_duration,
            cut.sample_rate
        );

        Ok(Artifact::new(Stage::Trimmed, output, ArtifactKind::MonoMix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{HoundBackend, SymphoniaBackend};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_tone(path: &Path, sample_rate: u32, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(sample_rate * seconds) {
            let sample = ((i % 200) as i16 - 100) * 100;
            writer.write_sample(sample).unwrap();
            writer.write_sample(-sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn acquired(dir: &Path, sample_rate: u32, seconds: u32) -> Artifact {
        std::fs::create_dir_all(dir.join("downloads")).unwrap();
        let path = dir.join("downloads").join("song.wav");
        write_tone(&path, sample_rate, seconds);
        Artifact::new(Stage::Acquired, path, ArtifactKind::MonoMix)
    }

    fn duration_of(path: &Path) -> f64 {
        let reader = hound::WavReader::open(path).unwrap();
        reader.duration() as f64 / reader.spec().sample_rate as f64
    }

    #[test]
    fn test_trim_range_inside_source() {
        let dir = TempDir::new().unwrap();
        let source = acquired(dir.path(), 8000, 10);
        let trimmer = Trimmer::new(Arc::new(HoundBackend::new()), &Workspace::new(dir.path()), false);

        let out = trimmer.trim(&source, TimeRange::new(2, 5).unwrap(), "song").unwrap();
        assert_eq!(out.stage, Stage::Trimmed);
        assert_eq!(out.path, dir.path().join("trimmed").join("song_trimmed.wav"));
        assert!((duration_of(&out.path) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_trim_end_past_source_truncates() {
        let dir = TempDir::new().unwrap();
        let source = acquired(dir.path(), 8000, 10);
        let trimmer = Trimmer::new(Arc::new(HoundBackend::new()), &Workspace::new(dir.path()), false);

        let out = trimmer.trim(&source, TimeRange::new(3, 20).unwrap(), "song").unwrap();
        assert!((duration_of(&out.path) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_trim_keeps_native_sample_rate() {
        let dir = TempDir::new().unwrap();
        let source = acquired(dir.path(), 22050, 3);

        for backend in [
            Arc::new(HoundBackend::new()) as Arc<dyn TrimBackend>,
            Arc::new(SymphoniaBackend::new()) as Arc<dyn TrimBackend>,
        ] {
            let trimmer = Trimmer::new(backend, &Workspace::new(dir.path()), false);
            let out = trimmer.trim(&source, TimeRange::new(1, 2).unwrap(), "song").unwrap();
            let reader = hound::WavReader::open(&out.path).unwrap();
            assert_eq!(reader.spec().sample_rate, 22050, "backend {}", trimmer.backend_name());
            assert_eq!(reader.duration(), 22050, "backend {}", trimmer.backend_name());
        }
    }

    #[test]
    fn test_trim_start_past_source_fails() {
        let dir = TempDir::new().unwrap();
        let source = acquired(dir.path(), 8000, 2);
        let trimmer = Trimmer::new(Arc::new(HoundBackend::new()), &Workspace::new(dir.path()), false);

        let err = trimmer.trim(&source, TimeRange::new(5, 8).unwrap(), "song").unwrap_err();
        assert!(matches!(err, StemcutError::TrimError { .. }));
        assert!(!dir.path().join("trimmed").join("song_trimmed.wav").exists());
    }

    #[test]
    fn test_trim_corrupt_source_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("downloads")).unwrap();
        let path = dir.path().join("downloads").join("song.wav");
        std::fs::write(&path, vec![7u8; 2048]).unwrap();
        let source = Artifact::new(Stage::Acquired, path, ArtifactKind::MonoMix);

        let trimmer = Trimmer::new(Arc::new(HoundBackend::new()), &Workspace::new(dir.path()), false);
        let err = trimmer.trim(&source, TimeRange::new(0, 1).unwrap(), "song").unwrap_err();
        assert!(matches!(err, StemcutError::TrimError { .. }));
    }

    #[test]
    fn test_trim_rejects_wrong_stage() {
        let dir = TempDir::new().unwrap();
        let source = Artifact::new(Stage::Trimmed, dir.path().join("x.wav"), ArtifactKind::MonoMix);
        let trimmer = Trimmer::new(Arc::new(HoundBackend::new()), &Workspace::new(dir.path()), false);
        assert!(trimmer.trim(&source, TimeRange::new(0, 1).unwrap(), "song").is_err());
    }

    #[test]
    fn test_unwritable_output_directory_is_trim_error() {
        let dir = TempDir::new().unwrap();
        let source = acquired(dir.path(), 8000, 4);
        std::fs::write(dir.path().join("trimmed"), b"in the way").unwrap();

        let trimmer = Trimmer::new(Arc::new(HoundBackend::new()), &Workspace::new(dir.path()), false);
        let err = trimmer.trim(&source, TimeRange::new(0, 2).unwrap(), "song").unwrap_err();

        assert!(matches!(err, StemcutError::TrimError { .. }), "{:?}", err);
        assert_eq!(err.stage(), Some(Stage::Trimmed));
    }
}
