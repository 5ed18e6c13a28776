//! Unified error types for stemcut
//!
//! Error strategy:
//! - Validation errors (range, time input, name): rejected before any stage runs
//! - Stage errors (acquisition, trim, separation): fatal, abort the job.
//!   Filesystem failures inside a stage are reported as that stage's error.
//! - Output errors: the working directory or run log cannot be set up
//!
//! Nothing is retried. The orchestrator logs the error and the binary exits 1.

use crate::types::Stage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for stemcut operations
#[derive(Debug, Error)]
pub enum StemcutError {
    // =========================================================================
    // Validation errors - reported before any external process runs
    // =========================================================================
    #[error("Invalid time range: start={start}s end={end}s\n  Start must be >= 0 and End must be greater than Start")]
    InvalidRange { start: i64, end: i64 },

    #[error("Invalid time input '{input}': expected a whole number of seconds")]
    InvalidTimeInput { input: String },

    #[error("Invalid output name '{name}': {reason}\n  Tip: Use a plain file name such as 'my_song'")]
    InvalidName { name: String, reason: String },

    // =========================================================================
    // Stage errors - abort the job
    // =========================================================================
    #[error("Download failed for '{source_ref}' (output '{path}'): {reason}\n  Tip: Check the URL and that yt-dlp and ffmpeg are installed and up to date")]
    AcquisitionError {
        source_ref: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Trimming failed for '{path}': {reason}")]
    TrimError { path: PathBuf, reason: String },

    #[error("Source separation failed for '{path}': {reason}{}", format_diagnostics(.diagnostics))]
    SeparationError {
        path: PathBuf,
        reason: String,
        diagnostics: String,
    },

    // =========================================================================
    // Environment errors
    // =========================================================================
    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the working directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stemcut operations
pub type Result<T> = std::result::Result<T, StemcutError>;

/// Readable reason for a filesystem failure on `path`
pub fn describe_io_error(path: &Path, err: &std::io::Error) -> String {
    match err.kind() {
        std::io::ErrorKind::PermissionDenied => {
            format!("Permission denied. Check that you have write access to {}", path.display())
        }
        std::io::ErrorKind::NotFound => {
            format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
        }
        _ => err.to_string(),
    }
}

fn format_diagnostics(diagnostics: &str) -> String {
    let trimmed = diagnostics.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n  Tool output:\n{}", trimmed)
    }
}

impl StemcutError {
    /// Returns true if this error was raised while validating job inputs
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            StemcutError::InvalidRange { .. }
                | StemcutError::InvalidTimeInput { .. }
                | StemcutError::InvalidName { .. }
        )
    }

    /// The pipeline stage this error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            StemcutError::AcquisitionError { .. } => Some(Stage::Acquired),
            StemcutError::TrimError { .. } => Some(Stage::Trimmed),
            StemcutError::SeparationError { .. } => Some(Stage::Separated),
            _ => None,
        }
    }

    /// Create an acquisition error for a source and its expected output file
    pub fn acquisition(
        source_ref: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        StemcutError::AcquisitionError {
            source_ref: source_ref.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a trim error with context about the file involved
    pub fn trim(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StemcutError::TrimError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a separation error without tool diagnostics
    pub fn separation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StemcutError::SeparationError {
            path: path.into(),
            reason: reason.into(),
            diagnostics: String::new(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = describe_io_error(&path, &err);
        StemcutError::OutputError { path, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_have_no_stage() {
        let err = StemcutError::InvalidRange { start: 5, end: 5 };
        assert!(err.is_validation_error());
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_stage_errors_map_to_stage() {
        let err = StemcutError::acquisition("https://example.com/x", "downloads/x.wav", "too small");
        assert_eq!(err.stage(), Some(Stage::Acquired));
        assert!(!err.is_validation_error());

        let err = StemcutError::trim("downloads/x.wav", "corrupt");
        assert_eq!(err.stage(), Some(Stage::Trimmed));

        let err = StemcutError::separation("trimmed/x_trimmed.wav", "missing stems");
        assert_eq!(err.stage(), Some(Stage::Separated));
    }

    #[test]
    fn test_separation_error_includes_diagnostics() {
        let err = StemcutError::SeparationError {
            path: PathBuf::from("trimmed/x_trimmed.wav"),
            reason: "demucs exited with status 1".to_string(),
            diagnostics: "RuntimeError: CUDA out of memory\n".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("trimmed/x_trimmed.wav"));
        assert!(message.contains("CUDA out of memory"));

        let bare = StemcutError::separation("a.wav", "no stems");
        assert!(!bare.to_string().contains("Tool output"));
    }

    #[test]
    fn test_output_error_permission_denied() {
        let err = StemcutError::output_error(
            "separated/vocals/x_vocals.wav",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("Permission denied"));
    }
}
