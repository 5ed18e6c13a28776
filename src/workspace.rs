//! Filesystem layout of a run
//!
//! ```text
//! <workdir>/downloads/<name>.wav
//! <workdir>/trimmed/<name>_trimmed.wav
//! <workdir>/separated/vocals/<name>_vocals.<ext>
//! <workdir>/separated/no_vocals/<name>_no_vocals.<ext>
//! <workdir>/process.log
//! ```
//!
//! Paths depend only on the output name, so a second run with the same name
//! overwrites the first.

use crate::error::{Result, StemcutError};
use std::path::{Path, PathBuf};

/// Canonical directory for the vocal stem under `separated/`
pub const VOCALS_DIR: &str = "vocals";
/// Canonical directory for the instrumental stem under `separated/`
pub const NO_VOCALS_DIR: &str = "no_vocals";

/// Extension of acquired and trimmed files
pub const WAV_EXT: &str = "wav";

/// Path helpers rooted at the working directory
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    pub fn trimmed_dir(&self) -> PathBuf {
        self.root.join("trimmed")
    }

    pub fn separated_dir(&self) -> PathBuf {
        self.root.join("separated")
    }

    pub fn vocals_dir(&self) -> PathBuf {
        self.separated_dir().join(VOCALS_DIR)
    }

    pub fn no_vocals_dir(&self) -> PathBuf {
        self.separated_dir().join(NO_VOCALS_DIR)
    }

    /// Output template handed to the downloader
    pub fn download_template(&self, name: &str) -> PathBuf {
        self.downloads_dir().join(format!("{}.%(ext)s", name))
    }

    pub fn acquired_path(&self, name: &str) -> PathBuf {
        self.downloads_dir().join(format!("{}.{}", name, WAV_EXT))
    }

    pub fn trimmed_path(&self, name: &str) -> PathBuf {
        self.trimmed_dir().join(format!("{}_trimmed.{}", name, WAV_EXT))
    }

    pub fn vocals_path(&self, name: &str, ext: &str) -> PathBuf {
        self.vocals_dir().join(format!("{}_vocals.{}", name, ext))
    }

    pub fn no_vocals_path(&self, name: &str, ext: &str) -> PathBuf {
        self.no_vocals_dir().join(format!("{}_no_vocals.{}", name, ext))
    }
}

/// Create `dir` (and parents) if missing
///
/// Each stage wraps the failure in its own error.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Reject names that would escape or break the layout
pub fn validate_output_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| StemcutError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name cannot be a relative directory"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("name cannot contain path separators"));
    }
    if name.contains('\0') {
        return Err(invalid("name cannot contain NUL bytes"));
    }
    Ok(())
}
