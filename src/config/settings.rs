//! Runtime configuration settings

use super::cli::TrimBackendKind;
use std::path::PathBuf;

/// Sample rate every acquired file is transcoded to
pub const ACQUIRE_SAMPLE_RATE: u32 = 44100;

/// Runtime settings for one pipeline run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the downloads/trimmed/separated layout
    pub workdir: PathBuf,
    /// Downloader program (yt-dlp)
    pub downloader: PathBuf,
    /// Source separation program (demucs)
    pub separator: PathBuf,
    /// Optional separation model name
    pub separation_model: Option<String>,
    /// Trimming backend
    pub trim_backend: TrimBackendKind,
    /// Console log level
    pub log_level: tracing::Level,
    /// Show progress bars
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        Self {
            workdir: cli.workdir.clone(),
            downloader: cli.yt_dlp.clone(),
            separator: cli.demucs.clone(),
            separation_model: cli.model.clone(),
            trim_backend: cli.trim_backend,
            log_level: cli.log_level(),
            show_progress: !cli.quiet,
        }
    }

    /// Path of the run log
    pub fn log_path(&self) -> PathBuf {
        self.workdir.join("process.log")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            downloader: PathBuf::from("yt-dlp"),
            separator: PathBuf::from("demucs"),
            separation_model: None,
            trim_backend: TrimBackendKind::Hound,
            log_level: tracing::Level::INFO,
            show_progress: true,
        }
    }
}
