//! CLI argument parsing and configuration

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// stemcut - Download a track, cut a range and split it into stems
///
/// Fetches the audio behind SOURCE with yt-dlp, keeps the requested
/// time range and separates it into a vocal and an instrumental track
/// with demucs. Start and end times are prompted for when not given.
#[derive(Parser, Debug)]
#[command(name = "stemcut")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Source to download (e.g. a YouTube URL)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Name used for every file this run produces
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Start of the range to keep, in seconds (prompted if omitted)
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub start: Option<i64>,

    /// End of the range to keep, in seconds (prompted if omitted)
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub end: Option<i64>,

    /// Working directory holding downloads/, trimmed/, separated/ and process.log
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Downloader program
    #[arg(long = "yt-dlp", value_name = "PROGRAM", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Source separation program
    #[arg(long, value_name = "PROGRAM", default_value = "demucs")]
    pub demucs: PathBuf,

    /// Separation model name passed to demucs (-n)
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Backend used to cut the time range
    #[arg(long, value_enum, default_value_t = TrimBackendKind::Hound)]
    pub trim_backend: TrimBackendKind,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only on the console, no progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

/// Available trimming backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrimBackendKind {
    /// WAV in, WAV out with the source's exact sample format
    Hound,
    /// Decode any supported container, write 32-bit float WAV
    Symphonia,
}

impl Cli {
    /// Get the console log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
