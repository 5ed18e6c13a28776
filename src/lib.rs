//! stemcut - Download, trim and vocal-separate one track
//!
//! A command-line utility that fetches the audio behind a source reference,
//! keeps a time range of it and splits that range into a vocal and an
//! instrumental stem.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing, the time prompt and runtime settings
//! - `workspace`: The downloads/trimmed/separated directory layout
//! - `tools`: Running yt-dlp and demucs with progress and diagnostics capture
//! - `acquire`: Download stage
//! - `audio`: WAV loading and writing backends for the trimmer
//! - `trim`: Trim stage
//! - `separate`: Separation stage and stem normalization
//! - `pipeline`: Strictly sequential stage orchestration
//! - `logging`: The per-run `process.log`
//!
//! # Example
//!
//! ```no_run
//! use stemcut::{config::Settings, logging::RunLog, pipeline, Job};
//!
//! let settings = Settings::default();
//! let log = RunLog::create_file_only(&settings.log_path()).expect("log");
//! let job = Job::new("https://www.youtube.com/watch?v=abc", "song", 30, 60);
//! let result = pipeline::run(&job, &settings, &log).expect("Run failed");
//! println!("Vocals: {}", result.vocals_path.display());
//! ```

pub mod acquire;
pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod separate;
pub mod tools;
pub mod trim;
pub mod types;
pub mod workspace;

// Re-export key types at crate root
pub use error::{Result, StemcutError};
pub use types::{Artifact, ArtifactKind, Job, SeparatedPair, Stage, TimeRange};
