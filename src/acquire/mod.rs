//! Acquisition stage
//!
//! Downloads the best audio stream behind a source reference with yt-dlp and
//! has it transcoded to 44.1 kHz WAV at `downloads/<name>.wav`.

use crate::config::{Settings, ACQUIRE_SAMPLE_RATE};
use crate::error::{describe_io_error, Result, StemcutError};
use crate::progress::StageProgress;
use crate::tools::ExternalTool;
use crate::types::{Artifact, ArtifactKind, Stage};
use crate::workspace::{ensure_dir, Workspace};
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info};

/// Downloads at or below this size are treated as failed
pub const MIN_DOWNLOAD_BYTES: u64 = 1024;

/// Fetches remote audio into the downloads directory
pub struct Acquirer {
    tool: ExternalTool,
    workspace: Workspace,
    show_progress: bool,
}

impl Acquirer {
    pub fn new(settings: &Settings, workspace: &Workspace) -> Self {
        Self {
            tool: ExternalTool::new(&settings.downloader),
            workspace: workspace.clone(),
            show_progress: settings.show_progress,
        }
    }

    /// Download `source_reference` to `downloads/<output_name>.wav`
    pub fn acquire(&self, source_reference: &str, output_name: &str) -> Result<Artifact> {
        let output = self.workspace.acquired_path(output_name);
        let fail = |reason: String| StemcutError::acquisition(source_reference, &output, reason);

        let downloads_dir = self.workspace.downloads_dir();
        ensure_dir(&downloads_dir).map_err(|e| {
            fail(format!(
                "Cannot create download directory: {}",
                describe_io_error(&downloads_dir, &e)
            ))
        })?;

        // A leftover file from an earlier run must not pass the size check
        if output.exists() {
            debug!("Removing previous download {}", output.display());
            std::fs::remove_file(&output).map_err(|e| {
                fail(format!(
                    "Cannot remove previous download: {}",
                    describe_io_error(&output, &e)
                ))
            })?;
        }

        let template = self.workspace.download_template(output_name);
        let args = download_args(source_reference, &template);
        debug!("Running {} {:?}", self.tool.program().display(), args);

        let mut progress = StageProgress::start(Stage::Acquired, self.show_progress);
        let result = self.tool.run(&args, |percent| progress.set_percent(percent));

        let tool_output = match result {
            Ok(tool_output) => tool_output,
            Err(e) => {
                progress.abandon();
                return Err(fail(self.tool.describe_spawn_error(&e, "--yt-dlp")));
            }
        };

        if !tool_output.success() {
            progress.abandon();
            return Err(fail(format!(
                "{} {}\n{}",
                self.tool.program().display(),
                tool_output.describe_status(),
                tool_output.diagnostics
            )));
        }

        match verify_download(&output) {
            Ok(size) => {
                progress.finish();
                info!("Downloaded {} bytes to {}", size, output.display());
                Ok(Artifact::new(Stage::Acquired, output.clone(), ArtifactKind::MonoMix))
            }
            Err(reason) => {
                progress.abandon();
                Err(fail(reason))
            }
        }
    }
}

/// yt-dlp arguments: best audio, extracted to WAV at the canonical rate
fn download_args(source_reference: &str, template: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-f",
        "bestaudio/best",
        "--no-playlist",
        "-x",
        "--audio-format",
        "wav",
        "--postprocessor-args",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push(format!("ffmpeg:-ar {}", ACQUIRE_SAMPLE_RATE).into());
    args.push("--force-overwrites".into());
    args.push("--newline".into());
    args.push("-o".into());
    args.push(template.as_os_str().to_owned());
    // Keep a source starting with '-' from being read as an option
    args.push("--".into());
    args.push(source_reference.into());
    args
}

/// Check the download exists and is larger than [`MIN_DOWNLOAD_BYTES`]
///
/// Returns the file size.
pub fn verify_download(path: &Path) -> std::result::Result<u64, String> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| format!("Downloaded file is missing ({})", e))?;

    if !metadata.is_file() {
        return Err("Download output is not a regular file".to_string());
    }

    let size = metadata.len();
    if size <= MIN_DOWNLOAD_BYTES {
        return Err(format!(
            "Downloaded file is empty or too small ({} bytes, expected more than {})",
            size, MIN_DOWNLOAD_BYTES
        ));
    }

    Ok(size)
}
