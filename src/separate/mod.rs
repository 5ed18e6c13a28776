//! Separation stage
//!
//! Runs demucs in two-stem mode on the trimmed file, then moves the result
//! into `separated/vocals/<name>_vocals.<ext>` and
//! `separated/no_vocals/<name>_no_vocals.<ext>`.

pub mod layout;

use crate::config::Settings;
use crate::error::{describe_io_error, Result, StemcutError};
use crate::progress::StageProgress;
use crate::tools::ExternalTool;
use crate::types::{Artifact, ArtifactKind, SeparatedPair, Stage};
use crate::workspace::{ensure_dir, Workspace};
use layout::{clear_canonical_outputs, locate_stems, normalize_stems};
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info};

/// Splits a trimmed artifact into vocal and instrumental stems
pub struct Separator {
    tool: ExternalTool,
    model: Option<String>,
    workspace: Workspace,
    show_progress: bool,
}

impl Separator {
    pub fn new(settings: &Settings, workspace: &Workspace) -> Self {
        Self {
            tool: ExternalTool::new(&settings.separator),
            model: settings.separation_model.clone(),
            workspace: workspace.clone(),
            show_progress: settings.show_progress,
        }
    }

    /// Separate `trimmed` and normalize the stems under `output_name`
    ///
    /// On any failure no canonical output for `output_name` is left behind.
    pub fn separate(&self, trimmed: &Artifact, output_name: &str) -> Result<SeparatedPair> {
        if trimmed.stage != Stage::Trimmed {
            return Err(StemcutError::separation(
                &trimmed.path,
                format!("Expected a trimmed artifact, got {:?}", trimmed.stage),
            ));
        }

        let track_base = trimmed
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StemcutError::separation(&trimmed.path, "Trimmed file has no usable name"))?
            .to_string();

        let root = self.workspace.separated_dir();
        ensure_dir(&root).map_err(|e| {
            StemcutError::separation(
                &root,
                format!("Cannot create output directory: {}", describe_io_error(&root, &e)),
            )
        })?;

        // Outputs of an earlier run must not survive a failed one
        clear_canonical_outputs(&self.workspace, output_name)?;

        let mut progress = StageProgress::start(Stage::Separated, self.show_progress);
        let args = separation_args(&trimmed.path, &root, self.model.as_deref());
        debug!("Running {} {:?}", self.tool.program().display(), args);

        let tool_output = match self.tool.run(&args, |percent| progress.set_percent(percent)) {
            Ok(tool_output) => tool_output,
            Err(e) => {
                progress.abandon();
                return Err(StemcutError::separation(
                    &trimmed.path,
                    self.tool.describe_spawn_error(&e, "--demucs"),
                ));
            }
        };

        if !tool_output.success() {
            progress.abandon();
            return Err(StemcutError::SeparationError {
                path: trimmed.path.clone(),
                reason: format!("{} {}", self.tool.program().display(), tool_output.describe_status()),
                diagnostics: tool_output.diagnostics,
            });
        }

        let normalized = locate_stems(&root, &track_base)
            .and_then(|located| normalize_stems(&located, &self.workspace, output_name));

        let (vocals, no_vocals) = match normalized {
            Ok(paths) => paths,
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };
        progress.finish();

        info!("Vocals: {}", vocals.display());
        info!("Instrumental: {}", no_vocals.display());

        Ok(SeparatedPair {
            vocals: Artifact::new(Stage::Separated, vocals, ArtifactKind::VocalTrack),
            instrumental: Artifact::new(Stage::Separated, no_vocals, ArtifactKind::InstrumentalTrack),
        })
    }
}

/// demucs arguments for a vocals / everything-else split
fn separation_args(input: &Path, out_root: &Path, model: Option<&str>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        input.as_os_str().to_owned(),
        "--out".into(),
        out_root.as_os_str().to_owned(),
        "--two-stems".into(),
        "vocals".into(),
    ];
    if let Some(model) = model {
        args.push("-n".into());
        args.push(model.into());
    }
    args
}
