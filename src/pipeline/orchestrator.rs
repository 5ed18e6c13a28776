//! Pipeline orchestration
//!
//! Validates the job, then runs acquisition, trimming and separation in
//! order. Each stage's artifact is the only input of the next one. The first
//! failure stops the run; files of completed stages are left as they are.

use crate::acquire::Acquirer;
use crate::audio;
use crate::config::Settings;
use crate::error::Result;
use crate::logging::RunLog;
use crate::separate::Separator;
use crate::trim::Trimmer;
use crate::types::{Artifact, Job, SeparatedPair, Stage, StageReport};
use crate::workspace::{validate_output_name, Workspace};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    pub vocals_path: PathBuf,
    pub instrumental_path: PathBuf,
    /// Completed stages in order
    pub stages: Vec<StageReport>,
}

/// Stages completed so far in this run; dropped on failure
#[derive(Debug, Default)]
struct PipelineState {
    completed: Vec<StageReport>,
}

impl PipelineState {
    /// Run one stage, logging its start, completion or failure
    fn run_stage<T>(
        &mut self,
        stage: Stage,
        outputs_of: impl Fn(&T) -> Vec<PathBuf>,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        info!("{}...", stage);
        let start = Instant::now();

        match f() {
            Ok(value) => {
                let elapsed = start.elapsed();
                let outputs = outputs_of(&value);
                let listed: Vec<String> = outputs.iter().map(|p| p.display().to_string()).collect();
                info!(
                    "{} complete: {} ({:.2}s)",
                    stage.label(),
                    listed.join(", "),
                    elapsed.as_secs_f64()
                );
                self.completed.push(StageReport {
                    stage,
                    outputs,
                    elapsed,
                });
                Ok(value)
            }
            Err(e) => {
                error!("{} failed: {}", stage.label(), e);
                Err(e)
            }
        }
    }
}

/// Run the whole job with `log` as the active log
pub fn run(job: &Job, settings: &Settings, log: &RunLog) -> Result<PipelineResult> {
    log.in_scope(|| run_job(job, settings))
}

fn run_job(job: &Job, settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    // Validate before touching the filesystem or spawning anything
    let range = match validate_output_name(&job.output_name).and_then(|_| job.validate_range()) {
        Ok(range) => range,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    info!(
        "Job '{}': {} from {}",
        job.output_name, range, job.source_reference
    );

    let workspace = Workspace::new(&settings.workdir);
    let backend = audio::backend_for(settings.trim_backend);
    debug!("Using {} trimming backend", backend.name());

    let acquirer = Acquirer::new(settings, &workspace);
    let trimmer = Trimmer::new(backend, &workspace, settings.show_progress);
    let separator = Separator::new(settings, &workspace);

    let mut state = PipelineState::default();

    let acquired = state.run_stage(Stage::Acquired, artifact_path, || {
        acquirer.acquire(&job.source_reference, &job.output_name)
    })?;

    let trimmed = state.run_stage(Stage::Trimmed, artifact_path, || {
        trimmer.trim(&acquired, range, &job.output_name)
    })?;

    let separated = state.run_stage(
        Stage::Separated,
        |pair: &SeparatedPair| vec![pair.vocals.path.clone(), pair.instrumental.path.clone()],
        || separator.separate(&trimmed, &job.output_name),
    )?;

    debug_assert_eq!(state.completed.len(), Stage::ALL.len());

    info!(
        "All done in {:.2}s. Check the '{}' folder for outputs.",
        pipeline_start.elapsed().as_secs_f64(),
        workspace.separated_dir().display()
    );

    Ok(PipelineResult {
        vocals_path: separated.vocals.path,
        instrumental_path: separated.instrumental.path,
        stages: state.completed,
    })
}

fn artifact_path(artifact: &Artifact) -> Vec<PathBuf> {
    vec![artifact.path.clone()]
}

/// Exit code for a finished run: 0 on success, 1 on any failure
pub fn exit_code<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
