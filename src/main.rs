//! stemcut CLI entry point

use clap::Parser;
use stemcut::config::prompt::resolve_time_bounds;
use stemcut::config::{Cli, Settings};
use stemcut::logging::RunLog;
use stemcut::{pipeline, Job, StemcutError};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Build settings from CLI
    let settings = Settings::from_cli(&cli);

    if let Err(e) = std::fs::create_dir_all(&settings.workdir) {
        eprintln!("Error: {}", StemcutError::output_error(&settings.workdir, e));
        return ExitCode::FAILURE;
    }

    // One log per run, truncated at start
    let log_path = settings.log_path();
    let log = match RunLog::create(&log_path, settings.log_level) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: {}", StemcutError::output_error(&log_path, e));
            return ExitCode::FAILURE;
        }
    };

    let bounds = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        resolve_time_bounds(cli.start, cli.end, &mut input, &mut output)
    };

    let result = match bounds {
        Ok((start, end)) => {
            let job = Job::new(cli.source.as_str(), cli.name.as_str(), start, end);
            pipeline::run(&job, &settings, &log)
        }
        Err(e) => {
            log.in_scope(|| error!("{}", e));
            Err(e)
        }
    };

    let code = pipeline::exit_code(&result);

    if let Err(e) = log.finish(result.is_ok()) {
        eprintln!("Warning: could not flush process.log: {}", e);
    }

    match result {
        Ok(outputs) => {
            println!();
            println!("Vocals:       {}", outputs.vocals_path.display());
            println!("Instrumental: {}", outputs.instrumental_path.display());
            ExitCode::SUCCESS
        }
        // Already reported through the log
        Err(_) => ExitCode::from(code),
    }
}
