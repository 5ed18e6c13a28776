//! Run log
//!
//! Every run writes `process.log` (truncated per run, timestamped) and mirrors
//! the same lines to the console without timestamps. The subscriber is owned
//! by a [`RunLog`] value and only active inside [`RunLog::in_scope`], so
//! nothing is installed globally.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Dispatch, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, Layer, Registry};

/// Timestamp format for the log file
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Log context for one job: created at job start, finished at job end
pub struct RunLog {
    dispatch: Dispatch,
    file: Arc<File>,
}

impl RunLog {
    /// Create the log file and mirror events at `console_level` to stdout
    pub fn create(path: &Path, console_level: Level) -> std::io::Result<Self> {
        Self::build(path, Some(console_level))
    }

    /// Create the log file without a console mirror
    pub fn create_file_only(path: &Path) -> std::io::Result<Self> {
        Self::build(path, None)
    }

    fn build(path: &Path, console_level: Option<Level>) -> std::io::Result<Self> {
        let file = Arc::new(File::create(path)?);

        // The file always records the run at info or finer
        let file_level = match console_level {
            Some(level) if level > Level::INFO => level,
            _ => Level::INFO,
        };

        let file_layer = fmt::layer()
            .with_writer(Arc::clone(&file))
            .with_ansi(false)
            .with_target(false)
            .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
            .with_filter(LevelFilter::from_level(file_level));

        let console_layer = console_level.map(|level| {
            fmt::layer()
                .with_writer(std::io::stdout)
                .without_time()
                .with_target(false)
                .with_level(false)
                .with_filter(LevelFilter::from_level(level))
        });

        let subscriber = Registry::default().with(file_layer).with(console_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            file,
        })
    }

    /// Run `f` with this log as the active subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Write the closing line and flush the file to disk
    pub fn finish(self, success: bool) -> std::io::Result<()> {
        self.in_scope(|| {
            info!(
                "Run {} at {}",
                if success { "finished" } else { "aborted" },
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        });
        self.file.sync_all()
    }
}
