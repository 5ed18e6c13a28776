//! Configuration and CLI handling

pub mod cli;
pub mod prompt;
pub mod settings;

pub use cli::{Cli, TrimBackendKind};
pub use settings::{Settings, ACQUIRE_SAMPLE_RATE};
