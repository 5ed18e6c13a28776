//! Stage orchestration

pub mod orchestrator;

pub use orchestrator::{exit_code, run, PipelineResult};
