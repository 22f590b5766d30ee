// src/pipeline.rs
pub mod config;
pub mod context;
pub mod job;
pub mod processor;

pub use config::{JobOptions, ProcessorConfig};
pub use context::{Context, JobStats, LineOutcome};
pub use job::{Job, JobFinishedHook};
pub use processor::Processor;
