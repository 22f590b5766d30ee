// src/pipeline/context.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-run context threaded through every plugin, source and sink call.
///
/// Cancellation is cooperative: the reader source stops producing lines once
/// the token is cancelled, and long-running plugins may poll it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// What happened to a line handed to `Job::process_line`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line entered the backlog (and may already have been emitted)
    Accepted,
    /// Below the start line, or empty after cleaning
    Skipped,
    /// Past the configured line window; stop feeding lines
    Finished,
}

/// Runtime statistics for one job
#[derive(Debug, Default, Clone)]
pub struct JobStats {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub records_emitted: usize,
    pub records_created: usize,
    pub records_dropped: usize,
    pub structure_matches: usize,
    pub parse_matches: usize,
    pub consolidations: usize,
    pub forced_flushes: usize,
    pub processing_time: Duration,
}
