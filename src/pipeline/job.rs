// src/pipeline/job.rs
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::debug_log::DebugLog;
use crate::error::{ProcessingError, Result, Stage};
use crate::metadata;
use crate::pipeline::config::JobOptions;
use crate::pipeline::context::{Context, JobStats, LineOutcome};
use crate::plugin::PluginRegistry;
use crate::record::{joined_rendered_source, Record};
use crate::sink::Sink;
use crate::source::SourceLine;

/// Called once per job, after the backlog is flushed and before the sink is closed
pub type JobFinishedHook = Arc<dyn Fn(&Context, &JobStats) -> anyhow::Result<()> + Send + Sync>;

struct JobState<S> {
    backlog: Vec<Record>,
    line_number: usize,
    /// Last known timestamp, given to records without one
    last_time: Option<DateTime<Utc>>,
    sink: S,
    stats: JobStats,
}

/// Classifies one stream of lines into records.
///
/// Lines are fed one at a time through [`Job::process_line`]. Unmatched lines
/// wait in a backlog until a structure or parse plugin claims a window ending
/// at the newest line, a sequence plugin breaks the run, or the backlog
/// overflows; then they are consolidated and emitted to the sink.
pub struct Job<S: Sink> {
    plugins: Arc<PluginRegistry>,
    options: JobOptions,
    debug_log: Option<Arc<dyn DebugLog>>,
    hooks: Vec<JobFinishedHook>,
    started: Instant,
    state: Mutex<JobState<S>>,
}

impl<S: Sink> Job<S> {
    pub fn new(plugins: Arc<PluginRegistry>, options: JobOptions, sink: S) -> Self {
        Job {
            plugins,
            options,
            debug_log: None,
            hooks: Vec::new(),
            started: Instant::now(),
            state: Mutex::new(JobState {
                backlog: Vec::new(),
                line_number: 0,
                last_time: None,
                sink,
                stats: JobStats::default(),
            }),
        }
    }

    pub fn with_debug_log(mut self, debug_log: Option<Arc<dyn DebugLog>>) -> Self {
        self.debug_log = debug_log;
        self
    }

    pub fn with_hooks(mut self, hooks: Vec<JobFinishedHook>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Snapshot of the statistics so far
    pub fn stats(&self) -> JobStats {
        let mut stats = self.lock_state().stats.clone();
        stats.processing_time = self.started.elapsed();
        stats
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState<S>> {
        // State stays consistent between lines; a panicking plugin only loses its own line
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed the next input line
    pub fn process_line(&self, ctx: &Context, line: SourceLine) -> Result<LineOutcome> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        state.line_number += 1;
        state.stats.lines_read += 1;
        let line_number = state.line_number;

        if line_number < self.options.start_line {
            state.stats.lines_skipped += 1;
            return Ok(LineOutcome::Skipped);
        }
        // Zero means no limit
        if let Some(amount) = self.options.line_amount.filter(|&amount| amount > 0) {
            if line_number > self.options.start_line + amount {
                tracing::debug!(line_number, "line window exhausted");
                return Ok(LineOutcome::Finished);
            }
        }

        let (mut record, raw) = self.materialize(line_number, line);

        for plugin in &self.plugins.clean {
            plugin
                .clean(ctx, &mut record)
                .map_err(|e| ProcessingError::plugin(Stage::Clean, line_number, e))?;
        }

        let trimmed = record.text.trim();
        if trimmed.len() != record.text.len() {
            record.text = trimmed.to_string();
        }
        if record.text.is_empty() {
            state.stats.lines_skipped += 1;
            return Ok(LineOutcome::Skipped);
        }

        if let Some(log) = &self.debug_log {
            log.log_source_line(ctx, line_number, &record.text, &raw);
        }

        for plugin in &self.plugins.metadata {
            plugin
                .extract_metadata(ctx, &mut record)
                .map_err(|e| ProcessingError::plugin(Stage::Metadata, line_number, e))?;
        }

        if self.options.include_source {
            record.rendered_source = record.text.clone();
        }

        state.backlog.push(record);

        let mut found = self.scan_structure(ctx, &state.backlog, line_number)?;
        if found.is_some() {
            state.stats.structure_matches += 1;
        } else {
            found = self.scan_parse(ctx, &state.backlog, line_number)?;
            if found.is_some() {
                state.stats.parse_matches += 1;
            }
        }

        if let Some((start, mut matched)) = found {
            matched.line_number = state.backlog[start].line_number;
            matched.line_count = state.backlog.len() - start;
            if self.options.include_source {
                matched.rendered_source = joined_rendered_source(&state.backlog[start..]);
            }
            if state.last_time.is_none() {
                state.last_time = matched.metadata.timestamp_value(metadata::TIMESTAMP);
            }

            let mut previous = std::mem::take(&mut state.backlog);
            previous.truncate(start);
            self.flush(ctx, state, previous)?;

            let carried = state.last_time;
            state.last_time = self.emit(ctx, state, matched, carried, true)?;
        } else if state.backlog.len() > 1 && self.breaks_sequence(ctx, &state.backlog) {
            let mut previous = std::mem::take(&mut state.backlog);
            let newest = previous.pop();
            tracing::debug!(line_number, lines = previous.len(), "sequence break");
            self.flush(ctx, state, previous)?;
            state.backlog.extend(newest);
        }

        if state.backlog.len() > self.options.max_backlog_lines {
            let lines = std::mem::take(&mut state.backlog);
            tracing::debug!(line_number, lines = lines.len(), "backlog full, forcing flush");
            state.stats.forced_flushes += 1;
            self.flush(ctx, state, lines)?;
        }

        Ok(LineOutcome::Accepted)
    }

    /// Flush what is left, run the finished hooks, then flush and close the
    /// sink and hand it back.
    pub fn finish(self, ctx: &Context) -> Result<S> {
        self.finish_with_stats(ctx).map(|(sink, _)| sink)
    }

    pub fn finish_with_stats(self, ctx: &Context) -> Result<(S, JobStats)> {
        {
            let mut guard = self.lock_state();
            let state = &mut *guard;

            if !state.backlog.is_empty() {
                let lines = std::mem::take(&mut state.backlog);
                self.flush(ctx, state, lines)?;
            }

            state.stats.processing_time = self.started.elapsed();
            for hook in &self.hooks {
                if let Err(e) = hook(ctx, &state.stats) {
                    tracing::warn!(error = %e, "job finished hook failed");
                }
            }

            state.sink.on_flush(ctx)?;
            state.sink.on_close(ctx)?;
        }

        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Ok((state.sink, state.stats))
    }

    fn materialize(&self, line_number: usize, line: SourceLine) -> (Record, String) {
        match line {
            SourceLine::Text(text) => {
                let raw = if self.debug_log.is_some() {
                    text.clone()
                } else {
                    String::new()
                };
                let mut record = Record::new()
                    .with_line_number(line_number)
                    .with_line_count(1);
                if self.options.include_source {
                    record.raw_source = text.clone();
                }
                record.text = text;
                (record, raw)
            }
            SourceLine::Record(mut record) => {
                record.line_number = line_number;
                if record.line_count == 0 {
                    record.line_count = 1;
                }
                if !self.options.include_source {
                    record.raw_source.clear();
                    record.rendered_source.clear();
                }
                let raw = if self.debug_log.is_some() {
                    record.data.to_json().to_string()
                } else {
                    String::new()
                };
                (record, raw)
            }
        }
    }

    fn scan_structure(
        &self,
        ctx: &Context,
        backlog: &[Record],
        line_number: usize,
    ) -> Result<Option<(usize, Record)>> {
        if self.plugins.structure.is_empty() {
            return Ok(None);
        }
        lookback(backlog, |window, scratch| {
            for plugin in &self.plugins.structure {
                let mut candidate = scratch.clone();
                let matched = plugin
                    .extract_structure(ctx, window, &mut candidate)
                    .map_err(|e| ProcessingError::plugin(Stage::Structure, line_number, e))?;
                if matched {
                    return Ok(Some(candidate));
                }
            }
            Ok(None)
        })
    }

    fn scan_parse(
        &self,
        ctx: &Context,
        backlog: &[Record],
        line_number: usize,
    ) -> Result<Option<(usize, Record)>> {
        if self.plugins.parse.is_empty() {
            return Ok(None);
        }
        lookback(backlog, |window, scratch| {
            for plugin in &self.plugins.parse {
                let mut candidate = scratch.clone();
                let matched = plugin
                    .extract_parse(ctx, window, &mut candidate)
                    .map_err(|e| ProcessingError::plugin(Stage::Parse, line_number, e))?;
                if matched {
                    return Ok(Some(candidate));
                }
            }
            Ok(None)
        })
    }

    fn breaks_sequence(&self, ctx: &Context, backlog: &[Record]) -> bool {
        match backlog {
            [.., previous, current] => self
                .plugins
                .sequence
                .iter()
                .any(|p| p.breaks_sequence(ctx, previous, current)),
            _ => false,
        }
    }

    /// Emit `lines` in order, folding runs with consolidate plugins
    fn flush(&self, ctx: &Context, state: &mut JobState<S>, mut lines: Vec<Record>) -> Result<()> {
        let mut cursor = 0;
        while cursor < lines.len() {
            let consolidated = self.consolidate(ctx, &lines[cursor..])?;

            let (record, consumed) = match consolidated {
                Some((record, top)) => {
                    state.stats.consolidations += 1;
                    (record, top)
                }
                None => {
                    let mut record = std::mem::take(&mut lines[cursor]);
                    record.line_count = 1;
                    (record, 1)
                }
            };

            let carried = state.last_time;
            state.last_time = self.emit(ctx, state, record, carried, true)?;
            cursor += consumed;
        }
        Ok(())
    }

    fn consolidate(&self, ctx: &Context, lines: &[Record]) -> Result<Option<(Record, usize)>> {
        let Some(first) = lines.first() else {
            return Ok(None);
        };

        for plugin in &self.plugins.consolidate {
            let mut record = Record::new().with_line_number(first.line_number);
            let top = plugin
                .consolidate(ctx, lines, &mut record)
                .map_err(|e| ProcessingError::plugin(Stage::Consolidate, first.line_number, e))?;

            let Some(top) = top else { continue };
            if top == 0 || top > lines.len() {
                return Err(ProcessingError::ConsolidateOverrun {
                    requested: top,
                    available: lines.len(),
                });
            }

            record.line_count = top;
            if self.options.include_source {
                record.rendered_source = joined_rendered_source(&lines[..top]);
            }
            return Ok(Some((record, top)));
        }
        Ok(None)
    }

    /// Finalize a record and hand it to the sink.
    ///
    /// Returns the timestamp to carry forward; skipped records leave `carried`
    /// unchanged.
    fn emit(
        &self,
        ctx: &Context,
        state: &mut JobState<S>,
        mut record: Record,
        carried: Option<DateTime<Utc>>,
        create_enabled: bool,
    ) -> Result<Option<DateTime<Utc>>> {
        let line_number = record.line_number;

        if !record.metadata.has_value(metadata::FORMAT) {
            for plugin in &self.plugins.parse_format {
                let matched = plugin
                    .parse_format(ctx, &mut record)
                    .map_err(|e| ProcessingError::plugin(Stage::ParseFormat, line_number, e))?;
                if matched {
                    break;
                }
            }
        }

        for plugin in &self.plugins.post_process {
            plugin
                .post_process(ctx, &mut record)
                .map_err(|e| ProcessingError::plugin(Stage::PostProcess, line_number, e))?;
        }

        let next = if record.metadata.has_value(metadata::TIMESTAMP) {
            record
                .metadata
                .timestamp_value(metadata::TIMESTAMP)
                .or(carried)
        } else {
            record
                .metadata
                .set(metadata::TIMESTAMP, carried.unwrap_or_else(Utc::now));
            record.metadata.set(metadata::TIMESTAMP_CALCULATED, true);
            carried
        };

        if record.metadata.bool_value(metadata::SKIP) {
            state.stats.records_dropped += 1;
            return Ok(carried);
        }

        let creating = create_enabled && !self.plugins.create.is_empty();
        if creating {
            let before = self.create_records(ctx, &record, true)?;
            self.emit_created(ctx, state, before, carried)?;
        }

        // Create-after sees the record only once the sink owns it
        let delivered = creating.then(|| record.clone());

        if let Some(log) = &self.debug_log {
            log.log_record(ctx, &record);
        }
        // The continuation flag is advisory; every record is offered
        let _ = state.sink.on_record(ctx, record)?;
        state.stats.records_emitted += 1;

        if let Some(delivered) = delivered {
            let after = self.create_records(ctx, &delivered, false)?;
            self.emit_created(ctx, state, after, carried)?;
        }

        Ok(next)
    }

    fn create_records(&self, ctx: &Context, record: &Record, before: bool) -> Result<Vec<Record>> {
        let mut created = Vec::new();
        for plugin in &self.plugins.create {
            let records = if before {
                plugin.create_before(ctx, record)
            } else {
                plugin.create_after(ctx, record)
            }
            .map_err(|e| ProcessingError::plugin(Stage::Create, record.line_number, e))?;
            created.extend(records);
        }
        Ok(created)
    }

    fn emit_created(
        &self,
        ctx: &Context,
        state: &mut JobState<S>,
        records: Vec<Record>,
        carried: Option<DateTime<Utc>>,
    ) -> Result<()> {
        for mut record in records {
            record.metadata.set(metadata::CREATED, true);
            state.stats.records_created += 1;
            self.emit(ctx, state, record, carried, false)?;
        }
        Ok(())
    }
}

/// Walk windows ending at the newest record, from the shortest to the whole
/// backlog, until `try_window` claims one. Returns the window start and the
/// claimed record.
fn lookback<F>(backlog: &[Record], mut try_window: F) -> Result<Option<(usize, Record)>>
where
    F: FnMut(&[Record], &Record) -> Result<Option<Record>>,
{
    let Some(current) = backlog.last() else {
        return Ok(None);
    };
    for start in (0..backlog.len()).rev() {
        if let Some(record) = try_window(&backlog[start..], current)? {
            return Ok(Some((start, record)));
        }
    }
    Ok(None)
}
