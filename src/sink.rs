// src/sink.rs
use crate::error::{ProcessingError, Result};
use crate::output_format::{OutputFormat, OutputFormatter};
use crate::pipeline::context::Context;
use crate::record::Record;
use std::io::Write;

/// Receives the records a job emits.
///
/// `on_flush` and then `on_close` are each called exactly once when the job
/// finishes.
pub trait Sink {
    /// Returns whether the sink wants more records. The engine currently keeps
    /// feeding records regardless.
    fn on_record(&mut self, ctx: &Context, record: Record) -> Result<bool>;

    fn on_flush(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn on_close(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// Accumulates every record in memory
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<Record>,
    pub flushed: bool,
    pub closed: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl Sink for VecSink {
    fn on_record(&mut self, _ctx: &Context, record: Record) -> Result<bool> {
        self.records.push(record);
        Ok(true)
    }

    fn on_flush(&mut self, _ctx: &Context) -> Result<()> {
        self.flushed = true;
        Ok(())
    }

    fn on_close(&mut self, _ctx: &Context) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn on_record(&mut self, _ctx: &Context, _record: Record) -> Result<bool> {
        Ok(true)
    }
}

/// Hands every record to a closure
pub struct FnSink<F>(pub F);

impl<F> Sink for FnSink<F>
where
    F: FnMut(Record),
{
    fn on_record(&mut self, _ctx: &Context, record: Record) -> Result<bool> {
        (self.0)(record);
        Ok(true)
    }
}

/// Renders records to a writer
pub struct WriterSink<W: Write> {
    output: W,
    formatter: OutputFormatter,
}

impl<W: Write> WriterSink<W> {
    pub fn new(output: W, format: OutputFormat, use_colors: bool) -> Self {
        WriterSink {
            output,
            formatter: OutputFormatter::new(format, use_colors),
        }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn on_record(&mut self, _ctx: &Context, record: Record) -> Result<bool> {
        match self.formatter.write_record(&mut self.output, &record) {
            Ok(()) => Ok(true),
            // Reader went away (e.g. piped into head); stop quietly
            Err(ProcessingError::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn on_flush(&mut self, _ctx: &Context) -> Result<()> {
        match self.output.flush() {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            other => other.map_err(ProcessingError::from),
        }
    }
}
