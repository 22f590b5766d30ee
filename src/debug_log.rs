// src/debug_log.rs
use crate::pipeline::context::Context;
use crate::plugins::clean::strip_ansi;
use crate::record::Record;
use crate::value::ValueMap;
use std::io::Write;
use std::sync::Mutex;

/// Side channel observing each processing step
pub trait DebugLog: Send + Sync {
    /// Called for every input line after cleaning and trimming
    fn log_source_line(&self, ctx: &Context, line_number: usize, line: &str, raw: &str);
    /// Called right before a record reaches the sink
    fn log_record(&self, ctx: &Context, record: &Record);
}

/// Writes a human-readable trace to any writer
pub struct WriterDebugLog {
    writer: Mutex<Box<dyn Write + Send>>,
    include_source: bool,
}

impl WriterDebugLog {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        WriterDebugLog {
            writer: Mutex::new(writer),
            include_source: false,
        }
    }

    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Also print the rendered source, with ANSI escapes removed
    pub fn with_include_source(mut self, include_source: bool) -> Self {
        self.include_source = include_source;
        self
    }

    fn write_line(&self, line: &str) {
        // A poisoned writer only loses debug output
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }

    pub(crate) fn format_record(&self, record: &Record) -> String {
        let line_range = if record.line_count > 1 {
            format!("[{}-{}]", record.line_number, record.last_line_number())
        } else {
            format!("[{}]", record.line_number)
        };

        let mut parts = Vec::new();
        if !record.metadata.is_empty() {
            parts.push(format!("Metadata: {}", format_map(&record.metadata)));
        }
        if !record.data.is_empty() {
            parts.push(format!("Data: {}", format_map(&record.data)));
        }
        if !record.text.is_empty() {
            parts.push(format!("Line: \"{}\"", record.text));
        }
        if self.include_source && !record.rendered_source.is_empty() {
            let source = strip_ansi(&record.rendered_source)
                .unwrap_or_else(|| record.rendered_source.clone());
            parts.push(format!("Source: \"{}\"", source));
        }

        format!("*** PROCESS LINE {}: {}", line_range, parts.join(" - "))
    }
}

impl DebugLog for WriterDebugLog {
    fn log_source_line(&self, _ctx: &Context, line_number: usize, line: &str, _raw: &str) {
        self.write_line(&format!("@@@ SOURCE LINE [{}]: '{}' @@@", line_number, line));
    }

    fn log_record(&self, _ctx: &Context, record: &Record) {
        let line = self.format_record(record);
        self.write_line(&line);
    }
}

fn format_map(map: &ValueMap) -> String {
    let fields: Vec<String> = map.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
    format!("{{{}}}", fields.join(" "))
}

/// Emits every step as `tracing` events at TRACE level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDebugLog;

impl DebugLog for TracingDebugLog {
    fn log_source_line(&self, _ctx: &Context, line_number: usize, line: &str, raw: &str) {
        tracing::trace!(line_number, line, raw, "source line");
    }

    fn log_record(&self, _ctx: &Context, record: &Record) {
        tracing::trace!(
            line_number = record.line_number,
            line_count = record.line_count,
            metadata = %record.metadata.to_json(),
            data = %record.data.to_json(),
            text = %record.text,
            "record"
        );
    }
}
