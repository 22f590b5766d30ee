// src/source.rs
use crate::error::{ProcessingError, Result};
use crate::pipeline::context::Context;
use crate::record::Record;
use std::collections::VecDeque;
use std::io::{BufRead, Read};

/// One unit of input handed to a job
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLine {
    /// A raw text line, without its line terminator
    Text(String),
    /// A record built upstream; only its line number is assigned by the job
    Record(Record),
}

impl From<&str> for SourceLine {
    fn from(line: &str) -> Self {
        SourceLine::Text(line.to_string())
    }
}

impl From<String> for SourceLine {
    fn from(line: String) -> Self {
        SourceLine::Text(line)
    }
}

impl From<Record> for SourceLine {
    fn from(record: Record) -> Self {
        SourceLine::Record(record)
    }
}

/// Produces input lines one at a time.
///
/// `Ok(None)` means the source is exhausted. An `Err` is terminal, callers
/// should not ask for more lines after one.
pub trait LineSource {
    fn next_line(&mut self, ctx: &Context) -> Result<Option<SourceLine>>;
}

/// Reads newline-terminated lines from any buffered reader
pub struct ReaderLineSource<R: BufRead> {
    reader: R,
    max_line_length: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R, max_line_length: usize) -> Self {
        ReaderLineSource {
            reader,
            max_line_length,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn next_line(&mut self, ctx: &Context) -> Result<Option<SourceLine>> {
        if ctx.is_cancelled() {
            return Ok(None);
        }

        self.buf.clear();
        // One byte of slack for the terminator, plus one to detect overflow
        let limit = self.max_line_length as u64 + 2;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        if self.buf.len() > self.max_line_length {
            return Err(ProcessingError::LineTooLong {
                length: self.buf.len(),
                max_length: self.max_line_length,
            });
        }

        Ok(Some(SourceLine::Text(
            String::from_utf8_lossy(&self.buf).into_owned(),
        )))
    }
}

/// In-memory list of lines, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct StaticLineSource {
    lines: VecDeque<SourceLine>,
}

impl StaticLineSource {
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<SourceLine>,
    {
        StaticLineSource {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for StaticLineSource {
    fn next_line(&mut self, _ctx: &Context) -> Result<Option<SourceLine>> {
        Ok(self.lines.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(source: &mut impl LineSource) -> Vec<String> {
        let ctx = Context::new();
        let mut out = Vec::new();
        while let Some(line) = source.next_line(&ctx).unwrap() {
            match line {
                SourceLine::Text(text) => out.push(text),
                SourceLine::Record(record) => out.push(record.text),
            }
        }
        out
    }

    #[test]
    fn test_reader_strips_terminators() {
        let mut source = ReaderLineSource::new(Cursor::new("a\nb\r\n\nc"), 1024);
        assert_eq!(collect(&mut source), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_reader_decodes_lossily() {
        let mut source = ReaderLineSource::new(Cursor::new(b"ok \xff\n".to_vec()), 1024);
        assert_eq!(collect(&mut source), vec!["ok \u{FFFD}"]);
    }

    #[test]
    fn test_reader_line_too_long() {
        let ctx = Context::new();
        let mut source = ReaderLineSource::new(Cursor::new("12345\n123456\n"), 5);

        assert_eq!(
            source.next_line(&ctx).unwrap(),
            Some(SourceLine::Text("12345".into()))
        );
        match source.next_line(&ctx) {
            Err(ProcessingError::LineTooLong { max_length, .. }) => assert_eq!(max_length, 5),
            other => panic!("expected LineTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_exact_length_with_crlf() {
        let mut source = ReaderLineSource::new(Cursor::new("12345\r\n"), 5);
        assert_eq!(collect(&mut source), vec!["12345"]);
    }

    #[test]
    fn test_reader_stops_when_cancelled() {
        let ctx = Context::new();
        let mut source = ReaderLineSource::new(Cursor::new("a\nb\n"), 1024);
        assert!(source.next_line(&ctx).unwrap().is_some());
        ctx.cancel();
        assert!(source.next_line(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_static_source() {
        let mut source = StaticLineSource::new(vec![
            SourceLine::from("first"),
            SourceLine::from(Record::new().with_text("second")),
        ]);
        assert_eq!(collect(&mut source), vec!["first", "second"]);
    }
}
