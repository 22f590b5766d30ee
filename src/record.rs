// src/record.rs
use crate::value::ValueMap;
use serde::Serialize;

/// One logical log entry, built from one or more raw input lines
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub line_number: usize,
    pub line_count: usize,
    pub metadata: ValueMap,
    pub data: ValueMap,
    /// Part of the line not claimed by any plugin
    pub text: String,
    /// Untouched input line, only kept when source retention is enabled
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_source: String,
    /// Line after clean and metadata plugins, joined across all contributing lines
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rendered_source: String,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    pub fn with_line_count(mut self, line_count: usize) -> Self {
        self.line_count = line_count;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_rendered_source(mut self, source: impl Into<String>) -> Self {
        self.rendered_source = source.into();
        self
    }

    pub fn with_metadata(mut self, metadata: ValueMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_data(mut self, data: ValueMap) -> Self {
        self.data = data;
        self
    }

    /// Last raw line covered by this record
    pub fn last_line_number(&self) -> usize {
        self.line_number + self.line_count.max(1) - 1
    }

    /// Merge metadata and data of `lines` into this record, first value seen wins
    pub fn merge_lines_data(&mut self, lines: &[Record]) {
        for line in lines {
            self.metadata.merge_keep_existing(&line.metadata);
            self.data.merge_keep_existing(&line.data);
        }
    }
}

/// Text of every record joined with newlines
pub fn joined_text(lines: &[Record]) -> String {
    lines
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rendered source of every record joined with newlines
pub fn joined_rendered_source(lines: &[Record]) -> String {
    lines
        .iter()
        .map(|r| r.rendered_source.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
