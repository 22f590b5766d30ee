use crate::metadata;
use crate::record::Record;

/// Trait for formatting records to strings
pub trait RecordFormatter {
    fn format_record(&self, record: &Record) -> String;
}

/// Render a value for key=value style output
pub(crate) fn display_value(value: &crate::value::Value) -> String {
    match value {
        crate::value::Value::Json(serde_json::Value::Null) => String::new(),
        other => other.to_string(),
    }
}

/// Message shown for a record: its text, or the `message` metadata when the
/// text was fully claimed by a plugin
pub(crate) fn record_message(record: &Record) -> String {
    if !record.text.is_empty() {
        record.text.clone()
    } else {
        record.metadata.string_value(metadata::MESSAGE)
    }
}

pub mod logfmt;
pub mod text;
