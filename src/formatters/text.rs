use crate::colors::ColorScheme;
use crate::formatters::{record_message, RecordFormatter};
use crate::metadata;
use crate::record::Record;
use chrono::SecondsFormat;

/// Human-oriented single line: `<ts> <LEVEL> [<application>] <message> <data>`.
/// Missing parts are left out.
pub struct TextFormatter {
    colors: ColorScheme,
}

impl TextFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self {
            colors: ColorScheme::new(use_colors),
        }
    }
}

impl RecordFormatter for TextFormatter {
    fn format_record(&self, record: &Record) -> String {
        let mut parts = Vec::new();

        if let Some(ts) = record.metadata.timestamp_value(metadata::TIMESTAMP) {
            let ts = ts.to_rfc3339_opts(SecondsFormat::Millis, true);
            parts.push(self.colors.paint(self.colors.timestamp, &ts));
        }

        let level = record.metadata.string_value(metadata::LEVEL);
        if !level.is_empty() {
            let color = self.colors.level_color(&level);
            parts.push(self.colors.paint(color, &format!("{:<5}", level.to_uppercase())));
        }

        let application = record.metadata.string_value(metadata::APPLICATION);
        if !application.is_empty() {
            let application = format!("[{}]", application);
            parts.push(self.colors.paint(self.colors.application, &application));
        }

        let message = record_message(record);
        if !message.is_empty() {
            parts.push(message);
        }

        if !record.data.is_empty() {
            parts.push(record.data.to_json().to_string());
        }

        parts.join(" ")
    }
}
