use crate::colors::ColorScheme;
use crate::formatters::{display_value, record_message, RecordFormatter};
use crate::metadata;
use crate::record::Record;

/// Standard logfmt formatter with colored output.
///
/// Metadata fields come first, then data fields, then the remaining text as
/// `msg`. Within metadata, timestamp, level and application lead.
pub struct LogfmtFormatter {
    colors: ColorScheme,
}

impl LogfmtFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self {
            colors: ColorScheme::new(use_colors),
        }
    }

    /// Ordered key/value pairs for a record
    pub fn fields(&self, record: &Record) -> Vec<(String, String)> {
        let mut meta: Vec<(&String, String)> = record
            .metadata
            .iter()
            .filter(|(key, _)| key.as_str() != metadata::MESSAGE)
            .map(|(key, value)| (key, display_value(value)))
            .collect();
        // Stable: the rest keeps insertion order
        meta.sort_by_key(|(key, _)| self.priority(key));

        let mut fields: Vec<(String, String)> = meta
            .into_iter()
            .map(|(key, value)| (key.clone(), value))
            .collect();
        fields.extend(
            record
                .data
                .iter()
                .map(|(key, value)| (key.clone(), display_value(value))),
        );

        let message = record_message(record);
        if !message.is_empty() {
            fields.push(("msg".to_string(), message));
        }
        fields
    }

    fn priority(&self, key: &str) -> u8 {
        match key {
            metadata::TIMESTAMP => 0,
            metadata::LEVEL => 1,
            metadata::APPLICATION => 2,
            _ => 3,
        }
    }

    /// Format a single key=value pair with appropriate colors
    pub fn format_key_value_pair(&self, key: &str, value: &str) -> String {
        let colored_key = self.colors.paint(self.colors.key, key);
        let equals = self.colors.paint(self.colors.equals, "=");
        let colored_value = self.format_value(key, value);

        format!("{}{}{}", colored_key, equals, colored_value)
    }

    fn format_value(&self, key: &str, value: &str) -> String {
        let color = match key {
            metadata::LEVEL => self.colors.level_color(value),
            metadata::TIMESTAMP => self.colors.timestamp,
            metadata::APPLICATION => self.colors.application,
            _ => self.colors.string,
        };

        let quoted_value = if self.needs_quoting(value) {
            format!("\"{}\"", self.escape(value))
        } else {
            value.to_string()
        };

        self.colors.paint(color, &quoted_value)
    }

    /// Check if value needs to be quoted per logfmt rules
    fn needs_quoting(&self, value: &str) -> bool {
        value.is_empty()
            || value.contains(' ')
            || value.contains('\t')
            || value.contains('\n')
            || value.contains('"')
            || value.contains('=')
    }

    /// Escape quotes, backslashes and newlines per logfmt rules
    fn escape(&self, value: &str) -> String {
        value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

impl RecordFormatter for LogfmtFormatter {
    fn format_record(&self, record: &Record) -> String {
        self.fields(record)
            .iter()
            .map(|(key, value)| self.format_key_value_pair(key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
