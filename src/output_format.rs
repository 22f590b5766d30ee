use crate::error::ProcessingError;
use crate::formatters::logfmt::LogfmtFormatter;
use crate::formatters::text::TextFormatter;
use crate::formatters::RecordFormatter;
use crate::record::Record;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(name = "jsonl", help = "JSON Lines format (one JSON object per record)")]
    Jsonl,
    #[value(name = "logfmt", help = "Logfmt format (key=value pairs)")]
    Logfmt,
    #[value(name = "text", help = "Human-readable single line per record")]
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "logfmt" => Ok(OutputFormat::Logfmt),
            "text" => Ok(OutputFormat::Text),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Writes records in one of the supported output formats
pub struct OutputFormatter {
    format: OutputFormat,
    logfmt: LogfmtFormatter,
    text: TextFormatter,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, use_colors: bool) -> Self {
        OutputFormatter {
            format,
            logfmt: LogfmtFormatter::new(use_colors),
            text: TextFormatter::new(use_colors),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn write_record<W: Write>(
        &self,
        output: &mut W,
        record: &Record,
    ) -> Result<(), ProcessingError> {
        match self.format {
            OutputFormat::Jsonl => self.write_jsonl(output, record),
            OutputFormat::Logfmt => {
                writeln!(output, "{}", self.logfmt.format_record(record))?;
                Ok(())
            }
            OutputFormat::Text => {
                writeln!(output, "{}", self.text.format_record(record))?;
                Ok(())
            }
        }
    }

    fn write_jsonl<W: Write>(&self, output: &mut W, record: &Record) -> Result<(), ProcessingError> {
        let json_line = serde_json::to_string(record)
            .map_err(|e| ProcessingError::Sink(anyhow::anyhow!("JSON encoding error: {}", e)))?;
        writeln!(output, "{}", json_line)?;
        Ok(())
    }
}
