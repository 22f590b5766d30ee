// src/pipeline/config.rs
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_MAX_BACKLOG_LINES: usize = 50;
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Options scoped to a single job
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Lines before this one are skipped
    pub start_line: usize,
    /// Stop after `start_line + line_amount`; zero is unlimited
    pub line_amount: Option<usize>,
    /// Keep raw and rendered source text on every record
    pub include_source: bool,
    /// Force a flush once the backlog grows past this many lines
    pub max_backlog_lines: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        JobOptions {
            start_line: 0,
            line_amount: None, // Unlimited
            include_source: false,
            max_backlog_lines: DEFAULT_MAX_BACKLOG_LINES,
        }
    }
}

/// Configuration for the processor and the jobs it creates
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    #[serde(flatten)]
    pub job: JobOptions,
    /// Longest line accepted from a reader source
    pub buffer_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            job: JobOptions::default(),
            buffer_size: DEFAULT_BUFFER_SIZE, // 1MB
        }
    }
}

impl ProcessorConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ProcessorConfig = if source.trim().is_empty() {
            ProcessorConfig::default()
        } else {
            serde_yaml::from_str(source)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job.max_backlog_lines == 0 {
            return Err(ConfigError::Invalid(
                "max_backlog_lines must be at least 1".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
