use std::fmt;
use std::path::PathBuf;

/// Plugin stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Metadata,
    Structure,
    Parse,
    Consolidate,
    ParseFormat,
    PostProcess,
    Create,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Clean => "clean",
            Stage::Metadata => "metadata",
            Stage::Structure => "structure",
            Stage::Parse => "parse",
            Stage::Consolidate => "consolidate",
            Stage::ParseFormat => "parse-format",
            Stage::PostProcess => "post-process",
            Stage::Create => "create",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Plugin error in {stage} stage at line {line}: {source}")]
    Plugin {
        stage: Stage,
        line: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Consolidate plugin requested {requested} top lines but only {available} are available")]
    ConsolidateOverrun { requested: usize, available: usize },

    #[error("Line too long: {length} > {max_length}")]
    LineTooLong { length: usize, max_length: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink error: {0}")]
    Sink(#[source] anyhow::Error),
}

impl ProcessingError {
    pub(crate) fn plugin(stage: Stage, line: usize, source: anyhow::Error) -> Self {
        ProcessingError::Plugin {
            stage,
            line,
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config syntax: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T, E = ProcessingError> = std::result::Result<T, E>;
