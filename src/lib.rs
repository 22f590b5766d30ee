// src/lib.rs
pub mod colors;
pub mod debug_log;
pub mod error;
pub mod formatters;
pub mod metadata;
pub mod output_format;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod record;
pub mod sink;
pub mod source;
pub mod value;

pub use error::*;
pub use pipeline::*;

pub use debug_log::{DebugLog, TracingDebugLog, WriterDebugLog};
pub use plugin::{Capability, Plugin, PluginRegistry};
pub use record::Record;
pub use sink::{FnSink, NullSink, Sink, VecSink, WriterSink};
pub use source::{LineSource, ReaderLineSource, SourceLine, StaticLineSource};
pub use value::{Value, ValueMap};
