// src/metadata.rs
//! Well-known metadata keys and values shared by the engine and plugins.

pub const STRUCTURE: &str = "structure";
pub const FORMAT: &str = "format";
pub const LEVEL: &str = "level";
/// Timestamp of the record (`Value::Timestamp`)
pub const TIMESTAMP: &str = "ts";
/// Whether the timestamp was carried forward instead of read from the data
pub const TIMESTAMP_CALCULATED: &str = "ts_calc";
pub const MESSAGE: &str = "message";
pub const APPLICATION: &str = "application";
pub const APPLICATION_SOURCE: &str = "application_source";
/// List of cleaners that touched the line
pub const CLEAN: &str = "clean";
pub const CATEGORY: &str = "category";
/// Category before a plugin replaced it
pub const ORIGINAL_CATEGORY: &str = "original_category";
/// Record synthesized by a create plugin instead of read from the input
pub const CREATED: &str = "created";
/// Record is dropped silently before reaching the sink
pub const SKIP: &str = "skip";

pub const STRUCTURE_JSON: &str = "json";
pub const STRUCTURE_XML: &str = "xml";

pub const LEVEL_TRACE: &str = "trace";
pub const LEVEL_DEBUG: &str = "debug";
pub const LEVEL_INFO: &str = "info";
pub const LEVEL_WARNING: &str = "warn";
pub const LEVEL_ERROR: &str = "error";

pub const CLEAN_ANSI_ESCAPE: &str = "ansi_escape";
