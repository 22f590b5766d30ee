// src/plugin.rs
use crate::pipeline::context::Context;
use crate::record::Record;
use anyhow::Result;
use std::sync::Arc;

pub const POST_PROCESS_ORDER_FIRST: i32 = 0;
pub const POST_PROCESS_ORDER_DEFAULT: i32 = 5;
pub const POST_PROCESS_ORDER_LAST: i32 = 10;

/// Cleans a line before any other plugin sees it.
/// Change `record.text` to modify the line; tag `record.metadata` so other
/// plugins can detect the change.
pub trait CleanPlugin: Send + Sync {
    fn clean(&self, ctx: &Context, record: &mut Record) -> Result<bool>;
}

/// Extracts leading metadata (timestamp, level...) from a line, optionally
/// removing it from `record.text`.
pub trait MetadataPlugin: Send + Sync {
    fn extract_metadata(&self, ctx: &Context, record: &mut Record) -> Result<bool>;
}

/// Detects that the joined text of `lines` is one complete structured
/// document (JSON, XML...). Partial matches must be rejected.
///
/// `lines` ends with the current line; `record` is a scratch copy of it and
/// replaces it only when `true` is returned.
pub trait StructurePlugin: Send + Sync {
    fn extract_structure(&self, ctx: &Context, lines: &[Record], record: &mut Record)
        -> Result<bool>;
}

/// Detects that the joined text of `lines` is a known textual log format.
/// Same window contract as [`StructurePlugin`].
pub trait ParsePlugin: Send + Sync {
    fn extract_parse(&self, ctx: &Context, lines: &[Record], record: &mut Record) -> Result<bool>;
}

/// Decides whether two adjacent unmatched records must not be grouped,
/// for example because they belong to different applications.
pub trait SequencePlugin: Send + Sync {
    fn breaks_sequence(&self, ctx: &Context, previous: &Record, current: &Record) -> bool;
}

/// Folds lines no other plugin understood, like multi-line stack traces, into
/// one record.
///
/// Always read from the front of `lines` and return `Some(n)` with the number
/// of leading lines consumed. The plugin is called again for the remaining
/// lines, so stop at the first line that does not belong.
pub trait ConsolidatePlugin: Send + Sync {
    fn consolidate(&self, ctx: &Context, lines: &[Record], record: &mut Record)
        -> Result<Option<usize>>;
}

/// Called for records without a format, to derive one from parsed data.
pub trait ParseFormatPlugin: Send + Sync {
    fn parse_format(&self, ctx: &Context, record: &mut Record) -> Result<bool>;
}

/// Creates records that are not present in the input, emitted right before
/// or after the record that triggered them.
pub trait CreatePlugin: Send + Sync {
    fn create_before(&self, ctx: &Context, record: &Record) -> Result<Vec<Record>>;
    fn create_after(&self, ctx: &Context, record: &Record) -> Result<Vec<Record>>;
}

/// Last mutation pass before a record reaches the sink.
/// Lower orders run first; keep within `POST_PROCESS_ORDER_FIRST..=POST_PROCESS_ORDER_LAST`.
pub trait PostProcessPlugin: Send + Sync {
    fn order(&self) -> i32 {
        POST_PROCESS_ORDER_DEFAULT
    }
    fn post_process(&self, ctx: &Context, record: &mut Record) -> Result<bool>;
}

/// One role a plugin instance fulfils
#[derive(Clone)]
pub enum Capability {
    Clean(Arc<dyn CleanPlugin>),
    Metadata(Arc<dyn MetadataPlugin>),
    Structure(Arc<dyn StructurePlugin>),
    Parse(Arc<dyn ParsePlugin>),
    Sequence(Arc<dyn SequencePlugin>),
    Consolidate(Arc<dyn ConsolidatePlugin>),
    ParseFormat(Arc<dyn ParseFormatPlugin>),
    Create(Arc<dyn CreatePlugin>),
    PostProcess(Arc<dyn PostProcessPlugin>),
}

/// A plugin declares up front every role it plays.
///
/// ```ignore
/// impl Plugin for ForceApplication {
///     fn capabilities(self: Arc<Self>) -> Vec<Capability> {
///         vec![Capability::Metadata(self.clone()), Capability::Sequence(self)]
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    fn capabilities(self: Arc<Self>) -> Vec<Capability>;
}

/// Registered plugins bucketed by capability, in registration order
#[derive(Clone, Default)]
pub struct PluginRegistry {
    pub(crate) clean: Vec<Arc<dyn CleanPlugin>>,
    pub(crate) metadata: Vec<Arc<dyn MetadataPlugin>>,
    pub(crate) structure: Vec<Arc<dyn StructurePlugin>>,
    pub(crate) parse: Vec<Arc<dyn ParsePlugin>>,
    pub(crate) sequence: Vec<Arc<dyn SequencePlugin>>,
    pub(crate) consolidate: Vec<Arc<dyn ConsolidatePlugin>>,
    pub(crate) parse_format: Vec<Arc<dyn ParseFormatPlugin>>,
    pub(crate) create: Vec<Arc<dyn CreatePlugin>>,
    /// Kept sorted by `order()`, stable for equal orders
    pub(crate) post_process: Vec<Arc<dyn PostProcessPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: Plugin + 'static>(&mut self, plugin: Arc<P>) {
        for capability in plugin.capabilities() {
            self.add(capability);
        }
    }

    pub fn add(&mut self, capability: Capability) {
        match capability {
            Capability::Clean(p) => self.clean.push(p),
            Capability::Metadata(p) => self.metadata.push(p),
            Capability::Structure(p) => self.structure.push(p),
            Capability::Parse(p) => self.parse.push(p),
            Capability::Sequence(p) => self.sequence.push(p),
            Capability::Consolidate(p) => self.consolidate.push(p),
            Capability::ParseFormat(p) => self.parse_format.push(p),
            Capability::Create(p) => self.create.push(p),
            Capability::PostProcess(p) => {
                self.post_process.push(p);
                // sort_by_key is stable: equal orders keep registration order
                self.post_process.sort_by_key(|p| p.order());
            }
        }
    }

    pub fn register_clean(&mut self, plugin: Arc<dyn CleanPlugin>) {
        self.add(Capability::Clean(plugin));
    }

    pub fn register_metadata(&mut self, plugin: Arc<dyn MetadataPlugin>) {
        self.add(Capability::Metadata(plugin));
    }

    pub fn register_structure(&mut self, plugin: Arc<dyn StructurePlugin>) {
        self.add(Capability::Structure(plugin));
    }

    pub fn register_parse(&mut self, plugin: Arc<dyn ParsePlugin>) {
        self.add(Capability::Parse(plugin));
    }

    pub fn register_sequence(&mut self, plugin: Arc<dyn SequencePlugin>) {
        self.add(Capability::Sequence(plugin));
    }

    pub fn register_consolidate(&mut self, plugin: Arc<dyn ConsolidatePlugin>) {
        self.add(Capability::Consolidate(plugin));
    }

    pub fn register_parse_format(&mut self, plugin: Arc<dyn ParseFormatPlugin>) {
        self.add(Capability::ParseFormat(plugin));
    }

    pub fn register_create(&mut self, plugin: Arc<dyn CreatePlugin>) {
        self.add(Capability::Create(plugin));
    }

    pub fn register_post_process(&mut self, plugin: Arc<dyn PostProcessPlugin>) {
        self.add(Capability::PostProcess(plugin));
    }

    /// Number of registered plugins per bucket, in contract order:
    /// clean, metadata, structure, parse, sequence, consolidate,
    /// parse-format, create, post-process
    pub fn bucket_sizes(&self) -> [usize; 9] {
        [
            self.clean.len(),
            self.metadata.len(),
            self.structure.len(),
            self.parse.len(),
            self.sequence.len(),
            self.consolidate.len(),
            self.parse_format.len(),
            self.create.len(),
            self.post_process.len(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.bucket_sizes().iter().all(|&n| n == 0)
    }
}
