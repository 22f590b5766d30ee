use crate::metadata;
use crate::pipeline::context::Context;
use crate::plugin::{Capability, MetadataPlugin, Plugin, SequencePlugin};
use crate::record::Record;
use std::sync::Arc;

/// Tags every line with a fixed application unless one was already set, and
/// breaks grouping wherever the application changes
#[derive(Debug, Clone)]
pub struct ForceApplication {
    pub application: String,
}

impl ForceApplication {
    pub fn new(application: impl Into<String>) -> Self {
        ForceApplication {
            application: application.into(),
        }
    }
}

impl MetadataPlugin for ForceApplication {
    fn extract_metadata(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
        if !record.metadata.has_value(metadata::APPLICATION) {
            record
                .metadata
                .set(metadata::APPLICATION, self.application.as_str());
        }
        Ok(true)
    }
}

impl SequencePlugin for ForceApplication {
    fn breaks_sequence(&self, _ctx: &Context, previous: &Record, current: &Record) -> bool {
        previous.metadata.string_value(metadata::APPLICATION)
            != current.metadata.string_value(metadata::APPLICATION)
    }
}

impl Plugin for ForceApplication {
    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![
            Capability::Metadata(self.clone()),
            Capability::Sequence(self),
        ]
    }
}
