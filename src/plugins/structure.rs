use crate::metadata;
use crate::pipeline::context::Context;
use crate::plugin::{Capability, Plugin, StructurePlugin};
use crate::record::{joined_text, Record};
use crate::value::ValueMap;
use std::sync::Arc;

/// Claims windows whose joined text is exactly one JSON object.
///
/// The decoded fields land in `data`, merged after the data already carried
/// by the window's lines, and the text is cleared.
#[derive(Debug, Default, Clone, Copy)]
pub struct Json;

impl StructurePlugin for Json {
    fn extract_structure(
        &self,
        _ctx: &Context,
        lines: &[Record],
        record: &mut Record,
    ) -> anyhow::Result<bool> {
        let text = joined_text(lines);
        if !text.trim_start().starts_with('{') {
            return Ok(false);
        }
        // Trailing content after the object fails to decode
        let Ok(object) = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&text)
        else {
            return Ok(false);
        };

        record.merge_lines_data(lines);
        record.text.clear();
        record.data.merge_keep_existing(&ValueMap::from(object));
        record
            .metadata
            .set(metadata::STRUCTURE, metadata::STRUCTURE_JSON);
        Ok(true)
    }
}

impl Plugin for Json {
    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![Capability::Structure(self)]
    }
}
