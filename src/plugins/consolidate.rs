use crate::pipeline::context::Context;
use crate::plugin::{Capability, ConsolidatePlugin, Plugin};
use crate::record::{joined_text, Record};
use std::sync::Arc;

/// Folds every pending unmatched line into a single record
#[derive(Debug, Default, Clone, Copy)]
pub struct JoinAllLines;

impl ConsolidatePlugin for JoinAllLines {
    fn consolidate(
        &self,
        _ctx: &Context,
        lines: &[Record],
        record: &mut Record,
    ) -> anyhow::Result<Option<usize>> {
        record.merge_lines_data(lines);
        record.text = joined_text(lines);
        Ok(Some(lines.len()))
    }
}

impl Plugin for JoinAllLines {
    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![Capability::Consolidate(self)]
    }
}
