use crate::metadata;
use crate::pipeline::context::Context;
use crate::plugin::{Capability, CleanPlugin, Plugin};
use crate::record::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

// CSI sequences, both the 8-bit and the ESC [ form
static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\x{9B}|\x1B\[)[0-?]*[ -/]*[@-~]").unwrap());

/// Remove ANSI escape sequences; `None` when there were none
pub fn strip_ansi(text: &str) -> Option<String> {
    if ANSI_ESCAPE.is_match(text) {
        Some(ANSI_ESCAPE.replace_all(text, "").into_owned())
    } else {
        None
    }
}

/// Strips ANSI escapes from the line and records `ansi_escape` in the
/// `clean` metadata list
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiEscape;

impl CleanPlugin for AnsiEscape {
    fn clean(&self, _ctx: &Context, record: &mut Record) -> anyhow::Result<bool> {
        let Some(cleaned) = strip_ansi(&record.text) else {
            return Ok(false);
        };
        record
            .metadata
            .list_value_add(metadata::CLEAN, metadata::CLEAN_ANSI_ESCAPE);
        record.text = cleaned;
        Ok(true)
    }
}

impl Plugin for AnsiEscape {
    fn capabilities(self: Arc<Self>) -> Vec<Capability> {
        vec![Capability::Clean(self)]
    }
}
