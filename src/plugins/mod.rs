//! Ready-made plugins covering common log shapes.

pub mod clean;
pub mod consolidate;
pub mod metadata;
pub mod structure;

pub use clean::AnsiEscape;
pub use consolidate::JoinAllLines;
pub use metadata::ForceApplication;
pub use structure::Json;
