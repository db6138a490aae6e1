//! Content merge strategies for non-copy restore entries.
//!
//! All strategies are pure: `(source, existing target or absent,
//! options) -> new target content`. The executor handles file I/O,
//! backups, and the already-up-to-date check (output equal to existing
//! content means the entry is skipped without a write).

mod append;
mod ini;
mod json;

pub use append::append_lines;
pub use ini::merge_ini;
pub use json::merge_json;

use rigup_core::manifest::{ArrayStrategy, RestoreType};

/// Dispatch to the merge strategy for a restore entry type.
///
/// `copy` entries never reach this function; the executor handles them
/// as raw file operations.
pub fn merge_content(
    kind: RestoreType,
    source: &str,
    existing: Option<&str>,
    arrays: ArrayStrategy,
    dedupe: bool,
) -> anyhow::Result<String> {
    match kind {
        RestoreType::MergeJson => merge_json(source, existing, arrays),
        RestoreType::MergeIni => merge_ini(source, existing),
        RestoreType::Append => append_lines(source, existing, dedupe),
        RestoreType::Copy => anyhow::bail!("copy entries have no merge strategy"),
    }
}
