//! Bundle metadata.

use serde::{Deserialize, Serialize};

/// Schema version this build writes and accepts.
pub const BUNDLE_SCHEMA_VERSION: u32 = 1;

/// Name of the metadata file inside a bundle.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Name of the manifest file inside a bundle.
pub const MANIFEST_FILENAME: &str = "manifest.jsonc";

/// Directory inside a bundle holding the captured config sources.
pub const CONFIGS_DIR: &str = "configs";

/// Provenance record written into every bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub schema_version: u32,
    /// RFC 3339 UTC timestamp of the export
    pub captured_at: String,
    pub machine_name: String,
    pub tool_version: String,
    #[serde(default)]
    pub included_modules: Vec<String>,
    #[serde(default)]
    pub skipped_modules: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl BundleMetadata {
    pub fn new(captured_at: impl Into<String>, tool_version: impl Into<String>) -> Self {
        Self {
            schema_version: BUNDLE_SCHEMA_VERSION,
            captured_at: captured_at.into(),
            machine_name: machine_name(),
            tool_version: tool_version.into(),
            included_modules: Vec::new(),
            skipped_modules: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Best-effort machine name from the environment.
fn machine_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
