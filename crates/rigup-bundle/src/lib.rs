//! rigup-bundle: portable zip bundles of a manifest and its configs.

pub mod export;
pub mod extract;
pub mod metadata;

pub use export::{export_bundle, file_checksum, ExportSummary};
pub use extract::{extract_bundle, read_bundle_metadata, ExtractedBundle};
pub use metadata::{BundleMetadata, BUNDLE_SCHEMA_VERSION, CONFIGS_DIR, MANIFEST_FILENAME, METADATA_FILENAME};
