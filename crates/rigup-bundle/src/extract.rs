//! Bundle extraction.

use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use rigup_core::error::Error;

use crate::metadata::{BundleMetadata, BUNDLE_SCHEMA_VERSION, CONFIGS_DIR, MANIFEST_FILENAME, METADATA_FILENAME};

/// An extracted bundle, ready to drive a restore.
#[derive(Debug, Clone)]
pub struct ExtractedBundle {
    /// Directory the bundle was unpacked into
    pub root: Utf8PathBuf,
    /// The bundled manifest
    pub manifest_path: Utf8PathBuf,
    /// Directory to hand the restore executor as its export root
    pub export_root: Utf8PathBuf,
    pub metadata: BundleMetadata,
}

/// Unpack a bundle into `dest`.
///
/// The metadata schema version is checked before anything is written;
/// an unsupported version aborts with no partial extraction. Entry
/// names are validated against path traversal.
pub fn extract_bundle(bundle: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<ExtractedBundle> {
    let file = File::open(bundle)
        .map_err(|e| anyhow::anyhow!("Failed to open bundle {}: {}", bundle, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| anyhow::anyhow!("Not a valid bundle {}: {}", bundle, e))?;

    let metadata = read_metadata(&mut archive)?;
    if metadata.schema_version != BUNDLE_SCHEMA_VERSION {
        return Err(Error::schema_incompatible(
            metadata.schema_version.to_string(),
            BUNDLE_SCHEMA_VERSION.to_string(),
        )
        .into());
    }

    std::fs::create_dir_all(dest)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            anyhow::bail!("Bundle entry escapes extraction root: {}", entry.name());
        };
        let out_path = dest.join(
            Utf8Path::from_path(&relative)
                .ok_or_else(|| anyhow::anyhow!("Non-UTF-8 bundle entry: {}", entry.name()))?,
        );

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        debug!(path = %out_path, "Extracted bundle entry");
    }

    let manifest_path = dest.join(MANIFEST_FILENAME);
    if !manifest_path.exists() {
        return Err(Error::manifest_not_found(manifest_path.as_str()).into());
    }

    info!(bundle = %bundle, dest = %dest, "Bundle extracted");
    Ok(ExtractedBundle {
        root: dest.to_path_buf(),
        manifest_path,
        export_root: dest.join(CONFIGS_DIR),
        metadata,
    })
}

/// Read and parse metadata without extracting anything.
pub fn read_bundle_metadata(bundle: &Utf8Path) -> anyhow::Result<BundleMetadata> {
    let file = File::open(bundle)?;
    let mut archive = ZipArchive::new(file)?;
    read_metadata(&mut archive)
}

fn read_metadata(archive: &mut ZipArchive<File>) -> anyhow::Result<BundleMetadata> {
    let entry = archive
        .by_name(METADATA_FILENAME)
        .map_err(|_| anyhow::anyhow!("Bundle is missing {}", METADATA_FILENAME))?;
    let metadata: BundleMetadata = serde_json::from_reader(entry)
        .map_err(|e| anyhow::anyhow!("Invalid bundle metadata: {}", e))?;
    Ok(metadata)
}
