//! Bundle export.
//!
//! Packages a resolved manifest, its provenance metadata, and the config
//! sources of its restore entries into a single portable zip. Sources
//! land under `configs/` at their separator-normalised relative path, so
//! the extracted `configs/` directory can serve directly as the restore
//! executor's export root.

use std::fs::File;
use std::io::{BufReader, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use rigup_core::manifest::ResolvedManifest;
use rigup_core::paths::normalize_separators;

use crate::metadata::{BundleMetadata, CONFIGS_DIR, MANIFEST_FILENAME, METADATA_FILENAME};

/// Result of a bundle export.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_path: Utf8PathBuf,
    /// SHA-256 of the finished bundle, hex-encoded
    pub checksum: String,
    /// Config files packaged
    pub files: usize,
    /// Restore sources skipped (sensitive or missing-optional)
    pub skipped: usize,
}

/// Export a resolved manifest and its config sources into a zip bundle.
///
/// Sensitive entries and missing optional sources are skipped with a
/// warning recorded in the bundle metadata; a missing required source is
/// an error. A `{bundle}.sha256` sidecar with the bundle checksum is
/// written next to the output.
pub fn export_bundle(
    output: &Utf8Path,
    manifest_dir: &Utf8Path,
    resolved: &ResolvedManifest,
    mut metadata: BundleMetadata,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0usize;
    let mut skipped = 0usize;

    for entry in &resolved.restore {
        if entry.sensitive {
            skipped += 1;
            metadata
                .warnings
                .push(format!("Sensitive entry not bundled: {}", entry.action_id()));
            continue;
        }

        let normalized = normalize_separators(&entry.source);
        let source = manifest_dir.join(&normalized);
        if !source.exists() {
            if entry.optional {
                skipped += 1;
                debug!(source = %source, "Optional source missing, not bundled");
                continue;
            }
            anyhow::bail!("Source not found: {}", entry.source);
        }

        if source.is_file() {
            add_file(&mut zip, &source, &format!("{}/{}", CONFIGS_DIR, normalized), options)?;
            files += 1;
        } else {
            for item in walkdir::WalkDir::new(&source).sort_by_file_name() {
                let item = item?;
                if !item.file_type().is_file() {
                    continue;
                }
                let src = Utf8Path::from_path(item.path())
                    .ok_or_else(|| anyhow::anyhow!("Non-UTF-8 path: {}", item.path().display()))?;
                let rel = src
                    .strip_prefix(&source)
                    .map_err(|_| anyhow::anyhow!("Path escapes source root: {}", src))?;
                let name = format!("{}/{}/{}", CONFIGS_DIR, normalized, normalize_separators(rel.as_str()));
                add_file(&mut zip, src, &name, options)?;
                files += 1;
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Some restore sources were not bundled");
    }

    zip.start_file(MANIFEST_FILENAME, options)?;
    zip.write_all(serde_json::to_string_pretty(resolved)?.as_bytes())?;

    zip.start_file(METADATA_FILENAME, options)?;
    zip.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;

    zip.finish()?;

    let checksum = file_checksum(output)?;
    let sidecar = Utf8PathBuf::from(format!("{}.sha256", output));
    std::fs::write(
        &sidecar,
        format!("{}  {}\n", checksum, output.file_name().unwrap_or_default()),
    )?;

    info!(bundle = %output, files, skipped, "Bundle exported");
    Ok(ExportSummary {
        bundle_path: output.to_path_buf(),
        checksum,
        files,
        skipped,
    })
}

fn add_file(
    zip: &mut ZipWriter<File>,
    source: &Utf8Path,
    name: &str,
    options: SimpleFileOptions,
) -> anyhow::Result<()> {
    zip.start_file(name, options)?;
    let mut reader = BufReader::new(File::open(source)?);
    std::io::copy(&mut reader, zip)?;
    Ok(())
}

/// Streaming SHA-256 of a file, hex-encoded.
pub fn file_checksum(path: &Utf8Path) -> anyhow::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
