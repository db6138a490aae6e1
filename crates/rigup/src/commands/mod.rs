//! Command implementations.
//!
//! Every command returns its data payload as a `serde_json::Value`;
//! `main` wraps that in the response envelope for `--json` runs. Human
//! output is printed by the command itself and suppressed in JSON mode.

pub mod apps;
pub mod diff;
pub mod export;
pub mod plan;
pub mod restore;
pub mod revert;
pub mod validate;
pub mod version;

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use rigup_core::error::Error;
use rigup_core::manifest::{ManifestResolver, ResolvedManifest};
use rigup_core::{hash, paths};
use rigup_pkg::{DriverKind, PackageDriver, SubprocessDriver};

/// Per-invocation state shared by all commands.
pub struct CommandContext {
    pub manifest: Utf8PathBuf,
    pub json: bool,
    pub run_id: String,
    pub timestamp_utc: String,
}

impl CommandContext {
    /// Resolve the manifest into its flat form plus its content hash.
    pub fn resolve(&self, driver: Option<&str>) -> anyhow::Result<(ResolvedManifest, String)> {
        if !self.manifest.is_file() {
            return Err(Error::manifest_not_found(self.manifest.as_str()).into());
        }

        let base = self
            .manifest
            .parent()
            .unwrap_or(Utf8Path::new("."))
            .to_path_buf();
        let mut resolver = ManifestResolver::new(base.clone(), base.join("modules"));
        if let Some(driver) = driver {
            resolver = resolver.with_driver(driver);
        }

        let resolved = resolver.resolve_path(&self.manifest)?;
        let manifest_hash = hash::content_hash(&resolved)?;
        Ok((resolved, manifest_hash))
    }

    /// Directory of the manifest, the fallback root for restore sources.
    pub fn manifest_dir(&self) -> Utf8PathBuf {
        self.manifest
            .parent()
            .unwrap_or(Utf8Path::new("."))
            .to_path_buf()
    }

    /// Root for rigup's own state (backups, journals, extracted bundles).
    pub fn data_root(&self) -> anyhow::Result<Utf8PathBuf> {
        Ok(paths::local_appdata_dir()?.join("rigup"))
    }
}

/// Installed-reference snapshot for a driver, best-effort.
///
/// A missing or failing package manager degrades the plan (everything
/// classifies as `install`) instead of aborting it.
pub async fn installed_set(driver_name: &str) -> BTreeSet<String> {
    let Some(kind) = DriverKind::for_name(driver_name) else {
        warn!(driver = driver_name, "Unknown package driver, assuming nothing installed");
        return BTreeSet::new();
    };
    let driver = match SubprocessDriver::detect(kind) {
        Ok(driver) => driver,
        Err(e) => {
            warn!(error = %e, "Package driver unavailable, assuming nothing installed");
            return BTreeSet::new();
        }
    };
    match driver.list_installed().await {
        Ok(installed) => installed,
        Err(e) => {
            warn!(error = %e, "Failed to query installed packages, assuming nothing installed");
            BTreeSet::new()
        }
    }
}
