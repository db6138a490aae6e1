//! Manifest resolution.
//!
//! Resolution turns an authored manifest (with `includes`, `modules`,
//! and `bundles`) into a flat, read-only [`ResolvedManifest`]:
//!
//! 1. `includes` are resolved recursively. Entries with a file extension
//!    are paths relative to the including manifest's directory; bare
//!    names are profiles looked up in the profiles directory (bundled
//!    zip, then `{name}/manifest.jsonc` folder, then `{name}.jsonc`).
//! 2. `modules`/`bundles` are expanded through the [`ModuleCatalog`];
//!    each module's restore entries are spliced BEFORE the manifest's
//!    inline `restore[]`, so inline entries always apply last. Entries
//!    sharing a derived id are not deduplicated: later entries win at
//!    execution time purely by running later.
//! 3. Only the root manifest's `exclude`/`excludeConfigs` apply; an
//!    included manifest cannot veto apps of the profile composing it.
//!    Every excluded reference is mirrored into `excludeConfigs`.
//!
//! Apps are deduplicated by their install reference for the active
//! driver (not by `id`); when the same reference appears more than once
//! the later declaration wins. Apps with no reference for the active
//! driver contribute no action.

use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::jsonc;
use crate::manifest::catalog::ModuleCatalog;
use crate::manifest::types::{
    AppEntry, ManifestFile, ResolvedApp, ResolvedManifest, RestoreEntry, VerifyEntry,
};

/// File name of a manifest inside a profile folder or bundle.
pub const MANIFEST_FILENAME: &str = "manifest.jsonc";

/// Default package driver for the current platform.
pub fn default_driver() -> &'static str {
    if cfg!(target_os = "windows") {
        "winget"
    } else if cfg!(target_os = "macos") {
        "brew"
    } else {
        "apt"
    }
}

#[derive(Debug, Default)]
struct Collected {
    apps: Vec<AppEntry>,
    restore: Vec<RestoreEntry>,
    verify: Vec<VerifyEntry>,
}

/// Resolves manifests against a profiles directory and a module catalog.
#[derive(Debug)]
pub struct ManifestResolver {
    profiles_dir: Utf8PathBuf,
    catalog: ModuleCatalog,
    driver: String,
}

impl ManifestResolver {
    pub fn new(profiles_dir: impl Into<Utf8PathBuf>, modules_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
            catalog: ModuleCatalog::new(modules_dir),
            driver: default_driver().to_string(),
        }
    }

    /// Override the package driver used for reference selection.
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// The module catalog backing this resolver.
    pub fn catalog_mut(&mut self) -> &mut ModuleCatalog {
        &mut self.catalog
    }

    /// Resolve a manifest from an explicit file path.
    pub fn resolve_path(&mut self, path: &Utf8Path) -> Result<ResolvedManifest> {
        let root = self.load_file(path)?;
        let base = path.parent().unwrap_or(Utf8Path::new(".")).to_owned();
        self.resolve_root(root, path.as_str(), &base)
    }

    /// Resolve a manifest from a profile name.
    pub fn resolve_name(&mut self, name: &str) -> Result<ResolvedManifest> {
        let (root, origin, base) = self.load_profile(name)?;
        self.resolve_root(root, &origin, &base)
    }

    fn resolve_root(
        &mut self,
        root: ManifestFile,
        origin: &str,
        base: &Utf8Path,
    ) -> Result<ResolvedManifest> {
        let mut visited = vec![origin.to_string()];
        let mut collected = Collected::default();

        // Root exclusions are captured before the root is consumed;
        // included manifests' exclude lists are ignored by collect().
        let mut exclude = root.exclude.clone();
        let mut exclude_configs = root.exclude_configs.clone();
        for reference in &exclude {
            if !exclude_configs.contains(reference) {
                exclude_configs.push(reference.clone());
            }
        }

        let version = root.version.clone();
        let name = root.name.clone();
        self.collect(root, base, &mut visited, &mut collected)?;

        // Deduplicate apps by reference for the active driver; the later
        // declaration wins so composing manifests can override includes.
        let mut apps: Vec<ResolvedApp> = Vec::new();
        for app in &collected.apps {
            let Some(reference) = app.refs.get(&self.driver) else {
                debug!("App '{}' has no reference for driver '{}'", app.id, self.driver);
                continue;
            };
            let resolved = ResolvedApp {
                id: app.id.clone(),
                reference: reference.clone(),
                driver: self.driver.clone(),
            };
            match apps.iter().position(|a| a.reference == resolved.reference) {
                Some(idx) => apps[idx] = resolved,
                None => apps.push(resolved),
            }
        }

        let before = apps.len();
        apps.retain(|a| !exclude.contains(&a.reference));
        if apps.len() < before {
            debug!("Excluded {} app(s) by root exclude list", before - apps.len());
        }

        exclude.sort();
        exclude.dedup();
        exclude_configs.sort();
        exclude_configs.dedup();

        Ok(ResolvedManifest {
            version,
            name,
            path: origin.to_string(),
            exclude,
            exclude_configs,
            apps,
            restore: collected.restore,
            verify: collected.verify,
        })
    }

    /// Recursively fold one manifest file into the accumulator.
    ///
    /// Includes are folded first, then module-contributed restore
    /// entries, then the manifest's own apps/restore/verify — inline
    /// entries of a manifest therefore always follow anything it pulled
    /// in, which is what makes later-wins overriding possible.
    fn collect(
        &mut self,
        file: ManifestFile,
        base: &Utf8Path,
        visited: &mut Vec<String>,
        acc: &mut Collected,
    ) -> Result<()> {
        for include in &file.includes {
            let (included, origin, inc_base) = if has_extension(include) {
                let path = base.join(include);
                let inc_base = path.parent().unwrap_or(Utf8Path::new(".")).to_owned();
                (self.load_file(&path)?, path.as_str().to_string(), inc_base)
            } else {
                self.load_profile(include)?
            };

            if visited.contains(&origin) {
                visited.push(origin);
                return Err(Error::include_cycle(visited));
            }
            visited.push(origin);
            self.collect(included, &inc_base, visited, acc)?;
            visited.pop();
        }

        for module_name in file.modules.iter().chain(file.bundles.iter()) {
            let module = self.catalog.load(module_name)?;
            if module.restore.is_empty() {
                debug!("Module '{}' contributes no restore entries", module_name);
            }
            acc.restore.extend(module.restore);
        }

        acc.apps.extend(file.apps);
        acc.restore.extend(file.restore);
        acc.verify.extend(file.verify);

        if !file.exclude.is_empty() || !file.exclude_configs.is_empty() {
            // Only honoured on the root; see module docs.
            if visited.len() > 1 {
                warn!("Ignoring exclude list of included manifest (root-only)");
            }
        }

        Ok(())
    }

    fn load_file(&self, path: &Utf8Path) -> Result<ManifestFile> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::manifest_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        jsonc::from_str(&content)
    }

    /// Look up a named profile: bundled zip, loose folder, bare file.
    fn load_profile(&self, name: &str) -> Result<(ManifestFile, String, Utf8PathBuf)> {
        let zip_path = self.profiles_dir.join(format!("{name}.zip"));
        if zip_path.is_file() {
            let content = read_zip_manifest(&zip_path)?;
            let file = jsonc::from_str(&content)?;
            return Ok((file, format!("profile:{name}"), self.profiles_dir.clone()));
        }

        let folder_path = self.profiles_dir.join(name).join(MANIFEST_FILENAME);
        if folder_path.is_file() {
            let file = self.load_file(&folder_path)?;
            let base = folder_path.parent().unwrap().to_owned();
            return Ok((file, folder_path.as_str().to_string(), base));
        }

        let bare_path = self.profiles_dir.join(format!("{name}.jsonc"));
        if bare_path.is_file() {
            let file = self.load_file(&bare_path)?;
            return Ok((
                file,
                bare_path.as_str().to_string(),
                self.profiles_dir.clone(),
            ));
        }

        Err(Error::include_not_found(name))
    }
}

/// Includes with an extension are file paths; bare names are profiles.
fn has_extension(include: &str) -> bool {
    Utf8Path::new(include)
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}

/// Read `manifest.jsonc` out of a bundled profile zip.
fn read_zip_manifest(path: &Utf8Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::invalid_manifest(format!("unreadable profile bundle {path}: {e}")))?;
    let mut entry = archive.by_name(MANIFEST_FILENAME).map_err(|_| {
        Error::invalid_manifest(format!("profile bundle {path} has no {MANIFEST_FILENAME}"))
    })?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}
