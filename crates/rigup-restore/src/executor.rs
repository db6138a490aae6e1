//! Restore execution.
//!
//! Walks the resolved restore entries in manifest order and reconciles
//! each target: up-to-date targets are skipped, stale targets are
//! backed up then copied or merged, locked files are tolerated with a
//! warning, and every mutation is journaled. A failed entry is counted
//! and reported but never aborts the remaining entries.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, warn};

use rigup_core::manifest::{RestoreEntry, RestoreType};
use rigup_core::paths;

use crate::filters::{is_sensitive_path, ExcludeSet};
use crate::journal::{Journal, JournalAction, JournalEntry};
use crate::lockerr::{LockClassifier, PlatformLockClassifier};
use crate::merge::merge_content;

/// Settings for one restore invocation.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Directory containing the manifest; the fallback root for
    /// relative restore sources.
    pub manifest_dir: Utf8PathBuf,
    /// Alternate source root (an extracted bundle) preferred over the
    /// manifest directory when present.
    pub export_root: Option<Utf8PathBuf>,
    /// Root under which per-run backups are created.
    pub backup_root: Utf8PathBuf,
    /// Directory journals are written to.
    pub journal_dir: Utf8PathBuf,
    pub run_id: String,
    /// Recorded in the journal so revert can name its origin.
    pub manifest_path: String,
    /// Evaluate and report without writing anything.
    pub dry_run: bool,
}

/// Result of reconciling one restore entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryOutcome {
    pub id: String,
    pub success: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    /// Files within a directory copy that were locked by another
    /// process and left in place.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub run_id: String,
    pub dry_run: bool,
    pub restored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<EntryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<Utf8PathBuf>,
}

/// What one entry did, used to classify the outcome and journal it.
enum EntryAction {
    Restored {
        target: Utf8PathBuf,
        target_existed: bool,
        backup_path: Option<Utf8PathBuf>,
        warnings: Vec<String>,
        skipped_files: Vec<String>,
    },
    UpToDate {
        target: Utf8PathBuf,
        warnings: Vec<String>,
    },
    Skipped {
        message: String,
        warnings: Vec<String>,
    },
    /// Hard failure after the target was already touched. Journaled
    /// like a restore so revert can undo the partial write.
    Failed {
        message: String,
        target: Utf8PathBuf,
        target_existed: bool,
        backup_path: Option<Utf8PathBuf>,
        warnings: Vec<String>,
    },
}

pub struct RestoreExecutor {
    options: RestoreOptions,
    lock_classifier: Box<dyn LockClassifier>,
}

impl RestoreExecutor {
    pub fn new(options: RestoreOptions) -> Self {
        Self::with_lock_classifier(options, Box::new(PlatformLockClassifier))
    }

    /// Constructor with an injected lock classifier, used by tests to
    /// exercise locked-file tolerance without real OS contention.
    pub fn with_lock_classifier(
        options: RestoreOptions,
        lock_classifier: Box<dyn LockClassifier>,
    ) -> Self {
        Self {
            options,
            lock_classifier,
        }
    }

    /// Reconcile all entries in manifest order.
    pub async fn run(&self, entries: &[RestoreEntry]) -> anyhow::Result<RestoreReport> {
        let mut report = RestoreReport {
            run_id: self.options.run_id.clone(),
            dry_run: self.options.dry_run,
            restored: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
            journal_path: None,
        };
        let mut journal = Journal::new(&self.options.run_id, &self.options.manifest_path);

        for entry in entries {
            let id = entry.action_id();
            debug!(id = %id, "Reconciling restore entry");

            match self.reconcile(entry).await {
                Ok(EntryAction::Restored {
                    target,
                    target_existed,
                    backup_path,
                    warnings,
                    skipped_files,
                }) => {
                    report.restored += 1;
                    if !self.options.dry_run {
                        journal.record(JournalEntry {
                            kind: entry.kind,
                            source: entry.source.clone(),
                            target: target.to_string(),
                            action: JournalAction::Restored,
                            target_existed_before: target_existed,
                            backup_path: backup_path.map(|p| p.to_string()),
                        });
                    }
                    report.outcomes.push(EntryOutcome {
                        id,
                        success: true,
                        skipped: false,
                        message: None,
                        warnings,
                        skipped_files,
                    });
                }
                Ok(EntryAction::UpToDate { target, warnings }) => {
                    report.skipped += 1;
                    if !self.options.dry_run {
                        journal.record(JournalEntry {
                            kind: entry.kind,
                            source: entry.source.clone(),
                            target: target.to_string(),
                            action: JournalAction::SkippedUpToDate,
                            target_existed_before: true,
                            backup_path: None,
                        });
                    }
                    report.outcomes.push(EntryOutcome {
                        id,
                        success: true,
                        skipped: true,
                        message: Some("already up to date".to_string()),
                        warnings,
                        skipped_files: Vec::new(),
                    });
                }
                Ok(EntryAction::Skipped { message, warnings }) => {
                    report.skipped += 1;
                    report.outcomes.push(EntryOutcome {
                        id,
                        success: true,
                        skipped: true,
                        message: Some(message),
                        warnings,
                        skipped_files: Vec::new(),
                    });
                }
                Ok(EntryAction::Failed {
                    message,
                    target,
                    target_existed,
                    backup_path,
                    warnings,
                }) => {
                    report.failed += 1;
                    warn!(id = %id, error = %message, "Restore entry failed after writing");
                    // The target was mutated before the failure; the
                    // journal must still carry the entry or revert
                    // cannot undo the partial work.
                    if !self.options.dry_run {
                        journal.record(JournalEntry {
                            kind: entry.kind,
                            source: entry.source.clone(),
                            target: target.to_string(),
                            action: JournalAction::Restored,
                            target_existed_before: target_existed,
                            backup_path: backup_path.map(|p| p.to_string()),
                        });
                    }
                    report.outcomes.push(EntryOutcome {
                        id,
                        success: false,
                        skipped: false,
                        message: Some(message),
                        warnings,
                        skipped_files: Vec::new(),
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(id = %id, error = %e, "Restore entry failed");
                    report.outcomes.push(EntryOutcome {
                        id,
                        success: false,
                        skipped: false,
                        message: Some(e.to_string()),
                        warnings: Vec::new(),
                        skipped_files: Vec::new(),
                    });
                }
            }
        }

        if !self.options.dry_run {
            report.journal_path = Some(journal.save(&self.options.journal_dir).await?);
        }

        info!(
            restored = report.restored,
            skipped = report.skipped,
            failed = report.failed,
            dry_run = report.dry_run,
            "Restore complete"
        );
        Ok(report)
    }

    async fn reconcile(&self, entry: &RestoreEntry) -> anyhow::Result<EntryAction> {
        let mut warnings = Vec::new();

        if entry.sensitive {
            return Ok(EntryAction::Skipped {
                message: "Skipped sensitive entry".to_string(),
                warnings: vec![format!(
                    "Entry '{}' is marked sensitive and was not restored",
                    entry.action_id()
                )],
            });
        }

        let target = paths::expand(&entry.target, &paths::home_dir()?)?;
        if is_sensitive_path(&target) {
            warnings.push(format!("Target looks like credential material: {}", target));
        }
        if !entry.requires_closed.is_empty() {
            warnings.push(format!(
                "Close {} before relying on this restore",
                entry.requires_closed.join(", ")
            ));
        }

        let Some(source) = self.resolve_source(&entry.source) else {
            if entry.optional {
                return Ok(EntryAction::Skipped {
                    message: "Source not found (optional)".to_string(),
                    warnings,
                });
            }
            anyhow::bail!("Source not found: {}", entry.source);
        };
        if is_sensitive_path(&source) {
            warnings.push(format!("Source looks like credential material: {}", source));
        }

        match entry.kind {
            RestoreType::Copy => self.reconcile_copy(entry, &source, &target, warnings).await,
            _ => self.reconcile_merge(entry, &source, &target, warnings).await,
        }
    }

    /// Source path resolution: the export root wins when it holds the
    /// file, otherwise the manifest directory; absolute sources stand
    /// alone.
    fn resolve_source(&self, source: &str) -> Option<Utf8PathBuf> {
        let normalized = paths::normalize_separators(source);
        let relative = Utf8Path::new(&normalized);

        if relative.is_absolute() {
            return relative.exists().then(|| relative.to_path_buf());
        }
        if let Some(export_root) = &self.options.export_root {
            let candidate = export_root.join(relative);
            if candidate.exists() {
                return Some(candidate);
            }
        }
        let candidate = self.options.manifest_dir.join(relative);
        candidate.exists().then_some(candidate)
    }

    async fn reconcile_copy(
        &self,
        entry: &RestoreEntry,
        source: &Utf8Path,
        target: &Utf8Path,
        warnings: Vec<String>,
    ) -> anyhow::Result<EntryAction> {
        let source_meta = tokio::fs::metadata(source).await?;

        if source_meta.is_file() {
            return self.copy_file_entry(entry, source, target, warnings).await;
        }
        self.copy_dir_entry(entry, source, target, warnings).await
    }

    async fn copy_file_entry(
        &self,
        entry: &RestoreEntry,
        source: &Utf8Path,
        target: &Utf8Path,
        mut warnings: Vec<String>,
    ) -> anyhow::Result<EntryAction> {
        let target_existed = target.exists();

        if target_existed && file_up_to_date(source, target).await? {
            return Ok(EntryAction::UpToDate {
                target: target.to_path_buf(),
                warnings,
            });
        }

        if self.options.dry_run {
            return Ok(EntryAction::Restored {
                target: target.to_path_buf(),
                target_existed,
                backup_path: None,
                warnings,
                skipped_files: Vec::new(),
            });
        }

        let backup_path = if target_existed && entry.backup {
            Some(self.backup_target(target).await?)
        } else {
            None
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::copy(source, target).await {
            Ok(_) => {
                propagate_mtime(source, target)?;
            }
            Err(e) if self.lock_classifier.is_contention(&e) => {
                warnings.push(format!("sharing violation: {}", target));
                return Ok(EntryAction::Skipped {
                    message: "Target locked by another process".to_string(),
                    warnings,
                });
            }
            Err(e) => {
                return Ok(EntryAction::Failed {
                    message: format!("Copy to {} failed: {}", target, e),
                    target: target.to_path_buf(),
                    target_existed,
                    backup_path,
                    warnings,
                });
            }
        }

        Ok(EntryAction::Restored {
            target: target.to_path_buf(),
            target_existed,
            backup_path,
            warnings,
            skipped_files: Vec::new(),
        })
    }

    async fn copy_dir_entry(
        &self,
        entry: &RestoreEntry,
        source: &Utf8Path,
        target: &Utf8Path,
        mut warnings: Vec<String>,
    ) -> anyhow::Result<EntryAction> {
        let excludes = ExcludeSet::new(&entry.exclude)?;
        let target_existed = target.exists();

        // First pass decides whether anything is stale so an untouched
        // tree is reported up to date without a backup.
        let mut stale = Vec::new();
        for item in walkdir::WalkDir::new(source).sort_by_file_name() {
            let item = item?;
            if !item.file_type().is_file() {
                continue;
            }
            let src = Utf8Path::from_path(item.path())
                .ok_or_else(|| anyhow::anyhow!("Non-UTF-8 path: {}", item.path().display()))?;
            let rel = src
                .strip_prefix(source)
                .map_err(|_| anyhow::anyhow!("Path escapes source root: {}", src))?;
            if excludes.is_excluded(rel) {
                continue;
            }
            let dest = target.join(rel);
            if !dest.exists() || !file_up_to_date(src, &dest).await? {
                stale.push((src.to_path_buf(), dest));
            }
        }

        if stale.is_empty() {
            return Ok(EntryAction::UpToDate {
                target: target.to_path_buf(),
                warnings,
            });
        }

        if self.options.dry_run {
            return Ok(EntryAction::Restored {
                target: target.to_path_buf(),
                target_existed,
                backup_path: None,
                warnings,
                skipped_files: Vec::new(),
            });
        }

        let backup_path = if target_existed && entry.backup {
            Some(self.backup_target(target).await?)
        } else {
            None
        };

        let mut skipped_files = Vec::new();
        for (src, dest) in stale {
            let written = async {
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::copy(&src, &dest).await.map(|_| ())
            };
            match written.await {
                Ok(()) => propagate_mtime(&src, &dest)?,
                Err(e) if self.lock_classifier.is_contention(&e) => {
                    warnings.push(format!("sharing violation: {}", dest));
                    skipped_files.push(dest.to_string());
                }
                Err(e) => {
                    return Ok(EntryAction::Failed {
                        message: format!("Copy to {} failed: {}", dest, e),
                        target: target.to_path_buf(),
                        target_existed,
                        backup_path,
                        warnings,
                    });
                }
            }
        }

        Ok(EntryAction::Restored {
            target: target.to_path_buf(),
            target_existed,
            backup_path,
            warnings,
            skipped_files,
        })
    }

    async fn reconcile_merge(
        &self,
        entry: &RestoreEntry,
        source: &Utf8Path,
        target: &Utf8Path,
        warnings: Vec<String>,
    ) -> anyhow::Result<EntryAction> {
        let source_content = tokio::fs::read_to_string(source).await?;
        let target_existed = target.exists();
        let existing = if target_existed {
            Some(tokio::fs::read_to_string(target).await?)
        } else {
            None
        };

        let merged = merge_content(
            entry.kind,
            &source_content,
            existing.as_deref(),
            entry.array_strategy,
            entry.dedupe,
        )?;

        if existing.as_deref() == Some(merged.as_str()) {
            return Ok(EntryAction::UpToDate {
                target: target.to_path_buf(),
                warnings,
            });
        }

        if self.options.dry_run {
            return Ok(EntryAction::Restored {
                target: target.to_path_buf(),
                target_existed,
                backup_path: None,
                warnings,
                skipped_files: Vec::new(),
            });
        }

        let backup_path = if target_existed && entry.backup {
            Some(self.backup_target(target).await?)
        } else {
            None
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if let Err(e) = tokio::fs::write(target, merged).await {
            return Ok(EntryAction::Failed {
                message: format!("Write to {} failed: {}", target, e),
                target: target.to_path_buf(),
                target_existed,
                backup_path,
                warnings,
            });
        }

        Ok(EntryAction::Restored {
            target: target.to_path_buf(),
            target_existed,
            backup_path,
            warnings,
            skipped_files: Vec::new(),
        })
    }

    /// Copy the current target into the per-run backup root at its
    /// backup-safe normalized path.
    async fn backup_target(&self, target: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
        let safe = paths::backup_safe(target);
        let backup_path = self
            .options
            .backup_root
            .join(&self.options.run_id)
            .join(safe);

        let meta = tokio::fs::metadata(target).await?;
        if meta.is_file() {
            if let Some(parent) = backup_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(target, &backup_path).await?;
        } else {
            for item in walkdir::WalkDir::new(target).sort_by_file_name() {
                let item = item?;
                let src = Utf8Path::from_path(item.path())
                    .ok_or_else(|| anyhow::anyhow!("Non-UTF-8 path: {}", item.path().display()))?;
                let rel = src
                    .strip_prefix(target)
                    .map_err(|_| anyhow::anyhow!("Path escapes target root: {}", src))?;
                let dest = backup_path.join(rel);
                if item.file_type().is_dir() {
                    tokio::fs::create_dir_all(&dest).await?;
                } else {
                    if let Some(parent) = dest.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::copy(src, &dest).await?;
                }
            }
        }

        debug!(target = %target, backup = %backup_path, "Backed up target");
        Ok(backup_path)
    }
}

/// Cheap staleness check: equal size and equal modification time at
/// whole-second granularity means up to date. Copies propagate the
/// source mtime so a re-run sees its own work as current.
async fn file_up_to_date(source: &Utf8Path, target: &Utf8Path) -> anyhow::Result<bool> {
    let src_meta = tokio::fs::metadata(source).await?;
    let dst_meta = match tokio::fs::metadata(target).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if src_meta.len() != dst_meta.len() {
        return Ok(false);
    }

    let src_mtime = filetime::FileTime::from_last_modification_time(&src_meta);
    let dst_mtime = filetime::FileTime::from_last_modification_time(&dst_meta);
    Ok(src_mtime.unix_seconds() == dst_mtime.unix_seconds())
}

fn propagate_mtime(source: &Utf8Path, target: &Utf8Path) -> anyhow::Result<()> {
    let meta = std::fs::metadata(source.as_std_path())?;
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(target.as_std_path(), mtime)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn up_to_date_requires_matching_size_and_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let a = root.join("a.txt");
        let b = root.join("b.txt");
        tokio::fs::write(&a, "same").await.unwrap();
        tokio::fs::write(&b, "same").await.unwrap();

        let mtime = filetime::FileTime::from_unix_time(1_700_000_000, 0);
        filetime::set_file_mtime(a.as_std_path(), mtime).unwrap();
        filetime::set_file_mtime(b.as_std_path(), mtime).unwrap();
        assert!(file_up_to_date(&a, &b).await.unwrap());

        // Same size, different mtime
        filetime::set_file_mtime(b.as_std_path(), filetime::FileTime::from_unix_time(1_700_000_001, 0))
            .unwrap();
        assert!(!file_up_to_date(&a, &b).await.unwrap());

        // Different size
        tokio::fs::write(&b, "different").await.unwrap();
        filetime::set_file_mtime(b.as_std_path(), mtime).unwrap();
        assert!(!file_up_to_date(&a, &b).await.unwrap());
    }

    #[tokio::test]
    async fn missing_target_is_stale() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let a = root.join("a.txt");
        tokio::fs::write(&a, "x").await.unwrap();
        assert!(!file_up_to_date(&a, &root.join("missing")).await.unwrap());
    }
}
