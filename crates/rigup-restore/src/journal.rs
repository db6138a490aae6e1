//! Restore journal and journal-based revert.
//!
//! Every non-dry-run restore writes one journal file named after its
//! run id. The journal is append-at-write-time and read-only after:
//! entries are collected in memory during execution and persisted in a
//! single write when the run finishes. Revert replays a journal in
//! reverse write order, deleting targets the run created and copying
//! backups over targets the run overwrote.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rigup_core::manifest::RestoreType;

/// What the executor did for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    Restored,
    SkippedUpToDate,
}

/// One journaled mutation. `target_existed_before` is the pivot fact
/// revert uses to choose delete versus restore-from-backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub kind: RestoreType,
    pub source: String,
    pub target: String,
    pub action: JournalAction,
    pub target_existed_before: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    pub run_id: String,
    pub manifest_path: String,
    pub entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new(run_id: impl Into<String>, manifest_path: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            manifest_path: manifest_path.into(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Persist the journal as `{runId}.json` under the journal
    /// directory, creating the directory if needed. Returns the path
    /// written.
    pub async fn save(&self, journal_dir: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
        tokio::fs::create_dir_all(journal_dir).await?;
        let path = journal_dir.join(format!("{}.json", self.run_id));
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        debug!(path = %path, entries = self.entries.len(), "Journal written");
        Ok(path)
    }

    pub async fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read journal {}: {}", path, e))?;
        let journal = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid journal {}: {}", path, e))?;
        Ok(journal)
    }

    /// Most recent journal in a directory. Run ids sort
    /// lexicographically by timestamp, so the largest file stem wins.
    pub async fn latest(journal_dir: &Utf8Path) -> anyhow::Result<Option<Utf8PathBuf>> {
        if !journal_dir.exists() {
            return Ok(None);
        }

        let mut newest: Option<Utf8PathBuf> = None;
        let mut reader = tokio::fs::read_dir(journal_dir).await?;
        while let Some(dirent) = reader.next_entry().await? {
            let path = Utf8PathBuf::from_path_buf(dirent.path())
                .map_err(|p| anyhow::anyhow!("Non-UTF-8 journal path: {}", p.display()))?;
            if path.extension() != Some("json") {
                continue;
            }
            match &newest {
                Some(current) if current.file_stem() >= path.file_stem() => {}
                _ => newest = Some(path),
            }
        }
        Ok(newest)
    }
}

/// Result of a revert run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertOutcome {
    pub run_id: String,
    pub reverted: usize,
    pub failed: usize,
    pub warnings: Vec<String>,
}

/// Replay a journal in reverse write order.
///
/// Entries that skipped an up-to-date target wrote nothing, so revert
/// ignores them. Each remaining entry is reverted independently; a
/// failure is counted and reported but does not stop the rest.
pub async fn revert(journal: &Journal) -> RevertOutcome {
    let mut outcome = RevertOutcome {
        run_id: journal.run_id.clone(),
        reverted: 0,
        failed: 0,
        warnings: Vec::new(),
    };

    for entry in journal.entries.iter().rev() {
        if entry.action == JournalAction::SkippedUpToDate {
            continue;
        }
        match revert_entry(entry).await {
            Ok(()) => {
                outcome.reverted += 1;
                debug!(target = %entry.target, "Reverted");
            }
            Err(e) => {
                outcome.failed += 1;
                warn!(target = %entry.target, error = %e, "Revert failed for entry");
                outcome
                    .warnings
                    .push(format!("{}: {}", entry.target, e));
            }
        }
    }

    info!(
        run_id = %journal.run_id,
        reverted = outcome.reverted,
        failed = outcome.failed,
        "Revert complete"
    );
    outcome
}

async fn revert_entry(entry: &JournalEntry) -> anyhow::Result<()> {
    let target = Utf8Path::new(&entry.target);

    if !entry.target_existed_before {
        // Created by the restore run; no prior state to put back.
        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(target).await?,
            Ok(_) => tokio::fs::remove_file(target).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(());
    }

    let Some(backup) = &entry.backup_path else {
        anyhow::bail!("target pre-existed but no backup was recorded");
    };
    let backup = Utf8Path::new(backup);
    if !backup.exists() {
        anyhow::bail!("backup missing: {}", backup);
    }

    copy_recursive(backup, target).await
}

/// Copy a backup (file or directory tree) back over a target.
async fn copy_recursive(from: &Utf8Path, to: &Utf8Path) -> anyhow::Result<()> {
    let meta = tokio::fs::metadata(from).await?;
    if meta.is_file() {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(from, to).await?;
        return Ok(());
    }

    for item in walkdir::WalkDir::new(from).sort_by_file_name() {
        let item = item?;
        let src = Utf8Path::from_path(item.path())
            .ok_or_else(|| anyhow::anyhow!("Non-UTF-8 path: {}", item.path().display()))?;
        let rel = src
            .strip_prefix(from)
            .map_err(|_| anyhow::anyhow!("Path escapes backup root: {}", src))?;
        let dest = to.join(rel);
        if item.file_type().is_dir() {
            tokio::fs::create_dir_all(&dest).await?;
        } else {
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(src, &dest).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn entry(
        target: &str,
        action: JournalAction,
        existed: bool,
        backup: Option<&str>,
    ) -> JournalEntry {
        JournalEntry {
            kind: RestoreType::Copy,
            source: "src".to_string(),
            target: target.to_string(),
            action,
            target_existed_before: existed,
            backup_path: backup.map(|b| b.to_string()),
        }
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);

        let mut journal = Journal::new("20260823-120000", "/profiles/dev/manifest.jsonc");
        journal.record(entry("/tmp/a", JournalAction::Restored, false, None));

        let path = journal.save(&root).await.unwrap();
        assert_eq!(path.file_name(), Some("20260823-120000.json"));

        let loaded = Journal::load(&path).await.unwrap();
        assert_eq!(loaded.run_id, "20260823-120000");
        assert_eq!(loaded.entries.len(), 1);
        assert!(!loaded.entries[0].target_existed_before);
    }

    #[tokio::test]
    async fn journal_json_uses_camel_case_and_omits_absent_backup() {
        let mut journal = Journal::new("20260823-120000", "m.jsonc");
        journal.record(entry("/tmp/a", JournalAction::SkippedUpToDate, true, None));

        let json = serde_json::to_string(&journal).unwrap();
        assert!(json.contains("\"runId\""));
        assert!(json.contains("\"targetExistedBefore\""));
        assert!(json.contains("\"skipped_up_to_date\""));
        assert!(!json.contains("backupPath"));
    }

    #[tokio::test]
    async fn latest_picks_highest_run_id() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);

        for run_id in ["20260101-080000", "20260823-120000", "20260401-090000"] {
            Journal::new(run_id, "m.jsonc").save(&root).await.unwrap();
        }

        let latest = Journal::latest(&root).await.unwrap().unwrap();
        assert_eq!(latest.file_stem(), Some("20260823-120000"));
    }

    #[tokio::test]
    async fn latest_is_none_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = utf8(&dir).join("nope");
        assert!(Journal::latest(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revert_deletes_created_targets() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let created = root.join("created.txt");
        tokio::fs::write(&created, "new").await.unwrap();

        let mut journal = Journal::new("r1", "m.jsonc");
        journal.record(entry(created.as_str(), JournalAction::Restored, false, None));

        let outcome = revert(&journal).await;
        assert_eq!(outcome.reverted, 1);
        assert_eq!(outcome.failed, 0);
        assert!(!created.exists());
    }

    #[tokio::test]
    async fn revert_restores_backups_over_overwritten_targets() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let target = root.join("settings.json");
        let backup = root.join("backup/settings.json");
        tokio::fs::write(&target, "overwritten").await.unwrap();
        tokio::fs::create_dir_all(backup.parent().unwrap()).await.unwrap();
        tokio::fs::write(&backup, "original").await.unwrap();

        let mut journal = Journal::new("r2", "m.jsonc");
        journal.record(entry(
            target.as_str(),
            JournalAction::Restored,
            true,
            Some(backup.as_str()),
        ));

        let outcome = revert(&journal).await;
        assert_eq!(outcome.reverted, 1);
        assert_eq!(
            tokio::fs::read_to_string(&target).await.unwrap(),
            "original"
        );
    }

    #[tokio::test]
    async fn revert_skips_up_to_date_entries() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let untouched = root.join("untouched.txt");
        tokio::fs::write(&untouched, "keep").await.unwrap();

        let mut journal = Journal::new("r3", "m.jsonc");
        journal.record(entry(
            untouched.as_str(),
            JournalAction::SkippedUpToDate,
            true,
            None,
        ));

        let outcome = revert(&journal).await;
        assert_eq!(outcome.reverted, 0);
        assert!(untouched.exists());
    }

    #[tokio::test]
    async fn revert_is_best_effort_across_entries() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let good = root.join("good.txt");
        tokio::fs::write(&good, "new").await.unwrap();

        let mut journal = Journal::new("r4", "m.jsonc");
        // Reverted second (reverse order): fine.
        journal.record(entry(good.as_str(), JournalAction::Restored, false, None));
        // Reverted first: pre-existed but backup is gone.
        journal.record(entry(
            root.join("bad.txt").as_str(),
            JournalAction::Restored,
            true,
            Some(root.join("missing-backup").as_str()),
        ));

        let outcome = revert(&journal).await;
        assert_eq!(outcome.reverted, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!good.exists());
    }
}
