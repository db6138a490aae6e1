//! End-to-end restore behavior: reconcile, journal, revert.

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use rigup_core::manifest::{ArrayStrategy, RestoreEntry, RestoreType};
use rigup_restore::{
    revert, Journal, LockClassifier, RestoreExecutor, RestoreOptions,
};

struct Fixture {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("profile")).unwrap();
        Self { _dir: dir, root }
    }

    fn options(&self, run_id: &str) -> RestoreOptions {
        RestoreOptions {
            manifest_dir: self.root.join("profile"),
            export_root: None,
            backup_root: self.root.join("backups"),
            journal_dir: self.root.join("journals"),
            run_id: run_id.to_string(),
            manifest_path: self.root.join("profile/manifest.jsonc").to_string(),
            dry_run: false,
        }
    }

    fn write_source(&self, rel: &str, content: &str) -> Utf8PathBuf {
        let path = self.root.join("profile").join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn target(&self, rel: &str) -> Utf8PathBuf {
        self.root.join("machine").join(rel)
    }
}

fn copy_entry(source: &str, target: &Utf8Path) -> RestoreEntry {
    RestoreEntry {
        id: None,
        kind: RestoreType::Copy,
        source: source.to_string(),
        target: target.to_string(),
        backup: true,
        optional: false,
        sensitive: false,
        exclude: vec![],
        requires_closed: vec![],
        array_strategy: ArrayStrategy::Replace,
        dedupe: false,
    }
}

#[tokio::test]
async fn restores_a_file_and_journals_the_creation() {
    let fx = Fixture::new();
    fx.write_source("gitconfig", "[user]\nname=Dev\n");
    let target = fx.target("gitconfig");

    let executor = RestoreExecutor::new(fx.options("run-1"));
    let report = executor.run(&[copy_entry("gitconfig", &target)]).await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "[user]\nname=Dev\n"
    );

    let journal = Journal::load(report.journal_path.as_ref().unwrap())
        .await
        .unwrap();
    assert_eq!(journal.entries.len(), 1);
    assert!(!journal.entries[0].target_existed_before);
}

#[tokio::test]
async fn second_run_is_all_skips() {
    let fx = Fixture::new();
    fx.write_source("settings.json", r#"{"a":1}"#);
    let target = fx.target("settings.json");
    let entries = [copy_entry("settings.json", &target)];

    let first = RestoreExecutor::new(fx.options("run-1"))
        .run(&entries)
        .await
        .unwrap();
    assert_eq!(first.restored, 1);

    let second = RestoreExecutor::new(fx.options("run-2"))
        .run(&entries)
        .await
        .unwrap();
    assert_eq!(second.restored, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(
        second.outcomes[0].message.as_deref(),
        Some("already up to date")
    );
}

#[tokio::test]
async fn overwrite_backs_up_the_previous_target() {
    let fx = Fixture::new();
    fx.write_source("app.conf", "new content here");
    let target = fx.target("app.conf");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "old").unwrap();

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[copy_entry("app.conf", &target)])
        .await
        .unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "new content here");

    let journal = Journal::load(report.journal_path.as_ref().unwrap())
        .await
        .unwrap();
    let backup = journal.entries[0].backup_path.as_ref().unwrap();
    assert_eq!(std::fs::read_to_string(backup).unwrap(), "old");
}

#[tokio::test]
async fn restore_then_revert_round_trips() {
    let fx = Fixture::new();
    fx.write_source("created.txt", "created by restore");
    fx.write_source("replaced.txt", "replacement");

    let created = fx.target("created.txt");
    let replaced = fx.target("replaced.txt");
    std::fs::create_dir_all(replaced.parent().unwrap()).unwrap();
    std::fs::write(&replaced, "original").unwrap();

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[
            copy_entry("created.txt", &created),
            copy_entry("replaced.txt", &replaced),
        ])
        .await
        .unwrap();
    assert_eq!(report.restored, 2);

    let journal = Journal::load(report.journal_path.as_ref().unwrap())
        .await
        .unwrap();
    let outcome = revert(&journal).await;

    assert_eq!(outcome.reverted, 2);
    assert_eq!(outcome.failed, 0);
    assert!(!created.exists(), "created target is deleted on revert");
    assert_eq!(std::fs::read_to_string(&replaced).unwrap(), "original");
}

#[tokio::test]
async fn directory_copy_honors_exclude_globs() {
    let fx = Fixture::new();
    fx.write_source("vscode/settings.json", "{}");
    fx.write_source("vscode/cache/state.bin", "junk");
    fx.write_source("vscode/logs/today.log", "junk");
    let target = fx.target("vscode");

    let mut entry = copy_entry("vscode", &target);
    entry.exclude = vec!["cache".to_string(), "*.log".to_string()];

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[entry])
        .await
        .unwrap();

    assert_eq!(report.restored, 1);
    assert!(target.join("settings.json").exists());
    assert!(!target.join("cache").exists());
    assert!(!target.join("logs/today.log").exists());
}

#[tokio::test]
async fn missing_required_source_fails_without_aborting_the_rest() {
    let fx = Fixture::new();
    fx.write_source("present.txt", "ok");

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[
            copy_entry("missing.txt", &fx.target("missing.txt")),
            copy_entry("present.txt", &fx.target("present.txt")),
        ])
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.restored, 1);
    assert!(report.outcomes[0]
        .message
        .as_deref()
        .unwrap()
        .contains("Source not found"));
    assert!(fx.target("present.txt").exists());
}

#[tokio::test]
async fn missing_optional_source_is_a_quiet_skip() {
    let fx = Fixture::new();
    let mut entry = copy_entry("missing.txt", &fx.target("missing.txt"));
    entry.optional = true;

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[entry])
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(
        report.outcomes[0].message.as_deref(),
        Some("Source not found (optional)")
    );
    assert!(report.outcomes[0].warnings.is_empty());
}

#[tokio::test]
async fn sensitive_entries_are_skipped_with_a_warning() {
    let fx = Fixture::new();
    fx.write_source("id_rsa", "PRIVATE KEY");
    let mut entry = copy_entry("id_rsa", &fx.target(".ssh/id_rsa"));
    entry.sensitive = true;

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[entry])
        .await
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert!(!report.outcomes[0].warnings.is_empty());
    assert!(!fx.target(".ssh/id_rsa").exists());
}

#[tokio::test]
async fn credential_looking_source_restores_with_a_warning() {
    let fx = Fixture::new();
    fx.write_source(".ssh/known_hosts", "github.com ssh-ed25519 AAAA");
    let target = fx.target("hosts-snapshot");

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[copy_entry(".ssh/known_hosts", &target)])
        .await
        .unwrap();

    assert_eq!(report.restored, 1);
    assert!(target.exists());
    assert!(report.outcomes[0]
        .warnings
        .iter()
        .any(|w| w.contains("credential material")));
}

#[tokio::test]
async fn partial_directory_copy_is_journaled_for_revert() {
    let fx = Fixture::new();
    fx.write_source("tree/a.txt", "landed");
    fx.write_source("tree/z.txt", "never lands");
    let target = fx.target("tree");

    // Occupy z.txt's destination with a non-empty directory so its
    // copy fails hard after a.txt has already been written.
    std::fs::create_dir_all(target.join("z.txt")).unwrap();
    std::fs::write(target.join("z.txt/occupied"), "x").unwrap();

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[copy_entry("tree", &target)])
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert!(!report.outcomes[0].success);
    assert_eq!(
        std::fs::read_to_string(target.join("a.txt")).unwrap(),
        "landed"
    );

    // The partial mutation is on record with its backup, so revert can
    // still undo the run.
    let journal = Journal::load(report.journal_path.as_ref().unwrap())
        .await
        .unwrap();
    assert_eq!(journal.entries.len(), 1);
    assert!(journal.entries[0].target_existed_before);
    assert!(journal.entries[0].backup_path.is_some());
}

#[tokio::test]
async fn export_root_wins_over_manifest_directory() {
    let fx = Fixture::new();
    fx.write_source("tool.conf", "from profile");
    let export_root = fx.root.join("export");
    std::fs::create_dir_all(&export_root).unwrap();
    std::fs::write(export_root.join("tool.conf"), "from export").unwrap();

    let mut options = fx.options("run-1");
    options.export_root = Some(export_root);
    let target = fx.target("tool.conf");

    RestoreExecutor::new(options)
        .run(&[copy_entry("tool.conf", &target)])
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "from export");
}

#[tokio::test]
async fn dry_run_writes_nothing_and_has_no_journal() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "x");
    let target = fx.target("a.txt");

    let mut options = fx.options("run-1");
    options.dry_run = true;

    let report = RestoreExecutor::new(options)
        .run(&[copy_entry("a.txt", &target)])
        .await
        .unwrap();

    assert_eq!(report.restored, 1, "dry run still classifies the entry");
    assert!(report.journal_path.is_none());
    assert!(!target.exists());
    assert!(!fx.root.join("journals").exists());
}

#[tokio::test]
async fn merge_json_entry_merges_into_existing_target() {
    let fx = Fixture::new();
    fx.write_source("settings.json", r#"{"theme":"dark"}"#);
    let target = fx.target("settings.json");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, r#"{"theme":"light","fontSize":14}"#).unwrap();

    let mut entry = copy_entry("settings.json", &target);
    entry.kind = RestoreType::MergeJson;

    let report = RestoreExecutor::new(fx.options("run-1"))
        .run(&[entry])
        .await
        .unwrap();
    assert_eq!(report.restored, 1);

    let merged: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(merged["theme"], "dark");
    assert_eq!(merged["fontSize"], 14);
}

#[tokio::test]
async fn merge_entry_rerun_reports_up_to_date() {
    let fx = Fixture::new();
    fx.write_source("extras.txt", "line a\nline b\n");
    let target = fx.target("shellrc");

    let mut entry = copy_entry("extras.txt", &target);
    entry.kind = RestoreType::Append;
    let entries = [entry];

    let first = RestoreExecutor::new(fx.options("run-1"))
        .run(&entries)
        .await
        .unwrap();
    assert_eq!(first.restored, 1);

    let second = RestoreExecutor::new(fx.options("run-2"))
        .run(&entries)
        .await
        .unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(
        second.outcomes[0].message.as_deref(),
        Some("already up to date")
    );
}

struct EverythingLocked;

impl LockClassifier for EverythingLocked {
    fn is_contention(&self, _err: &std::io::Error) -> bool {
        true
    }
}

#[tokio::test]
async fn locked_files_are_skipped_with_a_warning_not_failed() {
    let fx = Fixture::new();
    fx.write_source("tree/ok.txt", "fine");
    fx.write_source("tree/locked.txt", "cannot land");
    let target = fx.target("tree");

    // Make the copy of locked.txt fail by occupying its target path
    // with a directory; the injected classifier treats the error as
    // contention.
    std::fs::create_dir_all(target.join("locked.txt")).unwrap();

    let mut entry = copy_entry("tree", &target);
    entry.backup = false;

    let report = RestoreExecutor::with_lock_classifier(fx.options("run-1"), Box::new(EverythingLocked))
        .run(&[entry])
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(report.restored, 1);
    assert_eq!(report.outcomes[0].skipped_files.len(), 1);
    assert!(report.outcomes[0].warnings[0].contains("sharing violation"));
    assert_eq!(
        std::fs::read_to_string(target.join("ok.txt")).unwrap(),
        "fine"
    );
}
