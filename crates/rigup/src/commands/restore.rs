//! Restore command: reconcile restore entries, then verify.

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use rigup_bundle::extract_bundle;
use rigup_core::manifest::{ResolvedManifest, VerifyEntry, VerifyType};
use rigup_core::{jsonc, paths};
use rigup_restore::{RestoreExecutor, RestoreOptions};

use crate::cli::RestoreArgs;
use crate::commands::CommandContext;
use crate::envelope::CodedError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResult {
    kind: String,
    subject: String,
    passed: bool,
}

pub async fn run(args: RestoreArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let data_root = ctx.data_root()?;

    // A bundle carries an already-resolved manifest and its own source
    // tree; a local profile goes through normal resolution.
    let (resolved, manifest_dir, manifest_path, export_root) = match &args.bundle {
        Some(bundle) => {
            let dest = data_root.join("bundles").join(&ctx.run_id);
            let extracted = extract_bundle(bundle, &dest)
                .with_context(|| format!("Failed to extract bundle {}", bundle))?;
            let content = std::fs::read_to_string(&extracted.manifest_path)?;
            let resolved: ResolvedManifest = jsonc::from_str(&content)
                .with_context(|| format!("Invalid bundled manifest in {}", bundle))?;
            (
                resolved,
                extracted.root.clone(),
                extracted.manifest_path.to_string(),
                Some(extracted.export_root),
            )
        }
        None => {
            let (resolved, _) = ctx.resolve(None)?;
            (
                resolved,
                ctx.manifest_dir(),
                ctx.manifest.to_string(),
                args.export_root.clone(),
            )
        }
    };

    let options = RestoreOptions {
        manifest_dir,
        export_root,
        backup_root: data_root.join("backups"),
        journal_dir: data_root.join("journals"),
        run_id: ctx.run_id.clone(),
        manifest_path,
        dry_run: args.dry_run,
    };

    let spinner = (!ctx.json).then(|| output::spinner("Restoring configuration..."));
    let report = RestoreExecutor::new(options).run(&resolved.restore).await?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if !ctx.json {
        output::header(if args.dry_run {
            "Restore (dry run)"
        } else {
            "Restore"
        });
        output::kv("restored", &report.restored.to_string());
        output::kv("skipped", &report.skipped.to_string());
        output::kv("failed", &report.failed.to_string());
        for outcome in &report.outcomes {
            for warning in &outcome.warnings {
                output::warning(&format!("{}: {}", outcome.id, warning));
            }
            if !outcome.success {
                output::error(&format!(
                    "{}: {}",
                    outcome.id,
                    outcome.message.as_deref().unwrap_or("failed")
                ));
            }
        }
        if let Some(journal) = &report.journal_path {
            output::kv("journal", journal.as_str());
        }
    }

    let verify = if args.no_verify || args.dry_run {
        Vec::new()
    } else {
        run_checks(&resolved.verify).await?
    };

    let failed_checks = verify.iter().filter(|v| !v.passed).count();
    if !ctx.json {
        for result in &verify {
            if result.passed {
                output::success(&format!("verify {}: {}", result.kind, result.subject));
            } else {
                output::error(&format!("verify {}: {}", result.kind, result.subject));
            }
        }
        if report.failed == 0 && failed_checks == 0 {
            output::success("Restore complete");
        }
    }

    let data = serde_json::json!({
        "report": report,
        "verify": verify,
    });

    if failed_checks > 0 {
        return Err(CodedError::new(
            "VERIFY_FAILED",
            format!("{failed_checks} verification check(s) failed"),
        )
        .into());
    }

    Ok(data)
}

/// Run verification checks. Check failures are results, not errors;
/// only being unable to run a check at all is an error.
async fn run_checks(entries: &[VerifyEntry]) -> anyhow::Result<Vec<VerifyResult>> {
    let mut results = Vec::with_capacity(entries.len());
    let home = paths::home_dir()?;

    for entry in entries {
        let passed = match entry.kind {
            VerifyType::FileExists => {
                let Some(path) = &entry.path else {
                    debug!("file-exists check without a path, treated as failed");
                    results.push(VerifyResult {
                        kind: entry.kind.as_str().to_string(),
                        subject: String::new(),
                        passed: false,
                    });
                    continue;
                };
                paths::expand(path, &home)?.exists()
            }
            VerifyType::Command => {
                let Some(command) = &entry.command else {
                    results.push(VerifyResult {
                        kind: entry.kind.as_str().to_string(),
                        subject: String::new(),
                        passed: false,
                    });
                    continue;
                };
                run_check_command(command).await
            }
        };

        results.push(VerifyResult {
            kind: entry.kind.as_str().to_string(),
            subject: entry.subject().to_string(),
            passed,
        });
    }
    Ok(results)
}

async fn run_check_command(command: &str) -> bool {
    let mut cmd = if cfg!(windows) {
        let mut c = tokio::process::Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.args(["-c", command]);
        c
    };
    cmd.kill_on_drop(true);

    match tokio::time::timeout(std::time::Duration::from_secs(120), cmd.output()).await {
        Ok(Ok(output)) => output.status.success(),
        _ => false,
    }
}
