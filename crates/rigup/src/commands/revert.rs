//! Revert command: undo a restore run from its journal.

use anyhow::Context;
use camino::Utf8PathBuf;

use rigup_restore::{revert, Journal};

use crate::cli::RevertArgs;
use crate::commands::CommandContext;
use crate::output;

pub async fn run(args: RevertArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let journal_dir = ctx.data_root()?.join("journals");

    let journal_path: Utf8PathBuf = match &args.journal {
        Some(path) => path.clone(),
        None => Journal::latest(&journal_dir)
            .await?
            .context("No restore journal found; nothing to revert")?,
    };

    let journal = Journal::load(&journal_path).await?;

    if !args.yes && !ctx.json {
        let prompt = format!(
            "Revert run {} ({} entries, manifest {})?",
            journal.run_id,
            journal.entries.len(),
            journal.manifest_path
        );
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Revert cancelled");
            return Ok(serde_json::json!({ "cancelled": true }));
        }
    }

    let outcome = revert(&journal).await;

    if !ctx.json {
        output::header(&format!("Revert of run {}", outcome.run_id));
        output::kv("reverted", &outcome.reverted.to_string());
        output::kv("failed", &outcome.failed.to_string());
        for warning in &outcome.warnings {
            output::warning(warning);
        }
        if outcome.failed == 0 {
            output::success("Revert complete");
        }
    }

    Ok(serde_json::to_value(&outcome)?)
}
