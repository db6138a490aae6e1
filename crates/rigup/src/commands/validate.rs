//! Validate command: resolve the manifest without acting on it.

use crate::cli::ValidateArgs;
use crate::commands::CommandContext;
use crate::output;

pub async fn run(_args: ValidateArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let (resolved, manifest_hash) = ctx.resolve(None)?;

    if !ctx.json {
        output::success(&format!("{} is valid", ctx.manifest));
        output::kv("name", resolved.name.as_deref().unwrap_or("-"));
        output::kv("apps", &resolved.apps.len().to_string());
        output::kv("restore", &resolved.restore.len().to_string());
        output::kv("verify", &resolved.verify.len().to_string());
        if !resolved.exclude.is_empty() {
            output::kv("excluded", &resolved.exclude.join(", "));
        }
    }

    Ok(serde_json::json!({
        "valid": true,
        "name": resolved.name,
        "hash": manifest_hash,
        "apps": resolved.apps.len(),
        "restore": resolved.restore.len(),
        "verify": resolved.verify.len(),
        "exclude": resolved.exclude,
        "excludeConfigs": resolved.exclude_configs,
    }))
}
