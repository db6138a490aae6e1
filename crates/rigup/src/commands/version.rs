//! Version command.

use crate::cli::VersionArgs;
use crate::commands::CommandContext;

pub fn run(_args: VersionArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    if !ctx.json {
        println!("rigup {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
