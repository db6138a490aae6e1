//! Apps command: application inventory.

use crate::cli::{AppsCommands, AppsListArgs};
use crate::commands::{installed_set, CommandContext};
use crate::output;

pub async fn run(command: AppsCommands, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    match command {
        AppsCommands::List(args) => list(args, ctx).await,
    }
}

async fn list(args: AppsListArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let (resolved, _) = ctx.resolve(None)?;

    let installed = if args.installed {
        match resolved.apps.first() {
            Some(app) => installed_set(&app.driver).await,
            None => Default::default(),
        }
    } else {
        Default::default()
    };

    let apps: Vec<serde_json::Value> = resolved
        .apps
        .iter()
        .map(|app| {
            serde_json::json!({
                "id": app.id,
                "ref": app.reference,
                "driver": app.driver,
                "installed": if args.installed {
                    serde_json::Value::Bool(installed.contains(&app.reference))
                } else {
                    serde_json::Value::Null
                },
            })
        })
        .collect();

    if !ctx.json {
        output::header(&format!("Applications ({})", resolved.apps.len()));
        for app in &resolved.apps {
            let marker = if args.installed {
                if installed.contains(&app.reference) {
                    " [installed]"
                } else {
                    " [missing]"
                }
            } else {
                ""
            };
            println!("  {}  {} ({}){}", app.id, app.reference, app.driver, marker);
        }
    }

    Ok(serde_json::json!({ "apps": apps }))
}
