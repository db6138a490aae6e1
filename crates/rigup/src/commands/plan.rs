//! Plan command: resolve the manifest and classify actions.

use anyhow::Context;

use rigup_core::manifest::default_driver;
use rigup_plan::{build_plan, Action};

use crate::cli::PlanArgs;
use crate::commands::{installed_set, CommandContext};
use crate::output;

pub async fn run(args: PlanArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let driver = args
        .driver
        .clone()
        .unwrap_or_else(|| default_driver().to_string());

    let (resolved, manifest_hash) = ctx.resolve(Some(&driver))?;
    let installed = installed_set(&driver).await;
    let plan = build_plan(
        &resolved,
        &manifest_hash,
        &ctx.run_id,
        &ctx.timestamp_utc,
        &installed,
    );

    if let Some(out) = &args.out {
        let json = plan.to_json()?;
        std::fs::write(out, json).with_context(|| format!("Failed to write plan to {}", out))?;
    }

    if !ctx.json {
        output::header(&format!(
            "Plan for {}",
            resolved.name.as_deref().unwrap_or("manifest")
        ));
        output::kv("run", &plan.run_id);
        output::kv("driver", &driver);
        output::kv("install", &plan.summary.install.to_string());
        output::kv("skip", &plan.summary.skip.to_string());
        output::kv("restore", &plan.summary.restore.to_string());
        output::kv("verify", &plan.summary.verify.to_string());

        for action in &plan.actions {
            if let Action::App {
                reference, status, ..
            } = action
            {
                output::action_line(status, reference);
            }
        }
        if let Some(out) = &args.out {
            output::success(&format!("Plan written to {}", out));
        }
    }

    Ok(serde_json::to_value(&plan)?)
}
