//! Diff command: compare two saved plans.

use anyhow::Context;

use rigup_plan::{diff, Plan};

use crate::cli::DiffArgs;
use crate::commands::CommandContext;
use crate::output;

pub async fn run(args: DiffArgs, ctx: &CommandContext) -> anyhow::Result<serde_json::Value> {
    let content_a = std::fs::read_to_string(&args.plan_a)
        .with_context(|| format!("Failed to read plan {}", args.plan_a))?;
    let content_b = std::fs::read_to_string(&args.plan_b)
        .with_context(|| format!("Failed to read plan {}", args.plan_b))?;

    let plan_a = Plan::from_json(&content_a)
        .with_context(|| format!("Invalid plan file {}", args.plan_a))?;
    let plan_b = Plan::from_json(&content_b)
        .with_context(|| format!("Invalid plan file {}", args.plan_b))?;

    let result = diff(&plan_a, &plan_b);

    if !ctx.json {
        if result.identical {
            output::success("Plans are identical");
        } else {
            output::header("Plan differences");
            for key in &result.actions_added {
                output::diff_line('+', key);
            }
            for key in &result.actions_removed {
                output::diff_line('-', key);
            }
            for change in &result.actions_changed {
                output::diff_line(
                    '~',
                    &format!("{} ({} -> {})", change.key, change.status_a, change.status_b),
                );
            }
        }
    }

    Ok(serde_json::to_value(&result)?)
}
