//! rigup CLI - declarative machine provisioning and config reconciliation
//!
//! This is the main entry point for the rigup command-line interface.

mod cli;
mod commands;
mod envelope;
mod output;

use anyhow::Result;
use camino::Utf8PathBuf;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::CommandContext;
use envelope::Envelope;
use rigup_plan::format_run_id;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so a --json envelope owns stdout
    init_tracing(cli.verbose, cli.quiet);

    let now = Utc::now();
    let ctx = CommandContext {
        manifest: cli
            .manifest
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from("manifest.jsonc")),
        json: cli.json,
        run_id: format_run_id(&now),
        timestamp_utc: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let command_name = command_name(&cli.command);
    let result = dispatch(cli.command, &ctx).await;

    if ctx.json {
        let envelope = match &result {
            Ok(data) => Envelope::success(command_name, &ctx.run_id, &ctx.timestamp_utc, data.clone()),
            Err(e) => Envelope::failure(command_name, &ctx.run_id, &ctx.timestamp_utc, e),
        };
        println!("{}", envelope.to_json());
        std::process::exit(if envelope.success { 0 } else { 1 });
    }

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            output::error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

async fn dispatch(command: Commands, ctx: &CommandContext) -> Result<serde_json::Value> {
    match command {
        Commands::Plan(args) => commands::plan::run(args, ctx).await,
        Commands::Restore(args) => commands::restore::run(args, ctx).await,
        Commands::Revert(args) => commands::revert::run(args, ctx).await,
        Commands::Diff(args) => commands::diff::run(args, ctx).await,
        Commands::Export(args) => commands::export::run(args, ctx).await,
        Commands::Validate(args) => commands::validate::run(args, ctx).await,
        Commands::Apps(args) => commands::apps::run(args, ctx).await,
        Commands::Version(args) => commands::version::run(args, ctx),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Plan(_) => "plan",
        Commands::Restore(_) => "restore",
        Commands::Revert(_) => "revert",
        Commands::Diff(_) => "diff",
        Commands::Export(_) => "export",
        Commands::Validate(_) => "validate",
        Commands::Apps(_) => "apps list",
        Commands::Version(_) => "version",
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
