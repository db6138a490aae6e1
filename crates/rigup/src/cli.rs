//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// rigup - Declarative machine provisioning and config reconciliation
#[derive(Parser, Debug)]
#[command(name = "rigup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the manifest (default: manifest.jsonc)
    #[arg(short, long, global = true)]
    pub manifest: Option<Utf8PathBuf>,

    /// Emit a machine-readable JSON envelope on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the manifest and generate an action plan
    Plan(PlanArgs),

    /// Reconcile restore entries onto this machine
    Restore(RestoreArgs),

    /// Undo a previous restore run from its journal
    Revert(RevertArgs),

    /// Compare two saved plans
    Diff(DiffArgs),

    /// Export the manifest and its configs as a portable bundle
    Export(ExportArgs),

    /// Resolve the manifest and report problems without acting
    Validate(ValidateArgs),

    /// Application inventory
    #[command(subcommand)]
    Apps(AppsCommands),

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Write the plan JSON to a file as well
    #[arg(short, long)]
    pub out: Option<Utf8PathBuf>,

    /// Package driver to classify against (default: platform driver)
    #[arg(long)]
    pub driver: Option<String>,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Restore from an exported bundle instead of a local profile
    #[arg(short, long)]
    pub bundle: Option<Utf8PathBuf>,

    /// Alternate directory preferred when resolving restore sources
    #[arg(long)]
    pub export_root: Option<Utf8PathBuf>,

    /// Skip post-restore verification checks
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
pub struct RevertArgs {
    /// Journal file to revert (default: the most recent run)
    #[arg(short, long)]
    pub journal: Option<Utf8PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// First plan file
    pub plan_a: Utf8PathBuf,

    /// Second plan file
    pub plan_b: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output bundle path (default: {name}.rigup.zip)
    #[arg(short, long)]
    pub out: Option<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {}

#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// List the applications the manifest declares
    List(AppsListArgs),
}

#[derive(Args, Debug)]
pub struct AppsListArgs {
    /// Mark apps already installed according to the package driver
    #[arg(long)]
    pub installed: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {}
