//! rigup-plan: deterministic plan generation and plan diffing.

pub mod diff;
pub mod plan;

pub use diff::{diff, ChangedAction, DiffResult};
pub use plan::{build_plan, format_run_id, Action, ManifestRef, Plan, Summary};
