//! rigup-restore: restore execution, merge strategies, journal, revert.
//!
//! The executor consumes resolved restore entries and reconciles each
//! target on the machine, journaling every mutation so a run can be
//! reverted.

pub mod executor;
pub mod filters;
pub mod journal;
pub mod lockerr;
pub mod merge;

pub use executor::{EntryOutcome, RestoreExecutor, RestoreOptions, RestoreReport};
pub use filters::{is_sensitive_path, ExcludeSet};
pub use journal::{revert, Journal, JournalAction, JournalEntry, RevertOutcome};
pub use lockerr::{LockClassifier, PlatformLockClassifier};
pub use merge::{append_lines, merge_content, merge_ini, merge_json};
