//! rigup-pkg: package-manager subprocess wrapper.
//!
//! Supplies the "what's installed" snapshot the plan generator consumes
//! and performs installs, behind a trait so everything above it stays
//! testable without a real package manager.

pub mod driver;
pub mod error;
pub mod subprocess;

pub use driver::{DriverKind, PackageDriver};
pub use error::{Error, Result};
pub use subprocess::{SubprocessDriver, DEFAULT_TIMEOUT};
