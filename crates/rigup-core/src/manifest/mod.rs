//! Manifest loading, types, and resolution.

pub mod catalog;
pub mod resolver;
pub mod types;

pub use catalog::ModuleCatalog;
pub use resolver::{default_driver, ManifestResolver, MANIFEST_FILENAME};
pub use types::{
    AppEntry, ArrayStrategy, ManifestFile, Module, ResolvedApp, ResolvedManifest, RestoreEntry,
    RestoreType, VerifyEntry, VerifyType,
};
