//! rigup-core: shared types and manifest machinery for rigup.
//!
//! This crate owns the pieces every other rigup crate builds on:
//! the configuration-class error type, comment-tolerant JSON reading,
//! path expansion and backup-safe normalisation, manifest types, the
//! include/module resolver, and manifest content hashing.

pub mod error;
pub mod hash;
pub mod jsonc;
pub mod manifest;
pub mod paths;

pub use error::{Error, Result};
