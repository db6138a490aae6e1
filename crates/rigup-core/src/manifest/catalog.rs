//! Config-module catalog.
//!
//! Modules live as `{name}.jsonc` files (or `{name}/module.jsonc`
//! folders) under a modules directory. The catalog caches parsed modules
//! across lookups within one resolver lifetime; it is an explicitly
//! constructed object so tests create and drop their own instead of
//! sharing process-wide state.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::jsonc;
use crate::manifest::types::Module;

#[derive(Debug)]
pub struct ModuleCatalog {
    dir: Utf8PathBuf,
    cache: HashMap<String, Module>,
}

impl ModuleCatalog {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Directory this catalog reads modules from.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Load a module by name, consulting the cache first.
    ///
    /// A module that exists but declares no restore entries is valid and
    /// contributes nothing; a missing module is a configuration error.
    pub fn load(&mut self, name: &str) -> Result<Module> {
        if let Some(module) = self.cache.get(name) {
            return Ok(module.clone());
        }

        let candidates = [
            self.dir.join(format!("{name}.jsonc")),
            self.dir.join(name).join("module.jsonc"),
        ];
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| Error::module_not_found(name))?;

        debug!("Loading module '{}' from {}", name, path);
        let content = std::fs::read_to_string(path)?;
        let module: Module = jsonc::from_str(&content)?;
        self.cache.insert(name.to_string(), module.clone());
        Ok(module)
    }

    /// Drop all cached modules.
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    /// Number of cached modules (for tests and diagnostics).
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
