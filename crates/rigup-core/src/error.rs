//! Error types for rigup-core

use thiserror::Error;

/// Result type alias using rigup-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-class errors for rigup.
///
/// These are the fatal errors: anything in this enum aborts the whole
/// operation before any on-disk mutation. Per-entry conditions (missing
/// optional sources, locked files, excluded paths) are carried inside
/// result structs instead and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// Manifest file not found
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: String },

    /// Included profile could not be resolved
    #[error("included profile not found: {name}")]
    IncludeNotFound { name: String },

    /// Include chain loops back on itself
    #[error("include cycle detected: {chain}")]
    IncludeCycle { chain: String },

    /// Referenced module does not exist in the catalog
    #[error("module not found: {name}")]
    ModuleNotFound { name: String },

    /// Structurally invalid manifest
    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    /// JSON parsing error (after comment stripping)
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bundle schema version is not supported by this build
    #[error("Incompatible bundle schema version: {found} (supported: {supported})")]
    SchemaIncompatible { found: String, supported: String },

    /// Manifest could not be written back to disk
    #[error("Failed to write manifest: {path}: {message}")]
    ManifestWrite { path: String, message: String },

    /// A path contained non-UTF-8 components
    #[error("Path is not valid UTF-8: {path}")]
    NonUtf8Path { path: String },

    /// Environment variable referenced by a path placeholder is unset
    #[error("Undefined variable in path: {name}")]
    UndefinedVariable { name: String },
}

impl Error {
    /// Create a manifest not found error
    pub fn manifest_not_found(path: impl Into<String>) -> Self {
        Self::ManifestNotFound { path: path.into() }
    }

    /// Create an include not found error
    pub fn include_not_found(name: impl Into<String>) -> Self {
        Self::IncludeNotFound { name: name.into() }
    }

    /// Create an include cycle error from the chain of manifest names
    pub fn include_cycle(chain: &[String]) -> Self {
        Self::IncludeCycle {
            chain: chain.join(" -> "),
        }
    }

    /// Create a module not found error
    pub fn module_not_found(name: impl Into<String>) -> Self {
        Self::ModuleNotFound { name: name.into() }
    }

    /// Create an invalid manifest error
    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            message: message.into(),
        }
    }

    /// Create a schema incompatibility error
    pub fn schema_incompatible(found: impl Into<String>, supported: impl Into<String>) -> Self {
        Self::SchemaIncompatible {
            found: found.into(),
            supported: supported.into(),
        }
    }

    /// Create a manifest write error
    pub fn manifest_write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ManifestWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a non-UTF-8 path error
    pub fn non_utf8_path(path: impl Into<String>) -> Self {
        Self::NonUtf8Path { path: path.into() }
    }

    /// Stable machine-readable code for the CLI envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ManifestNotFound { .. } | Self::IncludeNotFound { .. } => "MANIFEST_NOT_FOUND",
            Self::SchemaIncompatible { .. } => "SCHEMA_INCOMPATIBLE",
            Self::ManifestWrite { .. } => "MANIFEST_WRITE_FAILED",
            _ => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_not_found_message_names_the_profile() {
        let err = Error::include_not_found("workstation");
        assert_eq!(err.to_string(), "included profile not found: workstation");
    }

    #[test]
    fn error_codes_map_to_envelope_codes() {
        assert_eq!(Error::manifest_not_found("x").code(), "MANIFEST_NOT_FOUND");
        assert_eq!(
            Error::schema_incompatible("9", "1").code(),
            "SCHEMA_INCOMPATIBLE"
        );
        assert_eq!(
            Error::manifest_write("m.jsonc", "disk full").code(),
            "MANIFEST_WRITE_FAILED"
        );
        assert_eq!(Error::module_not_found("git").code(), "INTERNAL_ERROR");
    }

    #[test]
    fn include_cycle_renders_chain() {
        let chain = vec!["a.jsonc".to_string(), "b.jsonc".to_string(), "a.jsonc".to_string()];
        let err = Error::include_cycle(&chain);
        assert!(err.to_string().contains("a.jsonc -> b.jsonc -> a.jsonc"));
    }
}
