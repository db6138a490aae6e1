//! Path filtering for restore operations.
//!
//! Two concerns live here: user-declared exclusion globs for directory
//! copies, and the sensitive-path heuristic that flags credential
//! material. Excluded paths are never visited, never attempted, and
//! never reported as failures; sensitive paths are restored but always
//! carry a visible warning (entries flagged `sensitive` are skipped
//! outright by the executor).

use camino::Utf8Path;
use globset::{Glob, GlobSet, GlobSetBuilder};

use rigup_core::paths::normalize_separators;

/// Path segments that indicate credential stores or private keys.
const SENSITIVE_SEGMENTS: &[&str] = &[
    ".ssh",
    ".gnupg",
    ".aws",
    ".azure",
    ".kube",
    ".netrc",
    ".npmrc",
    "credentials",
    "id_rsa",
    "id_ed25519",
];

/// Compiled exclusion globs for one restore entry.
///
/// Patterns are matched against the path relative to the copy source,
/// separator-agnostically: `cache/**` written on any platform matches
/// `cache\tmp\x` and `cache/tmp/x` alike. Each pattern also matches the
/// subtree beneath it, so excluding `node_modules` excludes everything
/// inside it without requiring an explicit `node_modules/**`.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    globset: GlobSet,
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> anyhow::Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let normalized = normalize_separators(pattern);
            let glob = Glob::new(&normalized)
                .map_err(|e| anyhow::anyhow!("Invalid exclusion pattern '{}': {}", pattern, e))?;
            builder.add(glob);

            if !normalized.ends_with("/**") {
                let subtree = format!("{}/**", normalized.trim_end_matches('/'));
                let glob = Glob::new(&subtree).map_err(|e| {
                    anyhow::anyhow!("Invalid exclusion pattern '{}': {}", subtree, e)
                })?;
                builder.add(glob);
            }
        }

        let globset = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build exclusion globset: {}", e))?;

        Ok(Self { globset })
    }

    /// Empty set that excludes nothing.
    pub fn empty() -> Self {
        Self {
            globset: GlobSet::empty(),
        }
    }

    /// Checks whether a source-relative path is excluded.
    pub fn is_excluded(&self, relative: &Utf8Path) -> bool {
        self.globset
            .is_match(normalize_separators(relative.as_str()))
    }
}

/// Heuristic check for credential stores, SSH keys, and cloud-credential
/// directories. Matching is by exact path segment or file stem, so
/// `.ssh/config` matches while `datasshop/config` does not.
pub fn is_sensitive_path(path: &Utf8Path) -> bool {
    let normalized = normalize_separators(path.as_str());
    normalized.split('/').any(|segment| {
        SENSITIVE_SEGMENTS
            .iter()
            .any(|s| segment.eq_ignore_ascii_case(s))
    })
}
