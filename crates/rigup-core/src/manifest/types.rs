//! Manifest document types.
//!
//! The on-disk manifest is a camelCase JSONC document. All collections
//! default to empty so a minimal manifest can declare only what it uses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::paths::normalize_separators;

/// A manifest document as authored on disk, before resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManifestFile {
    /// Manifest schema version
    #[serde(default)]
    pub version: Option<String>,

    /// Human-readable manifest name
    #[serde(default)]
    pub name: Option<String>,

    /// Other manifests to compose: paths (with extension) or profile names
    #[serde(default)]
    pub includes: Vec<String>,

    /// Install references to exclude (root manifest only)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Install references whose matched configs are excluded (root only)
    #[serde(default)]
    pub exclude_configs: Vec<String>,

    /// Config modules whose restore entries are spliced in
    #[serde(default)]
    pub modules: Vec<String>,

    /// Alias for modules kept for older manifests
    #[serde(default)]
    pub bundles: Vec<String>,

    /// Applications to install
    #[serde(default)]
    pub apps: Vec<AppEntry>,

    /// Inline restore entries (applied after module-contributed entries)
    #[serde(default)]
    pub restore: Vec<RestoreEntry>,

    /// Post-restore verification checks
    #[serde(default)]
    pub verify: Vec<VerifyEntry>,
}

/// One application declaration.
///
/// `refs` maps a platform driver name (`winget`, `brew`, `apt`, ...) to
/// the package reference used by that driver. App identity for exclusion
/// and cross-include merging is the reference for the active driver, not
/// the `id` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    pub id: String,
    pub refs: BTreeMap<String, String>,
}

/// An app entry after platform resolution: the driver has been chosen
/// and the reference is concrete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedApp {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub driver: String,
}

/// How a restore entry reconciles target content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreType {
    #[serde(rename = "copy")]
    Copy,
    #[serde(rename = "merge-json")]
    MergeJson,
    #[serde(rename = "merge-ini")]
    MergeIni,
    #[serde(rename = "append")]
    Append,
}

impl RestoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::MergeJson => "merge-json",
            Self::MergeIni => "merge-ini",
            Self::Append => "append",
        }
    }
}

/// Array handling for `merge-json` entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStrategy {
    /// Source array wins wholesale
    #[default]
    Replace,
    /// Existing elements in existing order, then new source elements
    Union,
}

fn default_true() -> bool {
    true
}

/// One declared file/config reconciliation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreEntry {
    /// Explicit id; derived from type/source/target when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub kind: RestoreType,

    /// Source path, relative to the manifest directory or export root
    pub source: String,

    /// Target path; may use env vars, `~`, and logical tokens
    pub target: String,

    /// Back up an existing target before overwriting
    #[serde(default = "default_true")]
    pub backup: bool,

    /// A missing source is a quiet skip instead of a failure
    #[serde(default)]
    pub optional: bool,

    /// Never restore; record as skipped with a warning
    #[serde(default)]
    pub sensitive: bool,

    /// Glob patterns excluded from directory copies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Process names that should not be running during this restore
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_closed: Vec<String>,

    /// Array strategy for merge-json entries
    #[serde(default, skip_serializing_if = "is_default_array_strategy")]
    pub array_strategy: ArrayStrategy,

    /// Drop duplicate existing lines before appending (append entries)
    #[serde(default)]
    pub dedupe: bool,
}

fn is_default_array_strategy(s: &ArrayStrategy) -> bool {
    *s == ArrayStrategy::Replace
}

impl RestoreEntry {
    /// Stable id for journaling and diffing.
    ///
    /// Two entries with the same id are the same logical action across
    /// runs, whether the id was written explicitly or derived.
    pub fn action_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!(
                "{}:{}->{}",
                self.kind.as_str(),
                normalize_separators(self.source.trim()),
                normalize_separators(self.target.trim()),
            ),
        }
    }
}

/// Kind of a verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyType {
    #[serde(rename = "file-exists")]
    FileExists,
    #[serde(rename = "command")]
    Command,
}

impl VerifyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileExists => "file-exists",
            Self::Command => "command",
        }
    }
}

/// One post-restore verification check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEntry {
    #[serde(rename = "type")]
    pub kind: VerifyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl VerifyEntry {
    /// The path or command the check is keyed by in plans and diffs.
    pub fn subject(&self) -> &str {
        match self.kind {
            VerifyType::FileExists => self.path.as_deref().unwrap_or_default(),
            VerifyType::Command => self.command.as_deref().unwrap_or_default(),
        }
    }
}

/// A config module: a named, reusable set of restore entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub restore: Vec<RestoreEntry>,
}

/// A fully resolved manifest: includes, modules, and bundles expanded,
/// root exclusions applied, platform references chosen. Read-only after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedManifest {
    pub version: Option<String>,
    pub name: Option<String>,

    /// Path of the root manifest this was resolved from
    pub path: String,

    /// Root-level exclusions (normalised to present, ordered sequences)
    pub exclude: Vec<String>,
    pub exclude_configs: Vec<String>,

    pub apps: Vec<ResolvedApp>,
    pub restore: Vec<RestoreEntry>,
    pub verify: Vec<VerifyEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonc;

    #[test]
    fn derived_id_is_type_source_target() {
        let entry = RestoreEntry {
            id: None,
            kind: RestoreType::Copy,
            source: "configs\\git\\.gitconfig".to_string(),
            target: "~/.gitconfig".to_string(),
            backup: true,
            optional: false,
            sensitive: false,
            exclude: vec![],
            requires_closed: vec![],
            array_strategy: ArrayStrategy::Replace,
            dedupe: false,
        };
        assert_eq!(entry.action_id(), "copy:configs/git/.gitconfig->~/.gitconfig");
    }

    #[test]
    fn explicit_id_wins_over_derivation() {
        let entry = RestoreEntry {
            id: Some("git-config".to_string()),
            kind: RestoreType::Copy,
            source: "a".to_string(),
            target: "b".to_string(),
            backup: true,
            optional: false,
            sensitive: false,
            exclude: vec![],
            requires_closed: vec![],
            array_strategy: ArrayStrategy::Replace,
            dedupe: false,
        };
        assert_eq!(entry.action_id(), "git-config");
    }

    #[test]
    fn restore_entry_defaults() {
        let entry: RestoreEntry = jsonc::from_str(
            r#"{ "type": "copy", "source": "a", "target": "b" }"#,
        )
        .unwrap();
        assert!(entry.backup, "backup defaults to true");
        assert!(!entry.optional);
        assert!(!entry.sensitive);
        assert!(!entry.dedupe);
        assert_eq!(entry.array_strategy, ArrayStrategy::Replace);
        assert!(entry.exclude.is_empty());
    }

    #[test]
    fn manifest_parses_from_jsonc() {
        let m: ManifestFile = jsonc::from_str(
            r#"{
                // developer workstation
                "name": "dev",
                "apps": [
                    { "id": "git", "refs": { "winget": "Git.Git", "brew": "git" } },
                ],
                "restore": [
                    { "type": "merge-json", "source": "settings.json", "target": "~/.app/settings.json" },
                ],
            }"#,
        )
        .unwrap();
        assert_eq!(m.name.as_deref(), Some("dev"));
        assert_eq!(m.apps.len(), 1);
        assert_eq!(m.apps[0].refs["winget"], "Git.Git");
        assert_eq!(m.restore[0].kind, RestoreType::MergeJson);
    }

    #[test]
    fn unknown_manifest_fields_are_rejected() {
        let result: crate::error::Result<ManifestFile> =
            jsonc::from_str(r#"{ "name": "dev", "restores": [] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn verify_subject_follows_kind() {
        let v = VerifyEntry {
            kind: VerifyType::FileExists,
            path: Some("~/.gitconfig".to_string()),
            command: None,
        };
        assert_eq!(v.subject(), "~/.gitconfig");

        let v = VerifyEntry {
            kind: VerifyType::Command,
            path: None,
            command: Some("git --version".to_string()),
        };
        assert_eq!(v.subject(), "git --version");
    }
}
