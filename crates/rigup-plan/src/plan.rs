//! Deterministic plan generation.
//!
//! A plan is a pure function of `(resolved manifest, manifest hash,
//! runId, timestamp, installed set)`. Nothing in here reads a clock,
//! generates an id, or iterates an unordered map: two invocations with
//! identical inputs serialize byte-identically. The runId and timestamp
//! are caller-supplied for exactly this reason.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rigup_core::manifest::{ResolvedManifest, VerifyType};

/// Skip reason attached to app actions whose reference is already installed.
pub const REASON_ALREADY_INSTALLED: &str = "already installed";

/// Format a runId from a UTC instant: `yyyyMMdd-HHmmss`.
pub fn format_run_id(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Identity of the manifest a plan was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRef {
    pub path: String,
    pub name: Option<String>,
    pub hash: String,
}

/// Classified action counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub install: usize,
    pub skip: usize,
    pub restore: usize,
    pub verify: usize,
}

/// One planned action.
///
/// App actions are classified install/skip against the installed set;
/// `reason` is present only on skips — absence of the field, not a null,
/// is the contract. Restore and verify actions carry a constant pending
/// status at plan time; execution reports replace it with an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename = "app")]
    App {
        id: String,
        #[serde(rename = "ref")]
        reference: String,
        driver: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "restore", rename_all = "camelCase")]
    Restore {
        id: String,
        restore_type: String,
        source: String,
        target: String,
        status: String,
    },
    #[serde(rename = "verify", rename_all = "camelCase")]
    Verify {
        verify_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        status: String,
    },
}

impl Action {
    /// Stable key identifying the same logical action across artifacts.
    pub fn key(&self) -> String {
        match self {
            Self::App { reference, .. } => format!("app:{reference}"),
            Self::Restore { source, target, .. } => format!("restore:{source}->{target}"),
            Self::Verify {
                verify_type,
                path,
                command,
                ..
            } => {
                let subject = path.as_deref().or(command.as_deref()).unwrap_or_default();
                format!("verify:{verify_type}:{subject}")
            }
        }
    }

    /// The action's status field.
    pub fn status(&self) -> &str {
        match self {
            Self::App { status, .. }
            | Self::Restore { status, .. }
            | Self::Verify { status, .. } => status,
        }
    }
}

/// A resolved, timestamped, hashed, classified action list.
///
/// Field order is fixed and matches the wire contract; serializing the
/// same plan twice yields byte-identical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub run_id: String,
    pub timestamp: String,
    pub manifest: ManifestRef,
    pub summary: Summary,
    pub actions: Vec<Action>,
}

impl Plan {
    /// Serialize with stable formatting for plan files and diffing.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Build a plan from a resolved manifest and an installed-reference set.
///
/// Classification: an app action is `skip` with reason "already
/// installed" iff its reference is in `installed`; otherwise `install`
/// with no reason at all. Action order is fixed: apps in manifest
/// order, then restore entries, then verify entries.
pub fn build_plan(
    manifest: &ResolvedManifest,
    manifest_hash: &str,
    run_id: &str,
    timestamp: &str,
    installed: &BTreeSet<String>,
) -> Plan {
    let mut actions = Vec::with_capacity(
        manifest.apps.len() + manifest.restore.len() + manifest.verify.len(),
    );
    let mut summary = Summary::default();

    for app in &manifest.apps {
        let already = installed.contains(&app.reference);
        if already {
            summary.skip += 1;
        } else {
            summary.install += 1;
        }
        actions.push(Action::App {
            id: app.id.clone(),
            reference: app.reference.clone(),
            driver: app.driver.clone(),
            status: if already { "skip" } else { "install" }.to_string(),
            reason: already.then(|| REASON_ALREADY_INSTALLED.to_string()),
        });
    }

    for entry in &manifest.restore {
        summary.restore += 1;
        actions.push(Action::Restore {
            id: entry.action_id(),
            restore_type: entry.kind.as_str().to_string(),
            source: entry.source.clone(),
            target: entry.target.clone(),
            status: "pending".to_string(),
        });
    }

    for check in &manifest.verify {
        summary.verify += 1;
        actions.push(Action::Verify {
            verify_type: check.kind.as_str().to_string(),
            path: matches!(check.kind, VerifyType::FileExists)
                .then(|| check.subject().to_string()),
            command: matches!(check.kind, VerifyType::Command)
                .then(|| check.subject().to_string()),
            status: "pending".to_string(),
        });
    }

    Plan {
        run_id: run_id.to_string(),
        timestamp: timestamp.to_string(),
        manifest: ManifestRef {
            path: manifest.path.clone(),
            name: manifest.name.clone(),
            hash: manifest_hash.to_string(),
        },
        summary,
        actions,
    }
}
