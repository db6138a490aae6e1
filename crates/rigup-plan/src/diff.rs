//! Plan/report diffing.
//!
//! Compares two plan artifacts by stable per-action key and classifies
//! the differences. The computation is pure and the serialized result is
//! byte-stable: keys are collected into ordered maps, so repeated diffs
//! of the same artifacts are identical, which lets CI cache and compare
//! diff output textually.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::plan::{Action, Plan, Summary};

/// A paired action whose status differs between the two artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedAction {
    pub key: String,
    pub status_a: String,
    pub status_b: String,
}

/// Result of diffing two plans. Field order is fixed for stable output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub identical: bool,
    pub summary_a: Summary,
    pub summary_b: Summary,
    pub actions_added: Vec<String>,
    pub actions_removed: Vec<String>,
    pub actions_changed: Vec<ChangedAction>,
}

impl DiffResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Diff two plan artifacts by action key.
///
/// Keys present only in `b` are added, only in `a` removed. For keys in
/// both, only `status` is compared (per action type nothing else
/// participates in change detection). `identical` is true iff no
/// additions, removals, or changes exist.
pub fn diff(a: &Plan, b: &Plan) -> DiffResult {
    let map_a = keyed(a);
    let map_b = keyed(b);

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut changed = Vec::new();

    for (key, action_a) in &map_a {
        match map_b.get(key) {
            None => removed.push(key.clone()),
            Some(action_b) => {
                if action_a.status() != action_b.status() {
                    changed.push(ChangedAction {
                        key: key.clone(),
                        status_a: action_a.status().to_string(),
                        status_b: action_b.status().to_string(),
                    });
                }
            }
        }
    }

    for key in map_b.keys() {
        if !map_a.contains_key(key) {
            added.push(key.clone());
        }
    }

    DiffResult {
        identical: added.is_empty() && removed.is_empty() && changed.is_empty(),
        summary_a: a.summary,
        summary_b: b.summary,
        actions_added: added,
        actions_removed: removed,
        actions_changed: changed,
    }
}

fn keyed(plan: &Plan) -> BTreeMap<String, &Action> {
    plan.actions.iter().map(|a| (a.key(), a)).collect()
}
