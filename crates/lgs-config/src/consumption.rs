//! Unused-key guard.
//!
//! Every leaf of the merged config is matched against the registry of
//! pointers `settings.rs` reads. A registry entry covers its whole subtree,
//! so a typo such as `bills/deletion_gaurd` surfaces instead of silently
//! running on defaults.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Registry entries the config was checked against (sorted).
    pub consumed_prefixes: Vec<String>,
    /// Leaves no entry covers, as JSON pointers (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Pointers read by `settings.rs`. Keep in step with it.
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/store/max_connections",
        "/allocator/max_attempts",
        "/bills/deletion_guard/max_fraction",
        "/bills/deletion_guard/min_session_bills",
        "/import/data_dir",
        "/import/filters",
        // /import/states/<state>/filters/<entity>
        "/import/states",
    ]
}

fn segments(pointer: &str) -> Vec<&str> {
    pointer.split('/').filter(|s| !s.is_empty()).collect()
}

fn covered(registry: &[Vec<&str>], path: &[String]) -> bool {
    registry
        .iter()
        .any(|entry| entry.len() <= path.len() && entry.iter().zip(path).all(|(a, b)| *a == b))
}

fn render(path: &[String]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter()
        .map(|seg| format!("/{}", seg.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Depth-first walk; array indices are path segments like object keys.
fn walk(v: &Value, path: &mut Vec<String>, registry: &[Vec<&str>], unused: &mut Vec<String>) {
    if covered(registry, path) && !path.is_empty() {
        return;
    }
    let children: Vec<(String, &Value)> = match v {
        Value::Object(map) => map.iter().map(|(k, c)| (k.clone(), c)).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, c)| (i.to_string(), c)).collect(),
        _ => {
            unused.push(render(path));
            return;
        }
    };
    for (seg, child) in children {
        path.push(seg);
        walk(child, path, registry, unused);
        path.pop();
    }
}

/// Produce an unused-key report. With `Fail`, unused keys are an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let registry: Vec<Vec<&str>> = consumed_pointers().iter().map(|p| segments(p)).collect();

    let mut unused = Vec::new();
    walk(config_json, &mut Vec::new(), &registry, &mut unused);
    unused.sort();
    unused.dedup();

    let mut consumed_prefixes: Vec<String> =
        consumed_pointers().iter().map(|p| p.to_string()).collect();
    consumed_prefixes.sort();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config key(s): {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }

    Ok(report)
}
