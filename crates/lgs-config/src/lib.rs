//! lgs-config
//!
//! Layered YAML configuration for reconciliation runs.
//!
//! Documents are deep-merged in order (earlier = base, later = override),
//! rendered to canonical JSON and hashed with SHA-256 so every run can log
//! the exact configuration it ran under. Typed settings are read from the
//! merged JSON by pointer with conservative defaults (see [`settings`]).

mod consumption;
mod settings;

pub use consumption::{consumed_pointers, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport};
pub use settings::{
    DeletionGuard, EntityFilters, ImportSettings, ReconcileSettings, StoreSettings,
    DEFAULT_ALLOCATOR_MAX_ATTEMPTS, DEFAULT_MAX_CONNECTIONS,
};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Configuration with no layers: every setting takes its default.
    pub fn empty() -> Self {
        // An empty object always serializes.
        load_layered_yaml_from_strings(&[]).unwrap_or_else(|_| Self {
            config_hash: sha256_hex(b"{}"),
            canonical_json: "{}".to_string(),
            config_json: serde_json::json!({}),
        })
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as an empty layer.
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    // serde_json's default map is key-sorted, so serialization is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_scalars_and_keep_siblings() {
        let base = "bills:\n  deletion_guard:\n    max_fraction: 0.5\n    min_session_bills: 10\n";
        let over = "bills:\n  deletion_guard:\n    max_fraction: 0.2\n";
        let loaded = load_layered_yaml_from_strings(&[base, over]).unwrap();
        assert_eq!(
            loaded.config_json.pointer("/bills/deletion_guard/max_fraction"),
            Some(&serde_json::json!(0.2))
        );
        assert_eq!(
            loaded.config_json.pointer("/bills/deletion_guard/min_session_bills"),
            Some(&serde_json::json!(10))
        );
    }

    #[test]
    fn empty_config_hash_is_stable() {
        let a = LoadedConfig::empty();
        let b = load_layered_yaml_from_strings(&["{}"]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.canonical_json, "{}");
    }
}
