//! Command handler modules for lgs-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod import;
pub mod lookup;
pub mod merge;

use anyhow::{Context, Result};
use lgs_config::{report_unused_keys, LoadedConfig, StoreSettings, UnusedKeyPolicy};
use lgs_schemas::StateCode;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

/// Load the layered config (defaults only when no paths are given) and warn
/// about keys nothing reads.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let loaded = if paths.is_empty() {
        LoadedConfig::empty()
    } else {
        let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        lgs_config::load_layered_yaml(&path_refs)?
    };

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(%pointer, "config key is not used");
    }
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");
    Ok(loaded)
}

pub fn parse_state(raw: &str) -> Result<StateCode> {
    StateCode::parse(raw).with_context(|| format!("invalid state argument '{raw}'"))
}

pub async fn connect(loaded: &LoadedConfig) -> Result<PgPool> {
    let store = StoreSettings::from_config_json(&loaded.config_json)?;
    // The run lock pins one connection for the whole run.
    lgs_db::connect_from_env(store.max_connections.max(2)).await
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize report json failed")?;
    println!("{json}");
    Ok(())
}
