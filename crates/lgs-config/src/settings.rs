//! Typed settings read from the merged config JSON.
//!
//! Every key is optional; absent keys take the defaults below. Present keys
//! of the wrong type or out of range are errors, never silently defaulted.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_ALLOCATOR_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

fn opt_u64(cfg: &Value, ptr: &str) -> Result<Option<u64>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| anyhow!("config {ptr} must be a non-negative integer (got {v})")),
    }
}

fn opt_f64(cfg: &Value, ptr: &str) -> Result<Option<f64>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("config {ptr} must be a number (got {v})")),
    }
}

fn opt_str_list(cfg: &Value, ptr: &str) -> Result<Option<Vec<String>>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|i| {
                i.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| anyhow!("config {ptr} must be a list of strings (got {i})"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(v) => bail!("config {ptr} must be a list of strings (got {v})"),
    }
}

/// Guard against mass bill deletion after a partial scrape.
///
/// Deletions are evaluated per session: when a session's Old population is
/// at least `min_session_bills` and more than `max_fraction` of it would be
/// deleted, that session's deletions are withheld for the run.
#[derive(Clone, Debug, PartialEq)]
pub struct DeletionGuard {
    pub max_fraction: f64,
    pub min_session_bills: usize,
}

impl Default for DeletionGuard {
    fn default() -> Self {
        Self {
            max_fraction: 0.5,
            min_session_bills: 10,
        }
    }
}

impl DeletionGuard {
    /// Guard that never withholds.
    pub fn disabled() -> Self {
        Self {
            max_fraction: 1.0,
            min_session_bills: usize::MAX,
        }
    }

    pub fn withholds(&self, deleting: usize, population: usize) -> bool {
        if population == 0 || population < self.min_session_bills {
            return false;
        }
        (deleting as f64 / population as f64) > self.max_fraction
    }
}

/// Settings consumed by the reconcilers.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileSettings {
    pub allocator_max_attempts: u32,
    pub deletion_guard: DeletionGuard,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            allocator_max_attempts: DEFAULT_ALLOCATOR_MAX_ATTEMPTS,
            deletion_guard: DeletionGuard::default(),
        }
    }
}

impl ReconcileSettings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let d = Self::default();

        let attempts = opt_u64(cfg, "/allocator/max_attempts")?
            .map(|n| u32::try_from(n).context("config /allocator/max_attempts too large"))
            .transpose()?
            .unwrap_or(d.allocator_max_attempts);
        if attempts == 0 {
            bail!("config /allocator/max_attempts must be >= 1");
        }

        let max_fraction = opt_f64(cfg, "/bills/deletion_guard/max_fraction")?
            .unwrap_or(d.deletion_guard.max_fraction);
        if !(0.0..=1.0).contains(&max_fraction) {
            bail!(
                "config /bills/deletion_guard/max_fraction must be in [0, 1] (got {max_fraction})"
            );
        }

        let min_session_bills = opt_u64(cfg, "/bills/deletion_guard/min_session_bills")?
            .map(|n| n as usize)
            .unwrap_or(d.deletion_guard.min_session_bills);

        Ok(Self {
            allocator_max_attempts: attempts,
            deletion_guard: DeletionGuard {
                max_fraction,
                min_session_bills,
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSettings {
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl StoreSettings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let max_connections = opt_u64(cfg, "/store/max_connections")?
            .map(|n| u32::try_from(n).context("config /store/max_connections too large"))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            bail!("config /store/max_connections must be >= 1");
        }
        Ok(Self { max_connections })
    }
}

/// Import filter names per entity, resolved later against the closed
/// filter registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityFilters {
    pub metadata: Vec<String>,
    pub bills: Vec<String>,
    pub legislators: Vec<String>,
}

impl Default for EntityFilters {
    fn default() -> Self {
        let names = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            metadata: names(&["trim_strings"]),
            bills: names(&["trim_strings", "timestamps", "unique_key"]),
            legislators: names(&[
                "trim_strings",
                "split_name",
                "role_state",
                "timestamps",
                "unique_key",
            ]),
        }
    }
}

impl EntityFilters {
    fn overlay(&self, cfg: &Value, base_ptr: &str) -> Result<Self> {
        Ok(Self {
            metadata: opt_str_list(cfg, &format!("{base_ptr}/metadata"))?
                .unwrap_or_else(|| self.metadata.clone()),
            bills: opt_str_list(cfg, &format!("{base_ptr}/bills"))?
                .unwrap_or_else(|| self.bills.clone()),
            legislators: opt_str_list(cfg, &format!("{base_ptr}/legislators"))?
                .unwrap_or_else(|| self.legislators.clone()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSettings {
    pub data_dir: PathBuf,
    pub filters: EntityFilters,
    /// Fully-resolved per-state pipelines (state abbreviation, lowercase).
    pub state_filters: BTreeMap<String, EntityFilters>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            filters: EntityFilters::default(),
            state_filters: BTreeMap::new(),
        }
    }
}

impl ImportSettings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let data_dir = match cfg.pointer("/import/data_dir") {
            None | Some(Value::Null) => PathBuf::from("data"),
            Some(Value::String(s)) => PathBuf::from(s),
            Some(v) => bail!("config /import/data_dir must be a string (got {v})"),
        };

        let filters = EntityFilters::default().overlay(cfg, "/import/filters")?;

        let mut state_filters = BTreeMap::new();
        if let Some(states) = cfg.pointer("/import/states").and_then(Value::as_object) {
            for state in states.keys() {
                let ptr = format!("/import/states/{state}/filters");
                state_filters.insert(state.to_ascii_lowercase(), filters.overlay(cfg, &ptr)?);
            }
        }

        Ok(Self {
            data_dir,
            filters,
            state_filters,
        })
    }

    pub fn filters_for(&self, state: &str) -> &EntityFilters {
        self.state_filters
            .get(&state.to_ascii_lowercase())
            .unwrap_or(&self.filters)
    }
}
