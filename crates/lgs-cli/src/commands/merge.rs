//! `lgs merge <STATE>`: one reconciliation run over a state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lgs_config::ReconcileSettings;
use lgs_db::PgStore;
use lgs_import::{import_state, ImportReport};
use lgs_reconcile::{MergeSession, RunReport};
use serde::Serialize;
use tracing::info;

use super::import::import_settings;
use super::{connect, load_config, parse_state, print_json};

#[derive(Serialize)]
struct MergeOutput<'a> {
    config_hash: &'a str,
    import: Option<ImportReport>,
    merge: RunReport,
}

fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --now '{s}': expected RFC 3339"))?
            .with_timezone(&Utc)),
    }
}

pub async fn run(
    config_paths: &[String],
    state: &str,
    now: Option<&str>,
    import: bool,
    data_dir: Option<String>,
) -> Result<()> {
    let state = parse_state(state)?;
    let now = parse_now(now)?;
    let loaded = load_config(config_paths)?;
    let settings = ReconcileSettings::from_config_json(&loaded.config_json)?;
    let import_cfg = if import {
        Some(import_settings(&loaded, data_dir)?)
    } else {
        None
    };

    let store = PgStore::new(connect(&loaded).await?);
    let lock = store.lock_state(state.as_str()).await?;

    let imported = match &import_cfg {
        Some(cfg) => Some(import_state(&store, cfg, &state).await?),
        None => None,
    };

    let session = MergeSession::new(&store, state.clone(), settings, now);
    info!(
        state = %state,
        run_id = %session.run_id(),
        config_hash = %loaded.config_hash,
        "merging"
    );
    let report = session
        .merge()
        .await
        .with_context(|| format!("merge {state} failed"))?;
    lock.release().await?;

    print_json(&MergeOutput {
        config_hash: &loaded.config_hash,
        import: imported,
        merge: report,
    })
}
