//! `lgs import <STATE>`: scraper output into the Current generations.

use anyhow::Result;
use lgs_config::{ImportSettings, LoadedConfig};
use lgs_db::PgStore;
use lgs_import::import_state;
use std::path::PathBuf;

use super::{connect, load_config, parse_state, print_json};

pub fn import_settings(loaded: &LoadedConfig, data_dir: Option<String>) -> Result<ImportSettings> {
    let mut settings = ImportSettings::from_config_json(&loaded.config_json)?;
    if let Some(dir) = data_dir {
        settings.data_dir = PathBuf::from(dir);
    }
    Ok(settings)
}

pub async fn run(config_paths: &[String], state: &str, data_dir: Option<String>) -> Result<()> {
    let state = parse_state(state)?;
    let loaded = load_config(config_paths)?;
    let settings = import_settings(&loaded, data_dir)?;

    let store = PgStore::new(connect(&loaded).await?);
    let lock = store.lock_state(state.as_str()).await?;
    let report = import_state(&store, &settings, &state).await?;
    lock.release().await?;
    print_json(&report)
}
