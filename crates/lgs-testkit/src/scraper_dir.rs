//! Scraper output laid out on disk the way the importer reads it.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `<tmp>/<state>/{state_metadata.json, bills/, legislators/}`. Removed on drop.
pub struct ScraperDir {
    root: TempDir,
}

impl ScraperDir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: tempfile::tempdir().context("create scraper dir")?,
        })
    }

    /// The importer's data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    fn state_dir(&self, state: &str) -> PathBuf {
        self.root.path().join(state)
    }

    pub fn write_metadata(&self, state: &str, doc: &Value) -> Result<()> {
        write_json(&self.state_dir(state).join("state_metadata.json"), doc)
    }

    pub fn write_bill(&self, state: &str, file: &str, doc: &Value) -> Result<()> {
        write_json(&self.state_dir(state).join("bills").join(file), doc)
    }

    pub fn write_legislator(&self, state: &str, file: &str, doc: &Value) -> Result<()> {
        write_json(&self.state_dir(state).join("legislators").join(file), doc)
    }

    /// Raw bytes, for files that are not valid JSON.
    pub fn write_raw(&self, state: &str, rel: &str, bytes: &[u8]) -> Result<()> {
        let path = self.state_dir(state).join(rel);
        ensure_parent(&path)?;
        fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
    }

    pub fn remove(&self, state: &str, rel: &str) -> Result<()> {
        let path = self.state_dir(state).join(rel);
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

fn write_json(path: &Path, doc: &Value) -> Result<()> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(doc).context("serialize fixture")?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))
}
