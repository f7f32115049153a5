//! Scraper output on disk:
//!
//! ```text
//! <data_dir>/<state>/state_metadata.json
//! <data_dir>/<state>/bills/*.json
//! <data_dir>/<state>/legislators/*.json
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::filters::Document;

pub const METADATA_FILE: &str = "state_metadata.json";
pub const BILLS_DIR: &str = "bills";
pub const LEGISLATORS_DIR: &str = "legislators";

/// Documents read from one source plus files that could not be used.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub documents: Vec<Document>,
    pub files: usize,
    pub unreadable: usize,
}

fn read_document(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parse json {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("{} is not a JSON object", path.display()),
    }
}

/// Read one JSON object. `Ok(None)` when the file does not exist.
pub fn read_single(path: &Path) -> Result<Option<Document>> {
    if !path.exists() {
        return Ok(None);
    }
    read_document(path).map(Some)
}

/// Every `*.json` file of `dir` in file-name order. `Ok(None)` when the
/// directory does not exist. Unreadable files are logged and counted.
pub fn read_dir_sorted(dir: &Path) -> Result<Option<SourceBatch>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == "json"))
        .collect();
    paths.sort();

    let mut batch = SourceBatch::default();
    for path in &paths {
        batch.files += 1;
        match read_document(path) {
            Ok(doc) => batch.documents.push(doc),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "skipping unreadable scraper file"
                );
                batch.unreadable += 1;
            }
        }
    }
    Ok(Some(batch))
}
