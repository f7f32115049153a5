use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{natural_key, EntityType, KeyError, NaturalKey};

/// Bookkeeping fields that never take part in change detection. Scraper
/// documents carrying them have them stripped on entry.
pub const RESERVED_FIELDS: &[&str] = &["_id", "_all_ids", "created_at", "updated_at", "leg_id"];

/// A keyed document in one generation.
///
/// `content` never holds reserved fields, so two records have equal
/// normalized content exactly when their `content` maps are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub content: Map<String, Value>,
}

impl Record {
    /// Fresh scraper output: no identity, no timestamps.
    pub fn scraped(mut content: Map<String, Value>) -> Self {
        for f in RESERVED_FIELDS {
            content.remove(*f);
        }
        Self {
            stable_id: None,
            all_ids: Vec::new(),
            created_at: None,
            updated_at: None,
            content,
        }
    }

    pub fn from_scraped_value(v: Value) -> Result<Self, KeyError> {
        match v {
            Value::Object(map) => Ok(Self::scraped(map)),
            _ => Err(KeyError::NotAnObject),
        }
    }

    pub fn natural_key(&self, entity: EntityType) -> Result<NaturalKey, KeyError> {
        natural_key(entity, &self.content)
    }

    /// Set the stable id, appending it to `all_ids` when new. Earlier ids are
    /// kept so historical lookups keep resolving.
    pub fn adopt_id(&mut self, id: &str) {
        if !self.all_ids.iter().any(|x| x == id) {
            self.all_ids.push(id.to_string());
        }
        self.stable_id = Some(id.to_string());
    }

    /// Merge another id history into this one, keeping order and uniqueness.
    pub fn absorb_ids(&mut self, ids: &[String]) {
        for id in ids {
            if !self.all_ids.iter().any(|x| x == id) {
                self.all_ids.push(id.clone());
            }
        }
    }

    pub fn holds_id(&self, id: &str) -> bool {
        self.stable_id.as_deref() == Some(id) || self.all_ids.iter().any(|x| x == id)
    }

    /// Content comparison with ids and timestamps excluded.
    pub fn same_content(&self, other: &Record) -> bool {
        self.content == other.content
    }

    /// `created_at`, defaulting to `now` for baselines written without one.
    pub fn created_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.created_at.unwrap_or(now)
    }

    /// `updated_at`, falling back to `created_at` and then `now`.
    pub fn updated_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.updated_at.or(self.created_at).unwrap_or(now)
    }

    /// Published document shape: content plus `_id`, `_all_ids` and
    /// timestamps (and `leg_id` for legislators).
    pub fn to_document(&self, entity: EntityType) -> Value {
        let mut doc = self.content.clone();
        if let Some(id) = &self.stable_id {
            doc.insert("_id".to_string(), Value::String(id.clone()));
            if entity == EntityType::Legislator {
                doc.insert("leg_id".to_string(), Value::String(id.clone()));
            }
        }
        doc.insert(
            "_all_ids".to_string(),
            Value::Array(self.all_ids.iter().cloned().map(Value::String).collect()),
        );
        if let Some(t) = self.created_at {
            doc.insert("created_at".to_string(), Value::String(t.to_rfc3339()));
        }
        if let Some(t) = self.updated_at {
            doc.insert("updated_at".to_string(), Value::String(t.to_rfc3339()));
        }
        Value::Object(doc)
    }
}
