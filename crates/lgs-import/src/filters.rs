//! Closed registry of import filters.
//!
//! Pipelines are configured per state by filter name. Names resolve against
//! the fixed table below at startup; an unknown name fails the import before
//! anything is written.

use chrono::{DateTime, Utc};
use lgs_schemas::{natural_key, EntityType, NaturalKey, StateCode};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::names::split_name;

pub type Document = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterRegistryError {
    UnknownFilter { entity: EntityType, name: String },
}

impl fmt::Display for FilterRegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFilter { entity, name } => write!(
                f,
                "unknown {entity} import filter '{name}' (known: {})",
                Filter::NAMES.join(", ")
            ),
        }
    }
}

impl std::error::Error for FilterRegistryError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    /// Derive first/middle/last/suffixes from `full_name`.
    SplitName,
    /// Stamp the run's state onto roles lacking one.
    RoleState,
    /// Epoch seconds to RFC 3339 in dated sub-records.
    Timestamps,
    /// Drop records repeating an earlier natural key.
    UniqueKey,
    /// Trim top-level string fields.
    TrimStrings,
}

/// (sub-record list, date field) pairs rewritten by [`Filter::Timestamps`].
const DATED_FIELDS: &[(&str, &str)] = &[
    ("sources", "retrieved"),
    ("actions", "date"),
    ("votes", "date"),
    ("roles", "start_date"),
    ("roles", "end_date"),
];

impl Filter {
    pub const NAMES: &'static [&'static str] =
        &["split_name", "role_state", "timestamps", "unique_key", "trim_strings"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "split_name" => Some(Filter::SplitName),
            "role_state" => Some(Filter::RoleState),
            "timestamps" => Some(Filter::Timestamps),
            "unique_key" => Some(Filter::UniqueKey),
            "trim_strings" => Some(Filter::TrimStrings),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::SplitName => "split_name",
            Filter::RoleState => "role_state",
            Filter::Timestamps => "timestamps",
            Filter::UniqueKey => "unique_key",
            Filter::TrimStrings => "trim_strings",
        }
    }
}

/// Resolved filter chain for one entity type of one state.
#[derive(Clone, Debug)]
pub struct Pipeline {
    entity: EntityType,
    state: StateCode,
    steps: Vec<Filter>,
}

impl Pipeline {
    pub fn resolve<S: AsRef<str>>(
        entity: EntityType,
        state: &StateCode,
        names: &[S],
    ) -> Result<Self, FilterRegistryError> {
        let steps = names
            .iter()
            .map(|n| {
                Filter::parse(n.as_ref()).ok_or_else(|| FilterRegistryError::UnknownFilter {
                    entity,
                    name: n.as_ref().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            entity,
            state: state.clone(),
            steps,
        })
    }

    pub fn steps(&self) -> &[Filter] {
        &self.steps
    }

    /// Run every step over the batch, in configured order. Returns the
    /// surviving documents and how many were dropped.
    pub fn apply(&self, docs: Vec<Document>) -> (Vec<Document>, usize) {
        let mut docs = docs;
        let mut dropped = 0;
        for step in &self.steps {
            match step {
                Filter::UniqueKey => {
                    let before = docs.len();
                    docs = unique_by_key(self.entity, docs);
                    dropped += before - docs.len();
                }
                Filter::SplitName => docs.iter_mut().for_each(apply_split_name),
                Filter::RoleState => docs.iter_mut().for_each(|d| stamp_role_state(d, &self.state)),
                Filter::Timestamps => docs.iter_mut().for_each(convert_timestamps),
                Filter::TrimStrings => docs.iter_mut().for_each(trim_strings),
            }
        }
        (docs, dropped)
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn apply_split_name(doc: &mut Document) {
    if !is_blank(doc.get("first_name")) || !is_blank(doc.get("last_name")) {
        return;
    }
    let Some(full) = doc.get("full_name").and_then(Value::as_str) else {
        return;
    };
    let parts = split_name(full);
    doc.insert("first_name".into(), Value::String(parts.first));
    doc.insert("middle_name".into(), Value::String(parts.middle));
    doc.insert("last_name".into(), Value::String(parts.last));
    doc.insert("suffixes".into(), Value::String(parts.suffixes));
}

fn stamp_role_state(doc: &mut Document, state: &StateCode) {
    let Some(roles) = doc.get_mut("roles").and_then(Value::as_array_mut) else {
        return;
    };
    for role in roles.iter_mut().filter_map(Value::as_object_mut) {
        if is_blank(role.get("state")) {
            role.insert("state".into(), Value::String(state.as_str().to_string()));
        }
    }
}

fn epoch_to_rfc3339(v: &Value) -> Option<String> {
    let secs = v.as_f64()?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let dt = DateTime::<Utc>::from_timestamp(whole as i64, nanos.min(999_999_999))?;
    Some(dt.to_rfc3339())
}

fn convert_timestamps(doc: &mut Document) {
    for (list, field) in DATED_FIELDS {
        let Some(items) = doc.get_mut(*list).and_then(Value::as_array_mut) else {
            continue;
        };
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            let converted = item.get(*field).filter(|v| v.is_number()).and_then(epoch_to_rfc3339);
            if let Some(s) = converted {
                item.insert((*field).to_string(), Value::String(s));
            }
        }
    }
}

fn trim_strings(doc: &mut Document) {
    for v in doc.values_mut() {
        if let Value::String(s) = v {
            let t = s.trim();
            if t.len() != s.len() {
                *s = t.to_string();
            }
        }
    }
}

/// Keep the first document per natural key. Unkeyable documents pass
/// through: the reconciler skips and counts them.
fn unique_by_key(entity: EntityType, docs: Vec<Document>) -> Vec<Document> {
    let mut seen: HashSet<NaturalKey> = HashSet::new();
    docs.into_iter()
        .filter(|d| match natural_key(entity, d) {
            Ok(key) => {
                let fresh = seen.insert(key.clone());
                if !fresh {
                    debug!(%entity, %key, "dropping duplicate document");
                }
                fresh
            }
            Err(_) => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    fn ct() -> StateCode {
        StateCode::parse("ct").unwrap()
    }

    #[test]
    fn unknown_filter_names_are_rejected() {
        let err = Pipeline::resolve(EntityType::Bill, &ct(), &["trim_strings", "keywordize"])
            .unwrap_err();
        assert_eq!(
            err,
            FilterRegistryError::UnknownFilter {
                entity: EntityType::Bill,
                name: "keywordize".into()
            }
        );
        assert!(err.to_string().contains("split_name"));
    }

    #[test]
    fn legislator_pipeline_normalizes_documents() {
        let p = Pipeline::resolve(
            EntityType::Legislator,
            &ct(),
            &["trim_strings", "split_name", "role_state", "timestamps", "unique_key"],
        )
        .unwrap();
        let raw = doc(json!({
            "full_name": "  Lee, Ann  ",
            "roles": [{"session": "2011", "chamber": "upper", "district": "5",
                       "start_date": 1293840000}]
        }));
        let (out, dropped) = p.apply(vec![raw.clone(), raw]);
        assert_eq!(dropped, 1);
        let d = &out[0];
        assert_eq!(d["full_name"], "Lee, Ann");
        assert_eq!(d["first_name"], "Ann");
        assert_eq!(d["last_name"], "Lee");
        assert_eq!(d["roles"][0]["state"], "ct");
        assert_eq!(d["roles"][0]["start_date"], "2011-01-01T00:00:00+00:00");
    }

    #[test]
    fn split_name_keeps_existing_names() {
        let mut d = doc(json!({"full_name": "Ann Lee", "first_name": "Annie", "last_name": "Lee"}));
        apply_split_name(&mut d);
        assert_eq!(d["first_name"], "Annie");
        assert!(d.get("middle_name").is_none());
    }

    #[test]
    fn timestamps_leave_strings_alone() {
        let mut d = doc(json!({"actions": [{"date": "2011-01-05"}, {"date": 0}]}));
        convert_timestamps(&mut d);
        assert_eq!(d["actions"][0]["date"], "2011-01-05");
        assert_eq!(d["actions"][1]["date"], "1970-01-01T00:00:00+00:00");
    }
}
