//! Shared fixtures for scenario tests: document builders, a fixed clock,
//! store seeding helpers, on-disk scraper output and a fault-injecting store.

mod faulty;
mod scraper_dir;

pub use faulty::{Fault, FaultyStore};
pub use scraper_dir::ScraperDir;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use lgs_schemas::{EntityType, Generation, Record, Scope, StateCode};
use lgs_store::GenerationStore;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// 2011-01-01T00:00:00Z.
const EPOCH_2011: i64 = 1_293_840_000;

/// Midnight UTC `day` days after 2011-01-01.
pub fn day(day: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(EPOCH_2011, 0).unwrap_or_default() + Duration::days(day)
}

pub fn state(code: &str) -> Result<StateCode> {
    Ok(StateCode::parse(code)?)
}

pub fn scope(state: &StateCode, entity: EntityType) -> Scope {
    Scope::new(state, entity)
}

fn object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

pub fn bill(state: &str, session: &str, bill_id: &str, title: &str) -> Record {
    Record::scraped(object(json!({
        "state": state,
        "session": session,
        "chamber": "lower",
        "bill_id": bill_id,
        "title": title,
    })))
}

/// Legislator with one membership role.
pub fn legislator(first: &str, last: &str, session: &str, chamber: &str, district: &str) -> Record {
    Record::scraped(object(json!({
        "full_name": format!("{first} {last}"),
        "first_name": first,
        "last_name": last,
        "roles": [{
            "type": "member",
            "state": "ct",
            "session": session,
            "chamber": chamber,
            "district": district,
            "party": "Democratic",
        }],
    })))
}

/// Metadata whose terms list the given sessions, one term per slice.
pub fn metadata(abbreviation: &str, terms: &[&[&str]]) -> Record {
    let terms: Vec<Value> = terms
        .iter()
        .map(|sessions| json!({ "sessions": sessions }))
        .collect();
    Record::scraped(object(json!({
        "abbreviation": abbreviation,
        "name": "Connecticut",
        "legislature_name": "Connecticut General Assembly",
        "terms": terms,
    })))
}

/// `record` as a previous run would have published it.
pub fn published(
    mut record: Record,
    id: &str,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
) -> Record {
    record.adopt_id(id);
    record.created_at = Some(created);
    record.updated_at = Some(updated);
    record
}

/// Install `records` as the Old baseline (write Current, rotate).
pub async fn seed_old(
    store: &dyn GenerationStore,
    scope: &Scope,
    records: Vec<Record>,
) -> Result<()> {
    store.write_current(scope, records).await?;
    store.rotate(scope).await?;
    Ok(())
}

pub async fn seed_live(
    store: &dyn GenerationStore,
    scope: &Scope,
    records: &[Record],
) -> Result<()> {
    for r in records {
        store.live_put(scope, r).await?;
    }
    Ok(())
}

/// Live contents keyed by stable id.
pub async fn live_by_id(
    store: &dyn GenerationStore,
    scope: &Scope,
) -> Result<BTreeMap<String, Record>> {
    Ok(store
        .load(scope, Generation::Live)
        .await?
        .into_iter()
        .filter_map(|r| r.stable_id.clone().map(|id| (id, r)))
        .collect())
}

/// Live record for a bill id (`HB1`), if any.
pub async fn live_bill(
    store: &dyn GenerationStore,
    scope: &Scope,
    bill_id: &str,
) -> Result<Option<Record>> {
    Ok(store
        .load(scope, Generation::Live)
        .await?
        .into_iter()
        .find(|r| r.content.get("bill_id").and_then(Value::as_str) == Some(bill_id)))
}

/// Membership sessions of a legislator, in stored order.
pub fn role_sessions(record: &Record) -> Vec<String> {
    record
        .content
        .get("roles")
        .and_then(Value::as_array)
        .map(|roles| roles.iter().filter_map(lgs_schemas::role_session).collect())
        .unwrap_or_default()
}
