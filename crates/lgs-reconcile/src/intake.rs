//! Keying of Current and Old records before diffing.

use chrono::{DateTime, Utc};
use lgs_schemas::{EntityType, NaturalKey, Record, Scope};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::EntityCounts;

pub(crate) struct Keyed {
    pub key: NaturalKey,
    pub record: Record,
}

/// Current records that survived keying, in scrape order.
pub(crate) struct Intake {
    pub records: Vec<Keyed>,
    pub counts: EntityCounts,
}

/// Output of one reconciler: the records that become the next Old.
pub(crate) struct Reconciled {
    pub records: Vec<Record>,
    pub counts: EntityCounts,
}

/// State component of a natural key.
fn key_state(entity: EntityType, key: &NaturalKey) -> Option<&str> {
    let idx = match entity {
        EntityType::Metadata | EntityType::Bill => 0,
        EntityType::Legislator => 2,
    };
    key.parts().get(idx).map(String::as_str)
}

/// Key every Current record. Records without a natural key, belonging to
/// another state, or repeating an earlier key are skipped and counted.
pub(crate) fn key_current(scope: &Scope, records: Vec<Record>) -> Intake {
    let mut counts = EntityCounts::default();
    let mut seen: HashSet<NaturalKey> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());

    for (position, record) in records.into_iter().enumerate() {
        let key = match record.natural_key(scope.entity) {
            Ok(k) => k,
            Err(e) => {
                warn!(%scope, position, error = %e, "skipping malformed current record");
                counts.skipped_malformed += 1;
                continue;
            }
        };
        if !key_state(scope.entity, &key).is_some_and(|s| scope.state.matches(s)) {
            warn!(%scope, %key, "skipping current record for another state");
            counts.skipped_foreign += 1;
            continue;
        }
        if !seen.insert(key.clone()) {
            warn!(%scope, %key, "skipping duplicate natural key in current");
            counts.skipped_duplicate += 1;
            continue;
        }
        out.push(Keyed { key, record });
    }

    Intake {
        records: out,
        counts,
    }
}

/// Old baseline by natural key. Old was written by a previous run, so an
/// unkeyable record there means someone edited it by hand; it is dropped
/// from the diff with a warning.
pub(crate) fn index_old(scope: &Scope, records: Vec<Record>) -> BTreeMap<NaturalKey, Record> {
    let mut out = BTreeMap::new();
    for record in records {
        match record.natural_key(scope.entity) {
            Ok(key) => {
                if out.insert(key.clone(), record).is_some() {
                    warn!(%scope, %key, "duplicate natural key in old; keeping the later record");
                }
            }
            Err(e) => {
                warn!(
                    %scope,
                    stable_id = ?record.stable_id,
                    error = %e,
                    "ignoring unkeyable old record"
                );
            }
        }
    }
    out
}

/// Take over `from`'s id history and creation time.
pub(crate) fn inherit_identity(record: &mut Record, from: &Record, now: DateTime<Utc>) {
    record.all_ids = from.all_ids.clone();
    if let Some(id) = &from.stable_id {
        record.adopt_id(id);
    }
    record.created_at = Some(from.created_or(now));
}

/// Stamp a freshly minted identity.
pub(crate) fn mint_identity(record: &mut Record, id: &str, now: DateTime<Utc>) {
    record.all_ids.clear();
    record.adopt_id(id);
    record.created_at = Some(now);
    record.updated_at = Some(now);
}
