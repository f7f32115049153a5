//! Legislator reconciler.
//!
//! Phase A carries ids and timestamps forward from Old exactly like bills.
//! Phase B fuses each record into Live: the same person is looked up by name
//! and seat in the scraped session, then in the preceding session, then in
//! the following one. A match keeps its stable id and gains the scraped
//! roles; roles of other sessions are never dropped. Legislators missing
//! from a scrape are only logged.

use lgs_schemas::{
    adjacent_sessions, role_session, EntityType, IdKind, NaturalKey, Record, Role, Scope,
};
use lgs_store::MemberQuery;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::intake::{index_old, inherit_identity, key_current, mint_identity, Keyed, Reconciled};
use crate::{EntityCounts, MergeError, MergeSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MatchKind {
    /// Same name and seat in the scraped session.
    Exact,
    /// Same name and seat in the neighbouring session.
    Adjacent,
    /// The id carried forward from Old.
    CarriedId,
}

/// Query for the key `[first, last, state, session, chamber, district]`.
fn member_query(key: &NaturalKey) -> MemberQuery {
    let part = |i: usize| key.parts().get(i).cloned().unwrap_or_default();
    MemberQuery {
        first_name: part(0),
        last_name: part(1),
        seat: Role {
            state: part(2),
            session: part(3),
            chamber: part(4),
            district: part(5),
            party: None,
        },
    }
}

fn roles_of(record: &Record) -> Vec<Value> {
    record
        .content
        .get("roles")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Append every role of `from` whose session is not yet represented in
/// `roles`. Roles without a session are kept unless already present.
fn extend_roles(roles: &mut Vec<Value>, from: &[Value]) {
    let sessions: BTreeSet<String> = roles.iter().filter_map(role_session).collect();
    for r in from {
        let keep = match role_session(r) {
            Some(s) => !sessions.contains(&s),
            None => !roles.contains(r),
        };
        if keep {
            roles.push(r.clone());
        }
    }
}

pub(crate) async fn reconcile(
    session: &MergeSession<'_>,
    current: Vec<Record>,
    old: Option<Vec<Record>>,
) -> Result<Reconciled, MergeError> {
    let scope = session.scope(EntityType::Legislator);
    let now = session.now();

    let intake = key_current(&scope, current);
    let mut counts = intake.counts;
    let mut old = index_old(&scope, old.unwrap_or_default());

    let sessions = if intake.records.is_empty() {
        Vec::new()
    } else {
        session.metadata_sessions().await?
    };

    let mut out = Vec::with_capacity(intake.records.len());

    for Keyed { key, mut record } in intake.records {
        // Phase A: within-run carry-forward.
        let carried = old.remove(&key).filter(|o| o.stable_id.is_some());
        if let Some(prev) = &carried {
            inherit_identity(&mut record, prev, now);
            record.updated_at = Some(if record.same_content(prev) {
                prev.updated_or(now)
            } else {
                now
            });
        }

        // Phase B: fusion into Live.
        let published = fuse(
            session,
            &scope,
            &sessions,
            &key,
            record,
            carried.as_ref(),
            &mut counts,
        )
        .await?;
        out.push(published);
    }

    for (key, prev) in old {
        info!(
            %scope,
            %key,
            stable_id = ?prev.stable_id,
            "legislator absent from scrape; kept in live"
        );
        counts.removed += 1;
    }

    Ok(Reconciled {
        records: out,
        counts,
    })
}

async fn find_match(
    session: &MergeSession<'_>,
    scope: &Scope,
    sessions: &[String],
    key: &NaturalKey,
    carried: Option<&Record>,
) -> Result<Option<(Record, MatchKind)>, MergeError> {
    let store = session.store();
    let wanted = member_query(key);

    if let Some(found) = store.live_find_member(scope, &wanted).await? {
        return Ok(Some((found, MatchKind::Exact)));
    }

    match adjacent_sessions(sessions, &wanted.seat.session) {
        Some(neighbours) => {
            for adjacent in [neighbours.previous, neighbours.next].into_iter().flatten() {
                let shifted = MemberQuery {
                    seat: wanted.seat.with_session(&adjacent),
                    ..wanted.clone()
                };
                if let Some(found) = store.live_find_member(scope, &shifted).await? {
                    return Ok(Some((found, MatchKind::Adjacent)));
                }
            }
        }
        None => {
            warn!(
                %scope,
                %key,
                session = %wanted.seat.session,
                "session not listed in metadata; exact match only"
            );
        }
    }

    if let Some(id) = carried.and_then(|c| c.stable_id.as_deref()) {
        if let Some(found) = store.live_get(scope, id).await? {
            return Ok(Some((found, MatchKind::CarriedId)));
        }
    }

    Ok(None)
}

async fn fuse(
    session: &MergeSession<'_>,
    scope: &Scope,
    sessions: &[String],
    key: &NaturalKey,
    mut record: Record,
    carried: Option<&Record>,
    counts: &mut EntityCounts,
) -> Result<Record, MergeError> {
    let store = session.store();
    let now = session.now();

    let Some((live, how)) = find_match(session, scope, sessions, key, carried).await? else {
        if carried.is_some() {
            // Identity already inherited from Old; Live lost the record.
            warn!(
                %scope,
                %key,
                stable_id = ?record.stable_id,
                "carried legislator missing from live; restoring"
            );
            store.live_put(scope, &record).await?;
            counts.restored += 1;
        } else {
            let id = session.allocate(IdKind::Legislator).await?;
            mint_identity(&mut record, &id, now);
            store.live_put(scope, &record).await?;
            counts.created += 1;
            debug!(%scope, %key, stable_id = %id, "legislator created");
        }
        return Ok(record);
    };

    let live_id = live.stable_id.clone().unwrap_or_default();

    // Fresh roles first so the scraped role stays the active one.
    let mut roles = roles_of(&record);
    extend_roles(&mut roles, &roles_of(&live));

    let mut merged = record.clone();
    merged.all_ids = live.all_ids.clone();
    merged.absorb_ids(&record.all_ids);
    merged.adopt_id(&live_id);
    merged.created_at = Some(live.created_or(now));

    // Old and Live disagree about who this is: fold the Live record holding
    // the carried id into the match.
    let mut folded: Option<String> = None;
    if let Some(carried_id) = carried.and_then(|c| c.stable_id.as_deref()) {
        if carried_id != live_id {
            if let Some(dup) = store.live_get(scope, carried_id).await? {
                if dup.stable_id.as_deref() != Some(live_id.as_str()) {
                    extend_roles(&mut roles, &roles_of(&dup));
                    merged.absorb_ids(&dup.all_ids);
                    folded = dup.stable_id.clone();
                }
            }
        }
    }

    merged
        .content
        .insert("roles".to_string(), Value::Array(roles));

    if merged.content == live.content && merged.all_ids == live.all_ids {
        merged.updated_at = Some(live.updated_or(now));
        counts.unchanged += 1;
    } else {
        merged.updated_at = Some(now);
        store.live_put(scope, &merged).await?;
        match how {
            MatchKind::Adjacent => {
                counts.fused += 1;
                info!(%scope, %key, stable_id = %live_id, "legislator fused across sessions");
            }
            MatchKind::Exact | MatchKind::CarriedId => {
                counts.updated += 1;
                debug!(%scope, %key, stable_id = %live_id, "legislator updated");
            }
        }
    }

    // Only drop the duplicate once the survivor holding its roles is stored.
    if let Some(dup_id) = folded {
        store.live_delete(scope, &dup_id).await?;
        counts.merged_duplicates += 1;
        warn!(
            %scope,
            %key,
            kept = %live_id,
            folded = %dup_id,
            "folded duplicate live legislator"
        );
    }

    // The next Old keeps the scrape itself; Live keeps the fused view.
    record.all_ids = merged.all_ids;
    record.stable_id = merged.stable_id;
    record.created_at = merged.created_at;
    record.updated_at = merged.updated_at;
    Ok(record)
}
