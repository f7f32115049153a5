//! Bill reconciler.
//!
//! Diff Current against Old by natural key: new keys get fresh ids, changed
//! keys rewrite Live under the inherited id, unchanged keys leave Live alone.
//! Keys that vanished from Current are deleted from Live, session by session,
//! unless the deletion guard holds that session back.

use lgs_schemas::{EntityType, IdKind, NaturalKey, Record};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::intake::{index_old, inherit_identity, key_current, mint_identity, Keyed, Reconciled};
use crate::{EntityCounts, MergeError, MergeSession};

const SESSION_PART: usize = 1;

fn key_session(key: &NaturalKey) -> String {
    key.parts().get(SESSION_PART).cloned().unwrap_or_default()
}

pub(crate) async fn reconcile(
    session: &MergeSession<'_>,
    current: Vec<Record>,
    old: Option<Vec<Record>>,
) -> Result<Reconciled, MergeError> {
    let scope = session.scope(EntityType::Bill);
    let store = session.store();
    let now = session.now();

    let intake = key_current(&scope, current);
    let mut counts = intake.counts;
    let mut old = index_old(&scope, old.unwrap_or_default());

    let mut population: BTreeMap<String, usize> = BTreeMap::new();
    for key in old.keys() {
        *population.entry(key_session(key)).or_default() += 1;
    }

    let mut out = Vec::with_capacity(intake.records.len());

    for Keyed { key, mut record } in intake.records {
        let prev = old.remove(&key).filter(|o| o.stable_id.is_some());

        match prev {
            Some(prev) => {
                inherit_identity(&mut record, &prev, now);
                let id = prev.stable_id.clone().unwrap_or_default();

                if record.same_content(&prev) {
                    record.updated_at = Some(prev.updated_or(now));
                    if store.live_get(&scope, &id).await?.is_some() {
                        counts.unchanged += 1;
                    } else {
                        warn!(
                            %scope,
                            %key,
                            stable_id = %id,
                            "unchanged bill missing from live; restoring"
                        );
                        store.live_put(&scope, &record).await?;
                        counts.restored += 1;
                    }
                } else {
                    record.updated_at = Some(now);
                    store.live_put(&scope, &record).await?;
                    counts.updated += 1;
                    debug!(%scope, %key, stable_id = %id, "bill updated");
                }
            }
            None => publish_new(session, &key, &mut record, &mut counts).await?,
        }

        out.push(record);
    }

    // Whatever is left in Old was not reconfirmed by this scrape.
    let mut vanished: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for (key, record) in old {
        vanished.entry(key_session(&key)).or_default().push(record);
    }

    let guard = &session.settings().deletion_guard;
    for (bill_session, gone) in vanished {
        let total = population.get(&bill_session).copied().unwrap_or(gone.len());
        if guard.withholds(gone.len(), total) {
            warn!(
                %scope,
                session = %bill_session,
                deleting = gone.len(),
                population = total,
                max_fraction = guard.max_fraction,
                "deletion guard tripped; withholding deletions for this session"
            );
            counts.withheld += gone.len();
            // Carried into the next Old so the next scrape re-evaluates them.
            out.extend(gone);
            continue;
        }

        for record in gone {
            let Some(id) = record.stable_id.as_deref() else {
                continue;
            };
            if store.live_delete(&scope, id).await? {
                counts.deleted += 1;
                info!(%scope, stable_id = %id, session = %bill_session, "bill deleted");
            } else {
                debug!(%scope, stable_id = %id, "vanished bill already absent from live");
            }
        }
    }

    Ok(Reconciled {
        records: out,
        counts,
    })
}

/// A key Old has never seen. Live may already hold it when a previous run
/// died before rotating; that identity is re-adopted instead of minting a
/// duplicate.
async fn publish_new(
    session: &MergeSession<'_>,
    key: &NaturalKey,
    record: &mut Record,
    counts: &mut EntityCounts,
) -> Result<(), MergeError> {
    let scope = session.scope(EntityType::Bill);
    let store = session.store();
    let now = session.now();

    if let Some(live) = store.live_by_key(&scope, key).await? {
        inherit_identity(record, &live, now);
        if record.same_content(&live) {
            record.updated_at = Some(live.updated_or(now));
        } else {
            record.updated_at = Some(now);
            store.live_put(&scope, record).await?;
            counts.rewritten += 1;
        }
        counts.readopted += 1;
        info!(%scope, %key, stable_id = ?live.stable_id, "bill re-adopted its live identity");
        return Ok(());
    }

    let id = session.allocate(IdKind::Bill).await?;
    mint_identity(record, &id, now);
    store.live_put(&scope, record).await?;
    counts.created += 1;
    debug!(%scope, %key, stable_id = %id, "bill created");
    Ok(())
}
