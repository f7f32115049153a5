//! Metadata reconciler: one descriptor per state, keyed by its abbreviation.

use lgs_schemas::{EntityType, Record};
use tracing::{debug, info, warn};

use crate::intake::{key_current, Keyed, Reconciled};
use crate::{MergeError, MergeSession};

pub(crate) async fn reconcile(
    session: &MergeSession<'_>,
    current: Vec<Record>,
) -> Result<Reconciled, MergeError> {
    let scope = session.scope(EntityType::Metadata);
    let store = session.store();
    let now = session.now();
    let id = session.state().as_str().to_string();

    let intake = key_current(&scope, current);
    let mut counts = intake.counts;
    let mut out = Vec::with_capacity(1);

    for Keyed { mut record, .. } in intake.records {
        let live = store.live_get(&scope, &id).await?;

        match live {
            Some(live) => {
                record.all_ids = live.all_ids.clone();
                record.adopt_id(&id);
                record.created_at = Some(live.created_or(now));
                if record.same_content(&live) {
                    record.updated_at = Some(live.updated_or(now));
                    counts.unchanged += 1;
                    debug!(%scope, "metadata unchanged");
                } else {
                    record.updated_at = Some(now);
                    store.live_put(&scope, &record).await?;
                    counts.updated += 1;
                    info!(%scope, "metadata updated");
                }
            }
            None => {
                record.adopt_id(&id);
                record.created_at = Some(now);
                record.updated_at = Some(now);
                store.live_put(&scope, &record).await?;
                counts.created += 1;
                info!(%scope, "metadata created");
            }
        }
        out.push(record);
    }

    if out.is_empty() {
        warn!(%scope, "current holds no usable metadata document");
    }

    Ok(Reconciled {
        records: out,
        counts,
    })
}
