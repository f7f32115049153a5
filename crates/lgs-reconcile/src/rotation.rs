//! Rotation controller.
//!
//! | state         | action                                             |
//! |---------------|----------------------------------------------------|
//! | Absent        | skip (nothing scraped)                             |
//! | OldOnly       | skip (already rotated, awaiting the next scrape)   |
//! | CurrentOnly   | every record is new; reconcile, promote Current    |
//! | OldAndCurrent | diff against Old; reconcile, drop Old, promote     |
//!
//! The reconciled records replace Current before the swap, so the next Old
//! carries ids and timestamps. A run that dies between the two steps leaves
//! either an un-rotated Current (re-run diffs it again) or, on backends
//! without atomic rotation, a Current with no Old (re-run takes the
//! CurrentOnly path and re-adopts identities from Live).

use lgs_schemas::{EntityType, Generation};
use lgs_store::GenerationState;
use tracing::info;

use crate::{bills, legislators, metadata};
use crate::{EntityReport, MergeError, MergeSession};

pub(crate) async fn advance(
    session: &MergeSession<'_>,
    entity: EntityType,
) -> Result<EntityReport, MergeError> {
    let scope = session.scope(entity);
    let store = session.store();
    let generation_state = store.generation_state(&scope).await?;

    let old = match generation_state {
        GenerationState::Absent | GenerationState::OldOnly => {
            info!(
                %scope,
                generation = generation_state.as_str(),
                run_id = %session.run_id(),
                "no scraper output; skipping"
            );
            return Ok(EntityReport::skipped(entity, generation_state));
        }
        GenerationState::CurrentOnly => None,
        GenerationState::OldAndCurrent => Some(store.load(&scope, Generation::Old).await?),
    };
    let current = store.load(&scope, Generation::Current).await?;

    let reconciled = match entity {
        EntityType::Metadata => metadata::reconcile(session, current).await?,
        EntityType::Legislator => legislators::reconcile(session, current, old).await?,
        EntityType::Bill => bills::reconcile(session, current, old).await?,
    };

    store.write_current(&scope, reconciled.records).await?;
    let rotation = store.rotate(&scope).await?;

    let c = &reconciled.counts;
    info!(
        %scope,
        run_id = %session.run_id(),
        generation = generation_state.as_str(),
        rotation = rotation.as_str(),
        created = c.created,
        updated = c.updated,
        unchanged = c.unchanged,
        fused = c.fused,
        deleted = c.deleted,
        live_writes = c.live_writes(),
        withheld = c.withheld,
        skipped = c.skipped(),
        "generation reconciled"
    );

    Ok(EntityReport {
        entity,
        generation_state,
        rotation: Some(rotation),
        counts: reconciled.counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lgs_config::ReconcileSettings;
    use lgs_schemas::{Record, StateCode};
    use lgs_store::{GenerationStore, MemStore, RotationOutcome};
    use serde_json::json;

    #[tokio::test]
    async fn skips_without_current_and_promotes_with_it() {
        let store = MemStore::new();
        let now = Utc.with_ymd_and_hms(2011, 1, 9, 0, 0, 0).unwrap();
        let s = MergeSession::new(
            &store,
            StateCode::parse("ct").unwrap(),
            ReconcileSettings::default(),
            now,
        );
        let scope = s.scope(EntityType::Bill);

        let r = advance(&s, EntityType::Bill).await.unwrap();
        assert_eq!(r.generation_state, GenerationState::Absent);
        assert!(!r.was_reconciled());

        let bill = Record::from_scraped_value(json!({
            "state": "ct", "session": "2011", "chamber": "lower", "bill_id": "HB1"
        }))
        .unwrap();
        store.write_current(&scope, vec![bill]).await.unwrap();

        let r = advance(&s, EntityType::Bill).await.unwrap();
        assert_eq!(r.generation_state, GenerationState::CurrentOnly);
        assert_eq!(r.rotation, Some(RotationOutcome::Promoted { discarded_old: false }));

        let old = store.load(&scope, Generation::Old).await.unwrap();
        assert_eq!(old[0].stable_id.as_deref(), Some("CTB000001"));
        assert_eq!(old[0].created_at, Some(now));

        let r = advance(&s, EntityType::Bill).await.unwrap();
        assert_eq!(r.generation_state, GenerationState::OldOnly);
        assert!(!r.was_reconciled());
    }
}
