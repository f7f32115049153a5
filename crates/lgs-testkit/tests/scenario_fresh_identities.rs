use anyhow::Result;
use lgs_config::ReconcileSettings;
use lgs_reconcile::merge_state;
use lgs_schemas::{is_stable_id, EntityType};
use lgs_store::{GenerationStore, MemStore};
use lgs_testkit::{bill, day, legislator, live_by_id, metadata, scope, state};

#[tokio::test]
async fn new_records_get_family_ids_and_matching_timestamps() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);
    let legislators = scope(&ct, EntityType::Legislator);

    store
        .write_current(&scope(&ct, EntityType::Metadata), vec![metadata("ct", &[&["2011"]])])
        .await?;
    store
        .write_current(&legislators, vec![legislator("Ann", "Lee", "2011", "upper", "5")])
        .await?;
    store
        .write_current(
            &bills,
            (1..=3).map(|n| bill("ct", "2011", &format!("HB{n}"), "T")).collect(),
        )
        .await?;

    merge_state(&store, ct, ReconcileSettings::default(), day(4)).await?;

    let bill_ids: Vec<_> = live_by_id(&store, &bills).await?.into_keys().collect();
    assert_eq!(bill_ids, vec!["CTB000001", "CTB000002", "CTB000003"]);
    let leg_ids: Vec<_> = live_by_id(&store, &legislators).await?.into_keys().collect();
    assert_eq!(leg_ids, vec!["CTL000001"]);

    for s in [&bills, &legislators] {
        for (id, r) in live_by_id(&store, s).await? {
            assert!(is_stable_id(&id), "{id}");
            assert_eq!(r.all_ids, vec![id.clone()]);
            assert_eq!(r.created_at, Some(day(4)));
            assert_eq!(r.created_at, r.updated_at);
        }
    }

    let meta = store
        .live_get(&scope(&state("ct")?, EntityType::Metadata), "ct")
        .await?
        .expect("metadata keyed by abbreviation");
    assert_eq!(meta.stable_id.as_deref(), Some("ct"));
    Ok(())
}

#[tokio::test]
async fn id_sequences_are_independent_per_state() -> Result<()> {
    let store = MemStore::new();
    for code in ["ct", "ny"] {
        let st = state(code)?;
        store
            .write_current(&scope(&st, EntityType::Bill), vec![bill(code, "2011", "HB1", "T")])
            .await?;
        merge_state(&store, st, ReconcileSettings::default(), day(1)).await?;
    }
    assert_eq!(store.ledger_ids()?, vec!["CTB000001", "NYB000001"]);
    Ok(())
}
