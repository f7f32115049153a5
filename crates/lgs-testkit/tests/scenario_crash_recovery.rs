use anyhow::Result;
use lgs_config::ReconcileSettings;
use lgs_reconcile::{merge_state, MergeError};
use lgs_schemas::EntityType;
use lgs_store::{GenerationState, GenerationStore, MemStore};
use lgs_testkit::{bill, day, live_by_id, scope, state, Fault, FaultyStore};

#[tokio::test]
async fn failed_rotation_rerun_reuses_identities() -> Result<()> {
    let store = FaultyStore::new(MemStore::new());
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);

    store.write_current(&bills, vec![bill("ct", "2011", "HB1", "A")]).await?;
    merge_state(&store, ct.clone(), ReconcileSettings::default(), day(1)).await?;

    store
        .write_current(&bills, vec![bill("ct", "2011", "HB1", "A"), bill("ct", "2011", "HB2", "B")])
        .await?;
    store.arm(Fault::Rotate);
    let err = merge_state(&store, ct.clone(), ReconcileSettings::default(), day(2))
        .await
        .expect_err("rotation fails");
    assert!(matches!(err, MergeError::Store(_)), "{err}");
    assert_eq!(store.generation_state(&bills).await?, GenerationState::OldAndCurrent);

    store.disarm();
    let report = merge_state(&store, ct.clone(), ReconcileSettings::default(), day(3)).await?;
    let counts = &report.entity(EntityType::Bill).expect("bills").counts;
    assert_eq!(counts.created, 0);
    assert_eq!(counts.readopted, 1);

    let live = live_by_id(&store, &bills).await?;
    assert_eq!(live.keys().cloned().collect::<Vec<_>>(), vec!["CTB000001", "CTB000002"]);
    assert_eq!(live["CTB000002"].created_at, Some(day(2)));
    assert_eq!(store.inner().ledger_ids()?, vec!["CTB000001", "CTB000002"]);
    Ok(())
}

#[tokio::test]
async fn lost_baseline_is_rebuilt_from_live() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);

    store.write_current(&bills, vec![bill("ct", "2011", "HB1", "A")]).await?;
    merge_state(&store, ct.clone(), ReconcileSettings::default(), day(1)).await?;

    store
        .write_current(&bills, vec![bill("ct", "2011", "HB1", "A"), bill("ct", "2011", "HB2", "B")])
        .await?;
    // Died after dropping Old, before promoting Current.
    assert!(store.discard_old(&bills)?);
    assert_eq!(store.generation_state(&bills).await?, GenerationState::CurrentOnly);

    let report = merge_state(&store, ct, ReconcileSettings::default(), day(2)).await?;
    let counts = &report.entity(EntityType::Bill).expect("bills").counts;
    assert_eq!(counts.readopted, 1);
    assert_eq!(counts.created, 1);

    let live = live_by_id(&store, &bills).await?;
    assert_eq!(live.len(), 2);
    assert_eq!(live["CTB000001"].created_at, Some(day(1)));
    assert_eq!(live["CTB000001"].updated_at, Some(day(1)));
    Ok(())
}

#[tokio::test]
async fn interrupted_live_writes_never_duplicate_or_reuse_ids() -> Result<()> {
    let store = FaultyStore::new(MemStore::new());
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);
    let scrape = || (1..=3).map(|n| bill("ct", "2011", &format!("HB{n}"), "T")).collect::<Vec<_>>();

    store.write_current(&bills, scrape()).await?;
    store.arm(Fault::LivePutAfter(1));
    assert!(merge_state(&store, ct.clone(), ReconcileSettings::default(), day(1)).await.is_err());
    store.disarm();

    merge_state(&store, ct, ReconcileSettings::default(), day(2)).await?;

    let live = live_by_id(&store, &bills).await?;
    assert_eq!(live.len(), 3);
    // CTB000002 was claimed by the failed run and is never handed out again.
    assert_eq!(
        live.keys().cloned().collect::<Vec<_>>(),
        vec!["CTB000001", "CTB000003", "CTB000004"]
    );
    assert_eq!(
        store.inner().ledger_ids()?,
        vec!["CTB000001", "CTB000002", "CTB000003", "CTB000004"]
    );
    Ok(())
}
