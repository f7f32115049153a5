use anyhow::Result;
use lgs_config::ReconcileSettings;
use lgs_reconcile::{merge_state, RunReport};
use lgs_schemas::{EntityType, Record, StateCode};
use lgs_store::{GenerationStore, MemStore};
use lgs_testkit::{day, legislator, live_by_id, metadata, role_sessions, scope, state};

/// Two terms: 2009-2010 and 2011-2012.
fn ct_metadata() -> Record {
    metadata("ct", &[&["2009", "2010"], &["2011", "2012"]])
}

async fn scrape_and_merge(
    store: &MemStore,
    ct: &StateCode,
    people: Vec<Record>,
    at: i64,
) -> Result<RunReport> {
    store
        .write_current(&scope(ct, EntityType::Metadata), vec![ct_metadata()])
        .await?;
    store
        .write_current(&scope(ct, EntityType::Legislator), people)
        .await?;
    Ok(merge_state(store, ct.clone(), ReconcileSettings::default(), day(at)).await?)
}

#[tokio::test]
async fn previous_session_match_keeps_the_identity() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let legislators = scope(&ct, EntityType::Legislator);

    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2010", "upper", "5")], 1).await?;
    let ann_2011 = legislator("Ann", "Lee", "2011", "upper", "5");
    let report = scrape_and_merge(&store, &ct, vec![ann_2011], 2).await?;

    let counts = &report.entity(EntityType::Legislator).expect("legislators").counts;
    assert_eq!(counts.fused, 1);
    assert_eq!(counts.created, 0);
    // The 2010 key is gone from the scrape but the person stays in Live.
    assert_eq!(counts.removed, 1);

    let live = live_by_id(&store, &legislators).await?;
    assert_eq!(live.len(), 1);
    let ann = &live["CTL000001"];
    assert_eq!(role_sessions(ann), vec!["2011", "2010"]);
    assert_eq!(ann.created_at, Some(day(1)));
    assert_eq!(ann.updated_at, Some(day(2)));
    Ok(())
}

#[tokio::test]
async fn next_session_match_keeps_the_identity() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let legislators = scope(&ct, EntityType::Legislator);

    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2012", "upper", "5")], 1).await?;
    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2011", "upper", "5")], 2).await?;

    let live = live_by_id(&store, &legislators).await?;
    assert_eq!(live.len(), 1);
    assert_eq!(role_sessions(&live["CTL000001"]), vec!["2011", "2012"]);
    Ok(())
}

#[tokio::test]
async fn non_adjacent_sessions_are_different_people() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let legislators = scope(&ct, EntityType::Legislator);

    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2009", "upper", "5")], 1).await?;
    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2011", "upper", "5")], 2).await?;

    let ids: Vec<_> = live_by_id(&store, &legislators).await?.into_keys().collect();
    assert_eq!(ids, vec!["CTL000001", "CTL000002"]);
    Ok(())
}

#[tokio::test]
async fn different_seat_is_not_fused() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let legislators = scope(&ct, EntityType::Legislator);

    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2010", "upper", "5")], 1).await?;
    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2011", "upper", "6")], 2).await?;

    assert_eq!(live_by_id(&store, &legislators).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn repeated_fusion_never_duplicates_sessions() -> Result<()> {
    let store = MemStore::new();
    let ct = state("ct")?;
    let legislators = scope(&ct, EntityType::Legislator);

    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2010", "upper", "5")], 1).await?;
    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2011", "upper", "5")], 2).await?;
    scrape_and_merge(&store, &ct, vec![legislator("Ann", "Lee", "2011", "upper", "5")], 3).await?;

    let live = live_by_id(&store, &legislators).await?;
    let ann = &live["CTL000001"];
    assert_eq!(role_sessions(ann), vec!["2011", "2010"]);
    // Third run changed nothing.
    assert_eq!(ann.updated_at, Some(day(2)));
    Ok(())
}
