use anyhow::Result;
use lgs_config::{ImportSettings, ReconcileSettings};
use lgs_import::import_state;
use lgs_reconcile::merge_state;
use lgs_schemas::EntityType;
use lgs_store::{GenerationStore, MemStore};
use lgs_testkit::{day, live_by_id, scope, state, ScraperDir};
use serde_json::json;

fn fixture() -> Result<ScraperDir> {
    let dir = ScraperDir::new()?;
    dir.write_metadata(
        "ct",
        &json!({
            "name": "Connecticut",
            "terms": [{"sessions": ["2011", "2012"]}]
        }),
    )?;
    dir.write_legislator(
        "ct",
        "CTL_ann.json",
        &json!({
            "full_name": "  Ann B. Lee  ",
            "roles": [{"type": "member", "session": "2011", "chamber": "upper",
                       "district": "5", "start_date": 1293840000}]
        }),
    )?;
    dir.write_bill(
        "ct",
        "2011_HB1.json",
        &json!({"state": "ct", "session": "2011", "chamber": "lower", "bill_id": "HB1",
                "title": "An Act", "actions": [{"action": "Introduced", "date": 1294012800}]}),
    )?;
    dir.write_bill(
        "ct",
        "2011_HB2.json",
        &json!({"state": "ct", "session": "2011", "chamber": "lower", "bill_id": "HB2",
                "title": "Another Act"}),
    )?;
    dir.write_raw("ct", "bills/2011_HB3.json", b"{ not json")?;
    Ok(dir)
}

#[tokio::test]
async fn scraped_files_flow_into_live() -> Result<()> {
    let dir = fixture()?;
    let settings = ImportSettings {
        data_dir: dir.data_dir(),
        ..ImportSettings::default()
    };
    let store = MemStore::new();
    let ct = state("ct")?;

    let imported = import_state(&store, &settings, &ct).await?;
    let bills_in = imported.entity(EntityType::Bill).expect("bills imported");
    assert_eq!(bills_in.written, 2);
    assert_eq!(bills_in.unreadable, 1);

    let run = merge_state(&store, ct.clone(), ReconcileSettings::default(), day(2)).await?;
    assert!(run.entities.iter().all(|e| e.was_reconciled()));

    let meta = store
        .live_get(&scope(&ct, EntityType::Metadata), "ct")
        .await?
        .expect("metadata");
    assert_eq!(meta.content["abbreviation"], "ct");

    let people = live_by_id(&store, &scope(&ct, EntityType::Legislator)).await?;
    let ann = &people["CTL000001"];
    assert_eq!(ann.content["full_name"], "Ann B. Lee");
    assert_eq!(ann.content["first_name"], "Ann");
    assert_eq!(ann.content["middle_name"], "B.");
    assert_eq!(ann.content["last_name"], "Lee");
    assert_eq!(ann.content["roles"][0]["state"], "ct");
    assert_eq!(ann.content["roles"][0]["start_date"], "2011-01-01T00:00:00+00:00");

    let bills = live_by_id(&store, &scope(&ct, EntityType::Bill)).await?;
    assert_eq!(bills.len(), 2);
    assert_eq!(bills["CTB000001"].content["actions"][0]["date"], "2011-01-03T00:00:00+00:00");
    Ok(())
}

#[tokio::test]
async fn reimport_after_a_bill_disappears_deletes_it() -> Result<()> {
    let dir = fixture()?;
    let settings = ImportSettings {
        data_dir: dir.data_dir(),
        ..ImportSettings::default()
    };
    let store = MemStore::new();
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);

    import_state(&store, &settings, &ct).await?;
    merge_state(&store, ct.clone(), ReconcileSettings::default(), day(2)).await?;

    dir.remove("ct", "bills/2011_HB2.json")?;
    import_state(&store, &settings, &ct).await?;
    let run = merge_state(&store, ct.clone(), ReconcileSettings::default(), day(3)).await?;
    assert_eq!(run.entity(EntityType::Bill).expect("bills").counts.deleted, 1);

    let live = live_by_id(&store, &bills).await?;
    assert_eq!(live.keys().cloned().collect::<Vec<_>>(), vec!["CTB000001"]);
    Ok(())
}
