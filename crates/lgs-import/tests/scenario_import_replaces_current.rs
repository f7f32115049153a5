//! Scraper output on disk lands in Current, filtered and in file order.

use anyhow::Result;
use lgs_config::ImportSettings;
use lgs_import::import_state;
use lgs_schemas::{EntityType, Generation, Scope, StateCode};
use lgs_store::{GenerationState, GenerationStore, MemStore};
use serde_json::json;
use std::fs;
use std::path::Path;

fn write_json(path: &Path, v: serde_json::Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&v).unwrap()).unwrap();
}

fn fixture(root: &Path) {
    let ct = root.join("ct");
    write_json(
        &ct.join("state_metadata.json"),
        json!({"name": "Connecticut", "terms": [{"sessions": ["2011"]}]}),
    );
    write_json(
        &ct.join("bills/b.json"),
        json!({"state": "ct", "session": "2011", "chamber": "lower", "bill_id": "HB2",
               "title": " B "}),
    );
    write_json(
        &ct.join("bills/a.json"),
        json!({"state": "ct", "session": "2011", "chamber": "lower", "bill_id": "HB1", "title": "A",
               "actions": [{"action": "introduced", "date": 1294012800}]}),
    );
    write_json(
        &ct.join("bills/c.json"),
        json!({"state": "ct", "session": "2011", "chamber": "lower", "bill_id": "HB1",
               "title": "dup"}),
    );
    fs::write(ct.join("bills/broken.json"), "{ not json").unwrap();
    write_json(
        &ct.join("legislators/lee.json"),
        json!({"full_name": "Ann Lee",
               "roles": [{"session": "2011", "chamber": "upper", "district": "5"}]}),
    );
}

fn settings(root: &Path) -> ImportSettings {
    ImportSettings {
        data_dir: root.to_path_buf(),
        ..ImportSettings::default()
    }
}

#[tokio::test]
async fn import_filters_and_writes_current() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path());
    let store = MemStore::new();
    let ct = StateCode::parse("ct")?;

    let report = import_state(&store, &settings(dir.path()), &ct).await?;

    let bills = report.entity(EntityType::Bill).expect("bills imported");
    assert_eq!(bills.files, 4);
    assert_eq!(bills.unreadable, 1);
    assert_eq!(bills.dropped, 1);
    assert_eq!(bills.written, 2);

    let scope = Scope::new(&ct, EntityType::Bill);
    assert_eq!(store.generation_state(&scope).await?, GenerationState::CurrentOnly);
    let current = store.load(&scope, Generation::Current).await?;
    // a.json sorts first and wins the duplicate HB1.
    assert_eq!(current[0].content["title"], "A");
    assert_eq!(current[0].content["actions"][0]["date"], "2011-01-03T00:00:00+00:00");
    assert_eq!(current[1].content["title"], "B");
    assert!(current.iter().all(|r| r.stable_id.is_none()));

    let meta = store
        .load(&Scope::new(&ct, EntityType::Metadata), Generation::Current)
        .await?;
    assert_eq!(meta[0].content["abbreviation"], "ct");

    let legs = store
        .load(&Scope::new(&ct, EntityType::Legislator), Generation::Current)
        .await?;
    assert_eq!(legs[0].content["last_name"], "Lee");
    assert_eq!(legs[0].content["roles"][0]["state"], "ct");
    Ok(())
}

#[tokio::test]
async fn unknown_filter_writes_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path());
    let store = MemStore::new();
    let ct = StateCode::parse("ct")?;

    let mut s = settings(dir.path());
    s.filters.bills.push("keywordize".into());
    let err = import_state(&store, &s, &ct).await.unwrap_err();
    assert!(format!("{err:#}").contains("keywordize"));

    for entity in EntityType::RUN_ORDER {
        let scope = Scope::new(&ct, entity);
        assert_eq!(store.generation_state(&scope).await?, GenerationState::Absent);
    }
    Ok(())
}

#[tokio::test]
async fn missing_state_directory_imports_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = MemStore::new();
    let report = import_state(&store, &settings(dir.path()), &StateCode::parse("ny")?).await?;
    assert!(report.entities.is_empty());
    Ok(())
}
