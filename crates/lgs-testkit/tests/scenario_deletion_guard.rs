use anyhow::Result;
use lgs_config::{load_layered_yaml_from_strings, DeletionGuard, ReconcileSettings};
use lgs_reconcile::merge_state;
use lgs_schemas::{EntityType, Generation, Record};
use lgs_store::{GenerationStore, MemStore};
use lgs_testkit::{bill, day, live_by_id, scope, state};

const GUARD_YAML: &str = r#"
bills:
  deletion_guard:
    max_fraction: 0.5
    min_session_bills: 4
"#;

fn session_2011(numbers: &[u32]) -> Vec<Record> {
    numbers
        .iter()
        .map(|n| bill("ct", "2011", &format!("HB{n}"), "T"))
        .collect()
}

#[tokio::test]
async fn partial_scrape_withholds_then_recovers() -> Result<()> {
    let loaded = load_layered_yaml_from_strings(&[GUARD_YAML])?;
    let settings = ReconcileSettings::from_config_json(&loaded.config_json)?;
    assert_eq!(settings.deletion_guard.min_session_bills, 4);

    let store = MemStore::new();
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);

    store.write_current(&bills, session_2011(&[1, 2, 3, 4, 5, 6])).await?;
    merge_state(&store, ct.clone(), settings.clone(), day(1)).await?;
    let baseline = live_by_id(&store, &bills).await?;

    // 5 of 6 vanish: withheld.
    store.write_current(&bills, session_2011(&[1])).await?;
    let report = merge_state(&store, ct.clone(), settings.clone(), day(2)).await?;
    let counts = &report.entity(EntityType::Bill).expect("bills").counts;
    assert_eq!(counts.withheld, 5);
    assert_eq!(counts.deleted, 0);
    assert_eq!(live_by_id(&store, &bills).await?, baseline);
    assert_eq!(store.load(&bills, Generation::Old).await?.len(), 6);

    // Full scrape again: nothing to create, nothing to delete.
    store.write_current(&bills, session_2011(&[1, 2, 3, 4, 5, 6])).await?;
    let report = merge_state(&store, ct.clone(), settings.clone(), day(3)).await?;
    let counts = &report.entity(EntityType::Bill).expect("bills").counts;
    assert_eq!(counts.created, 0);
    assert_eq!(counts.unchanged, 6);
    assert_eq!(live_by_id(&store, &bills).await?, baseline);

    // 2 of 6 vanish: under the threshold, deleted.
    store.write_current(&bills, session_2011(&[1, 2, 3, 4])).await?;
    let report = merge_state(&store, ct, settings, day(4)).await?;
    assert_eq!(report.entity(EntityType::Bill).expect("bills").counts.deleted, 2);
    assert_eq!(live_by_id(&store, &bills).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn disabled_guard_deletes_everything_vanished() -> Result<()> {
    let settings = ReconcileSettings {
        deletion_guard: DeletionGuard::disabled(),
        ..ReconcileSettings::default()
    };
    let store = MemStore::new();
    let ct = state("ct")?;
    let bills = scope(&ct, EntityType::Bill);

    store.write_current(&bills, session_2011(&(1..=20).collect::<Vec<_>>())).await?;
    merge_state(&store, ct.clone(), settings.clone(), day(1)).await?;
    store.write_current(&bills, session_2011(&[1])).await?;
    merge_state(&store, ct, settings, day(2)).await?;

    assert_eq!(live_by_id(&store, &bills).await?.len(), 1);
    Ok(())
}

#[test]
fn out_of_range_fraction_is_a_config_error() {
    let yaml = "bills:\n  deletion_guard:\n    max_fraction: 1.5\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("valid yaml");
    assert!(ReconcileSettings::from_config_json(&loaded.config_json).is_err());
}
