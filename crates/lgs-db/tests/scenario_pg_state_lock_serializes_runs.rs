//! Run lock: while one run holds a state, a second attempt on the same
//! state is refused; other states are unaffected; release frees it.
//!
//! DB-backed test, skipped if LGS_DATABASE_URL is not set.

use anyhow::Result;
use lgs_db::PgStore;
use std::time::Duration;

#[tokio::test]
async fn second_run_on_same_state_is_refused_until_release() -> Result<()> {
    let url = match std::env::var(lgs_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: LGS_DATABASE_URL not set");
            return Ok(());
        }
    };
    let pool = lgs_db::connect(&url, 4).await?;
    lgs_db::migrate(&pool).await?;
    let store = PgStore::new(pool);

    let held = store.lock_state("zt").await?;
    assert_eq!(held.key(), "lgs:zt");
    assert!(store.try_lock_state("zt").await?.is_none(), "same state must be refused");

    // A waiting run blocks until the holder lets go.
    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.lock_state("zt").await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished(), "waiter must block while the lock is held");

    let other = store.try_lock_state("zs").await?.expect("other state is free");
    other.release().await?;

    held.release().await?;
    let second = tokio::time::timeout(Duration::from_secs(5), waiter).await???;
    assert!(store.try_lock_state("zt").await?.is_none());
    second.release().await?;

    let again = store.try_lock_state("zt").await?.expect("free after release");
    again.release().await?;
    Ok(())
}

#[tokio::test]
async fn dropped_lock_is_freed_with_its_session() -> Result<()> {
    let url = match std::env::var(lgs_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: LGS_DATABASE_URL not set");
            return Ok(());
        }
    };
    let pool = lgs_db::connect(&url, 2).await?;
    lgs_db::migrate(&pool).await?;
    let store = PgStore::new(pool);

    // A run that errors out never calls release.
    drop(store.lock_state("zr").await?);

    let mut relocked = None;
    for _ in 0..50 {
        relocked = store.try_lock_state("zr").await?;
        if relocked.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    relocked.expect("lock freed once the session closed").release().await?;
    Ok(())
}
