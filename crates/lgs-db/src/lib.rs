//! lgs-db
//!
//! Postgres backend for the generation store and the stable-id ledger.
//! Schema lives in `migrations/` and is embedded with `sqlx::migrate!`.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod lock;
mod store;

pub use lock::StateLock;
pub use store::PgStore;

pub const ENV_DB_URL: &str = "LGS_DATABASE_URL";

/// Connect to Postgres using LGS_DATABASE_URL.
pub async fn connect_from_env(max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, max_connections).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_generation_tables: bool,
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)::bigint
        from information_schema.tables
        where table_schema = 'public'
          and table_name in ('generation_slots', 'slot_records', 'live_records', 'stable_ids')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_generation_tables: n == 4,
    })
}

/// Postgres unique_violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
