use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use tracing::{debug, warn};

use crate::PgStore;

fn lock_key(state: &str) -> String {
    format!("lgs:{state}")
}

/// Session-level advisory lock serializing import and merge runs for one
/// state. Held on a dedicated pool connection until [`StateLock::release`].
///
/// Dropping without `release` detaches that connection from the pool; the
/// server frees the lock when the session closes.
pub struct StateLock {
    conn: Option<PoolConnection<Postgres>>,
    key: String,
}

impl StateLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn release(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        let released: bool = sqlx::query_scalar("select pg_advisory_unlock(hashtext($1)::bigint)")
            .bind(&self.key)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("release run lock {} failed", self.key))?;
        if !released {
            warn!(key = %self.key, "run lock was not held at release");
        }
        debug!(key = %self.key, "run lock released");
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

impl PgStore {
    /// Wait for the run lock of `state`.
    pub async fn lock_state(&self, state: &str) -> Result<StateLock> {
        let key = lock_key(state);
        let mut conn = self.pool().acquire().await.context("acquire lock connection")?;
        sqlx::query("select pg_advisory_lock(hashtext($1)::bigint)")
            .bind(&key)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("take run lock {key} failed"))?;
        debug!(%key, "run lock taken");
        Ok(StateLock {
            conn: Some(conn),
            key,
        })
    }

    /// Take the run lock of `state` if nobody holds it.
    pub async fn try_lock_state(&self, state: &str) -> Result<Option<StateLock>> {
        let key = lock_key(state);
        let mut conn = self.pool().acquire().await.context("acquire lock connection")?;
        let taken: bool = sqlx::query_scalar("select pg_try_advisory_lock(hashtext($1)::bigint)")
            .bind(&key)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("try run lock {key} failed"))?;
        if !taken {
            return Ok(None);
        }
        debug!(%key, "run lock taken");
        Ok(Some(StateLock {
            conn: Some(conn),
            key,
        }))
    }
}
