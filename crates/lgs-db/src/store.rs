use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lgs_schemas::{Generation, IdKind, NaturalKey, Record, Scope, SEQUENCE_WIDTH};
use lgs_store::{
    check_live_identity, Claim, GenerationState, GenerationStore, IdLedger, MemberQuery,
    RotationOutcome,
};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::is_unique_violation;

/// Generation store and id ledger over one Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Clone, Copy, Debug)]
struct Pointers {
    current: Option<i16>,
    old: Option<i16>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn pointers(&self, scope: &Scope) -> Result<Pointers> {
        let row = sqlx::query(
            r#"
            select current_slot, old_slot
            from generation_slots
            where state = $1 and entity = $2
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("read generation pointers for {scope}"))?;

        Ok(match row {
            Some(r) => Pointers {
                current: r.try_get("current_slot")?,
                old: r.try_get("old_slot")?,
            },
            None => Pointers {
                current: None,
                old: None,
            },
        })
    }

    /// Lock the pointer row, creating it on first use.
    async fn lock_pointers(
        tx: &mut Transaction<'_, Postgres>,
        scope: &Scope,
    ) -> Result<Pointers> {
        sqlx::query(
            r#"
            insert into generation_slots (state, entity)
            values ($1, $2)
            on conflict (state, entity) do nothing
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .execute(&mut **tx)
        .await
        .context("ensure generation pointer row failed")?;

        let row = sqlx::query(
            r#"
            select current_slot, old_slot
            from generation_slots
            where state = $1 and entity = $2
            for update
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .fetch_one(&mut **tx)
        .await
        .context("lock generation pointer row failed")?;

        Ok(Pointers {
            current: row.try_get("current_slot")?,
            old: row.try_get("old_slot")?,
        })
    }

    async fn clear_slot(
        tx: &mut Transaction<'_, Postgres>,
        scope: &Scope,
        slot: i16,
    ) -> Result<()> {
        sqlx::query("delete from slot_records where state = $1 and entity = $2 and slot = $3")
            .bind(scope.state.as_str())
            .bind(scope.entity.as_str())
            .bind(slot)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("clear slot {slot} of {scope} failed"))?;
        Ok(())
    }

    async fn load_slot(&self, scope: &Scope, slot: i16) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            select record
            from slot_records
            where state = $1 and entity = $2 and slot = $3
            order by position asc
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(slot)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("load slot {slot} of {scope} failed"))?;

        rows.iter()
            .map(|r| {
                let v: Value = r.try_get("record")?;
                serde_json::from_value(v).context("slot_records.record is not a record")
            })
            .collect()
    }

    /// Remove every row belonging to `state` (all entities, all generations,
    /// the id ledger). Used to reset fixtures.
    pub async fn purge_state(&self, state: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.context("begin purge tx")?;
        for table in ["slot_records", "generation_slots", "live_records", "stable_ids"] {
            sqlx::query(&format!("delete from {table} where state = $1"))
                .bind(state)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("purge {table} failed"))?;
        }
        tx.commit().await.context("commit purge tx")?;
        Ok(())
    }
}

const LIVE_COLUMNS: &str = "stable_id, all_ids, created_at, updated_at, content";

fn live_from_row(row: &PgRow) -> Result<Record> {
    let content = match row.try_get::<Value, _>("content")? {
        Value::Object(map) => map,
        other => return Err(anyhow!("live_records.content is not an object: {other}")),
    };
    Ok(Record {
        stable_id: Some(row.try_get::<String, _>("stable_id")?),
        all_ids: row.try_get::<Vec<String>, _>("all_ids")?,
        created_at: Some(row.try_get::<DateTime<Utc>, _>("created_at")?),
        updated_at: Some(row.try_get::<DateTime<Utc>, _>("updated_at")?),
        content,
    })
}

#[async_trait]
impl GenerationStore for PgStore {
    async fn generation_state(&self, scope: &Scope) -> Result<GenerationState> {
        let p = self.pointers(scope).await?;
        Ok(GenerationState::from_slots(
            p.current.is_some(),
            p.old.is_some(),
        ))
    }

    async fn load(&self, scope: &Scope, generation: Generation) -> Result<Vec<Record>> {
        let slot = match generation {
            Generation::Live => {
                let rows = sqlx::query(&format!(
                    "select {LIVE_COLUMNS} from live_records \
                     where state = $1 and entity = $2 order by stable_id asc"
                ))
                .bind(scope.state.as_str())
                .bind(scope.entity.as_str())
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("load live {scope} failed"))?;
                return rows.iter().map(live_from_row).collect();
            }
            Generation::Current => self.pointers(scope).await?.current,
            Generation::Old => self.pointers(scope).await?.old,
        };
        match slot {
            Some(s) => self.load_slot(scope, s).await,
            None => Ok(Vec::new()),
        }
    }

    async fn write_current(&self, scope: &Scope, records: Vec<Record>) -> Result<()> {
        let mut tx = self.pool.begin().await.context("begin write_current tx")?;
        let p = Self::lock_pointers(&mut tx, scope).await?;
        let target: i16 = if p.old == Some(0) { 1 } else { 0 };

        Self::clear_slot(&mut tx, scope, target).await?;
        for (position, record) in records.iter().enumerate() {
            let position = i32::try_from(position).context("too many records for one slot")?;
            let doc = serde_json::to_value(record).context("serialize slot record")?;
            sqlx::query(
                r#"
                insert into slot_records (state, entity, slot, position, record)
                values ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(scope.state.as_str())
            .bind(scope.entity.as_str())
            .bind(target)
            .bind(position)
            .bind(doc)
            .execute(&mut *tx)
            .await
            .context("insert slot record failed")?;
        }

        sqlx::query(
            r#"
            update generation_slots
            set current_slot = $3
            where state = $1 and entity = $2
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(target)
        .execute(&mut *tx)
        .await
        .context("point current at new slot failed")?;

        tx.commit().await.context("commit write_current tx")?;
        debug!(%scope, slot = target, records = records.len(), "current generation written");
        Ok(())
    }

    async fn rotate(&self, scope: &Scope) -> Result<RotationOutcome> {
        let mut tx = self.pool.begin().await.context("begin rotate tx")?;
        let p = Self::lock_pointers(&mut tx, scope).await?;

        let Some(current) = p.current else {
            tx.commit().await.context("commit rotate tx")?;
            return Ok(RotationOutcome::NoCurrent);
        };

        let discarded_old = match p.old {
            Some(old) if old != current => {
                Self::clear_slot(&mut tx, scope, old).await?;
                true
            }
            _ => false,
        };

        sqlx::query(
            r#"
            update generation_slots
            set old_slot = current_slot,
                current_slot = null
            where state = $1 and entity = $2
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .execute(&mut *tx)
        .await
        .context("swap generation pointers failed")?;

        tx.commit().await.context("commit rotate tx")?;
        Ok(RotationOutcome::Promoted { discarded_old })
    }

    async fn live_get(&self, scope: &Scope, id: &str) -> Result<Option<Record>> {
        let row = sqlx::query(&format!(
            "select {LIVE_COLUMNS} from live_records \
             where state = $1 and entity = $2 and (stable_id = $3 or $3 = any(all_ids)) \
             order by (stable_id = $3) desc, stable_id asc \
             limit 1"
        ))
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("live lookup {scope} {id} failed"))?;
        row.as_ref().map(live_from_row).transpose()
    }

    async fn live_by_key(&self, scope: &Scope, key: &NaturalKey) -> Result<Option<Record>> {
        let row = sqlx::query(&format!(
            "select {LIVE_COLUMNS} from live_records \
             where state = $1 and entity = $2 and natural_key = $3 \
             order by stable_id asc limit 1"
        ))
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(key.storage_key())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("live key lookup {scope} {key} failed"))?;
        row.as_ref().map(live_from_row).transpose()
    }

    async fn live_find_member(&self, scope: &Scope, query: &MemberQuery) -> Result<Option<Record>> {
        // Narrow by name in SQL; role matching runs on the decoded documents.
        let rows = sqlx::query(&format!(
            "select {LIVE_COLUMNS} from live_records \
             where state = $1 and entity = $2 \
               and btrim(content->>'last_name') = $3 \
               and btrim(content->>'first_name') = $4 \
             order by stable_id asc"
        ))
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(&query.last_name)
        .bind(&query.first_name)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("live member search {scope} failed"))?;

        for row in &rows {
            let rec = live_from_row(row)?;
            if query.matches(&rec.content) {
                return Ok(Some(rec));
            }
        }
        Ok(None)
    }

    async fn live_put(&self, scope: &Scope, record: &Record) -> Result<()> {
        let id = check_live_identity(record)?;
        let created_at = record
            .created_at
            .with_context(|| format!("live record {id} has no created_at"))?;
        let updated_at = record
            .updated_at
            .with_context(|| format!("live record {id} has no updated_at"))?;
        let natural_key = record
            .natural_key(scope.entity)
            .ok()
            .map(|k| k.storage_key());

        sqlx::query(
            r#"
            insert into live_records (
              state, entity, stable_id, natural_key, all_ids, created_at, updated_at, content
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8
            )
            on conflict (state, entity, stable_id) do update
            set natural_key = excluded.natural_key,
                all_ids = excluded.all_ids,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                content = excluded.content
            "#,
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(id)
        .bind(natural_key)
        .bind(&record.all_ids)
        .bind(created_at)
        .bind(updated_at)
        .bind(Value::Object(record.content.clone()))
        .execute(&self.pool)
        .await
        .with_context(|| format!("live upsert {scope} {id} failed"))?;
        Ok(())
    }

    async fn live_delete(&self, scope: &Scope, stable_id: &str) -> Result<bool> {
        let res = sqlx::query(
            "delete from live_records where state = $1 and entity = $2 and stable_id = $3",
        )
        .bind(scope.state.as_str())
        .bind(scope.entity.as_str())
        .bind(stable_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("live delete {scope} {stable_id} failed"))?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl IdLedger for PgStore {
    async fn max_id(&self, prefix: &str) -> Result<Option<String>> {
        // Fixed-width sequences order lexicographically within a family.
        let pattern = format!("^{prefix}[0-9]{{{SEQUENCE_WIDTH}}}$");
        let row: Option<(String,)> = sqlx::query_as::<_, (String,)>(
            r#"
            select id
            from stable_ids
            where id ~ $1
            order by id desc
            limit 1
            "#,
        )
        .bind(pattern)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("max id lookup for {prefix} failed"))?;

        Ok(row.map(|(id,)| id))
    }

    async fn claim_id(&self, id: &str, kind: IdKind) -> Result<Claim> {
        let state = id.get(..2).map(str::to_ascii_lowercase).unwrap_or_default();
        let res = sqlx::query("insert into stable_ids (id, state, kind) values ($1, $2, $3)")
            .bind(id)
            .bind(&state)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await;

        match res {
            Ok(_) => Ok(Claim::Claimed),
            Err(e) if is_unique_violation(&e) => Ok(Claim::Taken),
            Err(e) => Err(anyhow::Error::new(e).context(format!("claim id {id} failed"))),
        }
    }
}
