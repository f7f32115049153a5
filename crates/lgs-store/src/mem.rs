//! In-memory backend.
//!
//! Used by tests and dry runs. Current/Old live in two physical slots per
//! scope with a pointer pair naming which slot is which, so rotation is a
//! pointer swap plus a slot drop, the same model the Postgres backend uses.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lgs_schemas::{parse_sequence, Generation, IdKind, NaturalKey, Record, Scope};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::{
    check_live_identity, Claim, GenerationState, GenerationStore, IdLedger, MemberQuery,
    RotationOutcome,
};

#[derive(Default)]
struct SlotPair {
    slots: [Option<Vec<Record>>; 2],
    current: Option<usize>,
    old: Option<usize>,
}

impl SlotPair {
    fn state(&self) -> GenerationState {
        GenerationState::from_slots(self.current.is_some(), self.old.is_some())
    }

    fn read(&self, which: Option<usize>) -> Vec<Record> {
        which
            .and_then(|i| self.slots[i].clone())
            .unwrap_or_default()
    }

    fn write_current(&mut self, records: Vec<Record>) {
        // Never overwrite the slot Old points at.
        let target = match self.old {
            Some(0) => 1,
            _ => 0,
        };
        self.slots[target] = Some(records);
        self.current = Some(target);
    }

    fn rotate(&mut self) -> RotationOutcome {
        let Some(c) = self.current.take() else {
            return RotationOutcome::NoCurrent;
        };
        let discarded_old = match self.old {
            Some(o) if o != c => {
                self.slots[o] = None;
                true
            }
            _ => false,
        };
        self.old = Some(c);
        RotationOutcome::Promoted { discarded_old }
    }

    fn discard_old(&mut self) -> bool {
        match self.old.take() {
            Some(o) => {
                self.slots[o] = None;
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct Inner {
    slots: HashMap<Scope, SlotPair>,
    live: HashMap<Scope, BTreeMap<String, Record>>,
    ids: BTreeSet<String>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("mem store lock poisoned"))
    }

    /// Drop Old without promoting Current: the state a run is left in when
    /// it dies between the two halves of a collection-rename rotation.
    pub fn discard_old(&self, scope: &Scope) -> Result<bool> {
        let mut inner = self.lock()?;
        Ok(inner
            .slots
            .get_mut(scope)
            .map(SlotPair::discard_old)
            .unwrap_or(false))
    }

    /// Every id in the ledger, sorted.
    pub fn ledger_ids(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.ids.iter().cloned().collect())
    }
}

#[async_trait]
impl GenerationStore for MemStore {
    async fn generation_state(&self, scope: &Scope) -> Result<GenerationState> {
        let inner = self.lock()?;
        Ok(inner
            .slots
            .get(scope)
            .map(SlotPair::state)
            .unwrap_or(GenerationState::Absent))
    }

    async fn load(&self, scope: &Scope, generation: Generation) -> Result<Vec<Record>> {
        let inner = self.lock()?;
        Ok(match generation {
            Generation::Live => inner
                .live
                .get(scope)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default(),
            Generation::Current => inner
                .slots
                .get(scope)
                .map(|p| p.read(p.current))
                .unwrap_or_default(),
            Generation::Old => inner
                .slots
                .get(scope)
                .map(|p| p.read(p.old))
                .unwrap_or_default(),
        })
    }

    async fn write_current(&self, scope: &Scope, records: Vec<Record>) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .slots
            .entry(scope.clone())
            .or_default()
            .write_current(records);
        Ok(())
    }

    async fn rotate(&self, scope: &Scope) -> Result<RotationOutcome> {
        let mut inner = self.lock()?;
        Ok(match inner.slots.get_mut(scope) {
            Some(pair) => pair.rotate(),
            None => RotationOutcome::NoCurrent,
        })
    }

    async fn live_get(&self, scope: &Scope, id: &str) -> Result<Option<Record>> {
        let inner = self.lock()?;
        let Some(live) = inner.live.get(scope) else {
            return Ok(None);
        };
        if let Some(r) = live.get(id) {
            return Ok(Some(r.clone()));
        }
        Ok(live.values().find(|r| r.holds_id(id)).cloned())
    }

    async fn live_by_key(&self, scope: &Scope, key: &NaturalKey) -> Result<Option<Record>> {
        let inner = self.lock()?;
        Ok(inner.live.get(scope).and_then(|live| {
            live.values()
                .find(|r| r.natural_key(scope.entity).ok().as_ref() == Some(key))
                .cloned()
        }))
    }

    async fn live_find_member(&self, scope: &Scope, query: &MemberQuery) -> Result<Option<Record>> {
        let inner = self.lock()?;
        Ok(inner.live.get(scope).and_then(|live| {
            live.values()
                .find(|r| query.matches(&r.content))
                .cloned()
        }))
    }

    async fn live_put(&self, scope: &Scope, record: &Record) -> Result<()> {
        let id = check_live_identity(record)?.to_string();
        let mut inner = self.lock()?;
        inner
            .live
            .entry(scope.clone())
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }

    async fn live_delete(&self, scope: &Scope, stable_id: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        Ok(inner
            .live
            .get_mut(scope)
            .map(|live| live.remove(stable_id).is_some())
            .unwrap_or(false))
    }
}

#[async_trait]
impl IdLedger for MemStore {
    async fn max_id(&self, prefix: &str) -> Result<Option<String>> {
        let inner = self.lock()?;
        Ok(inner
            .ids
            .range(prefix.to_string()..)
            .take_while(|id| id.starts_with(prefix))
            .filter(|id| parse_sequence(prefix, id).is_some())
            .max_by_key(|id| parse_sequence(prefix, id))
            .cloned())
    }

    async fn claim_id(&self, id: &str, _kind: IdKind) -> Result<Claim> {
        let mut inner = self.lock()?;
        Ok(if inner.ids.insert(id.to_string()) {
            Claim::Claimed
        } else {
            Claim::Taken
        })
    }
}
