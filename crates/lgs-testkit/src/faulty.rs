//! Store wrapper that fails on demand, for exercising crash windows.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lgs_schemas::{Generation, IdKind, NaturalKey, Record, Scope};
use lgs_store::{
    Backend, Claim, GenerationState, GenerationStore, IdLedger, MemberQuery, RotationOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Every rotation fails: the run dies after its Live writes.
    Rotate,
    /// Live writes succeed `n` times, then fail.
    LivePutAfter(usize),
}

pub struct FaultyStore<B> {
    inner: B,
    fault: Mutex<Option<Fault>>,
    live_puts: AtomicUsize,
}

impl<B: Backend> FaultyStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fault: Mutex::new(None),
            live_puts: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn arm(&self, fault: Fault) {
        self.live_puts.store(0, Ordering::SeqCst);
        if let Ok(mut f) = self.fault.lock() {
            *f = Some(fault);
        }
    }

    pub fn disarm(&self) {
        if let Ok(mut f) = self.fault.lock() {
            *f = None;
        }
    }

    fn armed(&self) -> Option<Fault> {
        self.fault.lock().ok().and_then(|f| *f)
    }
}

#[async_trait]
impl<B: Backend> GenerationStore for FaultyStore<B> {
    async fn generation_state(&self, scope: &Scope) -> Result<GenerationState> {
        self.inner.generation_state(scope).await
    }

    async fn load(&self, scope: &Scope, generation: Generation) -> Result<Vec<Record>> {
        self.inner.load(scope, generation).await
    }

    async fn write_current(&self, scope: &Scope, records: Vec<Record>) -> Result<()> {
        self.inner.write_current(scope, records).await
    }

    async fn rotate(&self, scope: &Scope) -> Result<RotationOutcome> {
        if self.armed() == Some(Fault::Rotate) {
            return Err(anyhow!("injected fault: rotate {scope}"));
        }
        self.inner.rotate(scope).await
    }

    async fn live_get(&self, scope: &Scope, id: &str) -> Result<Option<Record>> {
        self.inner.live_get(scope, id).await
    }

    async fn live_by_key(&self, scope: &Scope, key: &NaturalKey) -> Result<Option<Record>> {
        self.inner.live_by_key(scope, key).await
    }

    async fn live_find_member(&self, scope: &Scope, query: &MemberQuery) -> Result<Option<Record>> {
        self.inner.live_find_member(scope, query).await
    }

    async fn live_put(&self, scope: &Scope, record: &Record) -> Result<()> {
        if let Some(Fault::LivePutAfter(n)) = self.armed() {
            if self.live_puts.fetch_add(1, Ordering::SeqCst) >= n {
                return Err(anyhow!("injected fault: live write {scope}"));
            }
        }
        self.inner.live_put(scope, record).await
    }

    async fn live_delete(&self, scope: &Scope, stable_id: &str) -> Result<bool> {
        self.inner.live_delete(scope, stable_id).await
    }
}

#[async_trait]
impl<B: Backend> IdLedger for FaultyStore<B> {
    async fn max_id(&self, prefix: &str) -> Result<Option<String>> {
        self.inner.max_id(prefix).await
    }

    async fn claim_id(&self, id: &str, kind: IdKind) -> Result<Claim> {
        self.inner.claim_id(id, kind).await
    }
}
