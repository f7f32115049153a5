use chrono::{DateTime, Utc};
use lgs_config::ReconcileSettings;
use lgs_schemas::{session_list, EntityType, IdKind, Scope, StateCode};
use lgs_store::{Backend, GenerationStore, IdAllocator};
use tracing::info;
use uuid::Uuid;

use crate::rotation;
use crate::{EntityReport, MergeError, RunReport};

/// One merge run over one state.
///
/// Holds the store handle, the allocator and the run clock. Every timestamp
/// written during the run is `now`, so a re-run with the same clock and the
/// same generations reproduces the same Live state.
pub struct MergeSession<'a> {
    store: &'a dyn GenerationStore,
    allocator: IdAllocator<'a>,
    settings: ReconcileSettings,
    state: StateCode,
    now: DateTime<Utc>,
    run_id: Uuid,
}

impl<'a> MergeSession<'a> {
    pub fn new<B: Backend>(
        backend: &'a B,
        state: StateCode,
        settings: ReconcileSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            store: backend,
            allocator: IdAllocator::new(backend, settings.allocator_max_attempts),
            settings,
            state,
            now,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn state(&self) -> &StateCode {
        &self.state
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    pub(crate) fn store(&self) -> &'a dyn GenerationStore {
        self.store
    }

    pub fn scope(&self, entity: EntityType) -> Scope {
        Scope::new(&self.state, entity)
    }

    pub(crate) async fn allocate(&self, kind: IdKind) -> Result<String, MergeError> {
        Ok(self.allocator.allocate(&self.state, kind).await?)
    }

    /// Ordered session list from the state's Live metadata.
    pub(crate) async fn metadata_sessions(&self) -> Result<Vec<String>, MergeError> {
        let scope = self.scope(EntityType::Metadata);
        match self.store.live_get(&scope, self.state.as_str()).await? {
            Some(meta) => Ok(session_list(&meta.content)),
            None => Err(MergeError::MissingMetadata {
                state: self.state.to_string(),
            }),
        }
    }

    /// Reconcile and rotate one entity type.
    pub async fn merge_entity(&self, entity: EntityType) -> Result<EntityReport, MergeError> {
        rotation::advance(self, entity).await
    }

    /// Metadata, then legislators, then bills. The first fatal error aborts
    /// the run; entity types already rotated stay rotated.
    pub async fn merge(&self) -> Result<RunReport, MergeError> {
        info!(state = %self.state, run_id = %self.run_id, now = %self.now, "merge run started");

        let mut entities = Vec::with_capacity(EntityType::RUN_ORDER.len());
        for entity in EntityType::RUN_ORDER {
            entities.push(self.merge_entity(entity).await?);
        }

        info!(state = %self.state, run_id = %self.run_id, "merge run finished");
        Ok(RunReport {
            run_id: self.run_id,
            state: self.state.clone(),
            now: self.now,
            entities,
        })
    }
}

/// Run a full merge for `state` with a fresh session.
pub async fn merge_state<B: Backend>(
    backend: &B,
    state: StateCode,
    settings: ReconcileSettings,
    now: DateTime<Utc>,
) -> Result<RunReport, MergeError> {
    MergeSession::new(backend, state, settings, now).merge().await
}
