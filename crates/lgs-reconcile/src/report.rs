use chrono::{DateTime, Utc};
use lgs_schemas::{EntityType, StateCode};
use lgs_store::{GenerationState, RotationOutcome};
use serde::Serialize;
use uuid::Uuid;

/// Per-entity tallies of what a run did to Live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    /// New natural key, freshly minted id.
    pub created: usize,
    /// Content changed; Live rewritten under the inherited id.
    pub updated: usize,
    /// Content identical; no Live write.
    pub unchanged: usize,
    /// New to Old but already in Live by natural key (re-run after a crash).
    pub readopted: usize,
    /// Re-adopted with changed content; Live rewritten.
    pub rewritten: usize,
    /// Unchanged against Old but missing from Live; re-published.
    pub restored: usize,
    /// Legislators matched to Live through an adjacent session.
    pub fused: usize,
    /// Duplicate Live legislators folded into the matched record.
    pub merged_duplicates: usize,
    pub deleted: usize,
    /// Deletions held back by the deletion guard.
    pub withheld: usize,
    /// Legislators absent from this scrape (logged, never deleted).
    pub removed: usize,
    pub skipped_malformed: usize,
    pub skipped_duplicate: usize,
    /// Records belonging to another state.
    pub skipped_foreign: usize,
}

impl EntityCounts {
    pub fn skipped(&self) -> usize {
        self.skipped_malformed + self.skipped_duplicate + self.skipped_foreign
    }

    /// Number of Live mutations, upserts and deletes alike.
    pub fn live_writes(&self) -> usize {
        self.created
            + self.updated
            + self.rewritten
            + self.restored
            + self.fused
            + self.merged_duplicates
            + self.deleted
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub entity: EntityType,
    /// Generation state found before the run touched the scope.
    pub generation_state: GenerationState,
    /// `None` when the scope was skipped (no scraper output).
    pub rotation: Option<RotationOutcome>,
    pub counts: EntityCounts,
}

impl EntityReport {
    pub fn skipped(entity: EntityType, generation_state: GenerationState) -> Self {
        Self {
            entity,
            generation_state,
            rotation: None,
            counts: EntityCounts::default(),
        }
    }

    pub fn was_reconciled(&self) -> bool {
        self.rotation.is_some()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: StateCode,
    pub now: DateTime<Utc>,
    pub entities: Vec<EntityReport>,
}

impl RunReport {
    pub fn entity(&self, entity: EntityType) -> Option<&EntityReport> {
        self.entities.iter().find(|e| e.entity == entity)
    }
}
