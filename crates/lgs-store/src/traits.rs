use anyhow::Result;
use async_trait::async_trait;
use lgs_schemas::{legislator_name, Generation, IdKind, NaturalKey, Record, Role, Scope};
use serde::Serialize;
use serde_json::{Map, Value};

/// Which generation slots of a scope are populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationState {
    /// Nothing scraped and nothing reconciled yet.
    Absent,
    /// First import, or a re-run after a crash that discarded Old.
    CurrentOnly,
    /// Normal diff run.
    OldAndCurrent,
    /// Rotated; waiting for the next scrape.
    OldOnly,
}

impl GenerationState {
    pub fn from_slots(has_current: bool, has_old: bool) -> Self {
        match (has_current, has_old) {
            (false, false) => GenerationState::Absent,
            (true, false) => GenerationState::CurrentOnly,
            (true, true) => GenerationState::OldAndCurrent,
            (false, true) => GenerationState::OldOnly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Absent => "ABSENT",
            GenerationState::CurrentOnly => "CURRENT_ONLY",
            GenerationState::OldAndCurrent => "OLD_AND_CURRENT",
            GenerationState::OldOnly => "OLD_ONLY",
        }
    }

    pub fn has_current(&self) -> bool {
        matches!(
            self,
            GenerationState::CurrentOnly | GenerationState::OldAndCurrent
        )
    }
}

/// Result of a rotation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationOutcome {
    /// Current became Old; `discarded_old` tells whether a previous Old was dropped.
    Promoted { discarded_old: bool },
    /// No Current present: already rotated, or nothing was scraped.
    NoCurrent,
}

impl RotationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationOutcome::Promoted { discarded_old: true } => "PROMOTED_DISCARDED_OLD",
            RotationOutcome::Promoted { discarded_old: false } => "PROMOTED",
            RotationOutcome::NoCurrent => "NO_CURRENT",
        }
    }
}

/// Result of a uniqueness-enforced id claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    Claimed,
    /// Another allocation got there first.
    Taken,
}

/// Live legislator search: names plus one seat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberQuery {
    pub first_name: String,
    pub last_name: String,
    pub seat: Role,
}

impl MemberQuery {
    /// Names equal and any membership role occupying the requested seat.
    pub fn matches(&self, content: &Map<String, Value>) -> bool {
        let Ok((first, last)) = legislator_name(content) else {
            return false;
        };
        if first != self.first_name || last != self.last_name {
            return false;
        }
        content
            .get("roles")
            .and_then(Value::as_array)
            .map(|roles| {
                roles.iter().any(|r| {
                    Role::is_membership(r)
                        && Role::from_value(r)
                            .map(|role| role.same_seat(&self.seat))
                            .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

/// Current/Old/Live slots per (state, entity type).
///
/// Mutation discipline: only rotation swaps or discards Current/Old; only
/// reconcilers write Live. Implementations make `write_current` and `rotate`
/// atomic.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn generation_state(&self, scope: &Scope) -> Result<GenerationState>;

    /// All records of one generation. Absent slots read as empty; Live is
    /// returned ordered by stable id.
    async fn load(&self, scope: &Scope, generation: Generation) -> Result<Vec<Record>>;

    /// Replace Current wholesale.
    async fn write_current(&self, scope: &Scope, records: Vec<Record>) -> Result<()>;

    /// Discard Old and promote Current. Idempotent: with no Current this is
    /// a no-op reported as [`RotationOutcome::NoCurrent`].
    async fn rotate(&self, scope: &Scope) -> Result<RotationOutcome>;

    /// Live record holding `id` as its stable id or anywhere in `all_ids`.
    async fn live_get(&self, scope: &Scope, id: &str) -> Result<Option<Record>>;

    async fn live_by_key(&self, scope: &Scope, key: &NaturalKey) -> Result<Option<Record>>;

    /// Lowest-id Live legislator matching the query.
    async fn live_find_member(&self, scope: &Scope, query: &MemberQuery) -> Result<Option<Record>>;

    /// Insert or replace by stable id. The record must carry a stable id
    /// contained in its `all_ids`.
    async fn live_put(&self, scope: &Scope, record: &Record) -> Result<()>;

    /// Returns whether a record was removed.
    async fn live_delete(&self, scope: &Scope, stable_id: &str) -> Result<bool>;
}

/// Backing ledger for the identity allocator: every id ever minted.
#[async_trait]
pub trait IdLedger: Send + Sync {
    /// Highest well-formed id with `prefix` (`<STATE><TYPECODE>`).
    async fn max_id(&self, prefix: &str) -> Result<Option<String>>;

    /// Record `id` as taken; [`Claim::Taken`] when it already exists.
    async fn claim_id(&self, id: &str, kind: IdKind) -> Result<Claim>;
}

/// Both halves of a backend; what a merge run is handed.
pub trait Backend: GenerationStore + IdLedger {}

impl<T: GenerationStore + IdLedger> Backend for T {}

/// Shared Live-record invariant check for backends.
pub fn check_live_identity(record: &Record) -> Result<&str> {
    let id = record
        .stable_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("live record has no stable id"))?;
    if !record.all_ids.iter().any(|x| x == id) {
        anyhow::bail!("live record {id}: stable id missing from all_ids");
    }
    Ok(id)
}
