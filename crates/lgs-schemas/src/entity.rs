use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity types that are reconciled per state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Metadata,
    Legislator,
    Bill,
}

impl EntityType {
    /// Reconciliation order for one state run. Metadata must land first:
    /// legislator session adjacency reads it from Live.
    pub const RUN_ORDER: [EntityType; 3] =
        [EntityType::Metadata, EntityType::Legislator, EntityType::Bill];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Metadata => "metadata",
            EntityType::Legislator => "legislator",
            EntityType::Bill => "bill",
        }
    }

    /// Accepts singular or plural spellings, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metadata" => Some(EntityType::Metadata),
            "legislator" | "legislators" => Some(EntityType::Legislator),
            "bill" | "bills" => Some(EntityType::Bill),
            _ => None,
        }
    }

    /// Allocator kind for entities that receive minted ids. Metadata is keyed
    /// by the state abbreviation directly.
    pub fn id_kind(&self) -> Option<IdKind> {
        match self {
            EntityType::Metadata => None,
            EntityType::Legislator => Some(IdKind::Legislator),
            EntityType::Bill => Some(IdKind::Bill),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier families minted by the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IdKind {
    Legislator,
    Committee,
    Bill,
}

impl IdKind {
    pub fn type_code(&self) -> char {
        match self {
            IdKind::Legislator => 'L',
            IdKind::Committee => 'C',
            IdKind::Bill => 'B',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Legislator => "legislator",
            IdKind::Committee => "committee",
            IdKind::Bill => "bill",
        }
    }
}

/// One named slot of a state's dataset for one entity type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// Freshly scraped, unidentified records of this run.
    Current,
    /// Previous run's reconciled snapshot; the diff baseline.
    Old,
    /// Published dataset.
    Live,
}

impl Generation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Current => "current",
            Generation::Old => "old",
            Generation::Live => "live",
        }
    }
}

/// Error for state abbreviations that are not two ASCII letters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateCodeError {
    pub raw: String,
}

impl fmt::Display for StateCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid state abbreviation '{}': expected two ASCII letters (e.g. ct)",
            self.raw
        )
    }
}

impl std::error::Error for StateCodeError {}

/// Two-letter state abbreviation, stored lowercase.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateCode(String);

impl StateCode {
    pub fn parse(raw: &str) -> Result<Self, StateCodeError> {
        let t = raw.trim();
        if t.len() != 2 || !t.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(StateCodeError {
                raw: raw.to_string(),
            });
        }
        Ok(Self(t.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uppercase form used as the identifier prefix.
    pub fn upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    /// Case-insensitive comparison against a raw field value.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl TryFrom<String> for StateCode {
    type Error = StateCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StateCode::parse(&value)
    }
}

impl From<StateCode> for String {
    fn from(value: StateCode) -> Self {
        value.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// (state, entity type) pair that owns a current/old/live triple.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope {
    pub state: StateCode,
    pub entity: EntityType,
}

impl Scope {
    pub fn new(state: &StateCode, entity: EntityType) -> Self {
        Self {
            state: state.clone(),
            entity,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.state, self.entity)
    }
}
