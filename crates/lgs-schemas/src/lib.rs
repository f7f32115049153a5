//! lgs-schemas
//!
//! Shared data model for the generation reconciler: entity types, the
//! current/old/live generations, records with their identity bookkeeping,
//! natural keys, roles, stable id formatting and session ordering.
//!
//! Pure types. No IO, no clock.

mod entity;
mod ids;
mod key;
mod record;
mod sessions;

pub use entity::{EntityType, Generation, IdKind, Scope, StateCode, StateCodeError};
pub use ids::{format_id, id_prefix, is_stable_id, parse_sequence, MAX_SEQUENCE, SEQUENCE_WIDTH};
pub use key::{
    active_role, field_text, legislator_name, natural_key, role_session, KeyError, NaturalKey,
    Role,
};
pub use record::{Record, RESERVED_FIELDS};
pub use sessions::{adjacent_sessions, session_list, SessionNeighbours};
