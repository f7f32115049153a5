//! lgs-reconcile
//!
//! Generation reconciliation for one state:
//! - Metadata: upsert the state descriptor when it changed
//! - Bills: diff Current against Old, publish to Live, guarded deletion
//! - Legislators: the same carry-forward plus cross-session fusion in Live
//! - Rotation: promote reconciled Current to Old, idempotently
//!
//! All IO goes through `lgs_store::GenerationStore`; the clock is an explicit
//! `now` on the session.

mod bills;
mod error;
mod intake;
mod legislators;
mod metadata;
mod report;
mod rotation;
mod session;

pub use error::MergeError;
pub use report::{EntityCounts, EntityReport, RunReport};
pub use session::{merge_state, MergeSession};
