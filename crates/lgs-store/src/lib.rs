//! lgs-store
//!
//! Storage seams for the reconciler:
//! - `GenerationStore`: Current/Old/Live slots per (state, entity) with
//!   atomic rotation
//! - `IdLedger` + `IdAllocator`: collision-free stable ids minted under
//!   concurrency
//! - `MemStore`: in-memory backend (tests, dry runs)
//!
//! The Postgres backend lives in `lgs-db`.

mod allocator;
mod mem;
mod traits;

pub use allocator::{AllocError, IdAllocator};
pub use mem::MemStore;
pub use traits::{
    check_live_identity, Backend, Claim, GenerationState, GenerationStore, IdLedger, MemberQuery,
    RotationOutcome,
};
