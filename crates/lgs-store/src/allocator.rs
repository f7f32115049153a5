//! Identity allocator.
//!
//! Read the highest id of the `<STATE><TYPECODE>` family, claim the next
//! sequence, and on a uniqueness conflict re-read and retry. The ledger's
//! uniqueness constraint is the only coordination point: concurrent
//! allocations for the same family never hand out the same id, and a bounded
//! retry budget turns pathological contention into a fatal error.

use lgs_schemas::{format_id, id_prefix, parse_sequence, IdKind, StateCode, MAX_SEQUENCE};
use std::fmt;
use tracing::debug;

use crate::{Claim, IdLedger};

#[derive(Debug)]
pub enum AllocError {
    /// Every attempt lost its claim to a concurrent allocation.
    Exhausted { prefix: String, attempts: u32 },
    /// The six-digit sequence space of the family is used up.
    SequenceOverflow { prefix: String },
    /// The ledger returned an id outside the family's format.
    MalformedLedgerId { prefix: String, id: String },
    /// Ledger IO failure.
    Backend(anyhow::Error),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { prefix, attempts } => write!(
                f,
                "id allocation for {prefix} exhausted after {attempts} conflicting attempts"
            ),
            Self::SequenceOverflow { prefix } => {
                write!(f, "id sequence for {prefix} overflowed {MAX_SEQUENCE}")
            }
            Self::MalformedLedgerId { prefix, id } => {
                write!(f, "ledger returned malformed id '{id}' for {prefix}")
            }
            Self::Backend(e) => write!(f, "id ledger failure: {e:#}"),
        }
    }
}

impl std::error::Error for AllocError {}

/// Allocator bound to one ledger for the duration of a run.
#[derive(Clone, Copy)]
pub struct IdAllocator<'a> {
    ledger: &'a dyn IdLedger,
    max_attempts: u32,
}

impl<'a> IdAllocator<'a> {
    pub fn new(ledger: &'a dyn IdLedger, max_attempts: u32) -> Self {
        Self {
            ledger,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn allocate(&self, state: &StateCode, kind: IdKind) -> Result<String, AllocError> {
        let prefix = id_prefix(state, kind);

        for attempt in 1..=self.max_attempts {
            let max = self
                .ledger
                .max_id(&prefix)
                .await
                .map_err(AllocError::Backend)?;

            let next = match max {
                None => 1,
                Some(id) => {
                    let seq = parse_sequence(&prefix, &id).ok_or_else(|| {
                        AllocError::MalformedLedgerId {
                            prefix: prefix.clone(),
                            id: id.clone(),
                        }
                    })?;
                    seq + 1
                }
            };
            if next > MAX_SEQUENCE {
                return Err(AllocError::SequenceOverflow { prefix });
            }

            let id = format_id(&prefix, next);
            match self
                .ledger
                .claim_id(&id, kind)
                .await
                .map_err(AllocError::Backend)?
            {
                Claim::Claimed => {
                    debug!(id = %id, attempt, "allocated stable id");
                    return Ok(id);
                }
                Claim::Taken => {
                    debug!(id = %id, attempt, "stable id claimed concurrently; retrying");
                }
            }
        }

        Err(AllocError::Exhausted {
            prefix,
            attempts: self.max_attempts,
        })
    }
}
