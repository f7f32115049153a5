use lgs_store::AllocError;
use std::fmt;

/// Errors that abort a merge run. Per-record problems never surface here:
/// they are skipped, logged and counted in the report.
#[derive(Debug)]
pub enum MergeError {
    /// Legislator fusion needs the state's session list from Live metadata.
    MissingMetadata { state: String },
    /// Id allocation failed (retry budget exhausted, overflow, ledger IO).
    Alloc(AllocError),
    /// Generation store IO.
    Store(anyhow::Error),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMetadata { state } => write!(
                f,
                "no live metadata for state '{state}': import and merge state metadata first"
            ),
            Self::Alloc(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "generation store failure: {e:#}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for MergeError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

impl From<anyhow::Error> for MergeError {
    fn from(e: anyhow::Error) -> Self {
        Self::Store(e)
    }
}
