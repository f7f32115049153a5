//! Session ordering from a state's legislature descriptor.
//!
//! Sessions are listed per term (`terms[].sessions`); the flattened order is
//! chronological.

use serde_json::{Map, Value};

use crate::field_text;

/// Ordered, de-duplicated session list of a metadata document.
pub fn session_list(metadata: &Map<String, Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let terms = metadata
        .get("terms")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    for term in terms {
        let sessions = term
            .get("sessions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for s in sessions.iter().filter_map(field_text) {
            if !out.contains(&s) {
                out.push(s);
            }
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionNeighbours {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Sessions immediately before and after `session`; `None` when the session
/// is not listed at all.
pub fn adjacent_sessions(sessions: &[String], session: &str) -> Option<SessionNeighbours> {
    let idx = sessions.iter().position(|s| s == session)?;
    Some(SessionNeighbours {
        previous: idx.checked_sub(1).map(|i| sessions[i].clone()),
        next: sessions.get(idx + 1).cloned(),
    })
}
