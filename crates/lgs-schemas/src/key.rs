//! Natural keys: the business fields that name "the same entity" across runs.
//!
//! - bill: state + session + chamber + bill_id
//! - legislator: first/last name + state/session/chamber/district of the
//!   active role
//! - metadata: state abbreviation
//!
//! Key fields may arrive as strings or numbers (districts and sessions are
//! frequently numeric in scraper output); both render to the same text.

use serde_json::{Map, Value};
use std::fmt;

use crate::EntityType;

const KEY_SEPARATOR: char = '\u{1f}';

/// Errors raised when a document cannot produce its natural key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyError {
    /// The document is not a JSON object.
    NotAnObject,
    /// A required key field is absent, null, or empty.
    MissingField { field: &'static str },
    /// A legislator document has no membership role to key on.
    NoActiveRole,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "document is not a JSON object"),
            Self::MissingField { field } => write!(f, "missing natural-key field '{field}'"),
            Self::NoActiveRole => write!(f, "legislator has no active membership role"),
        }
    }
}

impl std::error::Error for KeyError {}

/// Ordered natural-key components.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NaturalKey(Vec<String>);

impl NaturalKey {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Single-string form used as an indexed column by persistent stores.
    pub fn storage_key(&self) -> String {
        self.0.join(&KEY_SEPARATOR.to_string())
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Text of a scalar key field. Strings are trimmed; empty strings, nulls and
/// containers yield `None`.
pub fn field_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required(content: &Map<String, Value>, field: &'static str) -> Result<String, KeyError> {
    content
        .get(field)
        .and_then(field_text)
        .ok_or(KeyError::MissingField { field })
}

/// Session-scoped attachment of a legislator to a chamber and district.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    pub state: String,
    pub session: String,
    pub chamber: String,
    pub district: String,
    pub party: Option<String>,
}

impl Role {
    pub fn from_value(v: &Value) -> Result<Self, KeyError> {
        let obj = v.as_object().ok_or(KeyError::NotAnObject)?;
        Ok(Self {
            state: required(obj, "state")?.to_ascii_lowercase(),
            session: required(obj, "session")?,
            chamber: required(obj, "chamber")?,
            district: required(obj, "district")?,
            party: obj.get("party").and_then(field_text),
        })
    }

    /// Roles without a `type` are memberships; committee roles and the like
    /// carry an explicit type.
    pub fn is_membership(v: &Value) -> bool {
        match v.get("type") {
            None | Some(Value::Null) => true,
            Some(t) => t.as_str().map(|s| s == "member").unwrap_or(false),
        }
    }

    /// Same seat in the same session. Party is deliberately not part of the
    /// identity: party switches keep the person.
    pub fn same_seat(&self, other: &Role) -> bool {
        self.state.eq_ignore_ascii_case(&other.state)
            && self.session == other.session
            && self.chamber == other.chamber
            && self.district == other.district
    }

    pub fn with_session(&self, session: &str) -> Role {
        Role {
            session: session.to_string(),
            ..self.clone()
        }
    }
}

/// Session of a raw role value, if it has one.
pub fn role_session(v: &Value) -> Option<String> {
    v.get("session").and_then(field_text)
}

/// The active role: the first membership role in `roles`. Scraper output and
/// fused Live records both keep the freshest role first.
pub fn active_role(content: &Map<String, Value>) -> Result<Role, KeyError> {
    let roles = content
        .get("roles")
        .and_then(Value::as_array)
        .ok_or(KeyError::NoActiveRole)?;
    let first = roles
        .iter()
        .find(|r| Role::is_membership(r))
        .ok_or(KeyError::NoActiveRole)?;
    Role::from_value(first)
}

/// Legislator name pair used for matching.
pub fn legislator_name(content: &Map<String, Value>) -> Result<(String, String), KeyError> {
    Ok((
        required(content, "first_name")?,
        required(content, "last_name")?,
    ))
}

/// Extract the natural key of `content` for `entity`.
pub fn natural_key(
    entity: EntityType,
    content: &Map<String, Value>,
) -> Result<NaturalKey, KeyError> {
    match entity {
        EntityType::Metadata => Ok(NaturalKey(vec![
            required(content, "abbreviation")?.to_ascii_lowercase()
        ])),
        EntityType::Bill => Ok(NaturalKey(vec![
            required(content, "state")?.to_ascii_lowercase(),
            required(content, "session")?,
            required(content, "chamber")?,
            required(content, "bill_id")?,
        ])),
        EntityType::Legislator => {
            let (first, last) = legislator_name(content)?;
            let role = active_role(content)?;
            Ok(NaturalKey(vec![
                first,
                last,
                role.state,
                role.session,
                role.chamber,
                role.district,
            ]))
        }
    }
}
