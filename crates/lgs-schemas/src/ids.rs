//! Stable id format: `<STATE><TYPECODE><6-digit sequence>`, e.g. `CTB000042`.

use crate::{IdKind, StateCode};

/// Width of the zero-padded sequence suffix.
pub const SEQUENCE_WIDTH: usize = 6;

/// Largest sequence representable in the fixed-width suffix.
pub const MAX_SEQUENCE: u32 = 999_999;

/// `<STATE><TYPECODE>` prefix shared by every id of one family.
pub fn id_prefix(state: &StateCode, kind: IdKind) -> String {
    format!("{}{}", state.upper(), kind.type_code())
}

pub fn format_id(prefix: &str, sequence: u32) -> String {
    format!("{prefix}{sequence:0width$}", width = SEQUENCE_WIDTH)
}

/// Numeric suffix of `id` when it belongs to the `prefix` family.
pub fn parse_sequence(prefix: &str, id: &str) -> Option<u32> {
    let digits = id.strip_prefix(prefix)?;
    if digits.len() != SEQUENCE_WIDTH || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `true` for any well-formed stable id of any state and family.
pub fn is_stable_id(id: &str) -> bool {
    let b = id.as_bytes();
    b.len() == 3 + SEQUENCE_WIDTH
        && b[0].is_ascii_uppercase()
        && b[1].is_ascii_uppercase()
        && matches!(b[2], b'L' | b'C' | b'B')
        && b[3..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_padding() {
        let ct = StateCode::parse("ct").unwrap();
        let p = id_prefix(&ct, IdKind::Bill);
        assert_eq!(p, "CTB");
        assert_eq!(format_id(&p, 1), "CTB000001");
        assert_eq!(parse_sequence(&p, "CTB000042"), Some(42));
    }

    #[test]
    fn parse_rejects_foreign_families() {
        assert_eq!(parse_sequence("CTB", "CTL000042"), None);
        assert_eq!(parse_sequence("CTB", "CTB42"), None);
        assert_eq!(parse_sequence("CTB", "CTB00004x"), None);
    }

    #[test]
    fn stable_id_shape() {
        assert!(is_stable_id("NYL123456"));
        assert!(is_stable_id("CTC000001"));
        assert!(!is_stable_id("ctb000001"));
        assert!(!is_stable_id("CTX000001"));
        assert!(!is_stable_id("CTB0000001"));
    }
}
