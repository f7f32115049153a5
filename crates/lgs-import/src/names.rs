//! Person-name splitting for scraper output that only carries `full_name`.
//!
//! Handles "Last, First Middle" and "First Middle Last Suffix".

const SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "v", "md", "phd", "esq"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub middle: String,
    pub last: String,
    pub suffixes: String,
}

fn is_suffix(token: &str) -> bool {
    let t = token.trim_end_matches('.').to_ascii_lowercase();
    SUFFIXES.contains(&t.as_str())
}

pub fn split_name(full: &str) -> NameParts {
    let full = full.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut pieces = full.split(',').map(str::trim).filter(|p| !p.is_empty());
    let head = pieces.next().unwrap_or_default();
    let rest: Vec<&str> = pieces.collect();

    let all_suffixes = |p: &&str| p.split_whitespace().all(is_suffix);

    // "First Last, Jr." has only suffixes after the comma.
    if !rest.is_empty() && !rest.iter().all(all_suffixes) {
        let last = head.to_string();
        let mut given: Vec<&str> = Vec::new();
        let mut suffixes: Vec<&str> = Vec::new();
        for piece in &rest {
            for token in piece.split_whitespace() {
                if is_suffix(token) && !given.is_empty() {
                    suffixes.push(token);
                } else {
                    given.push(token);
                }
            }
        }
        return NameParts {
            first: given.first().map(|s| s.to_string()).unwrap_or_default(),
            middle: given.get(1..).map(|m| m.join(" ")).unwrap_or_default(),
            last,
            suffixes: suffixes.join(" "),
        };
    }

    let mut tokens: Vec<&str> = head.split_whitespace().collect();
    let mut suffixes: Vec<&str> = Vec::new();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| is_suffix(t)) {
        if let Some(t) = tokens.pop() {
            suffixes.insert(0, t);
        }
    }
    for piece in &rest {
        suffixes.extend(piece.split_whitespace());
    }

    match tokens.as_slice() {
        [] => NameParts::default(),
        [only] => NameParts {
            last: only.to_string(),
            suffixes: suffixes.join(" "),
            ..NameParts::default()
        },
        [first, middle @ .., last] => NameParts {
            first: first.to_string(),
            middle: middle.join(" "),
            last: last.to_string(),
            suffixes: suffixes.join(" "),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(first: &str, middle: &str, last: &str, suffixes: &str) -> NameParts {
        NameParts {
            first: first.into(),
            middle: middle.into(),
            last: last.into(),
            suffixes: suffixes.into(),
        }
    }

    #[test]
    fn natural_order() {
        assert_eq!(split_name("Ann Lee"), parts("Ann", "", "Lee", ""));
        assert_eq!(split_name("John  Q.  Public Jr."), parts("John", "Q.", "Public", "Jr."));
        assert_eq!(split_name("John Public, III"), parts("John", "", "Public", "III"));
    }

    #[test]
    fn last_comma_first() {
        assert_eq!(split_name("Lee, Ann Marie"), parts("Ann", "Marie", "Lee", ""));
        assert_eq!(split_name("Public, John Q. Jr."), parts("John", "Q.", "Public", "Jr."));
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(split_name("Cher"), parts("", "", "Cher", ""));
        assert_eq!(split_name("   "), NameParts::default());
    }
}
