//! Display name and auction name rules.

/// Longest accepted name, in characters.
pub const MAX_NAME_LEN: usize = 16;

/// Returns whether `name` is 1 to 16 ASCII letters, digits, `_` or `-`.
pub fn is_valid_name(name: &str) -> bool {
    (1..=MAX_NAME_LEN).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["a", "alice", "bob_42", "item-1", "ABCDEFGHIJKLMNOP"] {
            assert!(is_valid_name(name), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "ABCDEFGHIJKLMNOPQ", "has space", "émile", "semi;colon", "dot.name"] {
            assert!(!is_valid_name(name), "{} should be invalid", name);
        }
    }
}
