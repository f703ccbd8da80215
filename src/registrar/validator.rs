//! Candidate-name validation rules.
//!
//! Pure, no I/O. Rules are checked in order and the first failure wins, so
//! the reported reason is deterministic for any given input.

/// Longest name the registrar accepts.
pub const MAX_NAME_LEN: usize = 32;

/// Check a candidate name against the registrar's rules.
///
/// Accepted names are 1..=32 characters of lowercase ascii letters, digits,
/// and hyphens, with no leading, trailing, or doubled hyphen.
pub fn validate(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("name must be at most {MAX_NAME_LEN} characters"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '-'))
    {
        return Err(format!(
            "name may only contain lowercase letters, digits, and hyphens (found {bad:?})"
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("name must not start or end with a hyphen".to_string());
    }
    if name.contains("--") {
        return Err("name must not contain consecutive hyphens".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_names() {
        for name in ["a", "a1", "my-domain", "x-2-y", "abc123", &"z".repeat(32)] {
            assert!(validate(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_rejects_empty() {
        let reason = validate("").unwrap_err();
        assert!(!reason.is_empty());
    }

    #[test]
    fn test_rejects_over_length() {
        let name = "a".repeat(33);
        let reason = validate(&name).unwrap_err();
        assert!(reason.contains("32"));
    }

    #[test]
    fn test_rejects_bad_characters() {
        for name in ["Hello", "name_1", "naïve", "a b", "dot.com"] {
            let reason = validate(name).unwrap_err();
            assert!(!reason.is_empty(), "{name} should be rejected");
        }
    }

    #[test]
    fn test_rejects_edge_hyphens() {
        assert!(validate("-abc").is_err());
        assert!(validate("abc-").is_err());
        assert!(validate("-").is_err());
    }

    #[test]
    fn test_rejects_doubled_hyphen() {
        assert!(validate("a--b").is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 20 characters but 40 bytes: within the length limit, so the
        // character-set rule is the one that rejects it.
        let name = "é".repeat(20);
        let reason = validate(&name).unwrap_err();
        assert!(reason.contains("lowercase letters"), "got: {reason}");
    }

    #[test]
    fn test_rule_order_first_failure_wins() {
        // 33 chars of invalid characters: the length rule reports first.
        let name = "A".repeat(33);
        let reason = validate(&name).unwrap_err();
        assert!(reason.contains("32 characters"));
    }
}
