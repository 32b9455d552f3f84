//! Email address normalization and syntax checks.

use std::sync::OnceLock;

use regex::Regex;

/// Canonical form used for uniqueness and token derivation.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$")
            .expect("Invalid email pattern")
    })
}

/// Syntax-only validation of an already normalized address.
///
/// No DNS or deliverability check is made.
pub fn is_valid_email(normalized: &str) -> bool {
    if normalized.len() > 254 {
        return false;
    }
    let local_ok = normalized
        .split_once('@')
        .map(|(local, _)| {
            !local.is_empty()
                && local.len() <= 64
                && !local.starts_with('.')
                && !local.ends_with('.')
                && !local.contains("..")
        })
        .unwrap_or(false);
    local_ok && email_pattern().is_match(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
        assert!(is_valid_email("o'brien@example.ie"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice@@example.com"));
        assert!(!is_valid_email(".alice@example.com"));
        assert!(!is_valid_email("al..ice@example.com"));
        assert!(!is_valid_email("alice smith@example.com"));
        assert!(!is_valid_email("alice@-example.com"));
    }
}
