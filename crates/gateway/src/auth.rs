//! Shared-secret authentication for webhook callers.

use subtle::ConstantTimeEq;

/// Check an `Authorization` header value against the configured secret.
///
/// Accepts `Bearer <secret>` (prefix case-insensitive) or the bare secret.
/// Runs of whitespace inside the token collapse to one space before
/// comparing. A missing header or an unset secret always rejects.
pub fn is_authorized(header: Option<&str>, secret: Option<&str>) -> bool {
    let (Some(header), Some(secret)) = (header, secret) else {
        return false;
    };
    if secret.is_empty() {
        return false;
    }
    let candidate = normalize_whitespace(strip_bearer(header.trim()));
    constant_time_eq(&candidate, secret)
}

fn strip_bearer(value: &str) -> &str {
    const PREFIX: &str = "bearer ";
    match value.get(..PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PREFIX) => &value[PREFIX.len()..],
        _ => value,
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Length mismatch returns early; equal-length inputs are compared in
/// constant time over every byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cr3t-token";

    #[test]
    fn bearer_and_bare_forms_accepted() {
        assert!(is_authorized(Some("Bearer s3cr3t-token"), Some(SECRET)));
        assert!(is_authorized(Some("bearer s3cr3t-token"), Some(SECRET)));
        assert!(is_authorized(Some("BEARER   s3cr3t-token  "), Some(SECRET)));
        assert!(is_authorized(Some("s3cr3t-token"), Some(SECRET)));
    }

    #[test]
    fn wrong_or_missing_credentials_rejected() {
        assert!(!is_authorized(Some("Bearer s3cr3t-tokeN"), Some(SECRET)));
        assert!(!is_authorized(Some("Bearer s3cr3t"), Some(SECRET)));
        assert!(!is_authorized(Some(""), Some(SECRET)));
        assert!(!is_authorized(None, Some(SECRET)));
    }

    #[test]
    fn unset_secret_fails_closed() {
        assert!(!is_authorized(Some("Bearer anything"), None));
        assert!(!is_authorized(Some(""), Some("")));
    }

    #[test]
    fn internal_whitespace_is_collapsed() {
        assert!(is_authorized(Some("Bearer two  words"), Some("two words")));
        assert!(!is_authorized(Some("Bearer twowords"), Some("two words")));
    }

    #[test]
    fn constant_time_eq_requires_equal_length() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
