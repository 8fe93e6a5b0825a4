//! Object key normalization.
//!
//! Callers may use either path separator; providers only understand `/`.

use std::borrow::Cow;

/// Replace backslash separators with forward slashes.
///
/// Applying it twice yields the same key as applying it once.
pub fn encode_key(key: &str) -> Cow<'_, str> {
    if key.contains('\\') {
        Cow::Owned(key.replace('\\', "/"))
    } else {
        Cow::Borrowed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_replaces_backslashes() {
        assert_eq!(encode_key("images\\2024\\cat.png"), "images/2024/cat.png");
        assert_eq!(encode_key("\\leading"), "/leading");
        assert_eq!(encode_key("mixed/sep\\arators"), "mixed/sep/arators");
    }

    #[test]
    fn test_encode_key_borrows_clean_keys() {
        assert!(matches!(encode_key("already/clean.txt"), Cow::Borrowed(_)));
        assert_eq!(encode_key(""), "");
    }

    #[test]
    fn test_encode_key_is_idempotent() {
        for key in [
            "a\\b\\c",
            "\\\\double",
            "plain.txt",
            "trailing\\",
            "unicode\\\u{e9}t\u{e9}.jpg",
        ] {
            let once = encode_key(key).into_owned();
            let twice = encode_key(&once).into_owned();
            assert_eq!(once, twice, "key {:?}", key);
            assert!(!once.contains('\\'));
        }
    }
}
