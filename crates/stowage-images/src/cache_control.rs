//! Cache-Control header parsing.

use std::time::Duration;

/// Extract `max-age` from a Cache-Control value.
///
/// Directive values may be quoted strings containing commas. Returns `None`
/// when the directive is missing, its value is not a plain number of seconds,
/// or the header is malformed.
pub fn parse_max_age(header: &str) -> Option<Duration> {
    let mut max_age = None;

    for directive in split_directives(header)? {
        let directive = directive.trim();
        if directive.is_empty() {
            continue;
        }

        let (name, value) = match directive.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (directive, None),
        };
        if !is_token(name) {
            return None;
        }
        if let Some(value) = value {
            if !is_token(value) && !is_quoted_string(value) {
                return None;
            }
        }

        if name.eq_ignore_ascii_case("max-age") {
            let seconds = value?.parse::<u64>().ok()?;
            max_age = Some(Duration::from_secs(seconds));
        }
    }

    max_age
}

/// Split on commas outside quoted strings. `None` on an unterminated quote.
fn split_directives(header: &str) -> Option<Vec<&str>> {
    let mut directives = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, b) in header.bytes().enumerate() {
        if in_quotes {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_quotes = true,
            b',' => {
                directives.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return None;
    }
    directives.push(&header[start..]);
    Some(directives)
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

fn is_quoted_string(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("max-age=3600"), Some(Duration::from_secs(3600)));
        assert_eq!(
            parse_max_age("public, max-age=31536000, immutable"),
            Some(Duration::from_secs(31_536_000))
        );
        assert_eq!(parse_max_age("Max-Age = 60"), Some(Duration::from_secs(60)));
        assert_eq!(parse_max_age("max-age=0"), Some(Duration::ZERO));
        assert_eq!(
            parse_max_age("private=\"Set-Cookie, X-Token\", max-age=60"),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            parse_max_age("no-cache=\"a, \\\"b\\\", c\", max-age=120, must-revalidate"),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_parse_max_age_absent() {
        assert_eq!(parse_max_age(""), None);
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("s-maxage=60"), None);
    }

    #[test]
    fn test_parse_max_age_unparsable() {
        assert_eq!(parse_max_age("max-age"), None);
        assert_eq!(parse_max_age("max-age=soon"), None);
        assert_eq!(parse_max_age("max-age=-5"), None);
        assert_eq!(parse_max_age("max-age=\"60\""), None);
        assert_eq!(parse_max_age("public, {broken}, max-age=60"), None);
        assert_eq!(parse_max_age("private=\"unterminated, max-age=60"), None);
        assert_eq!(parse_max_age("private=a b, max-age=60"), None);
    }
}
