//! Domain input checks performed before any request is made.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // One or more 3-63 char labels, then an alphabetic TLD with optional
    // alphabetic suffixes (co.uk, com.au).
    static ref DOMAIN_REGEX: Regex = Regex::new(
        r"^(?:[a-zA-Z0-9][a-zA-Z0-9-]{1,61}[a-zA-Z0-9]\.)+[a-zA-Z]{2,}(?:\.[a-zA-Z]{2,})*$"
    )
    .unwrap();
}

fn strip_scheme(input: &str) -> &str {
    input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input)
}

/// Returns true when `input` looks like a bare domain, with or without an
/// `http://`/`https://` prefix.
pub fn validate_domain(input: &str) -> bool {
    let host = strip_scheme(input.trim()).trim_end_matches('/');
    DOMAIN_REGEX.is_match(host)
}

/// Bare lowercase host used to build request URLs.
pub fn normalize_domain(input: &str) -> String {
    strip_scheme(input.trim())
        .trim_end_matches('/')
        .to_ascii_lowercase()
}
