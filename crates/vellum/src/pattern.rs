//! Wildcard matching for hook patterns and event names.
//!
//! `*` spans any characters, including path separators, so `pages.*` and
//! `admin::*` behave the way composer registrations expect.

use regex::Regex;

/// Compiles a `*` wildcard pattern into an anchored regex.
pub(crate) fn wildcard(pattern: &str) -> Regex {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$")).expect("escaped pattern is always a valid regex")
}

/// Returns true if `value` matches `pattern` exactly or via `*` wildcards.
pub(crate) fn matches(pattern: &str, value: &str) -> bool {
    pattern == value || wildcard(pattern).is_match(value)
}
