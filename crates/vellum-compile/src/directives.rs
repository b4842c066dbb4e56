//! Directive scanning and expansion.
//!
//! Expansion is a single pass over the template source. Occurrences of
//! `@name` are looked up in the directive registry; registered names are
//! replaced by their handler's output, unregistered names pass through
//! untouched, and `@@name` escapes to a literal `@name`. Arguments are the
//! text inside balanced parentheses immediately after the name (horizontal
//! whitespace allowed before the opening parenthesis).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::DirectiveHandler;
use crate::error::CompileError;

/// Matches `@name` and the `@@name` verbatim escape.
static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(@?)([A-Za-z_][A-Za-z0-9_]*)").expect("directive pattern is valid"));

/// Valid directive names: what the scanner can actually match.
static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern is valid"));

/// The context variable a conditional directive's branch tests at render
/// time. Prefixed so it cannot collide with ordinary view data.
pub(crate) fn condition_slot(name: &str) -> String {
    format!("__vellum_if_{name}")
}

pub(crate) fn validate_name(name: &str) -> Result<(), CompileError> {
    if NAME.is_match(name) {
        Ok(())
    } else {
        Err(CompileError::InvalidDirectiveName(name.to_string()))
    }
}

/// Expands every registered directive occurrence in `source`.
pub(crate) fn expand(
    source: &str,
    directives: &HashMap<String, DirectiveHandler>,
) -> Result<String, CompileError> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    while let Some(caps) = DIRECTIVE.captures_at(source, cursor) {
        let whole = caps.get(0).expect("group 0 always present");
        let name = caps.get(2).expect("name group always present").as_str();
        out.push_str(&source[cursor..whole.start()]);

        if &caps[1] == "@" {
            // `@@name` renders a literal `@name`.
            out.push('@');
            out.push_str(name);
            cursor = whole.end();
            continue;
        }

        let handler = match directives.get(name) {
            Some(handler) => handler.clone(),
            None => {
                out.push_str(whole.as_str());
                cursor = whole.end();
                continue;
            }
        };

        let (arguments, next) = parse_arguments(source, whole.end(), name)?;
        out.push_str(&handler(arguments.trim()));
        cursor = next;
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Consumes an optional balanced-parenthesis argument list starting at
/// `after_name`. Returns the inner text and the position past the closing
/// parenthesis, or an empty string and `after_name` when no list follows.
fn parse_arguments(
    source: &str,
    after_name: usize,
    name: &str,
) -> Result<(String, usize), CompileError> {
    let bytes = source.as_bytes();
    let mut lookahead = after_name;
    while lookahead < bytes.len() && (bytes[lookahead] == b' ' || bytes[lookahead] == b'\t') {
        lookahead += 1;
    }
    if lookahead >= bytes.len() || bytes[lookahead] != b'(' {
        return Ok((String::new(), after_name));
    }

    let open = lookahead;
    let mut depth = 0usize;
    for (offset, ch) in source[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let arguments = source[open + 1..open + offset].to_string();
                    return Ok((arguments, open + offset + 1));
                }
            }
            _ => {}
        }
    }

    Err(CompileError::UnbalancedDirective {
        directive: name.to_string(),
        line: line_of(source, open),
    })
}

fn line_of(source: &str, position: usize) -> usize {
    source[..position].bytes().filter(|b| *b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn registry(entries: &[(&str, fn(&str) -> String)]) -> HashMap<String, DirectiveHandler> {
        entries
            .iter()
            .map(|(name, handler)| {
                let handler = *handler;
                (
                    name.to_string(),
                    Rc::new(move |args: &str| handler(args)) as DirectiveHandler,
                )
            })
            .collect()
    }

    #[test]
    fn test_expand_substitutes_registered_directive() {
        let directives = registry(&[("upper", |args| format!("{{{{ {args} | upper }}}}"))]);
        let out = expand("Hello @upper(name)!", &directives).unwrap();
        assert_eq!(out, "Hello {{ name | upper }}!");
    }

    #[test]
    fn test_expand_without_arguments() {
        let directives = registry(&[("rule", |_| "----".to_string())]);
        let out = expand("above\n@rule\nbelow", &directives).unwrap();
        assert_eq!(out, "above\n----\nbelow");
    }

    #[test]
    fn test_expand_nested_parentheses() {
        let directives = registry(&[("call", |args| format!("[{args}]"))]);
        let out = expand("@call(outer(inner, 2))", &directives).unwrap();
        assert_eq!(out, "[outer(inner, 2)]");
    }

    #[test]
    fn test_expand_allows_space_before_arguments() {
        let directives = registry(&[("call", |args| format!("[{args}]"))]);
        let out = expand("@call (x)", &directives).unwrap();
        assert_eq!(out, "[x]");
    }

    #[test]
    fn test_unregistered_directive_passes_through() {
        let directives = registry(&[]);
        let out = expand("keep @unknown(args) as-is", &directives).unwrap();
        assert_eq!(out, "keep @unknown(args) as-is");
    }

    #[test]
    fn test_double_at_escapes() {
        let directives = registry(&[("upper", |_| "SHOULD NOT APPEAR".to_string())]);
        let out = expand("literal @@upper(name)", &directives).unwrap();
        assert_eq!(out, "literal @upper(name)");
    }

    #[test]
    fn test_email_addresses_untouched() {
        let directives = registry(&[]);
        let out = expand("mail me at someone@example.com", &directives).unwrap();
        assert_eq!(out, "mail me at someone@example.com");
    }

    #[test]
    fn test_unbalanced_arguments_report_name_and_line() {
        let directives = registry(&[("call", |args| args.to_string())]);
        let err = expand("line one\nline two @call(never closed", &directives).unwrap_err();
        match err {
            CompileError::UnbalancedDirective { directive, line } => {
                assert_eq!(directive, "call");
                assert_eq!(line, 2);
            }
            other => panic!("expected unbalanced directive error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("auth").is_ok());
        assert!(validate_name("end_auth2").is_ok());
        assert!(validate_name("with-dash").is_err());
        assert!(validate_name("with space").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("1leading").is_err());
    }

    #[test]
    fn test_condition_slot_is_prefixed() {
        assert_eq!(condition_slot("auth"), "__vellum_if_auth");
    }
}
