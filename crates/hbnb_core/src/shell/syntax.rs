//! Command line normalization and tokenizing.
//!
//! # Responsibility
//! - Rewrite `<Class>.<command>(<args>)` calls (parentheses optional) into
//!   canonical `<command> <Class> <args>` lines.
//! - Split argument strings into tokens, honoring quotes.
//!
//! # Invariants
//! - Lines that do not have the call shape are returned trimmed, otherwise
//!   untouched.
//! - A canonical line re-tokenizes to the same arguments the call carried.

use crate::storage::OrderedObject;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static METHOD_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)\s*(?:\((.*)\))?$")
        .expect("valid method call regex")
});

/// Reduces one input line to canonical `<command> <args>` form.
pub fn normalize_line(line: &str) -> String {
    let trimmed = line.trim();
    let Some(captures) = METHOD_CALL_RE.captures(trimmed) else {
        return trimmed.to_string();
    };

    let class_name = &captures[1];
    let command = &captures[2];
    let arguments = captures.get(3).map_or("", |m| m.as_str());

    // A trailing dictionary travels verbatim; only the leading args are split.
    let (plain, dictionary) = match find_unquoted(arguments, '{') {
        Some(index) => (&arguments[..index], Some(arguments[index..].trim())),
        None => (arguments, None),
    };

    let mut parts = vec![command.to_string(), class_name.to_string()];
    parts.extend(split_args(plain, true).into_iter().map(quote_if_needed));
    if let Some(dictionary) = dictionary {
        parts.push(dictionary.to_string());
    }
    parts.join(" ")
}

/// Splits `input` on whitespace (and on commas when `commas` is set).
///
/// Text between matching `"` or `'` characters forms a single token with the
/// quotes removed.
pub fn split_args(input: &str, commas: bool) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() || (commas && ch == ',') => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Byte offset of the first `target` that is not inside a quoted string.
fn find_unquoted(input: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, ch) in input.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == target => return Some(index),
            None => {}
        }
    }
    None
}

/// Splits off the first whitespace-delimited word.
pub fn split_first_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(char::is_whitespace) {
        Some(index) => (&input[..index], input[index..].trim_start()),
        None => (input, ""),
    }
}

/// Parses a `{name: value, ...}` update dictionary.
///
/// Accepts JSON as well as single-quoted keys and strings. Pairs keep the
/// order they were written in; non-string values keep their JSON text.
/// Returns `None` when the text is not an object.
pub fn parse_attribute_dictionary(text: &str) -> Option<Vec<(String, String)>> {
    let object = serde_json::from_str::<OrderedObject<Value>>(&to_json_quotes(text)).ok()?;

    Some(
        object
            .0
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect(),
    )
}

/// Rewrites single-quoted strings as double-quoted JSON strings.
///
/// Only delimiting quotes change; an apostrophe inside a double-quoted
/// string and a `"` inside a single-quoted one are kept as text.
fn to_json_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        match quote {
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                out.push('"');
            }
            None => out.push(ch),
            Some(open) if ch == open => {
                quote = None;
                out.push('"');
            }
            Some(open) if ch == '\\' => match chars.next() {
                Some('\'') if open == '\'' => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            Some(_) if ch == '"' => out.push_str("\\\""),
            Some(_) => out.push(ch),
        }
    }
    out
}

fn quote_if_needed(token: String) -> String {
    if token.is_empty() || token.contains(char::is_whitespace) {
        format!("\"{token}\"")
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_syntax_is_rewritten() {
        assert_eq!(normalize_line("User.all()"), "all User");
        assert_eq!(normalize_line("User.count()"), "count User");
        assert_eq!(normalize_line(r#"User.show("1234-abcd")"#), "show User 1234-abcd");
        assert_eq!(
            normalize_line(r#"Place.update("p1", "name", "Sea View")"#),
            r#"update Place p1 name "Sea View""#
        );
        assert_eq!(
            normalize_line("City.update('c1', 'name', 'Lyon')"),
            "update City c1 name Lyon"
        );
    }

    #[test]
    fn call_syntax_allows_missing_or_spaced_parentheses() {
        assert_eq!(normalize_line("User.all"), "all User");
        assert_eq!(normalize_line("User.count ()"), "count User");
        assert_eq!(normalize_line(r#"User.show ("u1")"#), "show User u1");
    }

    #[test]
    fn call_syntax_keeps_braces_inside_quoted_arguments() {
        assert_eq!(
            normalize_line(r#"User.update("u1", "bio", "a{b}c")"#),
            "update User u1 bio a{b}c"
        );
        assert_eq!(
            normalize_line(r#"User.update("u1", "bio", "x {y}", {"age": 3})"#),
            r#"update User u1 bio "x {y}" {"age": 3}"#
        );
    }

    #[test]
    fn call_syntax_passes_dictionary_through() {
        assert_eq!(
            normalize_line(r#"User.update("u1", {"first_name": "Ada", "age": 36})"#),
            r#"update User u1 {"first_name": "Ada", "age": 36}"#
        );
    }

    #[test]
    fn non_call_lines_are_only_trimmed() {
        assert_eq!(normalize_line("  show User 42  "), "show User 42");
        assert_eq!(
            normalize_line("update Place p1 price 3.5"),
            "update Place p1 price 3.5"
        );
        assert_eq!(normalize_line("price 3.5"), "price 3.5");
    }

    #[test]
    fn split_args_honors_quotes_and_commas() {
        assert_eq!(
            split_args(r#""a b", c,d  'e f'"#, true),
            vec!["a b", "c", "d", "e f"]
        );
        assert_eq!(split_args("a,b c", false), vec!["a,b", "c"]);
        assert_eq!(split_args(r#"name """#, false), vec!["name", ""]);
        assert!(split_args("   ", true).is_empty());
    }

    #[test]
    fn split_first_word_trims_the_rest() {
        assert_eq!(split_first_word("User  abc def"), ("User", "abc def"));
        assert_eq!(split_first_word("User"), ("User", ""));
        assert_eq!(split_first_word(""), ("", ""));
    }

    #[test]
    fn dictionary_accepts_single_quotes_and_numbers() {
        let pairs = parse_attribute_dictionary("{'name': 'Ada', 'age': 36}").unwrap();
        assert!(pairs.contains(&("name".to_string(), "Ada".to_string())));
        assert!(pairs.contains(&("age".to_string(), "36".to_string())));
        assert!(parse_attribute_dictionary("{broken").is_none());
    }

    #[test]
    fn dictionary_keeps_apostrophes_inside_strings() {
        let pairs =
            parse_attribute_dictionary(r#"{'last_name': "O'Brien", 'quote': 'say "hi"'}"#)
                .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("last_name".to_string(), "O'Brien".to_string()),
                ("quote".to_string(), "say \"hi\"".to_string()),
            ]
        );
    }

    #[test]
    fn dictionary_keeps_written_order() {
        let pairs = parse_attribute_dictionary(r#"{"zeta": "1", "alpha": "2"}"#).unwrap();
        let names: Vec<&str> = pairs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
