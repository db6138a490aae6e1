//! Comment-tolerant JSON reading.
//!
//! Manifests are `.jsonc`: standard JSON plus `//` line comments,
//! `/* */` block comments, and trailing commas. This module strips those
//! extensions in a single pass and hands the result to `serde_json`, so
//! the rest of the codebase only ever sees plain JSON.

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Strip `//` and `/* */` comments and trailing commas from JSONC text.
///
/// String literals are respected: comment markers inside quoted strings
/// are left untouched, as are escaped quotes. Comments are replaced with
/// spaces (newlines preserved) so serde_json error positions still point
/// at the right line.
pub fn strip_comments(input: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        InString,
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '"' => {
                    state = State::InString;
                    out.push(c);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::LineComment;
                        out.push_str("  ");
                    }
                    Some('*') => {
                        chars.next();
                        state = State::BlockComment;
                        out.push_str("  ");
                    }
                    _ => out.push(c),
                },
                _ => out.push(c),
            },
            State::InString => {
                out.push(c);
                match c {
                    '\\' => {
                        // Escaped character, copy it through verbatim
                        if let Some(next) = chars.next() {
                            out.push(next);
                        }
                    }
                    '"' => state = State::Normal,
                    _ => {}
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Normal;
                    out.push_str("  ");
                } else if c == '\n' {
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
        }
    }

    remove_trailing_commas(&out)
}

/// Remove commas that directly precede a closing `}` or `]`.
fn remove_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Look ahead past whitespace for a closing bracket
                let mut lookahead = chars.clone();
                let mut skipped = String::new();
                let mut closes = false;
                while let Some(&n) = lookahead.peek() {
                    if n.is_whitespace() {
                        skipped.push(n);
                        lookahead.next();
                    } else {
                        closes = n == '}' || n == ']';
                        break;
                    }
                }
                if closes {
                    // Drop the comma, keep the whitespace
                    out.push_str(&skipped);
                    for _ in 0..skipped.chars().count() {
                        chars.next();
                    }
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Parse a JSONC string into a deserializable value.
pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T> {
    let stripped = strip_comments(input);
    Ok(serde_json::from_str(&stripped)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn strips_line_comments() {
        let input = "{\n  // the app list\n  \"apps\": []\n}";
        let v: Value = from_str(input).unwrap();
        assert_eq!(v["apps"], serde_json::json!([]));
    }

    #[test]
    fn strips_block_comments() {
        let input = "{ /* inline */ \"name\": \"dev\" /* trailing */ }";
        let v: Value = from_str(input).unwrap();
        assert_eq!(v["name"], "dev");
    }

    #[test]
    fn preserves_comment_markers_inside_strings() {
        let input = r#"{ "url": "https://example.com", "glob": "a/*b*/c" }"#;
        let v: Value = from_str(input).unwrap();
        assert_eq!(v["url"], "https://example.com");
        assert_eq!(v["glob"], "a/*b*/c");
    }

    #[test]
    fn preserves_escaped_quotes_in_strings() {
        let input = r#"{ "msg": "say \"hi\" // not a comment" }"#;
        let v: Value = from_str(input).unwrap();
        assert_eq!(v["msg"], "say \"hi\" // not a comment");
    }

    #[test]
    fn tolerates_trailing_commas() {
        let input = "{ \"items\": [1, 2, 3,], \"last\": true, }";
        let v: Value = from_str(input).unwrap();
        assert_eq!(v["items"], serde_json::json!([1, 2, 3]));
        assert_eq!(v["last"], true);
    }

    #[test]
    fn keeps_line_numbers_stable_for_errors() {
        // The bad token is on line 3 both before and after stripping
        let input = "{\n  // comment line\n  \"x\": nope\n}";
        let err = from_str::<Value>(input).unwrap_err();
        assert!(err.to_string().contains("line 3"), "got: {err}");
    }

    #[test]
    fn plain_json_passes_through_unchanged() {
        let input = r#"{"a": 1, "b": [true, null]}"#;
        assert_eq!(strip_comments(input), input);
    }
}
