/*
 * This file is part of Wicard.
 *
 * Copyright (C) 2025 Wicard contributors
 *
 * Wicard is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wicard is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wicard. If not, see <https://www.gnu.org/licenses/>.
 */

//! Tolerant field extraction from loosely JSON-shaped text.
//!
//! These are best-effort string scans, not a validating parser: they only
//! understand the narrow shapes this service emits and consumes (catalog
//! documents, request lines, control-socket replies). Malformed or absent
//! structure yields "not found" rather than an error, and nothing here
//! panics on arbitrary input.

/// Byte offset just past the colon following the first `"key"` occurrence.
fn value_start(content: &str, key: &str) -> Option<usize> {
    let needle = format!("\"{}\"", key);
    let key_pos = content.find(&needle)?;
    let after = key_pos + needle.len();
    let colon = content[after..].find(':')?;
    Some(after + colon + 1)
}

/// Extract a scalar string value: either a quoted string (with backslash
/// escapes) or a bare token terminated by `,`, `}`, `]` or whitespace.
pub fn extract_string_field(content: &str, key: &str) -> Option<String> {
    let start = value_start(content, key)?;
    let rest = content[start..].trim_start();
    let mut chars = rest.chars();
    match chars.next()? {
        '"' => {
            let mut out = String::new();
            let mut escape = false;
            for ch in chars {
                if escape {
                    match ch {
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        // Unknown escapes are kept verbatim
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                    escape = false;
                } else if ch == '\\' {
                    escape = true;
                } else if ch == '"' {
                    return Some(out);
                } else {
                    out.push(ch);
                }
            }
            // Unterminated string
            None
        }
        // The value is structured, not a scalar
        '{' | '[' => None,
        _ => {
            let token: String = rest
                .chars()
                .take_while(|c| !c.is_whitespace() && !matches!(c, ',' | '}' | ']'))
                .collect();
            if token.is_empty() {
                None
            } else {
                Some(token)
            }
        }
    }
}

pub fn extract_int_field(content: &str, key: &str) -> Option<i64> {
    extract_string_field(content, key)?.trim().parse::<i64>().ok()
}

pub fn extract_bool_field(content: &str, key: &str) -> Option<bool> {
    match extract_string_field(content, key)?.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Extract the brace-delimited object substrings inside the first `[...]`
/// that follows `"key":`. String quoting/escaping and nested braces are
/// tracked so that nested objects are not mistaken for array boundaries.
pub fn extract_array_objects(content: &str, key: &str) -> Vec<String> {
    let mut objects = Vec::new();
    let Some(start) = value_start(content, key) else {
        return objects;
    };
    let Some(bracket) = content[start..].find('[') else {
        return objects;
    };

    let bytes = content.as_bytes();
    let mut in_string = false;
    let mut escape = false;
    let mut depth = 0usize;
    let mut obj_start: Option<usize> = None;

    for pos in (start + bracket + 1)..bytes.len() {
        let ch = bytes[pos];
        if in_string {
            if escape {
                escape = false;
            } else if ch == b'\\' {
                escape = true;
            } else if ch == b'"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    obj_start = Some(pos);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = obj_start.take() {
                            objects.push(content[s..=pos].to_string());
                        }
                    }
                }
            }
            b']' if depth == 0 => break,
            _ => {}
        }
    }
    objects
}

/// Extract the first full brace-delimited object following `"key":`, with
/// the same depth/escape tracking as [`extract_array_objects`].
pub fn extract_object_field(content: &str, key: &str) -> Option<String> {
    let start = value_start(content, key)?;
    let brace = content[start..].find('{')?;

    let bytes = content.as_bytes();
    let mut in_string = false;
    let mut escape = false;
    let mut depth = 0usize;
    let mut obj_start: Option<usize> = None;

    for pos in (start + brace)..bytes.len() {
        let ch = bytes[pos];
        if in_string {
            if escape {
                escape = false;
            } else if ch == b'\\' {
                escape = true;
            } else if ch == b'"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    obj_start = Some(pos);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = obj_start {
                            return Some(content[s..=pos].to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

pub fn json_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_string_field_quoted() {
        let content = r#"{"type":"wicard.cards.request","action":"set"}"#;
        assert_eq!(extract_string_field(content, "type").as_deref(), Some("wicard.cards.request"));
        assert_eq!(extract_string_field(content, "action").as_deref(), Some("set"));
    }

    #[test]
    fn test_extract_string_field_bare_token() {
        let content = r#"{"phy_index": 3, "ok": true}"#;
        assert_eq!(extract_string_field(content, "phy_index").as_deref(), Some("3"));
        assert_eq!(extract_string_field(content, "ok").as_deref(), Some("true"));
    }

    #[test]
    fn test_extract_string_field_escapes() {
        let content = r#"{"name":"a \"quoted\" name\twith\\stuff"}"#;
        assert_eq!(
            extract_string_field(content, "name").as_deref(),
            Some("a \"quoted\" name\twith\\stuff")
        );
    }

    #[test]
    fn test_extract_string_field_unknown_escape_kept() {
        let content = r#"{"name":"a\qb"}"#;
        assert_eq!(extract_string_field(content, "name").as_deref(), Some("a\\qb"));
    }

    #[test]
    fn test_extract_string_field_missing_or_malformed() {
        assert_eq!(extract_string_field("{}", "name"), None);
        assert_eq!(extract_string_field(r#"{"name"}"#, "name"), None);
        assert_eq!(extract_string_field(r#"{"name":"unterminated"#, "name"), None);
        // Structured values are not scalars
        assert_eq!(extract_string_field(r#"{"name":{"a":1}}"#, "name"), None);
        assert_eq!(extract_string_field(r#"{"name":[1,2]}"#, "name"), None);
    }

    #[test]
    fn test_extract_string_field_empty_string() {
        assert_eq!(extract_string_field(r#"{"name":""}"#, "name").as_deref(), Some(""));
    }

    #[test]
    fn test_extract_int_field() {
        let content = r#"{"frequency_mhz": 5800, "mcs_index": "7", "bad": "x"}"#;
        assert_eq!(extract_int_field(content, "frequency_mhz"), Some(5800));
        assert_eq!(extract_int_field(content, "mcs_index"), Some(7));
        assert_eq!(extract_int_field(content, "bad"), None);
        assert_eq!(extract_int_field(content, "missing"), None);
    }

    #[test]
    fn test_extract_int_field_negative() {
        assert_eq!(extract_int_field(r#"{"v":-12}"#, "v"), Some(-12));
    }

    #[test]
    fn test_extract_bool_field() {
        let content = r#"{"ok":true,"bad":"yes","off":false}"#;
        assert_eq!(extract_bool_field(content, "ok"), Some(true));
        assert_eq!(extract_bool_field(content, "off"), Some(false));
        assert_eq!(extract_bool_field(content, "bad"), None);
    }

    #[test]
    fn test_extract_array_objects_basic() {
        let content = r#"{"cards":[{"a":1},{"b":2},{"c":3}]}"#;
        let objects = extract_array_objects(content, "cards");
        assert_eq!(objects, vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn test_extract_array_objects_nested_braces() {
        let content = r#"{"cards":[{"levels_mw":{"high":1000}},{"x":{"y":{"z":1}}}]}"#;
        let objects = extract_array_objects(content, "cards");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0], r#"{"levels_mw":{"high":1000}}"#);
        assert_eq!(objects[1], r#"{"x":{"y":{"z":1}}}"#);
    }

    #[test]
    fn test_extract_array_objects_braces_in_strings() {
        let content = r#"{"cards":[{"name":"curly } brace ] and \" quote"}]}"#;
        let objects = extract_array_objects(content, "cards");
        assert_eq!(objects.len(), 1);
        assert!(objects[0].contains("curly"));
    }

    #[test]
    fn test_extract_array_objects_absent() {
        assert!(extract_array_objects("{}", "cards").is_empty());
        assert!(extract_array_objects(r#"{"cards":}"#, "cards").is_empty());
        assert!(extract_array_objects(r#"{"cards":[]}"#, "cards").is_empty());
    }

    #[test]
    fn test_extract_object_field() {
        let content = r#"{"levels_mw": {"lowest": 25, "nested": {"x": 1}}, "after": 2}"#;
        let object = extract_object_field(content, "levels_mw").unwrap();
        assert_eq!(object, r#"{"lowest": 25, "nested": {"x": 1}}"#);
        assert_eq!(extract_object_field(content, "missing"), None);
    }

    #[test]
    fn test_extract_object_field_unclosed() {
        assert_eq!(extract_object_field(r#"{"o":{"a":1"#, "o"), None);
    }

    #[test]
    fn test_json_escape() {
        assert_eq!(json_escape(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(json_escape("line\nbreak\ttab\r"), "line\\nbreak\\ttab\\r");
        assert_eq!(json_escape("plain"), "plain");
    }
}
