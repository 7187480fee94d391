//! Best-effort repair of model-emitted JSON.
//!
//! Covers the common failure modes seen in deferred citation blocks:
//! markdown code fences around the payload, invalid backslash escapes
//! inside string literals, trailing commas, and truncated output missing
//! its closing brackets. One pass, string-literal-aware throughout, so
//! legitimate content is never touched.

/// Repair a JSON payload enough for a second parse attempt.
///
/// Purely syntactic; if the payload is beyond this kind of repair the
/// caller surfaces both parse errors and moves on.
pub fn repair_json(payload: &str) -> String {
    let text = strip_code_fences(payload);
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut open_stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if c == '\\' {
                match chars.get(i + 1) {
                    Some(next) if is_valid_escape(&chars, i + 1) => {
                        out.push('\\');
                        out.push(*next);
                        i += 2;
                        continue;
                    }
                    Some(_) => {
                        // Invalid escape: drop the backslash, keep the
                        // character, and reconsider it from the top.
                        i += 1;
                        continue;
                    }
                    None => {
                        i += 1;
                        continue;
                    }
                }
            }
            if c == '"' {
                in_string = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                open_stack.push('}');
                out.push(c);
            }
            '[' => {
                open_stack.push(']');
                out.push(c);
            }
            '}' | ']' => {
                if open_stack.last() == Some(&c) {
                    open_stack.pop();
                }
                out.push(c);
            }
            ',' => {
                // Trailing comma: swallow it when the next meaningful
                // character closes a container.
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if !matches!(chars.get(j), Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    // Truncated output: close the string, then every open container.
    if in_string {
        out.push('"');
    }
    while let Some(closer) = open_stack.pop() {
        out.push(closer);
    }
    out
}

/// The eight valid JSON escapes, plus well-formed `\uXXXX`.
fn is_valid_escape(chars: &[char], escape_at: usize) -> bool {
    match chars.get(escape_at) {
        Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => true,
        Some('u') => chars
            .get(escape_at + 1..escape_at + 5)
            .is_some_and(|hex| hex.iter().all(|c| c.is_ascii_hexdigit())),
        _ => false,
    }
}

fn strip_code_fences(payload: &str) -> String {
    let mut text = payload.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the fence and its info string ("json", typically).
        text = rest.split_once('\n').map_or("", |(_, body)| body);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parses(text: &str) -> bool {
        serde_json::from_str::<Value>(text).is_ok()
    }

    #[test]
    fn test_strips_code_fences() {
        let payload = "```json\n[{\"id\": 1}]\n```";
        let repaired = repair_json(payload);
        assert_eq!(repaired, "[{\"id\": 1}]");
        assert!(parses(&repaired));
    }

    #[test]
    fn test_drops_invalid_escapes() {
        let payload = r#"{"full_phrase": "a \% share"}"#;
        let repaired = repair_json(payload);
        assert_eq!(repaired, r#"{"full_phrase": "a % share"}"#);
        assert!(parses(&repaired));
    }

    #[test]
    fn test_keeps_valid_escapes() {
        let payload = r#"{"a": "line\nbreak é \"quoted\" back\\slash"}"#;
        assert_eq!(repair_json(payload), payload);
    }

    #[test]
    fn test_malformed_unicode_escape_loses_backslash() {
        let payload = r#"{"a": "bad \uZZ94 escape"}"#;
        let repaired = repair_json(payload);
        assert_eq!(repaired, r#"{"a": "bad uZZ94 escape"}"#);
        assert!(parses(&repaired));
    }

    #[test]
    fn test_removes_trailing_commas() {
        let payload = r#"[{"id": 1,}, {"id": 2},]"#;
        let repaired = repair_json(payload);
        assert_eq!(repaired, r#"[{"id": 1}, {"id": 2}]"#);
        assert!(parses(&repaired));
    }

    #[test]
    fn test_commas_inside_strings_survive() {
        let payload = r#"{"a": "one, two, }"}"#;
        assert_eq!(repair_json(payload), payload);
    }

    #[test]
    fn test_appends_missing_closers() {
        let payload = r#"[{"id": 1, "full_phrase": "cut off"#;
        let repaired = repair_json(payload);
        assert!(parses(&repaired), "repaired: {}", repaired);
    }

    #[test]
    fn test_truncated_inside_string() {
        let payload = r#"[{"full_phrase": "ends mid-phra"#;
        let repaired = repair_json(payload);
        assert!(parses(&repaired), "repaired: {}", repaired);
    }

    #[test]
    fn test_valid_json_untouched() {
        let payload = r#"{"id": 1, "line_ids": [1, 2, 3]}"#;
        assert_eq!(repair_json(payload), payload);
    }
}
