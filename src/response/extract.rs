//! Best-effort recovery of a JSON document embedded in agent text.
//!
//! Agents frequently answer with prose wrapped around a JSON object, or with
//! a fenced code block. [`extract_json`] tries, in order:
//!
//! 1. the whole (trimmed) string as a JSON object or array,
//! 2. the first fenced code block (```` ```json ```` or a bare fence),
//! 3. the largest balanced `{ ... }` span.
//!
//! The last step is a heuristic. With several sibling objects in free text it
//! picks the longest one that parses, which is not necessarily the one the
//! agent meant. Callers must treat `None` as "this is plain text", never as an
//! error. [`parse_json_document`] stops after step 2, for callers that must
//! not discard prose around an embedded object.

use serde_json::Value;

/// Upper bound on `{` positions examined by the brace-span scan.
const MAX_SPAN_STARTS: usize = 64;

/// Texts longer than this skip the brace-span scan entirely.
const MAX_SCAN_BYTES: usize = 256 * 1024;

/// Extract a structured JSON value (object or array) from `text`.
pub fn extract_json(text: &str) -> Option<Value> {
    parse_json_document(text).or_else(|| largest_brace_span(text))
}

/// Parse `text` as a JSON object or array, optionally wrapped in a code fence.
pub fn parse_json_document(text: &str) -> Option<Value> {
    whole_document(text).or_else(|| fenced_block(text))
}

fn whole_document(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let looks_structured = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if !looks_structured {
        return None;
    }
    parse_structured(trimmed)
}

fn fenced_block(text: &str) -> Option<Value> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let info = after_fence[..body_start].trim();
    if !info.is_empty() && !info.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after_fence[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    whole_document(&body[..close])
}

fn largest_brace_span(text: &str) -> Option<Value> {
    if text.len() > MAX_SCAN_BYTES {
        return None;
    }

    let mut spans: Vec<(usize, usize)> = text
        .char_indices()
        .filter(|(_, c)| *c == '{')
        .take(MAX_SPAN_STARTS)
        .filter_map(|(start, _)| matching_close(text, start).map(|end| (start, end)))
        .collect();

    // Longest first; earlier start wins a tie.
    spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    spans
        .into_iter()
        .find_map(|(start, end)| parse_structured(&text[start..end]))
}

/// Byte offset one past the `}` closing the `{` at `start`, if any.
///
/// Braces inside JSON string literals are ignored.
fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_structured(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_document() {
        assert_eq!(extract_json(" {\"a\": 1} "), Some(json!({"a": 1})));
        assert_eq!(extract_json("[1, 2]"), Some(json!([1, 2])));
    }

    #[test]
    fn test_scalars_are_not_structured() {
        assert_eq!(extract_json("42"), None);
        assert_eq!(extract_json("\"quoted\""), None);
        assert_eq!(extract_json("not json"), None);
        assert_eq!(extract_json(""), None);
    }

    #[test]
    fn test_fenced_block() {
        let text = "Here you go:\n```json\n{\"chart_type\": \"pie\"}\n```\nThanks";
        assert_eq!(extract_json(text), Some(json!({"chart_type": "pie"})));

        let bare = "```\n[{\"x\": 1}]\n```";
        assert_eq!(extract_json(bare), Some(json!([{"x": 1}])));
    }

    #[test]
    fn test_fenced_non_json_block_falls_through_to_span() {
        let text = "```python\nprint('hi')\n```\nresult: {\"ok\": true}";
        assert_eq!(extract_json(text), Some(json!({"ok": true})));
    }

    #[test]
    fn test_brace_span_in_prose() {
        let text = "분석 결과는 다음과 같습니다 {\"total_count\": 10, \"nested\": {\"a\": \"}\"}} 끝.";
        assert_eq!(
            extract_json(text),
            Some(json!({"total_count": 10, "nested": {"a": "}"}}))
        );
    }

    #[test]
    fn test_brace_span_prefers_longest() {
        let text = "first {\"a\": 1} then {\"bbbbbb\": 2222222}";
        assert_eq!(extract_json(text), Some(json!({"bbbbbb": 2_222_222})));
    }

    #[test]
    fn test_document_parse_skips_span_scan() {
        let prose = "분석 결과는 {\"answer\": 42} 입니다";
        assert_eq!(parse_json_document(prose), None);
        assert_eq!(extract_json(prose), Some(json!({"answer": 42})));

        let fenced = "```json\n{\"answer\": 42}\n```";
        assert_eq!(parse_json_document(fenced), Some(json!({"answer": 42})));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(extract_json("{ never closed"), None);
        assert_eq!(extract_json("} {"), None);
    }
}
