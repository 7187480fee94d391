/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! The deferred-JSON citation dialect.
//!
//! Instead of inline tags, the model emits lightweight `[N]` markers in
//! its prose and one trailing JSON block carrying all citation metadata,
//! delimited by [`CITATION_DATA_START`]/[`CITATION_DATA_END`]. The block
//! may use full field names or single-letter shorthand, may be grouped by
//! attachment, and is frequently broken JSON; a repair pass gets one
//! retry before the dialect gives up and reports a structured failure.

pub mod repair;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use citex_core::{Citation, PageLocator, Timestamps};

use crate::error::Result;
use crate::fields;
use crate::guard;
use crate::normalize;
use crate::ranges;

/// Start delimiter of the trailing JSON block. Must match the prompt
/// templates byte for byte.
pub const CITATION_DATA_START: &str = "<<<CITATION_DATA>>>";
/// End delimiter. Optional in practice; models often stop early.
pub const CITATION_DATA_END: &str = "<<<END_CITATION_DATA>>>";

/// How to treat citation objects without a usable numeric id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Drop them. The default: an id-less object cannot be joined to any
    /// `[N]` marker.
    #[default]
    Strict,
    /// Keep them under the next sequential id.
    Lenient,
}

/// Structured result of parsing one deferred-dialect response.
///
/// `success: false` means the JSON block existed but stayed unparseable
/// after repair; `error` then carries both parse messages. The visible
/// text is always populated, so callers can keep rendering regardless.
#[derive(Debug, Clone, Default)]
pub struct DeferredParseOutcome {
    pub success: bool,
    pub visible_text: String,
    pub citations: BTreeMap<u32, Citation>,
    pub error: Option<String>,
}

/// Parse a deferred-dialect response with default (strict) id handling.
pub fn parse_deferred_response(input: &str) -> Result<DeferredParseOutcome> {
    parse_deferred_response_with(input, Strictness::Strict)
}

/// Parse a deferred-dialect response.
///
/// Absence of the start delimiter is not an error: the whole input is
/// visible text with zero citations. The only propagating failure is the
/// input-length guard.
pub fn parse_deferred_response_with(
    input: &str,
    strictness: Strictness,
) -> Result<DeferredParseOutcome> {
    guard::check_pattern_input(input)?;

    let Some(start) = input.find(CITATION_DATA_START) else {
        return Ok(DeferredParseOutcome {
            success: true,
            visible_text: input.trim().to_string(),
            ..Default::default()
        });
    };

    let visible_text = input[..start].trim().to_string();
    let after_start = &input[start + CITATION_DATA_START.len()..];
    let payload = match after_start.find(CITATION_DATA_END) {
        Some(end) => &after_start[..end],
        None => after_start,
    };
    let payload = payload.trim();

    let value = match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(original_err) => {
            match serde_json::from_str::<Value>(&repair::repair_json(payload)) {
                Ok(value) => value,
                Err(repair_err) => {
                    return Ok(DeferredParseOutcome {
                        success: false,
                        visible_text,
                        error: Some(format!(
                            "citation data is not valid JSON: {}; after repair: {}",
                            original_err, repair_err
                        )),
                        ..Default::default()
                    });
                }
            }
        }
    };

    let mut citations = BTreeMap::new();
    let expanded: Vec<Map<String, Value>> =
        flatten_payload(value).iter().map(canonicalize_keys).collect();
    // Fallback ids start above every explicit id, so a lenient assignment
    // can never clobber (or be clobbered by) an explicitly numbered object.
    let mut next_fallback = expanded
        .iter()
        .filter_map(numeric_id)
        .max()
        .map_or(1, |max| max.saturating_add(1));
    for object in &expanded {
        let id = match numeric_id(object) {
            Some(id) => id,
            None => match strictness {
                Strictness::Strict => continue,
                Strictness::Lenient => {
                    let id = next_fallback;
                    next_fallback = next_fallback.saturating_add(1);
                    id
                }
            },
        };
        let mut citation = citation_from_object(object);
        citation.citation_number = Some(id);
        citations.insert(id, citation);
    }

    Ok(DeferredParseOutcome {
        success: true,
        visible_text,
        citations,
        ..Default::default()
    })
}

/// Accepted payload shapes: a flat array of citation objects, one bare
/// object, or a grouped object keyed by attachment id whose every value
/// is an array. Grouping is detected structurally; the group key is
/// injected as `attachment_id` into members that lack one.
fn flatten_payload(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => {
            let grouped = !map.is_empty() && map.values().all(Value::is_array);
            if !grouped {
                return vec![map];
            }
            let mut flat = Vec::new();
            for (group_key, members) in map {
                let Value::Array(members) = members else {
                    continue;
                };
                for member in members {
                    let Value::Object(mut object) = member else {
                        continue;
                    };
                    if !object.contains_key("attachment_id") && !object.contains_key("a") {
                        object.insert(
                            "attachment_id".to_string(),
                            Value::String(group_key.clone()),
                        );
                    }
                    flat.push(object);
                }
            }
            flat
        }
        _ => Vec::new(),
    }
}

/// Expand shorthand keys and canonicalize full names, leaving unknown
/// keys untouched.
fn canonicalize_keys(object: &Map<String, Value>) -> Map<String, Value> {
    let mut expanded = Map::new();
    for (key, value) in object {
        let canonical = match fields::expand_shorthand_key(key) {
            Some(full) => fields::canonical_attribute(full).unwrap_or(full).to_string(),
            None => fields::canonical_attribute(key)
                .map(str::to_string)
                .unwrap_or_else(|| key.clone()),
        };
        // First spelling wins when a key appears under two aliases.
        expanded.entry(canonical).or_insert_with(|| value.clone());
    }
    expanded
}

fn numeric_id(object: &Map<String, Value>) -> Option<u32> {
    match object.get("id") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Build a citation from an object with canonical keys. Shared with the
/// recursive discovery path, whose objects use full field names.
pub(crate) fn citation_from_object(object: &Map<String, Value>) -> Citation {
    let mut citation = Citation {
        attachment_id: string_field(object, fields::ATTACHMENT_ID),
        full_phrase: string_field(object, fields::FULL_PHRASE),
        anchor_text: string_field(object, fields::ANCHOR_TEXT),
        reasoning: string_field(object, fields::REASONING),
        ..Default::default()
    };

    if let Some(Value::String(raw)) = object.get(fields::START_PAGE_KEY) {
        if let Some(locator) = PageLocator::parse(raw) {
            citation.set_page(locator);
        }
    }

    citation.line_ids = match object.get(fields::LINE_IDS) {
        Some(Value::Array(items)) => {
            let mut ids: Vec<u64> = items.iter().filter_map(Value::as_u64).collect();
            ids.sort_unstable();
            ids.dedup();
            (!ids.is_empty()).then_some(ids)
        }
        Some(Value::String(expr)) => ranges::expand_ranges(expr),
        _ => None,
    };

    citation.timestamps = match object.get(fields::TIMESTAMPS) {
        Some(Value::Object(times)) => {
            let timestamps = Timestamps {
                start_time: timestamp_field(times, "start_time", "s"),
                end_time: timestamp_field(times, "end_time", "e"),
            };
            (!timestamps.is_empty()).then_some(timestamps)
        }
        Some(Value::String(raw)) => match raw.split_once('-') {
            Some((start, end)) => Some(Timestamps {
                start_time: Some(start.trim().to_string()),
                end_time: Some(end.trim().to_string()),
            }),
            None => None,
        },
        _ => None,
    };

    if citation.citation_number.is_none() {
        citation.citation_number = numeric_id(object);
    }
    citation
}

/// Stray backslash escapes survive JSON parsing when the model escaped a
/// quote twice; collapse them the same way the XML path does.
fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(normalize::unescape_quotes_fully)
}

fn timestamp_field(times: &Map<String, Value>, full: &str, short: &str) -> Option<String> {
    let value = times.get(full).or_else(|| {
        times
            .get(short)
            .or_else(|| times.get(&camel_case(full)))
    });
    value.and_then(Value::as_str).map(str::to_string)
}

fn camel_case(snake: &str) -> String {
    let mut out = String::new();
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// What to substitute for a resolved `[N]` marker.
pub enum MarkerStyle<'a> {
    /// Remove the marker entirely (default rendering).
    Remove,
    /// Replace it with the citation's anchor text.
    AnchorText,
    /// Caller-supplied replacement.
    Custom(&'a dyn Fn(u32, Option<&Citation>) -> String),
}

/// Substitute in-text `[N]` markers in visible text.
///
/// Markers that resolve to no known citation are plain text, not
/// citations, and are always left untouched. A renderer-facing helper;
/// extraction itself never rewrites visible text.
pub fn replace_markers(
    visible_text: &str,
    citations: &BTreeMap<u32, Citation>,
    style: MarkerStyle<'_>,
) -> Result<String> {
    use std::sync::OnceLock;

    use regex::{Captures, Regex};

    guard::check_pattern_input(visible_text)?;
    static MARKER: OnceLock<Regex> = OnceLock::new();
    // Leading whitespace is captured so removal doesn't leave a double
    // space behind.
    let marker = MARKER.get_or_init(|| Regex::new(r"(?P<ws>\s*)\[(?P<id>\d+)\]").unwrap());

    let replaced = marker.replace_all(visible_text, |caps: &Captures<'_>| {
        let Ok(id) = caps["id"].parse::<u32>() else {
            return caps[0].to_string();
        };
        let Some(citation) = citations.get(&id) else {
            return caps[0].to_string();
        };
        let ws = &caps["ws"];
        match &style {
            MarkerStyle::Remove => String::new(),
            MarkerStyle::AnchorText => {
                format!("{}{}", ws, citation.anchor_text.as_deref().unwrap_or_default())
            }
            MarkerStyle::Custom(replace) => format!("{}{}", ws, replace(id, Some(citation))),
        }
    });
    Ok(replaced.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> DeferredParseOutcome {
        parse_deferred_response(input).unwrap()
    }

    #[test]
    fn test_no_delimiter_is_plain_text() {
        let outcome = parse("Just prose, no citations here.");
        assert!(outcome.success);
        assert_eq!(outcome.visible_text, "Just prose, no citations here.");
        assert!(outcome.citations.is_empty());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_basic_deferred_response() {
        let input = "Grew 45% [1].\n<<<CITATION_DATA>>>\n[{\"id\":1,\"attachment_id\":\"abc\",\"full_phrase\":\"Grew 45%\"}]\n<<<END_CITATION_DATA>>>";
        let outcome = parse(input);
        assert!(outcome.success);
        assert_eq!(outcome.visible_text, "Grew 45% [1].");
        assert_eq!(outcome.citations.len(), 1);
        let citation = &outcome.citations[&1];
        assert_eq!(citation.full_phrase.as_deref(), Some("Grew 45%"));
        assert_eq!(citation.citation_number, Some(1));
    }

    #[test]
    fn test_missing_end_delimiter() {
        let input = "Text [1].\n<<<CITATION_DATA>>>\n[{\"id\":1,\"full_phrase\":\"x\"}]";
        let outcome = parse(input);
        assert!(outcome.success);
        assert_eq!(outcome.citations.len(), 1);
    }

    #[test]
    fn test_shorthand_keys_expand() {
        let input = "T [1].\n<<<CITATION_DATA>>>\n[{\"n\":1,\"a\":\"doc1\",\"f\":\"phrase\",\"k\":\"anchor\",\"l\":\"2-4\",\"r\":\"why\"}]";
        let outcome = parse(input);
        let citation = &outcome.citations[&1];
        assert_eq!(citation.attachment_id.as_deref(), Some("doc1"));
        assert_eq!(citation.full_phrase.as_deref(), Some("phrase"));
        assert_eq!(citation.anchor_text.as_deref(), Some("anchor"));
        assert_eq!(citation.line_ids, Some(vec![2, 3, 4]));
        assert_eq!(citation.reasoning.as_deref(), Some("why"));
    }

    #[test]
    fn test_shorthand_timestamps() {
        let input = "T [1].\n<<<CITATION_DATA>>>\n[{\"n\":1,\"f\":\"p\",\"t\":{\"s\":\"0:12\",\"e\":\"0:45\"}}]";
        let outcome = parse(input);
        let times = outcome.citations[&1].timestamps.as_ref().unwrap();
        assert_eq!(times.start_time.as_deref(), Some("0:12"));
        assert_eq!(times.end_time.as_deref(), Some("0:45"));
    }

    #[test]
    fn test_grouped_payload_injects_attachment_id() {
        let input = "T [1][2].\n<<<CITATION_DATA>>>\n{\"doc_one_aaaaaaaaaaaa\":[{\"id\":1,\"full_phrase\":\"x\"}],\"doc_two_bbbbbbbbbbbb\":[{\"id\":2,\"full_phrase\":\"y\",\"attachment_id\":\"explicit\"}]}";
        let outcome = parse(input);
        assert_eq!(
            outcome.citations[&1].attachment_id.as_deref(),
            Some("doc_one_aaaaaaaaaaaa")
        );
        // An explicit id is never overwritten by the group key.
        assert_eq!(outcome.citations[&2].attachment_id.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_single_object_payload() {
        let input = "T [3].\n<<<CITATION_DATA>>>\n{\"id\":3,\"full_phrase\":\"solo\"}";
        let outcome = parse(input);
        assert_eq!(outcome.citations.len(), 1);
        assert_eq!(outcome.citations[&3].full_phrase.as_deref(), Some("solo"));
    }

    #[test]
    fn test_page_id_compact_and_legacy() {
        let input = "T.\n<<<CITATION_DATA>>>\n[{\"id\":1,\"f\":\"x\",\"p\":\"2_0\"},{\"id\":2,\"f\":\"y\",\"p\":\"page_number_5_index_1\"},{\"id\":3,\"f\":\"z\",\"p\":\"0_0\"}]";
        let outcome = parse(input);
        assert_eq!(outcome.citations[&1].page_number, Some(2));
        assert_eq!(outcome.citations[&2].page_number, Some(5));
        // Degenerate zero corrects to the first page.
        assert_eq!(outcome.citations[&3].page_number, Some(1));
    }

    #[test]
    fn test_strict_mode_drops_idless_objects() {
        let input = "T.\n<<<CITATION_DATA>>>\n[{\"full_phrase\":\"no id\"},{\"id\":2,\"full_phrase\":\"kept\"}]";
        let outcome = parse(input);
        assert_eq!(outcome.citations.len(), 1);
        assert!(outcome.citations.contains_key(&2));
    }

    #[test]
    fn test_lenient_mode_assigns_sequential_ids() {
        let input = "T.\n<<<CITATION_DATA>>>\n[{\"full_phrase\":\"no id\"}]";
        let outcome = parse_deferred_response_with(input, Strictness::Lenient).unwrap();
        assert_eq!(outcome.citations.len(), 1);
        assert_eq!(outcome.citations[&1].full_phrase.as_deref(), Some("no id"));
    }

    #[test]
    fn test_lenient_fallback_ids_skip_explicit_ones() {
        // An id-less object ahead of an explicitly numbered one must not
        // land on the same id and shadow it.
        let input = "T.\n<<<CITATION_DATA>>>\n[{\"full_phrase\":\"x\"},{\"id\":1,\"full_phrase\":\"y\"}]";
        let outcome = parse_deferred_response_with(input, Strictness::Lenient).unwrap();
        assert_eq!(outcome.citations.len(), 2);
        assert_eq!(outcome.citations[&1].full_phrase.as_deref(), Some("y"));
        assert_eq!(outcome.citations[&2].full_phrase.as_deref(), Some("x"));
    }

    #[test]
    fn test_broken_json_is_repaired() {
        let input = "T [1].\n<<<CITATION_DATA>>>\n```json\n[{\"id\":1,\"full_phrase\":\"cut off";
        let outcome = parse(input);
        assert!(outcome.success);
        assert_eq!(outcome.citations.len(), 1);
        assert!(outcome.citations[&1]
            .full_phrase
            .as_deref()
            .unwrap()
            .starts_with("cut off"));
    }

    #[test]
    fn test_unrepairable_json_is_structured_failure() {
        let input = "Visible text.\n<<<CITATION_DATA>>>\nnot json at all {{{[";
        let outcome = parse(input);
        assert!(!outcome.success);
        assert_eq!(outcome.visible_text, "Visible text.");
        assert!(outcome.citations.is_empty());
        let error = outcome.error.unwrap();
        assert!(error.contains("after repair"));
    }

    #[test]
    fn test_replace_markers_remove() {
        let outcome = parse(
            "Grew 45% [1] fast [2].\n<<<CITATION_DATA>>>\n[{\"id\":1,\"full_phrase\":\"x\",\"anchor_text\":\"45%\"}]",
        );
        let replaced =
            replace_markers(&outcome.visible_text, &outcome.citations, MarkerStyle::Remove)
                .unwrap();
        // [2] resolves to nothing: plain text, left alone.
        assert_eq!(replaced, "Grew 45% fast [2].");
    }

    #[test]
    fn test_replace_markers_anchor_text() {
        let outcome = parse(
            "Grew [1].\n<<<CITATION_DATA>>>\n[{\"id\":1,\"full_phrase\":\"x\",\"anchor_text\":\"45%\"}]",
        );
        let replaced = replace_markers(
            &outcome.visible_text,
            &outcome.citations,
            MarkerStyle::AnchorText,
        )
        .unwrap();
        assert_eq!(replaced, "Grew 45%.");
    }

    #[test]
    fn test_replace_markers_custom() {
        let outcome = parse(
            "See [1].\n<<<CITATION_DATA>>>\n[{\"id\":1,\"full_phrase\":\"x\"}]",
        );
        let style = MarkerStyle::Custom(&|id, _| format!("(ref {})", id));
        let replaced =
            replace_markers(&outcome.visible_text, &outcome.citations, style).unwrap();
        assert_eq!(replaced, "See (ref 1).");
    }

    #[test]
    fn test_line_ids_as_json_array() {
        let input = "T.\n<<<CITATION_DATA>>>\n[{\"id\":1,\"f\":\"x\",\"l\":[5,3,3,9]}]";
        let outcome = parse(input);
        assert_eq!(outcome.citations[&1].line_ids, Some(vec![3, 5, 9]));
    }
}
