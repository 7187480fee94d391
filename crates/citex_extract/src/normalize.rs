/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Tag normalization.
//!
//! Rewrites raw model output so that every citation occurrence is exactly
//! one canonical self-closing `<cite attr='v' ... />` tag: missing `<`
//! repaired, bodies relocated out of the tag, attribute names
//! canonicalized, values cleaned of entity/markdown/newline noise, quote
//! escaping made uniform, ranges expanded, attributes reordered. All
//! surrounding prose is left untouched. The pass is idempotent, which is
//! what lets the rest of the pipeline assume canonical input.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::fields;
use crate::guard;
use crate::ranges;

/// Normalize every citation tag in `input` to canonical form.
///
/// The only failure is the input-length guard; any malformed tag is
/// repaired as far as possible and carried through rather than dropped.
pub fn normalize_citations(input: &str) -> Result<String> {
    guard::check_pattern_input(input)?;
    let repaired = repair_missing_open_bracket(input);
    Ok(rebuild_tags(&repaired))
}

/// Models sometimes drop the `<` and emit `cite attachment_id='...'`
/// inline. Restore it when the word `cite` is not preceded by a letter or
/// `<` and is followed by an attribute assignment.
fn repair_missing_open_bracket(text: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?P<pre>^|[^A-Za-z<])cite\s+(?P<attr>[A-Za-z\\][A-Za-z0-9_\\]*\s*=)")
            .unwrap()
    });
    pattern.replace_all(text, "${pre}<cite ${attr}").into_owned()
}

/// One parsed occurrence of a cite tag in the raw text.
struct TagSpan {
    /// Byte offset just past the consumed region (including any body and
    /// closing tag).
    end: usize,
    /// Raw attribute text between `<cite` and the tag end.
    attrs: String,
    /// Body text for the tag-with-body shape, already removed from the
    /// tag. Relocated to precede the rebuilt tag.
    body: Option<String>,
}

/// Split the text into plain spans and tag spans, rebuilding each tag in
/// canonical form. Plain text is copied verbatim except for orphan
/// `</cite>` closers, which are model noise and dropped.
fn rebuild_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find("<cite") {
        let start = cursor + rel;
        let after_name = start + "<cite".len();

        // Guard against `<citext>`-style prefixes: the tag name must end
        // here.
        let boundary_ok = text[after_name..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        if !boundary_ok {
            push_plain(&mut out, &text[cursor..after_name]);
            cursor = after_name;
            continue;
        }

        push_plain(&mut out, &text[cursor..start]);
        let span = read_tag(text, after_name);
        if let Some(body) = &span.body {
            out.push_str(body);
        }
        out.push_str(&canonicalize_tag(&span.attrs));
        cursor = span.end;
    }
    push_plain(&mut out, &text[cursor..]);
    out
}

/// Copy a plain-text span, dropping orphan closing tags.
fn push_plain(out: &mut String, span: &str) {
    static ORPHAN_CLOSE: OnceLock<Regex> = OnceLock::new();
    let pattern = ORPHAN_CLOSE.get_or_init(|| Regex::new(r"</cite\s*>").unwrap());
    out.push_str(&pattern.replace_all(span, ""));
}

/// Read one tag whose attributes begin at `after_name`, classifying it as
/// self-closing, tag-with-body, or unclosed, and consuming through
/// whatever belongs to it.
fn read_tag(text: &str, after_name: usize) -> TagSpan {
    let Some((gt, self_closing)) = find_tag_end(text, after_name) else {
        // No closing `>` at all: everything to the end of input is
        // attribute text of an unclosed tag.
        return TagSpan {
            end: text.len(),
            attrs: text[after_name..].to_string(),
            body: None,
        };
    };

    let attrs_end = if self_closing {
        text[..gt].trim_end().trim_end_matches('/').len()
    } else {
        gt
    };
    let attrs = text[after_name..attrs_end].to_string();

    if self_closing {
        return TagSpan {
            end: gt + 1,
            attrs,
            body: None,
        };
    }

    // Open tag: a body runs to the matching `</cite>`, provided no new
    // `<cite` opens first. Otherwise the tag is unclosed and converted to
    // self-closing in place.
    let rest = &text[gt + 1..];
    let close = rest.find("</cite");
    let next_open = rest.find("<cite");
    if let Some(close_rel) = close {
        let opens_first = next_open.map_or(false, |open_rel| open_rel < close_rel);
        if !opens_first {
            let close_start = gt + 1 + close_rel;
            let after_close = close_start + "</cite".len();
            let close_tail = &text[after_close..];
            let close_gt = close_tail
                .char_indices()
                .find(|(_, c)| !c.is_whitespace())
                .filter(|(_, c)| *c == '>')
                .map(|(i, _)| after_close + i + 1);
            if let Some(end) = close_gt {
                return TagSpan {
                    end,
                    attrs,
                    body: Some(text[gt + 1..close_start].to_string()),
                };
            }
        }
    }

    TagSpan {
        end: gt + 1,
        attrs,
        body: None,
    }
}

/// Find the `>` terminating a tag whose attributes start at `from`,
/// honoring quoted values and backslash escapes. Returns the byte offset
/// of `>` and whether the tag was self-closing. Quote awareness matters:
/// decoded entities can put literal `<`/`>` inside attribute values.
pub(crate) fn find_tag_end(text: &str, from: usize) -> Option<(usize, bool)> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut last_meaningful = ' ';

    for (i, c) in text[from..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '>') => return Some((from + i, last_meaningful == '/')),
            (None, _) => {
                if !c.is_whitespace() {
                    last_meaningful = c;
                }
            }
        }
    }
    None
}

/// Rebuild one tag from its raw attribute text: parse, canonicalize names,
/// clean values, reorder, emit.
fn canonicalize_tag(attrs: &str) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (raw_name, raw_value) in parse_attributes(attrs) {
        // Markdown post-processing escapes underscores in names.
        let name = raw_name.replace('\\', "");
        let canonical = fields::canonical_attribute(&name)
            .map(str::to_string)
            .unwrap_or(name);
        // First occurrence wins on duplicated attributes.
        if pairs.iter().any(|(existing, _)| *existing == canonical) {
            continue;
        }
        let cleaned = clean_value(&canonical, &raw_value);
        pairs.push((canonical, cleaned));
    }

    let order: &[&str] = if pairs.iter().any(|(name, _)| name.as_str() == fields::TIMESTAMPS) {
        fields::MEDIA_ORDER
    } else {
        fields::DOCUMENT_ORDER
    };

    let mut tag = String::from("<cite");
    for name in order {
        if let Some((_, value)) = pairs.iter().find(|(n, _)| n.as_str() == *name) {
            tag.push_str(&format!(" {}='{}'", name, value));
        }
    }
    // Unrecognized extras go last, alphabetically, for determinism.
    let mut extras: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(name, _)| !order.contains(&name.as_str()))
        .collect();
    extras.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in extras {
        tag.push_str(&format!(" {}='{}'", name, value));
    }
    tag.push_str(" />");
    tag
}

/// Parse `name = 'value'` pairs out of raw attribute text, honoring both
/// quote styles and backslash escapes. Unparseable tokens are skipped, not
/// fatal.
fn parse_attributes(attrs: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let chars: Vec<char> = attrs.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && !(chars[i].is_ascii_alphanumeric() || chars[i] == '\\') {
            i += 1;
        }
        let name_start = i;
        while i < chars.len()
            && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '\\')
        {
            i += 1;
        }
        if i == name_start {
            break;
        }
        let name: String = chars[name_start..i].iter().collect();

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || chars[i] != '=' {
            continue;
        }
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || (chars[i] != '\'' && chars[i] != '"') {
            continue;
        }
        let quote = chars[i];
        i += 1;
        let mut value = String::new();
        while i < chars.len() {
            if chars[i] == '\\' && i + 1 < chars.len() {
                value.push(chars[i]);
                value.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if chars[i] == quote {
                i += 1;
                break;
            }
            value.push(chars[i]);
            i += 1;
        }
        pairs.push((name, value));
    }
    pairs
}

/// Clean one attribute value according to its kind, then re-escape quotes
/// canonically. Every class of value round-trips through
/// unescape-then-escape, so repeated normalization is a no-op.
fn clean_value(canonical_name: &str, raw: &str) -> String {
    let mut value = raw.to_string();
    if fields::TEXT_ATTRIBUTES.contains(&canonical_name) {
        value = clean_text_value(&value);
    } else if fields::RANGE_ATTRIBUTES.contains(&canonical_name) {
        value = clean_range_value(&value);
    }
    escape_quotes(&unescape_quotes_fully(&value))
}

/// Decode the five standard HTML entities, flatten newlines, strip
/// markdown emphasis markers.
fn clean_text_value(raw: &str) -> String {
    let mut value = decode_entities(raw);
    static NEWLINES: OnceLock<Regex> = OnceLock::new();
    let newlines = NEWLINES.get_or_init(|| Regex::new(r"[\r\n]+").unwrap());
    value = newlines.replace_all(&value, " ").into_owned();
    value = value.replace("**", "").replace("__", "").replace('*', "");
    value
}

/// Decode entities to a fixpoint so double-escaped input (`&amp;quot;`)
/// collapses fully; the output then never contains an entity, which keeps
/// normalization idempotent.
fn decode_entities(raw: &str) -> String {
    let mut value = raw.to_string();
    loop {
        let decoded = value
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");
        if decoded == value {
            return decoded;
        }
        value = decoded;
    }
}

/// Strip bracket/letter noise from a range value and expand it to the
/// canonical comma-separated form. Values the expander cannot parse (for
/// example `1:23-4:56` timestamps) keep their noise-stripped form.
fn clean_range_value(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '-' | ':' | '.'))
        .collect();
    match ranges::expand_ranges(&stripped) {
        Some(ids) => ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(","),
        None => stripped,
    }
}

/// Collapse backslash escaping on quotes to a fixpoint, so doubly escaped
/// input (`\\'`) ends up as a bare quote.
pub(crate) fn unescape_quotes_fully(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let unescaped = current.replace("\\'", "'").replace("\\\"", "\"");
        if unescaped == current {
            return unescaped;
        }
        current = unescaped;
    }
}

/// Canonical single-level escaping for emission inside single-quoted
/// attribute values.
fn escape_quotes(value: &str) -> String {
    value.replace('\'', "\\'").replace('"', "\\\"")
}
