/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Building citations from normalized tags.
//!
//! [`citation_from_tag`] turns one tag into a [`Citation`];
//! [`extract_citations_from_text`] is the whole inline-XML path:
//! normalize, walk every tag occurrence, build, keep the citable ones.

use citex_core::{Citation, PageLocator, Timestamps};

use crate::attrs::extract_attribute;
use crate::error::Result;
use crate::fields;
use crate::normalize;
use crate::ranges;

/// Length of a well-formed attachment id. Models sometimes inject ids
/// from unrelated context; anything of the wrong length is distrusted in
/// favor of a caller-supplied fallback.
pub const EXPECTED_ATTACHMENT_ID_LEN: usize = 20;

/// Characters of surrounding text captured as `before_cite`/`after_cite`.
const CONTEXT_WINDOW: usize = 100;

/// Build a [`Citation`] from a single tag.
///
/// Works on raw or normalized tags: every attribute is tried under all of
/// its aliases, and escaping is collapsed fully, so double-escaped input
/// still yields clean field values. The result may lack `full_phrase`;
/// callers discard those. The only error is the input-length guard on an
/// oversized tag.
pub fn citation_from_tag(
    tag: &str,
    fallback_attachment_id: Option<&str>,
    ordinal: u32,
) -> Result<Citation> {
    let mut citation = Citation {
        citation_number: Some(ordinal),
        ..Default::default()
    };

    citation.attachment_id = resolve_attachment_id(
        extract_attribute(tag, fields::ATTACHMENT_ID_ALIASES)?,
        fallback_attachment_id,
    );
    citation.full_phrase =
        extract_attribute(tag, fields::FULL_PHRASE_ALIASES)?.map(|v| unescape(&v));
    citation.anchor_text =
        extract_attribute(tag, fields::ANCHOR_TEXT_ALIASES)?.map(|v| unescape(&v));
    citation.reasoning =
        extract_attribute(tag, fields::REASONING_ALIASES)?.map(|v| unescape(&v));

    if let Some(raw) = extract_attribute(tag, fields::START_PAGE_KEY_ALIASES)? {
        if let Some(locator) = PageLocator::parse(&raw) {
            citation.set_page(locator);
        }
    }

    if let Some(raw) = extract_attribute(tag, fields::LINE_IDS_ALIASES)? {
        let stripped: String = raw
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '-'))
            .collect();
        citation.line_ids = ranges::expand_ranges(&stripped);
    }

    if let Some(raw) = extract_attribute(tag, fields::TIMESTAMPS_ALIASES)? {
        citation.timestamps = parse_timestamps(&raw);
    }

    Ok(citation)
}

/// The inline-XML extraction path.
///
/// Normalizes the text, then builds a citation from every tag occurrence
/// with a window of surrounding plain text as context. Tags without a
/// phrase are skipped; ordinals still count them, so numbering matches
/// tag order in the text.
pub fn extract_citations_from_text(
    text: &str,
    fallback_attachment_id: Option<&str>,
) -> Result<Vec<Citation>> {
    let normalized = normalize::normalize_citations(text)?;
    let mut citations = Vec::new();
    let mut ordinal = 0;
    let mut cursor = 0;

    while let Some(rel) = normalized[cursor..].find("<cite") {
        let start = cursor + rel;
        let after_name = start + "<cite".len();
        let Some((gt, _)) = normalize::find_tag_end(&normalized, after_name) else {
            break;
        };
        let end = gt + 1;
        ordinal += 1;

        let mut citation =
            citation_from_tag(&normalized[start..end], fallback_attachment_id, ordinal)?;
        if citation.is_citable() {
            let before = tail_chars(&normalized[..start], CONTEXT_WINDOW);
            let after = head_chars(&normalized[end..], CONTEXT_WINDOW);
            citation.before_cite = (!before.is_empty()).then_some(before);
            citation.after_cite = (!after.is_empty()).then_some(after);
            citations.push(citation);
        }
        cursor = end;
    }

    Ok(citations)
}

/// Keep the extracted id only when it has the expected length; otherwise
/// prefer the fallback when one was supplied.
fn resolve_attachment_id(
    extracted: Option<String>,
    fallback: Option<&str>,
) -> Option<String> {
    let extracted = extracted.map(|v| unescape(&v));
    match (&extracted, fallback) {
        (Some(id), _) if id.chars().count() == EXPECTED_ATTACHMENT_ID_LEN => extracted,
        (_, Some(fallback)) => Some(fallback.to_string()),
        _ => extracted,
    }
}

/// Split a raw timestamps value on the first `-`. Times are opaque
/// strings at this layer; no validation beyond non-emptiness.
fn parse_timestamps(raw: &str) -> Option<Timestamps> {
    let raw = unescape(raw);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let timestamps = match trimmed.split_once('-') {
        Some((start, end)) => Timestamps {
            start_time: non_empty(start),
            end_time: non_empty(end),
        },
        None => Timestamps {
            start_time: Some(trimmed.to_string()),
            end_time: None,
        },
    };
    (!timestamps.is_empty()).then_some(timestamps)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn unescape(value: &str) -> String {
    normalize::unescape_quotes_fully(value)
}

fn tail_chars(text: &str, count: usize) -> String {
    let total = text.chars().count();
    text.chars().skip(total.saturating_sub(count)).collect()
}

fn head_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}
