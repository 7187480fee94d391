/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Canonical citation records.
//!
//! This module defines the structures a citation is normalized into. Field
//! names double as the canonical attribute names of the normalized tag
//! dialect, so the serde representation round-trips against normalized
//! model output without renaming.

use indexmap::IndexMap;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A map from citation key to citation.
///
/// Keys come from [`crate::citation_key`]; they are content-derived, so
/// semantically identical citations collapse into one entry. Iteration
/// order is insertion order, which keeps serialized output reproducible.
pub type CitationRecord = IndexMap<String, Citation>;

/// Start/end times for an audio or video citation.
///
/// Times are opaque strings at this layer; the extraction pipeline splits
/// a raw `start-end` value but never interprets the parts.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Timestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl Timestamps {
    /// True when neither bound is set.
    pub fn is_empty(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }
}

/// A structured claim about a quoted phrase's source location.
///
/// All fields are optional; absence is meaningful, not zero. The one
/// existence criterion is `full_phrase`: a citation without it is never
/// emitted into a [`CitationRecord`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Citation {
    /// Identifier of the source document or media this citation refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    /// 1-based page number within the source document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Canonical page locator in `page_number_<N>_index_<I>` form.
    /// Always derivable when `page_number` is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_page_id: Option<String>,
    /// Verbatim quoted text. Required for the citation to be "real".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_phrase: Option<String>,
    /// 1-3 word span within `full_phrase` highlighting the key support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    /// Source line identifiers, sorted and unique, expanded from ranges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_ids: Option<Vec<u64>>,
    /// Start/end times for audio/video sources. A citation carries either
    /// `line_ids` or `timestamps` in practice, not both.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    /// Free-text justification from the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// 1-based ordinal assigned at extraction time, from tag order or from
    /// the deferred-JSON marker id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_number: Option<u32>,
    /// Text immediately preceding the tag occurrence. Set by the XML path
    /// only; transient context, excluded from the citation key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_cite: Option<String>,
    /// Text immediately following the tag occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_cite: Option<String>,
}

impl Citation {
    /// Whether this citation is real enough to keep.
    ///
    /// `full_phrase` is the sole existence criterion: a citation lacking
    /// one (or carrying only whitespace) is discarded by every path.
    pub fn is_citable(&self) -> bool {
        self.full_phrase
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    /// Set both page fields from a parsed locator.
    pub fn set_page(&mut self, locator: PageLocator) {
        self.page_number = Some(locator.page);
        self.start_page_id = Some(locator.page_id());
    }
}

/// A parsed page locator: 1-based page number plus chunk index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLocator {
    pub page: u32,
    pub index: u32,
}

impl PageLocator {
    /// Parse a page locator from either accepted form.
    ///
    /// Legacy: `page_number_<N>_index_<I>` (any letters/underscores after
    /// `page`, e.g. `page_number_2_index_0` or `pageNumber_2_index_0`).
    /// Compact: `<N>_<I>`, e.g. `2_0`.
    ///
    /// The degenerate `0_0` locator auto-corrects to page 1, index 0 in
    /// both forms. Any other zero-page value is ambiguous and parses to
    /// `None`; callers leave the page unset rather than guess.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (page, index) = if let Some(rest) = text.strip_prefix("page") {
            // Legacy form: skip the letter/underscore run after "page",
            // then expect `<N>_index_<I>`.
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '_');
            let (num, tail) = split_leading_digits(rest)?;
            let tail = tail.strip_prefix("_index_")?;
            let (idx, tail) = split_leading_digits(tail)?;
            if !tail.is_empty() {
                return None;
            }
            (num, idx)
        } else {
            let (num, tail) = split_leading_digits(text)?;
            let tail = tail.strip_prefix('_')?;
            let (idx, tail) = split_leading_digits(tail)?;
            if !tail.is_empty() {
                return None;
            }
            (num, idx)
        };

        match (page, index) {
            (0, 0) => Some(PageLocator { page: 1, index: 0 }),
            (0, _) => None,
            _ => Some(PageLocator { page, index }),
        }
    }

    /// The canonical `page_number_<N>_index_<I>` form.
    pub fn page_id(&self) -> String {
        format!("page_number_{}_index_{}", self.page, self.index)
    }
}

fn split_leading_digits(text: &str) -> Option<(u32, &str)> {
    let end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    let num = text[..end].parse().ok()?;
    Some((num, &text[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citable_requires_full_phrase() {
        let mut citation = Citation {
            anchor_text: Some("key span".to_string()),
            ..Default::default()
        };
        assert!(!citation.is_citable());
        citation.full_phrase = Some("   ".to_string());
        assert!(!citation.is_citable());
        citation.full_phrase = Some("a quoted phrase".to_string());
        assert!(citation.is_citable());
    }

    #[test]
    fn test_page_locator_legacy_form() {
        let locator = PageLocator::parse("page_number_2_index_0").unwrap();
        assert_eq!(locator, PageLocator { page: 2, index: 0 });
        assert_eq!(locator.page_id(), "page_number_2_index_0");
    }

    #[test]
    fn test_page_locator_compact_form() {
        assert_eq!(
            PageLocator::parse("14_3"),
            Some(PageLocator { page: 14, index: 3 })
        );
    }

    #[test]
    fn test_zero_page_auto_correct_only_degenerate() {
        // 0_0 is a known degenerate emission: correct it to the first page.
        assert_eq!(PageLocator::parse("0_0"), Some(PageLocator { page: 1, index: 0 }));
        assert_eq!(
            PageLocator::parse("page_number_0_index_0"),
            Some(PageLocator { page: 1, index: 0 })
        );
        // Any other zero-page form is ambiguous: leave unset.
        assert_eq!(PageLocator::parse("0_3"), None);
        assert_eq!(PageLocator::parse("page_number_0_index_2"), None);
    }

    #[test]
    fn test_page_locator_rejects_noise() {
        assert_eq!(PageLocator::parse("page_number_two_index_0"), None);
        assert_eq!(PageLocator::parse("2-0"), None);
        assert_eq!(PageLocator::parse(""), None);
        assert_eq!(PageLocator::parse("page_number_2_index_0_extra"), None);
    }

    #[test]
    fn test_citation_serialization_skips_absent_fields() {
        let citation = Citation {
            attachment_id: Some("abcdefghij1234567890".to_string()),
            full_phrase: Some("Grew 45%".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&citation).unwrap();
        assert_eq!(json["attachment_id"], "abcdefghij1234567890");
        assert!(json.get("line_ids").is_none());
        assert!(json.get("timestamps").is_none());
    }

    #[test]
    fn test_citation_deserialization() {
        let json = r#"
        {
            "attachment_id": "abc",
            "full_phrase": "Hello world",
            "line_ids": [1, 2, 3],
            "citation_number": 1
        }
        "#;
        let citation: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.line_ids, Some(vec![1, 2, 3]));
        assert_eq!(citation.citation_number, Some(1));
        assert!(citation.is_citable());
    }
}
