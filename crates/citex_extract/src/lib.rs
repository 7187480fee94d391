/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Citex Extract
//!
//! This crate turns adversarial, semi-structured model output into a
//! deterministic, bounded set of [`Citation`] records. Models emit
//! citations in two dialects: inline XML-like `<cite/>` tags, and a
//! deferred form using in-text `[N]` markers plus a trailing fenced JSON
//! block. Both are riddled with the usual model mistakes (inconsistent
//! attribute casing, unclosed tags, double-escaped quotes, truncated JSON,
//! enormous numeric ranges), so every stage here is written to repair or
//! bound its input rather than reject it.
//!
//! The top-level entry point is [`extract_all`]: given text or an
//! already-parsed JSON value, it runs whichever extraction paths apply and
//! merges the results into one [`CitationRecord`] keyed by content hash.
//! Malformed input degrades to fewer citations, never to a panic; the only
//! propagating failure is [`ExtractError::InputTooLarge`].
//!
//! # Example
//!
//! ```rust
//! use citex_extract::extract_all_from_text;
//!
//! let output = "Revenue grew 45% <cite attachment_id='abcdefghij1234567890' \
//!     full_phrase='Revenue grew 45% year over year' anchor_text='45%' \
//!     line_ids='3,4,5' />";
//! let record = extract_all_from_text(output).unwrap();
//! assert_eq!(record.len(), 1);
//! let citation = record.values().next().unwrap();
//! assert_eq!(citation.anchor_text.as_deref(), Some("45%"));
//! ```

pub mod attrs;
pub mod builder;
pub mod deferred;
pub mod discover;
pub mod error;
pub mod extract;
pub mod fields;
pub mod guard;
pub mod normalize;
pub mod ranges;

pub use citex_core::{Citation, CitationRecord};
pub use deferred::{
    parse_deferred_response, parse_deferred_response_with, replace_markers, DeferredParseOutcome,
    MarkerStyle, Strictness,
    CITATION_DATA_END, CITATION_DATA_START,
};
pub use discover::{discover_citations, MAX_TRAVERSAL_DEPTH};
pub use error::{ExtractError, Result};
pub use extract::{extract_all, extract_all_from_text, extract_all_from_value, ExtractionInput};
pub use guard::{check_pattern_input, MAX_PATTERN_INPUT_LEN};
pub use normalize::normalize_citations;
pub use ranges::{expand_ranges, expand_ranges_with, MAX_FULL_EXPANSION, RANGE_SAMPLE_COUNT};
