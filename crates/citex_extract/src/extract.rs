/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Top-level extraction orchestration.
//!
//! One entry point over both dialects and both input shapes. Text runs
//! the deferred-JSON path (when its delimiter is present) and always the
//! inline-XML path; an already-parsed JSON value runs recursive discovery
//! plus the XML path over its stringified form, which catches tags
//! embedded in JSON string fields. Results merge into one record keyed by
//! content hash, so the same citation found twice lands once.

use serde_json::Value;

use citex_core::{citation_key, Citation, CitationRecord};

use crate::builder;
use crate::deferred;
use crate::discover;
use crate::error::Result;

/// Input to [`extract_all`]: raw model text, or model output that has
/// already been parsed into a JSON value.
pub enum ExtractionInput<'a> {
    Text(&'a str),
    Json(&'a Value),
}

/// Extract every citation from the input, whichever dialects it uses.
///
/// Never fails on malformed content: a dialect that cannot be parsed
/// contributes zero citations and the others still run. The only error is
/// the input-length guard.
pub fn extract_all(input: ExtractionInput<'_>) -> Result<CitationRecord> {
    match input {
        ExtractionInput::Text(text) => extract_all_from_text(text),
        ExtractionInput::Json(value) => extract_all_from_value(value),
    }
}

/// Extract citations from raw response text.
///
/// Both dialects may coexist in one response; the union is keyed by
/// citation key with last-write-wins on collision (in practice the
/// colliding values are identical).
pub fn extract_all_from_text(text: &str) -> Result<CitationRecord> {
    let mut record = CitationRecord::new();

    if text.contains(deferred::CITATION_DATA_START) {
        let outcome = deferred::parse_deferred_response(text)?;
        // A failed JSON block contributes nothing; the XML path below
        // still gets its chance on the same input.
        for citation in outcome.citations.into_values() {
            insert(&mut record, citation);
        }
    }

    for citation in builder::extract_citations_from_text(text, None)? {
        insert(&mut record, citation);
    }
    Ok(record)
}

/// Extract citations from an already-parsed JSON value.
pub fn extract_all_from_value(value: &Value) -> Result<CitationRecord> {
    let mut record = CitationRecord::new();

    for citation in discover::discover_citations(value) {
        insert(&mut record, citation);
    }

    // Tags can hide as markdown inside JSON string fields; the XML path
    // over the stringified value finds them. Serializing a Value cannot
    // fail, hence the default.
    let stringified = serde_json::to_string(value).unwrap_or_default();
    for citation in builder::extract_citations_from_text(&stringified, None)? {
        insert(&mut record, citation);
    }
    Ok(record)
}

/// The existence rule lives here: no phrase, no entry.
fn insert(record: &mut CitationRecord, citation: Citation) {
    if citation.is_citable() {
        record.insert(citation_key(&citation), citation);
    }
}
