/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Content-addressed citation keys.
//!
//! Every extracted citation is stored under a deterministic hash of its
//! identifying fields. Two citations built from differently ordered,
//! differently quoted, or differently escaped raw tags hash identically
//! once normalized, so the key doubles as the deduplication mechanism and
//! as the join key against externally computed verification results.

use sha2::{Digest, Sha256};

use crate::citation::Citation;

/// Hex characters kept from the digest. An identity key, not a security
/// boundary; 64 bits of hash is plenty for practical input sizes.
const KEY_LEN: usize = 16;

/// Compute the content-addressed key for a citation.
///
/// The projection covers only identifying fields: source, quoted phrase,
/// anchor span, and the page/line/time locator. Transient context
/// (`before_cite`/`after_cite`), the extraction ordinal, and free-text
/// reasoning are excluded so that the same citation re-extracted from a
/// different position in the text keys identically.
pub fn citation_key(citation: &Citation) -> String {
    let mut projection = String::new();
    push_field(&mut projection, "attachment_id", citation.attachment_id.as_deref());
    push_field(&mut projection, "full_phrase", citation.full_phrase.as_deref());
    push_field(&mut projection, "anchor_text", citation.anchor_text.as_deref());
    push_field(&mut projection, "start_page_id", citation.start_page_id.as_deref());

    let page = citation.page_number.map(|p| p.to_string());
    push_field(&mut projection, "page_number", page.as_deref());

    let line_ids = citation.line_ids.as_ref().map(|ids| {
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    });
    push_field(&mut projection, "line_ids", line_ids.as_deref());

    if let Some(times) = &citation.timestamps {
        push_field(&mut projection, "start_time", times.start_time.as_deref());
        push_field(&mut projection, "end_time", times.end_time.as_deref());
    }

    let digest = Sha256::digest(projection.as_bytes());
    let mut key = String::with_capacity(KEY_LEN);
    for byte in digest.iter() {
        key.push_str(&format!("{:02x}", byte));
        if key.len() >= KEY_LEN {
            break;
        }
    }
    key.truncate(KEY_LEN);
    key
}

/// Length-prefixed fields make the serialization unambiguous: no choice of
/// separator can be confused with field content.
fn push_field(out: &mut String, name: &str, value: Option<&str>) {
    match value {
        Some(v) => {
            out.push_str(name);
            out.push(':');
            out.push_str(&v.len().to_string());
            out.push(':');
            out.push_str(v);
            out.push(';');
        }
        None => {
            out.push_str(name);
            out.push_str(":-;");
        }
    }
}
