/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Verification status contract.
//!
//! Verification itself is external: a backend decides whether a citation's
//! phrase actually appears in its claimed source and reports one of a fixed
//! set of statuses. The core's only involvement is [`classify`], the pure
//! function the display layer uses to collapse that enum into four
//! presentation flags.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome reported by the verification backend for one citation.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Phrase and anchor text both found where claimed.
    Found,
    /// Phrase found, but the anchor text is not inside it.
    FoundPhraseMissedAnchorText,
    /// Only the anchor text was located.
    FoundAnchorTextOnly,
    /// A portion of the phrase was located.
    PartialTextFound,
    /// Phrase found, but on a different page than claimed.
    FoundOnOtherPage,
    /// Phrase found, but on different lines than claimed.
    FoundOnOtherLine,
    /// Only the first word of the phrase was located.
    FirstWordFound,
    /// Nothing was located.
    NotFound,
    /// Verification has not run yet.
    Pending,
    /// Verification is in flight.
    Loading,
}

/// A verification result, joined to a citation by its citation key.
///
/// Corrected locators are carried opaque for the display layer; the core
/// never interprets them.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Verification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VerificationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_page_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_line_ids: Option<Vec<u64>>,
}

/// Presentation flags derived from a verification result.
///
/// Exactly one flag is set.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct CitationStatus {
    pub is_verified: bool,
    pub is_partial_match: bool,
    pub is_miss: bool,
    pub is_pending: bool,
}

/// Collapse a verification result into presentation flags.
///
/// An absent verification, an absent status, and the pending/loading
/// statuses all classify as pending: the citation exists but nothing is
/// known about it yet.
pub fn classify(verification: Option<&Verification>) -> CitationStatus {
    use VerificationStatus::*;

    let status = verification.and_then(|v| v.status);
    match status {
        Some(Found) => CitationStatus {
            is_verified: true,
            ..Default::default()
        },
        Some(NotFound) => CitationStatus {
            is_miss: true,
            ..Default::default()
        },
        Some(Pending) | Some(Loading) | None => CitationStatus {
            is_pending: true,
            ..Default::default()
        },
        Some(
            FoundPhraseMissedAnchorText | FoundAnchorTextOnly | PartialTextFound
            | FoundOnOtherPage | FoundOnOtherLine | FirstWordFound,
        ) => CitationStatus {
            is_partial_match: true,
            ..Default::default()
        },
    }
}
