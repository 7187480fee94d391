/*
SPDX-License-Identifier: MPL-2.0
SPDX-FileCopyrightText: © 2023-2026 Bruce D'Arcus
*/

//! Citex Core
//!
//! Data model for source citations extracted from language model output.
//! A [`Citation`] is the canonical structured record produced by the
//! extraction pipeline regardless of which dialect the model used to emit
//! it; [`citation_key`] derives the content-addressed key under which a
//! citation is stored and joined against external verification results.
//!
//! This crate holds only value types and pure functions. Parsing lives in
//! `citex_extract`; rendering and verification are external collaborators
//! that consume these types.

pub mod citation;
pub mod key;
pub mod verify;

pub use citation::{Citation, CitationRecord, PageLocator, Timestamps};
pub use key::citation_key;
pub use verify::{classify, CitationStatus, Verification, VerificationStatus};
