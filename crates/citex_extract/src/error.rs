use thiserror::Error;

/// Errors surfaced by the extraction pipeline.
///
/// Only `InputTooLarge` aborts an extraction call. Every other anomaly a
/// model can produce (a tag without a phrase, unparseable JSON, an object
/// without an id) degrades locally to fewer citations; the dialect-specific
/// results carry the diagnostic detail instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("input too large for citation extraction: {length} characters exceeds {limit}")]
    InputTooLarge { length: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
