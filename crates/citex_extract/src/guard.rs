//! Input ceiling for regex-driven passes.
//!
//! Every pattern-matching function in the pipeline validates its input
//! length here before touching a regex. Oversized inputs are rejected up
//! front rather than risking catastrophic backtracking or a memory blowup
//! partway through a pass.

use crate::error::{ExtractError, Result};

/// Maximum input length, in characters, accepted by any pattern pass.
pub const MAX_PATTERN_INPUT_LEN: usize = 100_000;

/// Reject input above the safety ceiling.
///
/// This is the only failure in the pipeline that propagates to the caller;
/// it aborts the whole extraction call rather than silently truncating.
pub fn check_pattern_input(text: &str) -> Result<()> {
    let length = text.chars().count();
    if length > MAX_PATTERN_INPUT_LEN {
        return Err(ExtractError::InputTooLarge {
            length,
            limit: MAX_PATTERN_INPUT_LEN,
        });
    }
    Ok(())
}
