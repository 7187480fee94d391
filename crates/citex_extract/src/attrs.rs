//! Attribute extraction from a single citation tag.
//!
//! A tiny order-independent grammar: `name = ('...'|"...")` where the
//! quoted value may contain backslash-escaped quotes. Callers pass every
//! alias a field is known under, so extraction works on raw tags before
//! normalization has canonicalized the names. Compiled matchers are cached
//! per attribute name; one document can hold hundreds of tags and the same
//! handful of names.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use regex::Regex;

use crate::error::Result;
use crate::guard;

/// Pure memoization of compiled per-name matchers. Populated on first use,
/// read concurrently afterwards; holds no per-call state.
static ATTR_PATTERNS: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

fn pattern_for(name: &str) -> Regex {
    let cache = ATTR_PATTERNS.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(pattern) = cache
        .read()
        .expect("attribute pattern cache poisoned")
        .get(name)
    {
        return pattern.clone();
    }
    // The name is regex-escaped, so the pattern always compiles.
    let source = format!(
        r#"{}\s*=\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#,
        regex::escape(name)
    );
    let pattern = Regex::new(&source).unwrap();
    cache
        .write()
        .expect("attribute pattern cache poisoned")
        .insert(name.to_string(), pattern.clone());
    pattern
}

/// Extract the first matching attribute value from a tag.
///
/// Candidate names are tried in order; the returned value is raw, with its
/// backslash escapes still in place. An oversized tag surfaces the
/// input-length guard error rather than silently matching nothing.
pub fn extract_attribute(tag: &str, candidate_names: &[&str]) -> Result<Option<String>> {
    guard::check_pattern_input(tag)?;
    for name in candidate_names {
        let pattern = pattern_for(name);
        if let Some(captures) = pattern.captures(tag) {
            if let Some(value) = captures.get(1).or_else(|| captures.get(2)) {
                return Ok(Some(value.as_str().to_string()));
            }
        }
    }
    Ok(None)
}
