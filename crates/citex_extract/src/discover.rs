//! Recursive citation discovery in structured output.
//!
//! When the model's output is itself JSON, citations arrive as
//! `citation`/`citations` properties buried at arbitrary depth rather
//! than as text. This walks the value tree looking for properties that
//! already look like structured citation records and collects them. The
//! traversal is depth-bounded: adversarially deep (or, via serialization
//! bugs, effectively circular) structures silently stop recursing instead
//! of blowing the stack. Duplicates are not filtered here; the
//! content-addressed key collapses them downstream.

use serde_json::{Map, Value};

use citex_core::Citation;

use crate::deferred;
use crate::fields;

/// Maximum nesting depth explored.
pub const MAX_TRAVERSAL_DEPTH: usize = 50;

/// Property names that hold citation payloads.
const CITATION_KEYS: &[&str] = &["citation", "citations"];

/// Collect every citation-shaped record reachable in `value`.
pub fn discover_citations(value: &Value) -> Vec<Citation> {
    let mut found = Vec::new();
    walk(value, 0, &mut found);
    found
}

fn walk(value: &Value, depth: usize, found: &mut Vec<Citation>) {
    if depth > MAX_TRAVERSAL_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if CITATION_KEYS.contains(&key.as_str()) && fields::is_citation_shaped(child) {
                    collect(child, found);
                } else {
                    walk(child, depth + 1, found);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, found);
            }
        }
        _ => {}
    }
}

/// A matched property holds either one citation object or an array of
/// them. Field names may be in any casing; the shared object builder
/// canonicalizes them.
fn collect(value: &Value, found: &mut Vec<Citation>) {
    match value {
        Value::Object(map) => found.push(build(map)),
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    found.push(build(map));
                }
            }
        }
        _ => {}
    }
}

fn build(map: &Map<String, Value>) -> Citation {
    let mut canonical = Map::new();
    for (key, value) in map {
        let name = fields::canonical_attribute(key)
            .map(str::to_string)
            .unwrap_or_else(|| key.clone());
        canonical.entry(name).or_insert_with(|| value.clone());
    }
    deferred::citation_from_object(&canonical)
}
