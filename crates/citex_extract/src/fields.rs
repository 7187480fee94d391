//! Canonical attribute names and their known aliases.
//!
//! Models emit attribute names in whatever casing they last saw: camelCase,
//! snake_case, legacy names (`fileId`, `keySpan`), or markdown-mangled
//! variants. Everything funnels through the static tables here, so adding a
//! newly observed alias is a one-line change covered by the exhaustiveness
//! tests below.

use serde_json::Value;

/// Canonical attribute name for the source document id.
pub const ATTACHMENT_ID: &str = "attachment_id";
/// Canonical attribute name for the quoted phrase.
pub const FULL_PHRASE: &str = "full_phrase";
/// Canonical attribute name for the anchor span.
pub const ANCHOR_TEXT: &str = "anchor_text";
/// Canonical attribute name for source line ids.
pub const LINE_IDS: &str = "line_ids";
/// Canonical attribute name for the page locator. The normalized tag keeps
/// the `start_page_key` spelling; the `Citation` field is `start_page_id`.
pub const START_PAGE_KEY: &str = "start_page_key";
/// Canonical attribute name for audio/video timestamps.
pub const TIMESTAMPS: &str = "timestamps";
/// Canonical attribute name for the model's justification.
pub const REASONING: &str = "reasoning";
/// Canonical attribute name for the catch-all value attribute.
pub const VALUE: &str = "value";

/// Aliases tried, in order, when pulling each field out of a raw tag.
pub const ATTACHMENT_ID_ALIASES: &[&str] =
    &["attachment_id", "attachmentId", "fileId", "fileID", "file_id"];
pub const FULL_PHRASE_ALIASES: &[&str] = &["full_phrase", "fullPhrase"];
pub const ANCHOR_TEXT_ALIASES: &[&str] =
    &["anchor_text", "anchorText", "key_span", "keySpan"];
pub const LINE_IDS_ALIASES: &[&str] = &["line_ids", "lineIds", "lineIDs"];
pub const START_PAGE_KEY_ALIASES: &[&str] = &[
    "start_page_key",
    "startPageKey",
    "start_page_id",
    "startPageId",
    "page_id",
    "pageId",
];
pub const TIMESTAMPS_ALIASES: &[&str] = &["timestamps", "timeStamps"];
pub const REASONING_ALIASES: &[&str] = &["reasoning"];
pub const VALUE_ALIASES: &[&str] = &["value"];

/// Map any known alias (in any casing) to its canonical attribute name.
///
/// Matching folds case and underscores, so `fullPhrase`, `FULL_PHRASE`,
/// and `fullphrase` all land on `full_phrase`. Unrecognized names return
/// `None`; the normalizer carries them through verbatim.
pub fn canonical_attribute(name: &str) -> Option<&'static str> {
    let folded: String = name
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match folded.as_str() {
        "attachmentid" | "fileid" => Some(ATTACHMENT_ID),
        "fullphrase" => Some(FULL_PHRASE),
        "anchortext" | "keyspan" => Some(ANCHOR_TEXT),
        "lineids" => Some(LINE_IDS),
        "startpagekey" | "startpageid" | "pageid" => Some(START_PAGE_KEY),
        "timestamps" => Some(TIMESTAMPS),
        "reasoning" => Some(REASONING),
        "value" => Some(VALUE),
        _ => None,
    }
}

/// Expand a deferred-JSON single-letter shorthand key.
///
/// `t` expands to `timestamps`, whose own object uses `s`/`e` for
/// `start_time`/`end_time` (handled where the timestamps object is read).
pub fn expand_shorthand_key(key: &str) -> Option<&'static str> {
    match key {
        "n" => Some("id"),
        "a" => Some(ATTACHMENT_ID),
        "r" => Some(REASONING),
        "f" => Some(FULL_PHRASE),
        "k" => Some(ANCHOR_TEXT),
        "p" => Some("page_id"),
        "l" => Some(LINE_IDS),
        "t" => Some(TIMESTAMPS),
        _ => None,
    }
}

/// Canonical attribute order for document citations. Unknown extras are
/// appended alphabetically after these.
pub const DOCUMENT_ORDER: &[&str] = &[
    ATTACHMENT_ID,
    START_PAGE_KEY,
    FULL_PHRASE,
    ANCHOR_TEXT,
    LINE_IDS,
    REASONING,
    VALUE,
];

/// Canonical attribute order for audio/video citations (detected by the
/// presence of `timestamps`).
pub const MEDIA_ORDER: &[&str] =
    &[ATTACHMENT_ID, FULL_PHRASE, ANCHOR_TEXT, TIMESTAMPS, REASONING, VALUE];

/// Attributes holding free text, subject to entity/markdown/quote cleanup.
pub const TEXT_ATTRIBUTES: &[&str] = &[FULL_PHRASE, ANCHOR_TEXT, REASONING, VALUE];

/// Attributes holding range expressions, subject to range cleanup.
pub const RANGE_ATTRIBUTES: &[&str] = &[LINE_IDS, TIMESTAMPS];

/// Whether a JSON value already looks like a structured citation.
///
/// An object qualifies when at least one of its keys is a recognized
/// citation field in any casing. An array qualifies when it is non-empty
/// and every element is a qualifying object. Used by recursive discovery
/// to decide whether a `citation`/`citations` property is worth
/// collecting.
pub fn is_citation_shaped(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.keys().any(|k| canonical_attribute(k).is_some()),
        Value::Array(items) => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|item| matches!(item, Value::Object(_)) && is_citation_shaped(item))
        }
        _ => false,
    }
}
