//! Citation extraction from response envelopes.
//!
//! The `<source>` block is a repr-like list of mappings (single-quoted
//! strings, raw newlines inside `content`), not strict JSON, and the
//! surrounding text is LLM-influenced. Extraction is therefore
//! best-effort: it normalizes quoting, bounds the scan, recovers the
//! fragments it can and drops (with a log line) the ones it cannot.
//! It never fails the whole call.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

static RESPONSE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<response>(.*?)</response>").unwrap_or_else(|e| unreachable!("{e}"))
});
static SOURCE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<source>(.*?)</source>").unwrap_or_else(|e| unreachable!("{e}"))
});
// Non-nested fragment boundary: stops at the first closing brace.
// Source documents never contain braces; nested braces would mis-parse
// and that is an accepted limitation of this recovery path.
static FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap_or_else(|e| unreachable!("{e}")));
static CONTENT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#",\s*"content":[^}]*"#).unwrap_or_else(|e| unreachable!("{e}"))
});

const REQUIRED_KEYS: [&str; 3] = ["file_name", "url", "page"];

/// One extracted citation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationDocument {
    /// Document title, taken from the source's file name.
    pub title: String,
    /// Public URL of the document.
    pub url: String,
    /// Page reference; number or string depending on upstream metadata.
    pub page: Value,
}

/// Structured output of one extraction pass.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedResponse {
    /// Answer text from the last `<response>` block.
    pub text: String,
    /// Reserved for future extensions; always empty.
    pub images: Vec<Value>,
    /// Reserved for future extensions; always empty.
    pub experts: Vec<Value>,
    /// Citations recovered from the last `<source>` block, in discovery
    /// order.
    pub documents: Vec<CitationDocument>,
}

/// Extracts the answer text and citations from an envelope.
///
/// Only the *last* `<response>` and `<source>` blocks are authoritative;
/// history folded into the input may contain earlier ones. The two
/// blocks are located independently and either may be absent.
#[must_use]
pub fn extract(input: &str) -> ExtractedResponse {
    ExtractedResponse {
        text: extract_last_response(input),
        images: Vec::new(),
        experts: Vec::new(),
        documents: extract_last_source(input),
    }
}

/// Text of the last `<response>` block, trimmed. Empty when absent.
fn extract_last_response(input: &str) -> String {
    RESPONSE_BLOCK
        .captures_iter(input)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Citations from the last `<source>` block. Empty when absent or
/// unrecoverable.
fn extract_last_source(input: &str) -> Vec<CitationDocument> {
    let Some(block) = SOURCE_BLOCK
        .captures_iter(input)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
    else {
        warn!("no <source> block found in input");
        return Vec::new();
    };

    parse_source_block(block)
        .into_iter()
        .map(|record| CitationDocument {
            title: record
                .get("file_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            url: record
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            page: record.get("page").cloned().unwrap_or(Value::Null),
        })
        .collect()
}

/// Recovers record objects from one repr-like source block.
fn parse_source_block(block: &str) -> Vec<serde_json::Map<String, Value>> {
    // Single quotes become double quotes wholesale. This also turns the
    // repr escape \' into the valid JSON escape \", so escaped quotes in
    // string fields survive the swap.
    let normalized = block.replace('\'', "\"");

    // Bound the scan to the list literal.
    let (Some(start), Some(end)) = (normalized.find('['), normalized.rfind(']')) else {
        warn!("source block contains no list literal");
        return Vec::new();
    };
    if start >= end {
        return Vec::new();
    }
    let bounded = &normalized[start..=end];

    let mut records = Vec::new();
    for fragment in FRAGMENT.find_iter(bounded) {
        // The content field is large arbitrary free text and is not
        // needed downstream; drop it before structural parsing.
        let stripped = CONTENT_FIELD.replace(fragment.as_str(), "");

        if !REQUIRED_KEYS
            .iter()
            .all(|key| stripped.contains(&format!("\"{key}\"")))
        {
            continue;
        }

        match serde_json::from_str::<serde_json::Map<String, Value>>(&stripped) {
            Ok(record) if REQUIRED_KEYS.iter().all(|key| record.contains_key(*key)) => {
                records.push(record);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "discarding unparsable citation fragment");
            }
        }
    }
    records
}
