//! JSON loading for schema files and JOCF documents.

use std::path::Path;

use serde_json::Value;

use crate::error::{DocumentError, SchemaLoadError};

/// Load a JOCF document from a file path.
///
/// # Errors
///
/// Returns `DocumentError::FileNotFound` if the file doesn't exist,
/// or `DocumentError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| DocumentError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Load one schema file of the corpus.
///
/// # Errors
///
/// Unreadable files and malformed JSON are both reported; callers treat
/// either as fatal for the whole corpus.
pub fn load_schema(path: &Path) -> Result<Value, SchemaLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| SchemaLoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| SchemaLoadError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Navigate a JSON Pointer fragment (e.g., "#/$defs/foo" or "#/properties/bar").
///
/// Returns `None` when any segment is missing. An empty fragment (`#`)
/// yields the document itself.
pub fn navigate_fragment<'a>(document: &'a Value, fragment: &str) -> Option<&'a Value> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Some(document);
    }

    let mut current = document;
    for part in path.split('/') {
        current = step(current, &unescape_pointer(part))?;
    }
    Some(current)
}

/// Move one JSON Pointer segment into `value`, indexing arrays numerically.
pub(crate) fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    }
}

/// Unescape JSON Pointer encoding (~1 = /, ~0 = ~).
pub(crate) fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
