//! Reference Registry: schema identifier to schema body, used for `$ref`.
//!
//! The registry is assembled once by [`SchemaIndex::load_all`] and handed to
//! validators explicitly. Compiled validators resolve cross-file references
//! through [`LocalRetriever`], so no network or filesystem access happens
//! during validation.
//!
//! Each schema is registered under its `$id` (when present) and under its path
//! relative to the corpus root. The path form lets a relative reference, or
//! one resolved against jsonschema's host-less `json-schema:///` base, find
//! the file whose path matches the reference's tail. References naming a host
//! resolve only through `$id`.
//!
//! [`SchemaIndex::load_all`]: crate::SchemaIndex::load_all

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;

use crate::error::ReferenceError;
use crate::loader::navigate_fragment;

#[derive(Debug, Default)]
struct Documents {
    by_id: HashMap<String, Arc<Value>>,
    by_path: HashMap<String, Arc<Value>>,
}

impl Documents {
    /// Find the document a URI (without fragment) points at.
    fn document(&self, uri: &str) -> Option<&Value> {
        let uri = strip_empty_fragment(uri);
        if let Some(doc) = self.by_id.get(uri) {
            return Some(doc);
        }
        if let Some(doc) = self.by_path.get(uri.trim_start_matches("./")) {
            return Some(doc);
        }

        // URIs naming a host must match an `$id` exactly.
        if !is_local(uri) {
            return None;
        }

        // Longest relative path that is a suffix of the URI's path.
        self.by_path
            .iter()
            .filter(|(path, _)| {
                uri.len() > path.len()
                    && uri.ends_with(path.as_str())
                    && uri.as_bytes()[uri.len() - path.len() - 1] == b'/'
            })
            .max_by_key(|(path, _)| path.len())
            .map(|(_, doc)| doc.as_ref())
    }
}

/// Identifier → schema body map shared by every validator built from one
/// schema corpus. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    documents: Arc<Documents>,
}

/// Incremental construction of a [`SchemaRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    documents: Documents,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its relative path (`/` separators) and, when
    /// it declares one, its `$id`.
    pub fn insert(&mut self, relative_path: &str, schema: Arc<Value>) {
        self.documents
            .by_path
            .insert(relative_path.to_string(), Arc::clone(&schema));

        if let Some(id) = schema_id(&schema) {
            let id = id.to_string();
            self.documents.by_id.insert(id, schema);
        }
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            documents: Arc::new(self.documents),
        }
    }
}

impl SchemaRegistry {
    /// Number of schemas registered under an `$id`.
    pub fn len(&self) -> usize {
        self.documents.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.by_id.is_empty()
    }

    /// Look up a schema by its absolute identifier.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.documents
            .by_id
            .get(strip_empty_fragment(id))
            .map(|doc| doc.as_ref())
    }

    /// All registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.documents.by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve a `$ref` found in a schema whose base identifier is `base`.
    ///
    /// Handles absolute identifiers, paths relative to `base`, and JSON
    /// Pointer fragments into the target document.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::Unresolved` when no registered document
    /// matches, or when the fragment does not exist in it.
    pub fn resolve(&self, base: Option<&str>, reference: &str) -> Result<&Value, ReferenceError> {
        let resolved = join_reference(base, reference);
        let (document_uri, fragment) = split_fragment(&resolved);

        let unresolved = || ReferenceError::Unresolved {
            reference: reference.to_string(),
            resolved: resolved.clone(),
        };

        let document = self.documents.document(document_uri).ok_or_else(unresolved)?;
        match fragment {
            Some(fragment) => navigate_fragment(document, fragment).ok_or_else(unresolved),
            None => Ok(document),
        }
    }

    /// Compile a schema into a validator whose `$ref`s resolve against this
    /// registry only.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::Compile` when the schema is invalid or one of
    /// its references cannot be retrieved.
    pub fn compile(&self, schema: &Value) -> Result<Validator, ReferenceError> {
        let mut opts = jsonschema::options();
        opts.with_retriever(LocalRetriever {
            documents: Arc::clone(&self.documents),
        });

        opts.build(schema).map_err(|e| ReferenceError::Compile {
            schema: schema_id(schema).unwrap_or("<anonymous>").to_string(),
            message: e.to_string(),
        })
    }
}

/// Retriever that serves `$ref` targets out of the registry.
///
/// Unknown URIs are an error: a partial corpus must surface as a schema
/// error instead of silently accepting anything.
struct LocalRetriever {
    documents: Arc<Documents>,
}

impl Retrieve for LocalRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        let (document_uri, _) = split_fragment(uri_str);

        match self.documents.document(document_uri) {
            Some(value) => {
                tracing::debug!(uri = uri_str, "resolved $ref from registry");
                Ok(value.clone())
            }
            None => Err(format!("schema not found in registry: {uri_str}").into()),
        }
    }
}

/// The `$id` a schema declares, without an empty trailing fragment.
pub fn schema_id(schema: &Value) -> Option<&str> {
    schema
        .get("$id")
        .and_then(Value::as_str)
        .map(strip_empty_fragment)
        .filter(|id| !id.is_empty())
}

fn strip_empty_fragment(uri: &str) -> &str {
    uri.strip_suffix('#').unwrap_or(uri)
}

fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.find('#') {
        Some(idx) => (&uri[..idx], Some(&uri[idx..])),
        None => (uri, None),
    }
}

/// True for relative references and host-less URIs such as `json-schema:///x`.
fn is_local(uri: &str) -> bool {
    match uri.find("://") {
        Some(idx) => uri[idx + 3..].starts_with('/'),
        None => !has_scheme(uri),
    }
}

fn has_scheme(reference: &str) -> bool {
    reference.contains("://") || reference.starts_with("urn:")
}

/// Resolve `reference` against `base` (RFC 3986 style, paths only).
pub fn join_reference(base: Option<&str>, reference: &str) -> String {
    let Some(base) = base else {
        return reference.to_string();
    };
    if has_scheme(reference) {
        return reference.to_string();
    }

    let (base_document, _) = split_fragment(base);
    if reference.starts_with('#') {
        return format!("{base_document}{reference}");
    }

    let (prefix, base_path) = split_authority(base_document);
    let joined = if reference.starts_with('/') {
        reference.to_string()
    } else {
        match base_path.rfind('/') {
            Some(idx) => format!("{}{}", &base_path[..=idx], reference),
            None => reference.to_string(),
        }
    };

    format!("{prefix}{}", remove_dot_segments(&joined))
}

/// Split `scheme://authority/path` into (`scheme://authority`, `/path`).
fn split_authority(uri: &str) -> (&str, &str) {
    match uri.find("://") {
        Some(scheme_end) => {
            let after = scheme_end + 3;
            match uri[after..].find('/') {
                Some(path_start) => uri.split_at(after + path_start),
                None => (uri, ""),
            }
        }
        None => ("", uri),
    }
}

fn remove_dot_segments(path: &str) -> String {
    let (path, fragment) = split_fragment(path);
    let absolute = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "." => {}
            ".." => {
                out.pop();
            }
            "" if !out.is_empty() || absolute => {}
            s => out.push(s),
        }
    }
    // Keep a trailing slash when the input had one.
    if path.ends_with('/') && !out.is_empty() {
        out.push("");
    }

    let mut normalized = out.join("/");
    if absolute {
        normalized.insert(0, '/');
    }
    if let Some(fragment) = fragment {
        normalized.push_str(fragment);
    }
    normalized
}
