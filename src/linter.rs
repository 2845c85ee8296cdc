//! Schema corpus linting.
//!
//! Checks a schema directory for problems that would otherwise only surface
//! while validating documents:
//! - JSON syntax errors
//! - `$ref`s that do not resolve within the corpus (missing document or anchor)
//! - discriminators or `$id`s declared twice
//! - schemas without `$id`, and schemas under `files/` or `objects/` that
//!   declare no discriminator

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::SchemaLoadError;
use crate::loader::load_schema;
use crate::registry::{join_reference, schema_id, RegistryBuilder, SchemaRegistry};
use crate::types::Discriminator;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// JSON path to the issue (e.g., "/properties/share_price/$ref")
    pub path: String,
    pub message: String,
}

/// Result of linting a single schema file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    /// Path relative to the corpus root.
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a schema corpus.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if no file has errors.
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

struct ParsedSchema {
    relative: String,
    schema: Option<Value>,
    diagnostics: Vec<Diagnostic>,
}

/// Lint every schema file (by `suffix`) below `root`, or `root` itself when
/// it is a file.
///
/// References are resolved against the whole corpus, the same way the
/// validator resolves them. If `strict` is true, warnings count as failures.
///
/// # Errors
///
/// Fails only if `root` does not exist or cannot be traversed. Broken
/// schema files are reported as diagnostics.
pub fn lint(root: &Path, suffix: &str, strict: bool) -> Result<LintResult, SchemaLoadError> {
    let mut parsed = Vec::new();
    for file in collect_schema_files(root, suffix)? {
        let relative = relative_path(root, &file);
        match load_schema(&file) {
            Ok(schema) => parsed.push(ParsedSchema {
                relative,
                schema: Some(schema),
                diagnostics: Vec::new(),
            }),
            Err(e) => parsed.push(ParsedSchema {
                relative,
                schema: None,
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    code: "E001",
                    path: "/".to_string(),
                    message: format!("syntax error: {e}"),
                }],
            }),
        }
    }

    let registry = build_registry(&parsed);
    check_duplicates(&mut parsed);
    for entry in &mut parsed {
        if let Some(schema) = &entry.schema {
            let base = schema_id(schema).unwrap_or(&entry.relative).to_string();
            check_refs(schema, &base, "", &registry, &mut entry.diagnostics);
            check_shape(schema, &entry.relative, &mut entry.diagnostics);
        }
    }

    let results: Vec<FileResult> = parsed.into_iter().map(file_result).collect();
    let errors = count(&results, Severity::Error);
    let warnings = count(&results, Severity::Warning);
    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    tracing::debug!(files = results.len(), errors, warnings, "linted schema corpus");
    Ok(LintResult {
        path: root.to_path_buf(),
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors,
        warnings,
        results,
    })
}

fn build_registry(parsed: &[ParsedSchema]) -> SchemaRegistry {
    let mut builder = RegistryBuilder::new();
    for entry in parsed {
        if let Some(schema) = &entry.schema {
            builder.insert(&entry.relative, schema.clone().into());
        }
    }
    builder.build()
}

/// Flag the second and later declarations of a discriminator or `$id`.
fn check_duplicates(parsed: &mut [ParsedSchema]) {
    let mut seen: HashMap<String, String> = HashMap::new();
    for entry in parsed.iter_mut() {
        let Some(schema) = &entry.schema else {
            continue;
        };

        let mut claims = Vec::new();
        if let Some(id) = schema_id(schema) {
            claims.push(("$id", id.to_string(), format!("$id \"{id}\"")));
        }
        match Discriminator::of_schema(schema) {
            Some(Discriminator::File(tag)) => claims.push((
                "/properties/file_type",
                format!("file_type:{tag}"),
                format!("file_type \"{tag}\""),
            )),
            Some(Discriminator::Object(tag)) => claims.push((
                "/properties/object_type",
                format!("object_type:{tag}"),
                format!("object_type \"{tag}\""),
            )),
            None => {}
        }

        for (path, key, label) in claims {
            match seen.get(&key) {
                Some(first) => entry.diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    code: "E004",
                    path: path.to_string(),
                    message: format!("{label} is already declared by {first}"),
                }),
                None => {
                    seen.insert(key, entry.relative.clone());
                }
            }
        }
    }
}

/// Recursively check `$ref` values, tracking the base URI through nested `$id`s.
fn check_refs(
    value: &Value,
    base: &str,
    path: &str,
    registry: &SchemaRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            let nested;
            let base = match map.get("$id").and_then(Value::as_str) {
                Some(id) if !path.is_empty() => {
                    nested = join_reference(Some(base), id);
                    nested.as_str()
                }
                _ => base,
            };

            if let Some(Value::String(reference)) = map.get("$ref") {
                check_single_ref(reference, base, path, registry, diagnostics);
            }

            for (key, val) in map {
                let child_path = format!("{path}/{key}");
                check_refs(val, base, &child_path, registry, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{path}/{i}");
                check_refs(item, base, &child_path, registry, diagnostics);
            }
        }
        _ => {}
    }
}

fn check_single_ref(
    reference: &str,
    base: &str,
    path: &str,
    registry: &SchemaRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if registry.resolve(Some(base), reference).is_ok() {
        return;
    }

    let document = reference.split('#').next().unwrap_or_default();
    let (code, message) = if reference.starts_with('#') {
        ("E003", format!("anchor not found: {reference}"))
    } else if registry.resolve(Some(base), document).is_ok() {
        ("E003", format!("anchor not found in {document}: {reference}"))
    } else {
        (
            "E002",
            format!(
                "unresolved $ref {reference} (resolved to {})",
                join_reference(Some(base), reference)
            ),
        )
    };
    diagnostics.push(Diagnostic {
        severity: Severity::Error,
        code,
        path: format!("{path}/$ref"),
        message,
    });
}

fn check_shape(schema: &Value, relative: &str, diagnostics: &mut Vec<Diagnostic>) {
    if schema_id(schema).is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W002",
            path: "/".to_string(),
            message: "schema missing $id field".to_string(),
        });
    }

    let expected = match relative.split('/').next() {
        Some("files") => "file_type",
        Some("objects") => "object_type",
        _ => return,
    };
    if Discriminator::of_schema(schema).is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W003",
            path: "/properties".to_string(),
            message: format!(
                "schema declares no {expected} discriminator; it cannot be selected during validation"
            ),
        });
    }
}

fn file_result(entry: ParsedSchema) -> FileResult {
    let has_errors = entry.diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = entry.diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: PathBuf::from(entry.relative),
        status,
        diagnostics: entry.diagnostics,
    }
}

fn count(results: &[FileResult], severity: Severity) -> usize {
    results
        .iter()
        .flat_map(|r| &r.diagnostics)
        .filter(|d| d.severity == severity)
        .count()
}

/// Collect schema files in a path (file or directory), sorted.
fn collect_schema_files(path: &Path, suffix: &str) -> Result<Vec<PathBuf>, SchemaLoadError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(SchemaLoadError::RootNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|source| SchemaLoadError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn relative_path(root: &Path, file: &Path) -> String {
    let relative = match file.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => Path::new(file.file_name().unwrap_or(file.as_os_str())),
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
