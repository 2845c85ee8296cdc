//! Validation outcomes: error accumulation, classification and aggregation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Marks an error raised while validating a nested object.
pub(crate) const OBJECT_VALIDATION_ERROR: &str = "object validation error";
/// Marks a structural violation reported by the schema engine.
pub(crate) const SCHEMA_VALIDATION_ERROR: &str = "schema validation error";
/// Marks a discriminator outside a file's allow-list.
pub(crate) const NOT_ALLOWED: &str = "is not allowed";
/// Marks a discriminator with no schema in the corpus.
pub(crate) const NO_SCHEMA_FOUND: &str = "no schema found";
/// Marks a document that could not be read at all.
pub(crate) const FILE_VALIDATION_ERROR: &str = "file validation error";

/// Coarse classification of an error message, for summaries only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ObjectValidation,
    TypeCheck,
    Schema,
    Other,
}

impl ErrorCategory {
    /// Classify an error message by its wording.
    ///
    /// Object-validation context wins over everything else, so a nested
    /// schema violation under `items[3]` counts as an object-validation error.
    pub fn classify(message: &str) -> Self {
        if message.contains(OBJECT_VALIDATION_ERROR) {
            ErrorCategory::ObjectValidation
        } else if message.contains(NOT_ALLOWED) || message.contains(NO_SCHEMA_FOUND) {
            ErrorCategory::TypeCheck
        } else if message.contains(SCHEMA_VALIDATION_ERROR) {
            ErrorCategory::Schema
        } else {
            ErrorCategory::Other
        }
    }
}

/// Per-category error counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCategories {
    pub object_validation_errors: usize,
    pub type_check_errors: usize,
    pub schema_errors: usize,
    pub other_errors: usize,
}

/// Summary view over a [`ValidationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_errors: usize,
    pub validation_success: bool,
    pub error_categories: ErrorCategories,
}

/// Outcome of one validation call.
///
/// Errors keep discovery order. Validity is false as soon as one error has
/// been added and never flips back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<PathBuf>,
    validated_objects: usize,
    #[serde(skip_serializing_if = "is_false")]
    input_error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            file_path: None,
            validated_objects: 0,
            input_error: false,
        }
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result for a document that could not be read or parsed.
    pub fn input_error(path: &Path, message: impl fmt::Display) -> Self {
        let mut result = Self::new().with_file_path(path);
        result.add_error(format!("{FILE_VALIDATION_ERROR}: {message}"));
        result.input_error = true;
        result
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn add_errors<I, S>(&mut self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for message in messages {
            self.add_error(message);
        }
    }

    /// Append another result's errors and object count.
    pub fn merge(&mut self, other: ValidationResult) {
        self.add_errors(other.errors);
        self.validated_objects += other.validated_objects;
        self.input_error |= other.input_error;
    }

    /// Like [`merge`](Self::merge), prefixing every error with `prefix`.
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationResult) {
        self.add_errors(
            other
                .errors
                .into_iter()
                .map(|e| format!("{prefix} {OBJECT_VALIDATION_ERROR}: {e}")),
        );
        self.validated_objects += other.validated_objects;
    }

    pub(crate) fn record_object(&mut self) {
        self.validated_objects += 1;
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Number of objects handed to the object validator.
    pub fn validated_objects(&self) -> usize {
        self.validated_objects
    }

    /// True when the document could not even be read.
    pub fn is_input_error(&self) -> bool {
        self.input_error
    }

    /// Errors grouped by category, each group in discovery order.
    pub fn errors_by_category(&self) -> BTreeMap<ErrorCategory, Vec<&str>> {
        let mut grouped: BTreeMap<ErrorCategory, Vec<&str>> = BTreeMap::new();
        for error in &self.errors {
            grouped
                .entry(ErrorCategory::classify(error))
                .or_default()
                .push(error);
        }
        grouped
    }

    pub fn summary(&self) -> ValidationSummary {
        let mut categories = ErrorCategories::default();
        for error in &self.errors {
            match ErrorCategory::classify(error) {
                ErrorCategory::ObjectValidation => categories.object_validation_errors += 1,
                ErrorCategory::TypeCheck => categories.type_check_errors += 1,
                ErrorCategory::Schema => categories.schema_errors += 1,
                ErrorCategory::Other => categories.other_errors += 1,
            }
        }
        ValidationSummary {
            total_errors: self.errors.len(),
            validation_success: self.is_valid,
            error_categories: categories,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.file_path {
            write!(f, "{}: ", path.display())?;
        }
        if self.is_valid {
            return write!(f, "valid");
        }
        write!(f, "invalid ({} error(s))", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

/// Results for a batch of documents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedValidationResult {
    results: Vec<ValidationResult>,
}

/// Batch totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregatedSummary {
    pub total_files: usize,
    pub valid_files: usize,
    pub invalid_files: usize,
    pub total_errors: usize,
    pub validated_objects: usize,
}

impl AggregatedValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    /// Move every result of `other` to the end of this batch.
    pub fn append(&mut self, other: AggregatedValidationResult) {
        self.results.extend(other.results);
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// True when every document is valid. An empty batch is valid.
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(ValidationResult::is_valid)
    }

    pub fn has_input_errors(&self) -> bool {
        self.results.iter().any(ValidationResult::is_input_error)
    }

    pub fn summary(&self) -> AggregatedSummary {
        let valid_files = self.results.iter().filter(|r| r.is_valid()).count();
        AggregatedSummary {
            total_files: self.results.len(),
            valid_files,
            invalid_files: self.results.len() - valid_files,
            total_errors: self.results.iter().map(ValidationResult::error_count).sum(),
            validated_objects: self.results.iter().map(ValidationResult::validated_objects).sum(),
        }
    }
}

impl FromIterator<ValidationResult> for AggregatedValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}
