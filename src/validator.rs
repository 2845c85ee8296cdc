//! Document validation entry points.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobMatcher;
use serde_json::Value;
use walkdir::WalkDir;

use crate::config::ValidatorConfig;
use crate::error::{DocumentError, SetupError};
use crate::file_validator::FileValidator;
use crate::index::SchemaIndex;
use crate::loader::load_document;
use crate::object_validator::ObjectValidator;
use crate::result::{AggregatedValidationResult, ValidationResult};

/// Read a JOCF document from `path` and validate it.
///
/// A missing file or malformed JSON yields an input-error result rather than
/// an `Err`, so batch callers can keep going.
pub fn validate_document(validator: &FileValidator, path: &Path) -> ValidationResult {
    match load_document(path) {
        Ok(document) => {
            let result = validator.validate(&document).with_file_path(path);
            tracing::debug!(
                path = %path.display(),
                valid = result.is_valid(),
                errors = result.error_count(),
                "validated document"
            );
            result
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "document not readable");
            ValidationResult::input_error(path, e)
        }
    }
}

/// A loaded schema corpus plus everything needed to validate documents
/// against it.
///
/// # Example
///
/// ```no_run
/// use jocf_validator::JocfValidator;
///
/// let validator = JocfValidator::from_schema_root("schema")?;
/// let result = validator.validate("samples/transactions.jocf.json");
/// if !result.is_valid() {
///     for error in result.errors() {
///         eprintln!("{error}");
///     }
/// }
/// # Ok::<(), jocf_validator::SetupError>(())
/// ```
pub struct JocfValidator {
    files: FileValidator,
    documents: GlobMatcher,
}

impl JocfValidator {
    /// Load the schema corpus named by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the corpus cannot be loaded or the document pattern is invalid.
    pub fn new(config: &ValidatorConfig) -> Result<Self, SetupError> {
        let documents = config.document_matcher()?;
        let index =
            SchemaIndex::load_with_suffix(config.schema_root(), &config.schema.file_suffix)?;
        let objects =
            ObjectValidator::new(&index).with_max_errors(config.validation.max_errors_per_object);
        Ok(Self {
            files: FileValidator::with_object_validator(Arc::new(index), objects),
            documents,
        })
    }

    /// Load the corpus at `root` with otherwise default settings.
    pub fn from_schema_root(root: impl AsRef<Path>) -> Result<Self, SetupError> {
        Self::new(&ValidatorConfig::default().with_schema_root(root))
    }

    /// Wrap an already built index with default settings.
    pub fn from_index(index: SchemaIndex) -> Result<Self, SetupError> {
        let documents = ValidatorConfig::default().document_matcher()?;
        Ok(Self {
            files: FileValidator::new(Arc::new(index)),
            documents,
        })
    }

    pub fn index(&self) -> &SchemaIndex {
        self.files.index()
    }

    pub fn file_validator(&self) -> &FileValidator {
        &self.files
    }

    /// Validate the document stored at `path`.
    pub fn validate(&self, path: impl AsRef<Path>) -> ValidationResult {
        validate_document(&self.files, path.as_ref())
    }

    /// Validate an in-memory document.
    pub fn validate_value(&self, document: &Value) -> ValidationResult {
        self.files.validate(document)
    }

    /// Validate several documents, in the order given.
    pub fn validate_many<I, P>(&self, paths: I) -> AggregatedValidationResult
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().map(|p| self.validate(p)).collect()
    }

    /// Validate every document below `dir` whose file name matches the
    /// configured document pattern. Files are visited in sorted path order.
    ///
    /// # Errors
    ///
    /// Fails if `dir` does not exist or cannot be traversed.
    pub fn validate_directory(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<AggregatedValidationResult, DocumentError> {
        let paths = self.find_documents(dir.as_ref())?;
        tracing::info!(
            dir = %dir.as_ref().display(),
            documents = paths.len(),
            "validating directory"
        );
        Ok(self.validate_many(paths))
    }

    fn find_documents(&self, dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
        if !dir.is_dir() {
            return Err(DocumentError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| DocumentError::ReadError {
                path: e.path().unwrap_or(dir).to_path_buf(),
                source: e.into(),
            })?;
            if entry.file_type().is_file() && self.documents.is_match(entry.file_name()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}
