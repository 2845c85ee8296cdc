//! JOCF Validator
//!
//! Schema-driven validation of Japan Open Cap Format (JOCF) documents.
//!
//! A JOCF document ("file") carries a `file_type` discriminator and an `items`
//! array of objects, each carrying an `object_type` discriminator. The schema
//! corpus is loaded once into a [`SchemaIndex`]; validators then pick the
//! schema for each file and object by its discriminator and report every
//! problem they find as a human-readable line in a [`ValidationResult`].
//!
//! # Example
//!
//! ```
//! use jocf_validator::{JocfValidator, SchemaIndex};
//! use serde_json::json;
//!
//! let index = SchemaIndex::from_schemas("schema", vec![
//!     ("files/HoldersFile.schema.json", json!({
//!         "$id": "https://example.com/schema/files/HoldersFile.schema.json",
//!         "properties": {
//!             "file_type": { "const": "JOCF_SECURITY_HOLDERS_FILE" },
//!             "items": { "items": { "$ref": "../objects/SecurityHolder.schema.json" } }
//!         },
//!         "required": ["file_type", "items"]
//!     })),
//!     ("objects/SecurityHolder.schema.json", json!({
//!         "$id": "https://example.com/schema/objects/SecurityHolder.schema.json",
//!         "properties": {
//!             "object_type": { "const": "SECURITY_HOLDER" },
//!             "name": { "type": "string" }
//!         },
//!         "required": ["object_type", "name"]
//!     })),
//! ])?;
//!
//! let validator = JocfValidator::from_index(index)?;
//! let result = validator.validate_value(&json!({
//!     "file_type": "JOCF_SECURITY_HOLDERS_FILE",
//!     "items": [{ "object_type": "SECURITY_HOLDER" }]
//! }));
//!
//! assert!(!result.is_valid());
//! assert!(result.errors()[0].starts_with("items[0] object validation error"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Error categories
//!
//! | Category | Matched by |
//! |----------|------------|
//! | object validation | `object validation error` (errors inside `items[i]` or a nested attribute) |
//! | type check | `is not allowed`, `no schema found` |
//! | schema | `schema validation error` |
//! | other | anything else (missing top-level attributes, unreadable input) |

mod config;
mod error;
mod file_validator;
mod index;
mod linter;
mod loader;
mod object_validator;
mod registry;
mod result;
mod types;
mod validator;

pub use config::{
    expand_env_vars, find_project_root, OutputFormat, OutputSettings, SchemaSettings,
    ValidationSettings, ValidatorConfig, CONFIG_FILE_NAMES,
};
pub use error::{ConfigError, DocumentError, ReferenceError, SchemaLoadError, SetupError};
pub use file_validator::FileValidator;
pub use index::{IndexedSchema, SchemaIndex, SCHEMA_FILE_SUFFIX};
pub use linter::{lint, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_document, load_schema, navigate_fragment};
pub use object_validator::{ObjectValidator, DEFAULT_MAX_ERRORS_PER_OBJECT};
pub use registry::{join_reference, schema_id, SchemaRegistry};
pub use result::{
    AggregatedSummary, AggregatedValidationResult, ErrorCategories, ErrorCategory,
    ValidationResult, ValidationSummary,
};
pub use types::{
    declared_object_type, json_type_name, Discriminator, FileType, ObjectType, SchemaId, TagError,
    FILE_TYPE_KEY, ITEMS_KEY, OBJECT_TYPE_KEY,
};
pub use validator::{validate_document, JocfValidator};
