//! Validation of a single JOCF object against the schema for its `object_type`.

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;

use crate::error::ReferenceError;
use crate::index::SchemaIndex;
use crate::loader::{step, unescape_pointer};
use crate::registry::{join_reference, schema_id, SchemaRegistry};
use crate::result::{ValidationResult, NO_SCHEMA_FOUND, SCHEMA_VALIDATION_ERROR};
use crate::types::{json_type_name, ObjectType, TagError, OBJECT_TYPE_KEY};

/// Default cap on structural errors reported for one object.
pub const DEFAULT_MAX_ERRORS_PER_OBJECT: usize = 100;

struct CompiledSchema {
    schema: Arc<Value>,
    validator: Result<Validator, ReferenceError>,
}

/// Validates objects by dispatching on their `object_type` discriminator.
///
/// Every object schema in the index is compiled once, up front, against the
/// index's registry. A schema that fails to compile (for instance because of
/// an unresolvable `$ref`) is kept as a failure and reported on each object
/// of that type.
pub struct ObjectValidator {
    registry: SchemaRegistry,
    compiled: BTreeMap<ObjectType, CompiledSchema>,
    max_errors: usize,
}

impl ObjectValidator {
    pub fn new(index: &SchemaIndex) -> Self {
        let registry = index.registry().clone();
        let compiled = index
            .object_schemas()
            .map(|(object_type, indexed)| {
                let validator = registry.compile(&indexed.schema);
                if let Err(e) = &validator {
                    tracing::warn!(
                        %object_type,
                        path = %indexed.path,
                        error = %e,
                        "object schema failed to compile"
                    );
                }
                (
                    object_type.clone(),
                    CompiledSchema {
                        schema: Arc::clone(&indexed.schema),
                        validator,
                    },
                )
            })
            .collect();

        Self {
            registry,
            compiled,
            max_errors: DEFAULT_MAX_ERRORS_PER_OBJECT,
        }
    }

    /// Cap the number of structural errors reported per object (minimum 1).
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors.max(1);
        self
    }

    /// Object types this validator can check, sorted.
    pub fn supported_object_types(&self) -> Vec<&ObjectType> {
        self.compiled.keys().collect()
    }

    pub fn is_valid_object_type(&self, object_type: &ObjectType) -> bool {
        self.compiled.contains_key(object_type)
    }

    /// Validate one object.
    ///
    /// Data-shape problems never fail the call; they are collected in the
    /// returned result.
    pub fn validate(&self, object: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.record_object();

        let Some(map) = object.as_object() else {
            result.add_error(format!(
                "expected a JSON object, got {}",
                json_type_name(object)
            ));
            return result;
        };

        let object_type = match ObjectType::from_value(map.get(OBJECT_TYPE_KEY)) {
            Ok(tag) => tag,
            Err(e) => {
                result.add_error(discriminator_error(e));
                return result;
            }
        };

        let Some(compiled) = self.compiled.get(&object_type) else {
            result.add_error(format!("{NO_SCHEMA_FOUND} for object_type '{object_type}'"));
            return result;
        };

        let validator = match &compiled.validator {
            Ok(validator) => validator,
            Err(e) => {
                result.add_error(format!(
                    "{SCHEMA_VALIDATION_ERROR}: schema for object_type '{object_type}' is unusable: {e}"
                ));
                return result;
            }
        };

        let mut reported = 0usize;
        let mut suppressed = 0usize;
        for error in validator.iter_errors(object) {
            // Matching several oneOf candidates is accepted.
            if matches!(error.kind, ValidationErrorKind::OneOfMultipleValid { .. }) {
                continue;
            }
            if reported == self.max_errors {
                suppressed += 1;
                continue;
            }

            let path = match error.instance_path.to_string() {
                p if p.is_empty() => "(root)".to_string(),
                p => p,
            };
            let message = if matches!(error.kind, ValidationErrorKind::OneOfNotValid { .. }) {
                let schema_path = error.schema_path.to_string();
                match self.one_of_candidates(&compiled.schema, &schema_path) {
                    Some(n) => format!("value matches none of the {n} oneOf candidates"),
                    None => "value matches none of the oneOf candidates".to_string(),
                }
            } else {
                error.to_string()
            };

            result.add_error(format!("{SCHEMA_VALIDATION_ERROR} at {path}: {message}"));
            reported += 1;
        }

        if suppressed > 0 {
            result.add_error(format!(
                "{SCHEMA_VALIDATION_ERROR}: {suppressed} further error(s) for object_type '{object_type}' suppressed"
            ));
        }
        result
    }

    /// Validate a list of objects, prefixing errors with the list index.
    pub fn validate_objects(&self, objects: &[Value]) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (i, object) in objects.iter().enumerate() {
            result.merge_prefixed(&format!("[{i}]"), self.validate(object));
        }
        result
    }

    /// Count the candidates of the `oneOf` a schema path points at.
    ///
    /// Walks the path from the object schema, following `$ref` segments
    /// through the registry. Each step is a single hop, so reference cycles
    /// cannot cause unbounded recursion.
    fn one_of_candidates(&self, root: &Value, schema_path: &str) -> Option<usize> {
        let mut current = root;
        let mut base = schema_id(root).map(str::to_string);

        for raw in schema_path.split('/').filter(|s| !s.is_empty()) {
            let segment = unescape_pointer(raw);
            if segment == "$ref" {
                let reference = current.get("$ref")?.as_str()?;
                let target = self.registry.resolve(base.as_deref(), reference).ok()?;
                let joined = join_reference(base.as_deref(), reference);
                base = Some(
                    schema_id(target)
                        .map(str::to_string)
                        .unwrap_or_else(|| split_document(&joined).to_string()),
                );
                current = target;
            } else {
                current = step(current, &segment)?;
                if let Some(id) = current.get("$id").and_then(Value::as_str) {
                    base = Some(join_reference(base.as_deref(), id));
                }
            }
        }

        current
            .as_array()
            .or_else(|| current.get("oneOf").and_then(Value::as_array))
            .map(Vec::len)
    }
}

fn split_document(uri: &str) -> &str {
    uri.split('#').next().unwrap_or(uri)
}

fn discriminator_error(error: TagError) -> String {
    match error {
        TagError::Missing => format!("{OBJECT_TYPE_KEY} attribute is missing"),
        TagError::NotString(actual) => format!("{OBJECT_TYPE_KEY} must be a string, got {actual}"),
        TagError::Empty => format!("{OBJECT_TYPE_KEY} must not be empty"),
    }
}
