//! Validation of a whole JOCF document ("file").

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::index::SchemaIndex;
use crate::object_validator::ObjectValidator;
use crate::registry::schema_id;
use crate::result::{ValidationResult, NOT_ALLOWED, NO_SCHEMA_FOUND, SCHEMA_VALIDATION_ERROR};
use crate::types::{
    declared_object_type, json_type_name, FileType, ObjectType, TagError, FILE_TYPE_KEY,
    ITEMS_KEY, OBJECT_TYPE_KEY,
};

/// Validates JOCF files against the file schema named by their `file_type`.
///
/// Only a missing or unknown `file_type` stops validation early. Every later
/// check runs to completion so one call reports the full error set, in a
/// fixed order: required attributes, the items allow-list, item contents,
/// then the remaining top-level attributes.
pub struct FileValidator {
    index: Arc<SchemaIndex>,
    objects: ObjectValidator,
}

impl FileValidator {
    pub fn new(index: Arc<SchemaIndex>) -> Self {
        let objects = ObjectValidator::new(&index);
        Self { index, objects }
    }

    /// Use an already configured object validator built from the same index.
    pub fn with_object_validator(index: Arc<SchemaIndex>, objects: ObjectValidator) -> Self {
        Self { index, objects }
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn object_validator(&self) -> &ObjectValidator {
        &self.objects
    }

    pub fn validate(&self, file: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let Some(fields) = file.as_object() else {
            result.add_error(format!(
                "expected a JSON object at the document root, got {}",
                json_type_name(file)
            ));
            return result;
        };

        let file_type = match FileType::from_value(fields.get(FILE_TYPE_KEY)) {
            Ok(tag) => tag,
            Err(e) => {
                result.add_error(file_type_error(e));
                return result;
            }
        };

        let Some(schema) = self.index.file_schema(&file_type) else {
            result.add_error(format!("{NO_SCHEMA_FOUND} for file_type '{file_type}'"));
            return result;
        };

        self.check_required(fields, schema, &mut result);

        match fields.get(ITEMS_KEY) {
            None => {}
            Some(Value::Array(items)) => {
                self.check_allowed_items(items, schema, &mut result);
                self.check_item_contents(items, &mut result);
            }
            Some(other) => result.add_error(format!(
                "{SCHEMA_VALIDATION_ERROR} at /{ITEMS_KEY}: expected an array, got {}",
                json_type_name(other)
            )),
        }

        self.check_other_attributes(fields, schema, &mut result);
        result
    }

    fn check_required(
        &self,
        fields: &Map<String, Value>,
        schema: &Value,
        result: &mut ValidationResult,
    ) {
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for name in required {
            if !fields.contains_key(name) {
                result.add_error(format!("missing required attribute '{name}'"));
            }
        }
    }

    fn check_allowed_items(&self, items: &[Value], schema: &Value, result: &mut ValidationResult) {
        let allowed = self.allowed_object_types(schema, result);

        for (i, item) in items.iter().enumerate() {
            let Some(object) = item.as_object() else {
                result.add_error(format!(
                    "items[{i}] must be an object, got {}",
                    json_type_name(item)
                ));
                continue;
            };
            // Missing or malformed tags are reported by the content check.
            let Ok(object_type) = ObjectType::from_value(object.get(OBJECT_TYPE_KEY)) else {
                continue;
            };
            // Without an items contract any object type is accepted.
            let Some(allowed) = &allowed else {
                continue;
            };
            if !allowed.contains(&object_type) {
                result.add_error(format!(
                    "items[{i}]: object_type '{object_type}' {NOT_ALLOWED} in items; allowed object_types: [{}]",
                    allowed
                        .iter()
                        .map(ObjectType::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }
    }

    /// Object types permitted in `items`, in schema order.
    ///
    /// Reads `properties.items.items`, either a single `$ref` or a `oneOf` of
    /// `$ref`s. Returns `None` when the schema states no such contract, in
    /// which case any object type is accepted. References that cannot be
    /// resolved, or that name a schema without an `object_type`, contribute
    /// nothing; an empty list therefore rejects every item. Unresolved
    /// references are reported into `result`.
    fn allowed_object_types(
        &self,
        schema: &Value,
        result: &mut ValidationResult,
    ) -> Option<Vec<ObjectType>> {
        let contract = schema.get("properties")?.get(ITEMS_KEY)?.get("items")?;

        let references: Vec<&str> = match contract.get("oneOf").and_then(Value::as_array) {
            Some(candidates) => candidates
                .iter()
                .filter_map(|c| c.get("$ref").and_then(Value::as_str))
                .collect(),
            None => contract.get("$ref").and_then(Value::as_str).into_iter().collect(),
        };
        if references.is_empty() {
            return None;
        }

        let base = schema_id(schema);
        let mut allowed = Vec::with_capacity(references.len());
        for reference in references {
            match self.index.registry().resolve(base, reference) {
                Ok(target) => match declared_object_type(target) {
                    Some(object_type) if !allowed.contains(&object_type) => {
                        allowed.push(object_type)
                    }
                    Some(_) => {}
                    None => {
                        tracing::debug!(reference, "items reference declares no object_type")
                    }
                },
                Err(e) => {
                    result.add_error(format!("{SCHEMA_VALIDATION_ERROR}: items contract: {e}"))
                }
            }
        }
        tracing::debug!(allowed = allowed.len(), "derived items allow-list");
        Some(allowed)
    }

    fn check_item_contents(&self, items: &[Value], result: &mut ValidationResult) {
        for (i, item) in items.iter().enumerate() {
            // Non-objects were already reported by the allow-list check.
            if !item.is_object() {
                continue;
            }
            result.merge_prefixed(&format!("items[{i}]"), self.objects.validate(item));
        }
    }

    fn check_other_attributes(
        &self,
        fields: &Map<String, Value>,
        schema: &Value,
        result: &mut ValidationResult,
    ) {
        for (name, value) in fields {
            if name == FILE_TYPE_KEY || name == ITEMS_KEY {
                continue;
            }
            if value.get(OBJECT_TYPE_KEY).is_some() {
                result.merge_prefixed(name, self.objects.validate(value));
            }
        }

        if schema.get("additionalProperties") != Some(&Value::Bool(false)) {
            return;
        }
        let declared = schema.get("properties").and_then(Value::as_object);
        for name in fields.keys() {
            if !declared.is_some_and(|props| props.contains_key(name)) {
                result.add_error(format!(
                    "undeclared top-level attribute '{name}' (additionalProperties is false)"
                ));
            }
        }
    }
}

fn file_type_error(error: TagError) -> String {
    match error {
        TagError::Missing => format!("{FILE_TYPE_KEY} attribute is missing"),
        TagError::NotString(actual) => format!("{FILE_TYPE_KEY} must be a string, got {actual}"),
        TagError::Empty => format!("{FILE_TYPE_KEY} must not be empty"),
    }
}
