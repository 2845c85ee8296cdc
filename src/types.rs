//! Core types for JOCF schema dispatch.
//!
//! Discriminator strings are parsed into newtypes at the JSON boundary so the
//! rest of the crate never handles a raw, possibly-empty tag.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator key carried by every JOCF file.
pub const FILE_TYPE_KEY: &str = "file_type";

/// Discriminator key carried by every JOCF object.
pub const OBJECT_TYPE_KEY: &str = "object_type";

/// Key of the array holding a file's objects.
pub const ITEMS_KEY: &str = "items";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why a JSON value could not be turned into a discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The key is absent.
    Missing,
    /// The value is present but is not a string.
    NotString(&'static str),
    /// The value is the empty string.
    Empty,
}

macro_rules! tag_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a tag, rejecting the empty string.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                if value.is_empty() {
                    None
                } else {
                    Some(Self(value))
                }
            }

            /// Parse a tag from a JSON value.
            pub fn from_value(value: Option<&Value>) -> Result<Self, TagError> {
                match value {
                    None => Err(TagError::Missing),
                    Some(Value::String(s)) => Self::new(s.as_str()).ok_or(TagError::Empty),
                    Some(other) => Err(TagError::NotString(json_type_name(other))),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
                    .ok_or_else(|| concat!(stringify!($name), " must not be empty").to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

tag_type!(
    /// Value of a file's `file_type` discriminator (e.g. `JOCF_TRANSACTIONS_FILE`).
    FileType
);

tag_type!(
    /// Value of an object's `object_type` discriminator (e.g. `TX_STOCK_ISSUANCE`).
    ObjectType
);

tag_type!(
    /// Absolute schema identifier, as declared by `$id`.
    SchemaId
);

/// Which discriminator a schema declares, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    File(FileType),
    Object(ObjectType),
}

impl Discriminator {
    /// Extract the discriminator constant a schema declares.
    ///
    /// Looks at `properties.<key>.const` first and falls back to a top-level
    /// `<key>` string on the schema itself. File types win when a schema
    /// declares both.
    pub fn of_schema(schema: &Value) -> Option<Self> {
        if let Some(tag) = declared_const(schema, FILE_TYPE_KEY).and_then(FileType::new) {
            return Some(Discriminator::File(tag));
        }
        declared_const(schema, OBJECT_TYPE_KEY)
            .and_then(ObjectType::new)
            .map(Discriminator::Object)
    }
}

fn declared_const<'a>(schema: &'a Value, key: &str) -> Option<&'a str> {
    schema
        .get("properties")
        .and_then(|p| p.get(key))
        .and_then(|p| p.get("const"))
        .and_then(Value::as_str)
        .or_else(|| schema.get(key).and_then(Value::as_str))
}

/// Object type declared by a schema at `properties.object_type.const`.
pub fn declared_object_type(schema: &Value) -> Option<ObjectType> {
    declared_const(schema, OBJECT_TYPE_KEY).and_then(ObjectType::new)
}
