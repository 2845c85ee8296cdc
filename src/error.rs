//! Error types for schema loading, configuration and document input.
//!
//! Structural problems in a JOCF document are never errors in this sense: they
//! are collected into a [`ValidationResult`](crate::ValidationResult). The
//! types here cover the failures that stop validation from happening at all.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while ingesting the schema corpus. Always fatal.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("schema root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("cannot walk schema directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("cannot read schema {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in schema {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} \"{value}\" is declared by both {first} and {second}")]
    DuplicateDiscriminator {
        kind: &'static str,
        value: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("$id \"{id}\" is declared by both {first} and {second}")]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl SchemaLoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchemaLoadError::RootNotFound { .. }
            | SchemaLoadError::Walk { .. }
            | SchemaLoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors resolving `$ref` through the Reference Registry or compiling a
/// schema that depends on it.
#[derive(Debug, Clone, Error)]
pub enum ReferenceError {
    #[error("cannot resolve $ref \"{reference}\" (resolved to {resolved})")]
    Unresolved { reference: String, resolved: String },

    #[error("cannot compile schema {schema}: {message}")]
    Compile { schema: String, message: String },
}

/// Errors reading a JOCF document from storage.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors building the validator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot load configuration: {0}")]
    Source(#[from] config_crate::ConfigError),

    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("invalid document pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Anything that prevents a validator from being constructed.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    SchemaLoad(#[from] SchemaLoadError),
}

impl SetupError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SetupError::Config(e) => e.exit_code(),
            SetupError::SchemaLoad(e) => e.exit_code(),
        }
    }
}
