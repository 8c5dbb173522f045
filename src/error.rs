//! Error types for the metaschema compiler
//!
//! Malformed schema source is an authoring error, so every contract
//! violation surfaces as one of these variants and aborts compilation of
//! the document. Nothing is retried and no partial output is produced.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema compiler errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unsupported schema dialect in {path}: {schema}")]
    UnsupportedDialect { path: PathBuf, schema: String },

    #[error("Document {path} has no definitions map")]
    MissingDefinitions { path: PathBuf },

    #[error("Invalid curie: {0}")]
    InvalidCurie(String),

    #[error("Unknown namespace '{namespace}' in curie {curie}")]
    UnknownNamespace { namespace: String, curie: String },

    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    #[error("Could not resolve class for reference {reference}")]
    UnresolvedClass { reference: String },

    #[error("{class}.{property} extends '{extends}', which is not an inherited property")]
    ExtendsMissing {
        class: String,
        property: String,
        extends: String,
    },

    #[error("{class} inherits from {parent}, which has no heritable properties")]
    UnsupportedInheritance { class: String, parent: String },

    #[error("Abstract class {class} must not declare a type")]
    AbstractWithType { class: String },

    #[error("Concrete class {class} must have type 'object', found {found}")]
    ConcreteNotObject { class: String, found: String },

    #[error("{class}.{property} missing ordered attribute")]
    MissingOrdered { class: String, property: String },

    #[error("{class}.{property} ordered attribute must be a boolean")]
    InvalidOrdered { class: String, property: String },

    #[error("oneOf members of {class} must be single-key objects")]
    InvalidUnionMember { class: String },

    #[error("Class {class} from import '{namespace}' is already defined")]
    ClassCollision { class: String, namespace: String },

    #[error("Import '{namespace}' resolves to more than one document")]
    ImportConflict { namespace: String },

    #[error("{class} holds non-local reference {reference}; cannot merge")]
    NonLocalReference { class: String, reference: String },

    #[error("Cyclic definition among: {}", members.join(", "))]
    CyclicDefinition { members: Vec<String> },

    #[error("Cyclic import of {path}")]
    CyclicImport { path: PathBuf },

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
