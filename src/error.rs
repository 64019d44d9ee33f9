use std::path::PathBuf;

/// Fatal compile failures. Any of these aborts the whole compile call
/// before an artifact is written.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("Unresolved reference in {context}: {target} not found")]
    Reference { context: String, target: String },
    #[error("Table {table} uses {mode} mode and cannot contain calculated column {column}")]
    IncompatibleMode {
        table: String,
        mode: &'static str,
        column: String,
    },
    #[error("No {kind} value defined for token {token:?}")]
    EnumerationMapping { kind: &'static str, token: String },
    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },
    #[error("Invalid {property} on {object}: {reason}")]
    InvalidProperty {
        object: String,
        property: &'static str,
        reason: &'static str,
    },
    #[error("Hierarchy {0} has no levels")]
    InvalidHierarchy(String),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while loading a model declaration file.
#[derive(Debug, thiserror::Error)]
pub enum DeclarationError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported declaration format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),
}
