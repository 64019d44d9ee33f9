//! Loading a [`SemanticModel`] from a declaration file.
//!
//! Declarations are plain data. Loading never validates; that is the
//! compiler's job.

use std::path::Path;

use crate::error::DeclarationError;
use crate::model::SemanticModel;

/// Parse a YAML declaration. JSON is accepted too, being a YAML subset.
pub fn from_yaml_str(source: &str) -> Result<SemanticModel, DeclarationError> {
    let mut model: SemanticModel = serde_yaml::from_str(source)?;
    model.attach_owners();
    Ok(model)
}

pub fn from_json_str(source: &str) -> Result<SemanticModel, DeclarationError> {
    let mut model: SemanticModel = serde_json::from_str(source)?;
    model.attach_owners();
    Ok(model)
}

/// Load a declaration, picking the format from the file extension.
pub fn load(path: impl AsRef<Path>) -> Result<SemanticModel, DeclarationError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let contents = std::fs::read_to_string(path).map_err(|source| DeclarationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let model = match extension.as_str() {
        "yaml" | "yml" => from_yaml_str(&contents)?,
        "json" => from_json_str(&contents)?,
        other => return Err(DeclarationError::UnsupportedFormat(other.to_string())),
    };
    log::debug!(
        "loaded declaration {} ({} tables)",
        path.display(),
        model.tables.len()
    );
    Ok(model)
}
