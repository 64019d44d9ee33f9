//! The compile pipeline: validate, emit text and JSON, persist.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CompileError;
use crate::json::ModelDocument;
use crate::model::SemanticModel;
use crate::options::CompileOptions;
use crate::tmdl::writer::file_stem;
use crate::tmdl::{write_definition, DefinitionFile};
use crate::validate::{validate, ValidationReport};

/// Everything one compile produces, held in memory until written.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub model_name: String,
    /// File-safe form of the model name used for folder names
    pub slug: String,
    /// Files of the `.SemanticModel` folder, in emission order
    pub definition_files: Vec<DefinitionFile>,
    pub json: String,
    pub report: ValidationReport,
}

impl Artifacts {
    /// `<slug>.SemanticModel`
    pub fn definition_dir_name(&self) -> String {
        format!("{}.SemanticModel", self.slug)
    }

    /// All `.tmdl` files joined into one stream.
    pub fn definition_text(&self) -> String {
        let mut text = String::new();
        for file in &self.definition_files {
            if file.path.extension().is_none_or(|e| e != "tmdl") {
                continue;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&file.contents);
        }
        text
    }

    /// Write both artifacts under `dir`, replacing any earlier output for
    /// this model in full. Returns the definition folder and JSON paths.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf), CompileError> {
        let dir = dir.as_ref();
        let definition_dir = dir.join(self.definition_dir_name());
        let json_dir = dir.join(&self.slug);
        let json_path = json_dir.join("model.json");

        if definition_dir.exists() {
            fs::remove_dir_all(&definition_dir).map_err(|source| CompileError::Io {
                path: definition_dir.clone(),
                source,
            })?;
        }

        for file in &self.definition_files {
            write_file(&definition_dir.join(&file.path), &file.contents)?;
        }
        write_file(&json_path, &self.json)?;

        log::info!(
            "wrote {} definition files to {}",
            self.definition_files.len(),
            definition_dir.display()
        );
        Ok((definition_dir, json_path))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CompileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CompileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Compile with default options.
pub fn compile(model: &SemanticModel) -> Result<Artifacts, CompileError> {
    compile_with(model, &CompileOptions::default())
}

pub fn compile_with(
    model: &SemanticModel,
    options: &CompileOptions,
) -> Result<Artifacts, CompileError> {
    let report = validate(model)?;

    let mut definition_files = vec![DefinitionFile {
        path: PathBuf::from("definition.pbism"),
        contents: pbism()?,
    }];
    definition_files.extend(write_definition(model, options));
    log::debug!(
        "emitted {} definition files for {}",
        definition_files.len(),
        model.name
    );

    let json = ModelDocument::from_model(model).to_json()?;

    Ok(Artifacts {
        model_name: model.name.clone(),
        slug: file_stem(&model.name),
        definition_files,
        json,
        report,
    })
}

/// Compile and write to `options.output_dir`. Nothing is written unless
/// compilation succeeds.
pub fn compile_to_dir(
    model: &SemanticModel,
    options: &CompileOptions,
) -> Result<Artifacts, CompileError> {
    let artifacts = compile_with(model, options)?;
    artifacts.write_to(&options.output_dir)?;
    Ok(artifacts)
}

fn pbism() -> Result<String, CompileError> {
    let value = serde_json::json!({
        "version": "4.0",
        "settings": {}
    });
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}
