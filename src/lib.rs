pub mod compiler;
pub mod declaration;
pub mod error;
pub mod json;
pub mod model;
pub mod options;
pub mod tmdl;
pub mod validate;

pub use compiler::{compile, compile_to_dir, compile_with, Artifacts};
pub use error::{CompileError, DeclarationError};
pub use model::{
    CalculatedColumn, Cardinality, Column, CrossFilter, DataType, Hierarchy, Measure,
    Relationship, Role, SemanticModel, Table, TableMode,
};
pub use options::CompileOptions;
pub use validate::{validate, ValidationReport};

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile a YAML/JSON declaration to the viewer JSON document
#[wasm_bindgen(js_name = "compileModel")]
pub fn compile_declaration(source: &str) -> Result<String, String> {
    let model = declaration::from_yaml_str(source).map_err(|e| e.to_string())?;
    let artifacts = compile(&model).map_err(|e| e.to_string())?;
    Ok(artifacts.json)
}

/// Compile a YAML/JSON declaration to model definition text
#[wasm_bindgen(js_name = "modelToTmdl")]
pub fn declaration_to_tmdl(source: &str) -> Result<String, String> {
    let model = declaration::from_yaml_str(source).map_err(|e| e.to_string())?;
    let artifacts = compile(&model).map_err(|e| e.to_string())?;
    Ok(artifacts.definition_text())
}
