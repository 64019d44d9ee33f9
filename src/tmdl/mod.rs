//! Tabular model definition text: naming, vocabulary, writing and reading.

pub mod ident;
pub mod reader;
pub mod vocab;
pub mod writer;

pub use ident::{quote, unquote};
pub use reader::{read_document, read_folder, Document};
pub use vocab::Vocabulary;
pub use writer::{write_definition, DefinitionFile};

/// Canonical form of a formula: common leading indentation removed,
/// trailing whitespace and blank lines dropped.
///
/// Both output artifacts carry this form, so they agree byte for byte.
pub fn normalize_expression(expression: &str) -> String {
    let lines: Vec<&str> = expression
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();

    let indent = lines
        .iter()
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| &line[indent..])
        .collect::<Vec<_>>()
        .join("\n")
}
