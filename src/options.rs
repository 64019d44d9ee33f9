use std::path::PathBuf;

/// Settings that shape compiled output but are not part of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub output_dir: PathBuf,
    pub culture: String,
    pub compatibility_level: u32,
    /// Schema used when a table declares none
    pub default_schema: String,
    /// Server for Cached tables without a connection
    pub default_server: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("compiled"),
            culture: "en-US".to_string(),
            compatibility_level: 1604,
            default_schema: "dbo".to_string(),
            default_server: "localhost".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
