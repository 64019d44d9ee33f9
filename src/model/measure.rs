use serde::Deserialize;

use super::table::qualify;
use super::types::DataType;

/// A named business calculation evaluated at query time.
///
/// Lives either on a table or directly on the model. Both scopes share one
/// flat name space in the compiled output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Measure {
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format_string: Option<String>,
    #[serde(default, alias = "folder")]
    pub display_folder: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(skip)]
    pub(crate) table: Option<String>,
}

impl Measure {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            description: None,
            format_string: None,
            display_folder: None,
            is_hidden: false,
            data_type: None,
            table: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_format_string(mut self, format_string: impl Into<String>) -> Self {
        self.format_string = Some(format_string.into());
        self
    }

    pub fn with_display_folder(mut self, folder: impl Into<String>) -> Self {
        self.display_folder = Some(folder.into());
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.is_hidden = hidden;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Owning table for table-scoped measures, `None` for model-level ones.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.table(), &self.name)
    }
}
