use serde::Deserialize;

use super::measure::Measure;
use super::types::{DataType, TableMode};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Table {
    pub name: String,
    /// Database schema the source lives in
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub mode: TableMode,
    #[serde(default)]
    pub description: Option<String>,
    /// Source query (Cached) or entity name (DirectConnection).
    /// Falls back to the table name when absent.
    #[serde(default, alias = "source_query")]
    pub source: Option<String>,
    /// Resource id (DirectConnection) or server (Cached)
    #[serde(default, alias = "directlake_resource_id", alias = "sql_server")]
    pub connection: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub calculated_columns: Vec<CalculatedColumn>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl Table {
    pub fn new(name: impl Into<String>, mode: TableMode) -> Self {
        Self {
            name: name.into(),
            schema: None,
            mode,
            description: None,
            source: None,
            connection: None,
            columns: Vec::new(),
            calculated_columns: Vec::new(),
            measures: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    pub fn add_column(&mut self, mut column: Column) -> &mut Self {
        column.table = Some(self.name.clone());
        self.columns.push(column);
        self
    }

    pub fn add_calculated_column(&mut self, mut column: CalculatedColumn) -> &mut Self {
        column.table = Some(self.name.clone());
        self.calculated_columns.push(column);
        self
    }

    pub fn add_measure(&mut self, mut measure: Measure) -> &mut Self {
        measure.table = Some(self.name.clone());
        self.measures.push(measure);
        self
    }

    /// True if a plain or calculated column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
            || self.calculated_columns.iter().any(|c| c.name == name)
    }

    /// Re-point every child at this table. Needed after deserialization,
    /// which bypasses the `add_*` methods.
    pub(crate) fn attach_owners(&mut self) {
        for column in &mut self.columns {
            column.table = Some(self.name.clone());
        }
        for column in &mut self.calculated_columns {
            column.table = Some(self.name.clone());
        }
        for measure in &mut self.measures {
            measure.table = Some(self.name.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, alias = "dtype")]
    pub data_type: DataType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format_string: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(skip)]
    pub(crate) table: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: None,
            format_string: None,
            is_hidden: false,
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

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.is_hidden = hidden;
        self
    }

    /// Owning table, once the column has been added to one.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// `Table[Column]` reference, or the bare name while unattached.
    pub fn qualified_name(&self) -> String {
        qualify(self.table(), &self.name)
    }
}

/// A column computed from an expression at refresh time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculatedColumn {
    pub name: String,
    pub expression: String,
    #[serde(default, alias = "dtype")]
    pub data_type: DataType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(skip)]
    pub(crate) table: Option<String>,
}

impl CalculatedColumn {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            data_type: DataType::Text,
            description: None,
            table: None,
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.table(), &self.name)
    }
}

pub(crate) fn qualify(table: Option<&str>, name: &str) -> String {
    match table {
        Some(table) => format!("{}[{}]", table, name),
        None => name.to_string(),
    }
}
