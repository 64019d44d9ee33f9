//! Closed enumerations used across the semantic model.

use serde::Deserialize;

/// Storage mode of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMode {
    /// Read live from the external storage engine at query time
    #[serde(alias = "direct_lake")]
    DirectConnection,
    /// Materialized into the model at refresh time
    #[default]
    #[serde(alias = "import")]
    Cached,
}

impl TableMode {
    /// Calculated columns need materialized data.
    pub fn supports_calculated_columns(self) -> bool {
        matches!(self, Self::Cached)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    #[default]
    Text,
    #[serde(alias = "datetime")]
    DateTime,
    Currency,
    Boolean,
    Decimal,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToMany,
    #[default]
    ManyToOne,
    OneToOne,
    ManyToMany,
}

/// Which side(s) of a relationship propagate filter context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossFilter {
    #[default]
    Single,
    Both,
    None,
}
