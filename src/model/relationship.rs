use serde::Deserialize;

use super::types::{Cardinality, CrossFilter};

fn default_active() -> bool {
    true
}

/// A join between two tables, resolved by name at compile time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub cross_filter_direction: CrossFilter,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Relationship {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
            cardinality: Cardinality::ManyToOne,
            cross_filter_direction: CrossFilter::Single,
            description: None,
            is_active: true,
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_cross_filter(mut self, direction: CrossFilter) -> Self {
        self.cross_filter_direction = direction;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Drill-down path over column names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hierarchy {
    pub name: String,
    pub levels: Vec<String>,
    /// Table the levels live in, when they all come from one
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Hierarchy {
    pub fn new<I, S>(name: impl Into<String>, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            levels: levels.into_iter().map(Into::into).collect(),
            table: None,
            description: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
