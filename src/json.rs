//! Viewer JSON document.
//!
//! Mirrors the definition text: same tables, columns, normalized
//! expressions and relationship endpoints, in the same order.

use serde::Serialize;

use crate::model::{CalculatedColumn, Column, Measure, Relationship, Role, SemanticModel, Table};
use crate::tmdl::{normalize_expression, Vocabulary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDocument {
    pub name: String,
    pub description: Option<String>,
    pub tables: Vec<TableDocument>,
    pub relationships: Vec<RelationshipDocument>,
    pub measures: Vec<MeasureDocument>,
    pub hierarchies: Vec<HierarchyDocument>,
    pub roles: Vec<RoleDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDocument {
    pub name: String,
    pub schema: Option<String>,
    pub mode: &'static str,
    pub description: Option<String>,
    pub source: Option<String>,
    /// Resource id (DirectLake) or server (Import)
    pub connection: Option<String>,
    pub columns: Vec<ColumnDocument>,
    pub calculated_columns: Vec<CalculatedColumnDocument>,
    pub measures: Vec<MeasureDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDocument {
    pub name: String,
    pub dtype: &'static str,
    pub description: Option<String>,
    pub format_string: Option<String>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatedColumnDocument {
    pub name: String,
    pub expression: String,
    pub dtype: &'static str,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureDocument {
    pub name: String,
    /// Owning table, `null` for model-level measures
    pub table: Option<String>,
    pub expression: String,
    pub description: Option<String>,
    pub format_string: Option<String>,
    pub folder: Option<String>,
    pub data_type: Option<&'static str>,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipDocument {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: &'static str,
    pub cross_filter_direction: &'static str,
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyDocument {
    pub name: String,
    pub table: Option<String>,
    pub levels: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDocument {
    pub name: String,
    pub description: Option<String>,
    pub table_permissions: Vec<PermissionDocument>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionDocument {
    pub table: String,
    pub filter_expression: String,
}

impl ModelDocument {
    pub fn from_model(model: &SemanticModel) -> Self {
        Self {
            name: model.name.clone(),
            description: model.description.clone(),
            tables: model.tables.iter().map(TableDocument::from_table).collect(),
            relationships: model
                .relationships
                .iter()
                .map(RelationshipDocument::from_relationship)
                .collect(),
            measures: model.measures.iter().map(MeasureDocument::from_measure).collect(),
            hierarchies: model
                .hierarchies
                .iter()
                .map(|h| HierarchyDocument {
                    name: h.name.clone(),
                    table: h.table.clone(),
                    levels: h.levels.clone(),
                    description: h.description.clone(),
                })
                .collect(),
            roles: model.roles.iter().map(RoleDocument::from_role).collect(),
        }
    }

    /// Pretty-printed with a trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

impl TableDocument {
    fn from_table(table: &Table) -> Self {
        Self {
            name: table.name.clone(),
            schema: table.schema.clone(),
            mode: table.mode.label(),
            description: table.description.clone(),
            source: table.source.clone(),
            connection: table.connection.clone(),
            columns: table.columns.iter().map(ColumnDocument::from_column).collect(),
            calculated_columns: table
                .calculated_columns
                .iter()
                .map(CalculatedColumnDocument::from_column)
                .collect(),
            measures: table.measures.iter().map(MeasureDocument::from_measure).collect(),
        }
    }
}

impl ColumnDocument {
    fn from_column(column: &Column) -> Self {
        Self {
            name: column.name.clone(),
            dtype: column.data_type.label(),
            description: column.description.clone(),
            format_string: column.format_string.clone(),
            is_hidden: column.is_hidden,
        }
    }
}

impl CalculatedColumnDocument {
    fn from_column(column: &CalculatedColumn) -> Self {
        Self {
            name: column.name.clone(),
            expression: normalize_expression(&column.expression),
            dtype: column.data_type.label(),
            description: column.description.clone(),
        }
    }
}

impl MeasureDocument {
    fn from_measure(measure: &Measure) -> Self {
        Self {
            name: measure.name.clone(),
            table: measure.table().map(str::to_string),
            expression: normalize_expression(&measure.expression),
            description: measure.description.clone(),
            format_string: measure.format_string.clone(),
            folder: measure.display_folder.clone(),
            data_type: measure.data_type.map(|t| t.label()),
            is_hidden: measure.is_hidden,
        }
    }
}

impl RelationshipDocument {
    fn from_relationship(rel: &Relationship) -> Self {
        Self {
            from_table: rel.from_table.clone(),
            from_column: rel.from_column.clone(),
            to_table: rel.to_table.clone(),
            to_column: rel.to_column.clone(),
            cardinality: rel.cardinality.label(),
            cross_filter_direction: rel.cross_filter_direction.label(),
            is_active: rel.is_active,
            description: rel.description.clone(),
        }
    }
}

impl RoleDocument {
    fn from_role(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            description: role.description.clone(),
            table_permissions: role
                .table_permissions
                .iter()
                .map(|p| PermissionDocument {
                    table: p.table_name.clone(),
                    filter_expression: normalize_expression(&p.filter_expression),
                })
                .collect(),
            members: role.members.clone(),
        }
    }
}
