//! In-memory semantic model declarations.
//!
//! Construction never fails; structural checks live in [`crate::validate`].

mod measure;
mod relationship;
mod security;
mod table;
mod types;

pub use measure::Measure;
pub use relationship::{Hierarchy, Relationship};
pub use security::{Role, TablePermission};
pub use table::{CalculatedColumn, Column, Table};
pub use types::{Cardinality, CrossFilter, DataType, TableMode};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SemanticModel {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Insertion order is emission order
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Model-level measures
    #[serde(default)]
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub hierarchies: Vec<Hierarchy>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl SemanticModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tables: Vec::new(),
            measures: Vec::new(),
            relationships: Vec::new(),
            hierarchies: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn add_table(&mut self, mut table: Table) -> &mut Self {
        table.attach_owners();
        self.tables.push(table);
        self
    }

    pub fn add_measure(&mut self, mut measure: Measure) -> &mut Self {
        measure.table = None;
        self.measures.push(measure);
        self
    }

    pub fn add_relationship(&mut self, relationship: Relationship) -> &mut Self {
        self.relationships.push(relationship);
        self
    }

    pub fn add_hierarchy(&mut self, hierarchy: Hierarchy) -> &mut Self {
        self.hierarchies.push(hierarchy);
        self
    }

    pub fn add_role(&mut self, role: Role) -> &mut Self {
        self.roles.push(role);
        self
    }

    /// First table with this name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Table-scoped measures in table order, then model-level measures.
    pub fn all_measures(&self) -> impl Iterator<Item = &Measure> {
        self.tables
            .iter()
            .flat_map(|t| t.measures.iter())
            .chain(self.measures.iter())
    }

    /// Restore owner back-references on every table child.
    pub fn attach_owners(&mut self) {
        for table in &mut self.tables {
            table.attach_owners();
        }
        for measure in &mut self.measures {
            measure.table = None;
        }
    }
}
