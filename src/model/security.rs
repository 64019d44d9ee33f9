//! Row-level security roles.

use serde::Deserialize;

/// Row filter applied to one table for members of a role.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TablePermission {
    pub table_name: String,
    pub filter_expression: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub table_permissions: Vec<TablePermission>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            table_permissions: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn add_table_permission(
        &mut self,
        table_name: impl Into<String>,
        filter_expression: impl Into<String>,
    ) -> &mut Self {
        self.table_permissions.push(TablePermission {
            table_name: table_name.into(),
            filter_expression: filter_expression.into(),
        });
        self
    }

    pub fn add_member(&mut self, member: impl Into<String>) -> &mut Self {
        self.members.push(member.into());
        self
    }
}
