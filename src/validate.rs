//! Structural validation run before any output is produced.

use std::collections::HashSet;

use crate::error::CompileError;
use crate::model::{SemanticModel, Table, TableMode};

/// Non-fatal findings from a successful validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Check `model`, stopping at the first fatal problem.
pub fn validate(model: &SemanticModel) -> Result<ValidationReport, CompileError> {
    check_names(model)?;
    check_properties(model)?;
    check_modes(model)?;
    check_relationships(model)?;
    check_duplicates(model)?;
    check_hierarchies(model)?;

    let mut report = ValidationReport::default();
    collect_warnings(model, &mut report);
    log::debug!(
        "validated model {} with {} warning(s)",
        model.name,
        report.warnings.len()
    );
    Ok(report)
}

fn check_name(kind: &'static str, name: &str) -> Result<(), CompileError> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name.chars().any(char::is_control) {
        "name contains control characters"
    } else {
        return Ok(());
    };
    Err(CompileError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    })
}

fn check_names(model: &SemanticModel) -> Result<(), CompileError> {
    check_name("model", &model.name)?;
    for table in &model.tables {
        check_name("table", &table.name)?;
        for column in &table.columns {
            check_name("column", &column.name)?;
        }
        for column in &table.calculated_columns {
            check_name("calculated column", &column.name)?;
        }
        for measure in &table.measures {
            check_name("measure", &measure.name)?;
        }
    }
    for measure in &model.measures {
        check_name("measure", &measure.name)?;
    }
    for hierarchy in &model.hierarchies {
        check_name("hierarchy", &hierarchy.name)?;
        for level in &hierarchy.levels {
            check_name("hierarchy level", level)?;
        }
    }
    for role in &model.roles {
        check_name("role", &role.name)?;
        for permission in &role.table_permissions {
            check_name("table", &permission.table_name)?;
        }
        for member in &role.members {
            check_name("role member", member)?;
        }
    }
    Ok(())
}

/// Values written after `key:` on a single line.
fn check_property(
    object: &str,
    property: &'static str,
    value: Option<&str>,
) -> Result<(), CompileError> {
    match value {
        Some(value) if value.chars().any(char::is_control) => {
            Err(CompileError::InvalidProperty {
                object: object.to_string(),
                property,
                reason: "value contains control characters",
            })
        }
        _ => Ok(()),
    }
}

fn check_properties(model: &SemanticModel) -> Result<(), CompileError> {
    for table in &model.tables {
        let object = format!("table {}", table.name);
        check_property(&object, "schema", table.schema.as_deref())?;
        check_property(&object, "connection", table.connection.as_deref())?;
        // Cached sources go into an M string literal, which escapes line breaks
        if table.mode == TableMode::DirectConnection {
            check_property(&object, "source", table.source.as_deref())?;
        }
        for column in &table.columns {
            let object = format!("column {}", column.qualified_name());
            check_property(&object, "format string", column.format_string.as_deref())?;
        }
    }
    for measure in model.all_measures() {
        let object = format!("measure {}", measure.name);
        check_property(&object, "format string", measure.format_string.as_deref())?;
        check_property(&object, "display folder", measure.display_folder.as_deref())?;
    }
    Ok(())
}

fn check_modes(model: &SemanticModel) -> Result<(), CompileError> {
    for table in &model.tables {
        if table.mode.supports_calculated_columns() {
            continue;
        }
        if let Some(column) = table.calculated_columns.first() {
            return Err(CompileError::IncompatibleMode {
                table: table.name.clone(),
                mode: "DirectConnection",
                column: column.name.clone(),
            });
        }
    }
    Ok(())
}

fn resolve_column<'a>(
    model: &'a SemanticModel,
    context: &str,
    table: &str,
    column: &str,
) -> Result<&'a Table, CompileError> {
    let found = model.table(table).ok_or_else(|| CompileError::Reference {
        context: context.to_string(),
        target: format!("table {}", table),
    })?;
    if !found.has_column(column) {
        return Err(CompileError::Reference {
            context: context.to_string(),
            target: format!("column {}[{}]", table, column),
        });
    }
    Ok(found)
}

fn check_relationships(model: &SemanticModel) -> Result<(), CompileError> {
    for rel in &model.relationships {
        let context = format!(
            "relationship {}[{}] -> {}[{}]",
            rel.from_table, rel.from_column, rel.to_table, rel.to_column
        );
        resolve_column(model, &context, &rel.from_table, &rel.from_column)?;
        resolve_column(model, &context, &rel.to_table, &rel.to_column)?;
    }
    Ok(())
}

fn first_duplicate<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

fn check_duplicates(model: &SemanticModel) -> Result<(), CompileError> {
    if let Some(name) = first_duplicate(model.tables.iter().map(|t| t.name.as_str())) {
        return Err(CompileError::DuplicateName {
            kind: "table",
            name: name.to_string(),
        });
    }

    for table in &model.tables {
        let columns = table
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(table.calculated_columns.iter().map(|c| c.name.as_str()));
        if let Some(name) = first_duplicate(columns) {
            return Err(CompileError::DuplicateName {
                kind: "column",
                name: format!("{}[{}]", table.name, name),
            });
        }
    }

    // Table-level and model-level measures share one name space
    if let Some(name) = first_duplicate(model.all_measures().map(|m| m.name.as_str())) {
        return Err(CompileError::DuplicateName {
            kind: "measure",
            name: name.to_string(),
        });
    }

    if let Some(name) = first_duplicate(model.roles.iter().map(|r| r.name.as_str())) {
        return Err(CompileError::DuplicateName {
            kind: "role",
            name: name.to_string(),
        });
    }
    Ok(())
}

fn check_hierarchies(model: &SemanticModel) -> Result<(), CompileError> {
    for hierarchy in &model.hierarchies {
        if hierarchy.levels.is_empty() {
            return Err(CompileError::InvalidHierarchy(hierarchy.name.clone()));
        }
        if let Some(table) = &hierarchy.table {
            if model.table(table).is_none() {
                return Err(CompileError::Reference {
                    context: format!("hierarchy {}", hierarchy.name),
                    target: format!("table {}", table),
                });
            }
        }
    }
    Ok(())
}

fn collect_warnings(model: &SemanticModel, report: &mut ValidationReport) {
    for table in &model.tables {
        if table.mode == TableMode::DirectConnection && table.connection.is_none() {
            report.warn(format!(
                "table {} is DirectConnection but declares no resource id",
                table.name
            ));
        }
        if table.mode == TableMode::Cached && table.columns.is_empty() {
            report.warn(format!("table {} declares no columns", table.name));
        }
        for measure in &table.measures {
            if table.has_column(&measure.name) {
                report.warn(format!(
                    "measure {} has the same name as a column in {}",
                    measure.name, table.name
                ));
            }
        }
    }

    for hierarchy in &model.hierarchies {
        for level in &hierarchy.levels {
            let found = match &hierarchy.table {
                Some(table) => model.table(table).is_some_and(|t| t.has_column(level)),
                None => model.tables.iter().any(|t| t.has_column(level)),
            };
            if !found {
                report.warn(format!(
                    "hierarchy {} level {} does not match any column",
                    hierarchy.name, level
                ));
            }
        }
    }

    for role in &model.roles {
        for permission in &role.table_permissions {
            if model.table(&permission.table_name).is_none() {
                report.warn(format!(
                    "role {} filters unknown table {}",
                    role.name, permission.table_name
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CalculatedColumn, Column, DataType, Hierarchy, Measure, Relationship, Role,
    };

    fn table(name: &str, columns: &[&str]) -> Table {
        let mut table = Table::new(name, TableMode::Cached);
        for column in columns {
            table.add_column(Column::new(*column, DataType::Integer));
        }
        table
    }

    fn sales_model() -> SemanticModel {
        let mut model = SemanticModel::new("Examples_Model");
        model
            .add_table(table("Sales", &["SalesID", "CustomerID"]))
            .add_table(table("Customer", &["CustomerID"]))
            .add_relationship(Relationship::new("Sales", "CustomerID", "Customer", "CustomerID"));
        model
    }

    #[test]
    fn test_valid_model() {
        let report = validate(&sales_model()).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_direct_connection_rejects_calculated_column() {
        let mut live = Table::new("Sales", TableMode::DirectConnection).with_connection("lake-1");
        live.add_column(Column::new("Revenue", DataType::Currency))
            .add_calculated_column(CalculatedColumn::new("Band", "1"));
        let mut model = SemanticModel::new("M");
        model.add_table(live);

        let err = validate(&model).unwrap_err();
        assert!(
            matches!(err, CompileError::IncompatibleMode { ref table, ref column, .. } if table == "Sales" && column == "Band")
        );
    }

    #[test]
    fn test_duplicate_table() {
        let mut model = SemanticModel::new("M");
        model.add_table(table("Sales", &["A"])).add_table(table("Sales", &["B"]));
        let err = validate(&model).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateName { kind: "table", ref name } if name == "Sales"));
    }

    #[test]
    fn test_duplicate_measure_across_scopes() {
        let mut sales = table("Sales", &["Revenue"]);
        sales.add_measure(Measure::new("Total Sales", "SUM(Sales[Revenue])"));
        let mut model = SemanticModel::new("M");
        model
            .add_table(sales)
            .add_measure(Measure::new("Total Sales", "1"));

        let err = validate(&model).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateName { kind: "measure", .. }));
    }

    #[test]
    fn test_duplicate_column_including_calculated() {
        let mut sales = table("Sales", &["Revenue"]);
        sales.add_calculated_column(CalculatedColumn::new("Revenue", "1"));
        let mut model = SemanticModel::new("M");
        model.add_table(sales);

        let err = validate(&model).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateName { kind: "column", ref name } if name == "Sales[Revenue]"));
    }

    #[test]
    fn test_dangling_relationship_table() {
        let mut model = SemanticModel::new("M");
        model
            .add_table(table("Sales", &["CustomerID"]))
            .add_relationship(Relationship::new("Sales", "CustomerID", "Customer", "CustomerID"));

        let err = validate(&model).unwrap_err();
        assert!(matches!(err, CompileError::Reference { ref target, .. } if target == "table Customer"));
    }

    #[test]
    fn test_dangling_relationship_column() {
        let mut model = sales_model();
        model.add_relationship(Relationship::new("Sales", "ProductID", "Customer", "CustomerID"));

        let err = validate(&model).unwrap_err();
        assert!(matches!(err, CompileError::Reference { ref target, .. } if target == "column Sales[ProductID]"));
    }

    #[test]
    fn test_relationship_to_calculated_column() {
        let mut model = sales_model();
        let mut region = table("Region", &[]);
        region.add_calculated_column(CalculatedColumn::new("Key", "1"));
        model
            .add_table(region)
            .add_relationship(Relationship::new("Sales", "SalesID", "Region", "Key"));
        assert!(validate(&model).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        let mut model = SemanticModel::new("M");
        model.add_table(table("Bad\nName", &[]));
        assert!(matches!(
            validate(&model).unwrap_err(),
            CompileError::InvalidName { kind: "table", .. }
        ));

        let mut model = SemanticModel::new("M");
        model.add_table(table("Sales", &[" "]));
        assert!(matches!(
            validate(&model).unwrap_err(),
            CompileError::InvalidName { kind: "column", reason: "name is empty", .. }
        ));
    }

    #[test]
    fn test_format_string_with_line_break() {
        let mut sales = Table::new("Sales", TableMode::Cached);
        sales.add_column(
            Column::new("Revenue", DataType::Currency).with_format_string("#,0\n\tcolumn Ghost"),
        );
        let mut model = SemanticModel::new("M");
        model.add_table(sales);

        let err = validate(&model).unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidProperty { ref object, property: "format string", .. } if object == "column Sales[Revenue]"
        ));
    }

    #[test]
    fn test_single_line_properties() {
        let mut live = Table::new("Live", TableMode::DirectConnection)
            .with_connection("lake-1")
            .with_source("sales\nfact");
        live.add_column(Column::new("Id", DataType::Integer));
        let mut model = SemanticModel::new("M");
        model.add_table(live);
        assert!(matches!(
            validate(&model).unwrap_err(),
            CompileError::InvalidProperty { property: "source", .. }
        ));

        let mut model = sales_model();
        model.add_measure(Measure::new("Orders", "1").with_display_folder("KPIs\r"));
        assert!(matches!(
            validate(&model).unwrap_err(),
            CompileError::InvalidProperty { property: "display folder", .. }
        ));

        // Multi-line queries are fine on Cached tables
        let mut model = sales_model();
        model.tables[1].source = Some("SELECT CustomerID\nFROM dim_customer".to_string());
        assert!(validate(&model).is_ok());
    }

    #[test]
    fn test_empty_hierarchy() {
        let mut model = sales_model();
        model.add_hierarchy(Hierarchy::new("Nothing", Vec::<String>::new()));
        assert!(matches!(validate(&model).unwrap_err(), CompileError::InvalidHierarchy(_)));
    }

    #[test]
    fn test_hierarchy_unknown_table() {
        let mut model = sales_model();
        model.add_hierarchy(Hierarchy::new("Geo", ["Country"]).with_table("Geography"));
        assert!(matches!(validate(&model).unwrap_err(), CompileError::Reference { .. }));
    }

    #[test]
    fn test_warnings_are_collected() {
        let mut model = sales_model();
        model
            .add_table(Table::new("Live", TableMode::DirectConnection))
            .add_hierarchy(Hierarchy::new("Geo", ["Country"]));
        let mut role = Role::new("Sales Team");
        role.add_table_permission("Region", "Region[Name] = USERNAME()");
        model.add_role(role);

        let report = validate(&model).unwrap();
        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings[0].contains("Live"));
        assert!(report.warnings[1].contains("Country"));
        assert!(report.warnings[2].contains("unknown table Region"));
    }
}
