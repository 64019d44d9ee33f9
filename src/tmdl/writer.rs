//! Emits the model definition folder as a list of text files.

use std::collections::HashSet;
use std::path::PathBuf;

use super::ident::{qualified, quote};
use super::normalize_expression;
use super::vocab::Vocabulary;
use crate::model::{
    CalculatedColumn, Column, Hierarchy, Measure, Relationship, Role, SemanticModel, Table,
    TableMode,
};
use crate::options::CompileOptions;

/// One emitted file, path relative to the `.SemanticModel` folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    pub path: PathBuf,
    pub contents: String,
}

impl DefinitionFile {
    fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// Emit every definition file for `model` in a fixed order.
///
/// Assumes the model passed validation.
pub fn write_definition(model: &SemanticModel, options: &CompileOptions) -> Vec<DefinitionFile> {
    let mut files = vec![
        DefinitionFile::new("definition/database.tmdl", serialize_database(model, options)),
        DefinitionFile::new("definition/model.tmdl", serialize_model(model, options)),
    ];

    let mut table_names = FileNames::default();
    for table in &model.tables {
        let path = format!("definition/tables/{}.tmdl", table_names.claim(&table.name));
        files.push(DefinitionFile::new(path, serialize_table(table, options)));
    }

    if !model.relationships.is_empty() {
        files.push(DefinitionFile::new(
            "definition/relationships.tmdl",
            serialize_relationships(&model.relationships),
        ));
    }

    if !model.hierarchies.is_empty() {
        let mut output = String::new();
        for (i, hierarchy) in model.hierarchies.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            serialize_hierarchy(&mut output, hierarchy);
        }
        files.push(DefinitionFile::new("definition/hierarchies.tmdl", output));
    }

    let mut role_names = FileNames::default();
    for role in &model.roles {
        let path = format!("definition/roles/{}.tmdl", role_names.claim(&role.name));
        files.push(DefinitionFile::new(path, serialize_role(role)));
    }

    files
}

/// Hands out file stems that are safe on every platform and unique
/// ignoring case.
#[derive(Default)]
struct FileNames {
    taken: HashSet<String>,
}

impl FileNames {
    fn claim(&mut self, name: &str) -> String {
        let base = file_stem(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        candidate
    }
}

/// Replace characters that are not allowed in file names.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim().trim_end_matches('.');
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem.to_string()
    }
}

fn indent(output: &mut String, depth: usize) {
    for _ in 0..depth {
        output.push('\t');
    }
}

fn line(output: &mut String, depth: usize, text: &str) {
    indent(output, depth);
    output.push_str(text);
    output.push('\n');
}

fn serialize_description(output: &mut String, depth: usize, description: Option<&str>) {
    let Some(description) = description else {
        return;
    };
    for text in description.trim().lines() {
        indent(output, depth);
        output.push_str("///");
        if !text.trim().is_empty() {
            output.push(' ');
            output.push_str(text.trim_end());
        }
        output.push('\n');
    }
}

/// `<head> = expr` on one line, or `<head> =` followed by the expression
/// two levels deeper.
fn serialize_expression(output: &mut String, depth: usize, head: &str, expression: &str) {
    let expression = normalize_expression(expression);
    indent(output, depth);
    output.push_str(head);
    output.push_str(" =");
    if expression.contains('\n') {
        output.push('\n');
        for text in expression.lines() {
            line(output, depth + 2, text);
        }
    } else {
        if !expression.is_empty() {
            output.push(' ');
            output.push_str(&expression);
        }
        output.push('\n');
    }
}

fn serialize_database(model: &SemanticModel, options: &CompileOptions) -> String {
    let mut output = String::new();
    line(&mut output, 0, &format!("database {}", quote(&model.name)));
    line(
        &mut output,
        1,
        &format!("compatibilityLevel: {}", options.compatibility_level),
    );
    output
}

fn serialize_model(model: &SemanticModel, options: &CompileOptions) -> String {
    let mut output = String::new();
    serialize_description(&mut output, 0, model.description.as_deref());
    line(&mut output, 0, "model Model");
    line(&mut output, 1, &format!("culture: {}", options.culture));
    line(&mut output, 1, "defaultPowerBIDataSourceVersion: powerBI_V3");
    line(&mut output, 1, &format!("sourceQueryCulture: {}", options.culture));

    for measure in &model.measures {
        output.push('\n');
        serialize_measure(&mut output, 0, measure);
    }

    if !model.tables.is_empty() {
        output.push('\n');
        for table in &model.tables {
            line(&mut output, 0, &format!("ref table {}", quote(&table.name)));
        }
    }

    if !model.roles.is_empty() {
        output.push('\n');
        for role in &model.roles {
            line(&mut output, 0, &format!("ref role {}", quote(&role.name)));
        }
    }

    output
}

fn serialize_table(table: &Table, options: &CompileOptions) -> String {
    let mut output = String::new();
    serialize_description(&mut output, 0, table.description.as_deref());
    line(&mut output, 0, &format!("table {}", quote(&table.name)));

    output.push('\n');
    serialize_partition(&mut output, table, options);

    for column in &table.columns {
        output.push('\n');
        serialize_column(&mut output, column);
    }

    for measure in &table.measures {
        output.push('\n');
        serialize_measure(&mut output, 1, measure);
    }

    // Validation rejects these on DirectConnection tables
    if table.mode.supports_calculated_columns() {
        for column in &table.calculated_columns {
            output.push('\n');
            serialize_calculated_column(&mut output, column);
        }
    }

    output
}

/// Escape a value for an M string literal. Line breaks and tabs become
/// `#(lf)`-style escapes so the literal stays on one line with its
/// content unchanged.
fn m_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => escaped.push_str("\"\""),
            '\n' => escaped.push_str("#(lf)"),
            '\r' => escaped.push_str("#(cr)"),
            '\t' => escaped.push_str("#(tab)"),
            // A literal `#(` would start an escape
            '#' if chars.peek() == Some(&'(') => escaped.push_str("#(#)"),
            c => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

fn serialize_partition(output: &mut String, table: &Table, options: &CompileOptions) {
    let schema = table.schema.as_deref().unwrap_or(&options.default_schema);
    line(
        output,
        1,
        &format!(
            "partition {} = {}",
            quote(&table.name),
            table.mode.partition_kind()
        ),
    );
    line(output, 2, &format!("mode: {}", table.mode.token()));

    match table.mode {
        TableMode::DirectConnection => {
            let entity = table.source.as_deref().unwrap_or(&table.name);
            line(output, 2, "source");
            line(output, 3, &format!("entityName: {}", entity));
            line(output, 3, &format!("schemaName: {}", schema));
            if let Some(resource) = &table.connection {
                line(output, 3, &format!("resourceId: {}", resource));
            }
        }
        TableMode::Cached => {
            let server = table.connection.as_deref().unwrap_or(&options.default_server);
            line(output, 2, "source =");
            line(output, 4, "let");
            line(
                output,
                4,
                &format!(
                    "    Source = Sql.Database({}, {}),",
                    m_string(server),
                    m_string(schema)
                ),
            );
            let data = match &table.source {
                Some(query) => format!(
                    "    Data = Value.NativeQuery(Source, {})",
                    m_string(query.trim())
                ),
                None => format!(
                    "    Data = Source{{[Schema={},Item={}]}}[Data]",
                    m_string(schema),
                    m_string(&table.name)
                ),
            };
            line(output, 4, &data);
            line(output, 4, "in");
            line(output, 4, "    Data");
        }
    }
}

fn serialize_column(output: &mut String, column: &Column) {
    serialize_description(output, 1, column.description.as_deref());
    line(output, 1, &format!("column {}", quote(&column.name)));
    line(output, 2, &format!("dataType: {}", column.data_type.token()));
    if let Some(format_string) = &column.format_string {
        line(output, 2, &format!("formatString: {}", format_string));
    }
    if column.is_hidden {
        line(output, 2, "isHidden");
    }
    line(output, 2, "summarizeBy: none");
    line(output, 2, &format!("sourceColumn: {}", column.name));
}

fn serialize_measure(output: &mut String, depth: usize, measure: &Measure) {
    serialize_description(output, depth, measure.description.as_deref());
    serialize_expression(
        output,
        depth,
        &format!("measure {}", quote(&measure.name)),
        &measure.expression,
    );
    if let Some(data_type) = measure.data_type {
        line(output, depth + 1, &format!("dataType: {}", data_type.token()));
    }
    if let Some(format_string) = &measure.format_string {
        line(output, depth + 1, &format!("formatString: {}", format_string));
    }
    if let Some(folder) = &measure.display_folder {
        line(output, depth + 1, &format!("displayFolder: {}", folder));
    }
    if measure.is_hidden {
        line(output, depth + 1, "isHidden");
    }
}

fn serialize_calculated_column(output: &mut String, column: &CalculatedColumn) {
    serialize_description(output, 1, column.description.as_deref());
    serialize_expression(
        output,
        1,
        &format!("calculatedColumn {}", quote(&column.name)),
        &column.expression,
    );
    line(output, 2, &format!("dataType: {}", column.data_type.token()));
    line(output, 2, "summarizeBy: none");
}

fn serialize_relationships(relationships: &[Relationship]) -> String {
    let mut output = String::new();
    let mut names = HashSet::new();

    for (i, rel) in relationships.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        let base = format!(
            "{}.{} -> {}.{}",
            rel.from_table, rel.from_column, rel.to_table, rel.to_column
        );
        let mut name = base.clone();
        let mut n = 2;
        while !names.insert(name.clone()) {
            name = format!("{} #{}", base, n);
            n += 1;
        }
        serialize_relationship(&mut output, &name, rel);
    }

    output
}

fn serialize_relationship(output: &mut String, name: &str, rel: &Relationship) {
    let (from_cardinality, to_cardinality) = rel.cardinality.ends();

    serialize_description(output, 0, rel.description.as_deref());
    line(output, 0, &format!("relationship {}", quote(name)));
    line(
        output,
        1,
        &format!("fromColumn: {}", qualified(&rel.from_table, &rel.from_column)),
    );
    line(
        output,
        1,
        &format!("toColumn: {}", qualified(&rel.to_table, &rel.to_column)),
    );
    line(output, 1, &format!("fromCardinality: {}", from_cardinality));
    line(output, 1, &format!("toCardinality: {}", to_cardinality));
    line(
        output,
        1,
        &format!(
            "crossFilteringBehavior: {}",
            rel.cross_filter_direction.token()
        ),
    );
    if !rel.is_active {
        line(output, 1, "isActive: false");
    }
}

fn serialize_hierarchy(output: &mut String, hierarchy: &Hierarchy) {
    serialize_description(output, 0, hierarchy.description.as_deref());
    line(output, 0, &format!("hierarchy {}", quote(&hierarchy.name)));
    if let Some(table) = &hierarchy.table {
        line(output, 1, &format!("table: {}", quote(table)));
    }
    for level in &hierarchy.levels {
        line(output, 1, &format!("level {}", quote(level)));
    }
}

fn serialize_role(role: &Role) -> String {
    let mut output = String::new();
    serialize_description(&mut output, 0, role.description.as_deref());
    line(&mut output, 0, &format!("role {}", quote(&role.name)));
    line(&mut output, 1, "modelPermission: read");

    for permission in &role.table_permissions {
        output.push('\n');
        serialize_expression(
            &mut output,
            1,
            &format!("tablePermission {}", quote(&permission.table_name)),
            &permission.filter_expression,
        );
    }

    if !role.members.is_empty() {
        output.push('\n');
        for member in &role.members {
            line(&mut output, 1, &format!("member {}", quote(member)));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, CrossFilter, DataType};

    fn file<'a>(files: &'a [DefinitionFile], path: &str) -> &'a str {
        files
            .iter()
            .find(|f| f.path == PathBuf::from(path))
            .map(|f| f.contents.as_str())
            .unwrap_or_else(|| panic!("missing {}", path))
    }

    fn sales_model() -> SemanticModel {
        let mut sales = Table::new("Sales", TableMode::Cached)
            .with_schema("dbo")
            .with_connection("sql.example.net")
            .with_description("Sales transactions");
        sales
            .add_column(Column::new("SalesID", DataType::Integer))
            .add_column(
                Column::new("Revenue", DataType::Currency)
                    .with_format_string("$#,##0.00")
                    .with_description("Sale amount"),
            )
            .add_measure(
                Measure::new("Total Sales", "SUM(Sales[Revenue])")
                    .with_format_string("$#,##0")
                    .with_display_folder("KPIs"),
            );

        let mut customer = Table::new("Customer", TableMode::Cached);
        customer.add_column(Column::new("CustomerID", DataType::Integer));

        let mut model = SemanticModel::new("Examples_Model");
        model.add_table(sales).add_table(customer).add_relationship(
            Relationship::new("Sales", "SalesID", "Customer", "CustomerID")
                .with_cardinality(Cardinality::ManyToOne)
                .with_cross_filter(CrossFilter::Both),
        );
        model
    }

    #[test]
    fn test_file_order() {
        let files = write_definition(&sales_model(), &CompileOptions::default());
        let paths: Vec<String> = files.iter().map(|f| f.path.display().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "definition/database.tmdl",
                "definition/model.tmdl",
                "definition/tables/Sales.tmdl",
                "definition/tables/Customer.tmdl",
                "definition/relationships.tmdl",
            ]
        );
    }

    #[test]
    fn test_serialize_table() {
        let files = write_definition(&sales_model(), &CompileOptions::default());
        let sales = file(&files, "definition/tables/Sales.tmdl");

        assert!(sales.starts_with("/// Sales transactions\ntable Sales\n"));
        assert!(sales.contains("\tpartition Sales = m\n\t\tmode: import\n"));
        assert!(sales.contains("Sql.Database(\"sql.example.net\", \"dbo\")"));
        assert!(sales.contains("Source{[Schema=\"dbo\",Item=\"Sales\"]}[Data]"));
        assert!(sales.contains("\t/// Sale amount\n\tcolumn Revenue\n\t\tdataType: decimal\n\t\tformatString: $#,##0.00\n"));
        assert!(sales.contains(
            "\tmeasure 'Total Sales' = SUM(Sales[Revenue])\n\t\tformatString: $#,##0\n\t\tdisplayFolder: KPIs\n"
        ));
    }

    #[test]
    fn test_serialize_direct_connection_partition() {
        let mut live = Table::new("sales_fact", TableMode::DirectConnection)
            .with_schema("lake")
            .with_connection("0000-lake");
        live.add_column(Column::new("Id", DataType::Integer));
        let out = serialize_table(&live, &CompileOptions::default());

        assert!(out.contains("\tpartition sales_fact = entity\n\t\tmode: directLake\n\t\tsource\n"));
        assert!(out.contains("\t\t\tentityName: sales_fact\n\t\t\tschemaName: lake\n\t\t\tresourceId: 0000-lake\n"));
    }

    #[test]
    fn test_serialize_native_query_escapes_quotes() {
        let table = Table::new("Product", TableMode::Cached)
            .with_source("SELECT *\n  FROM p WHERE Name = \"x\"");
        let out = serialize_table(&table, &CompileOptions::default());
        assert!(out.contains(
            "Value.NativeQuery(Source, \"SELECT *#(lf)  FROM p WHERE Name = \"\"x\"\"\")"
        ));
        assert!(out.contains("Sql.Database(\"localhost\", \"dbo\")"));
    }

    #[test]
    fn test_serialize_native_query_keeps_layout() {
        let table = Table::new("Product", TableMode::Cached).with_source(
            "SELECT ProductID -- key only\r\nFROM dim_product\n\tWHERE Name = 'a  b'\n",
        );
        let out = serialize_table(&table, &CompileOptions::default());
        assert!(out.contains(
            "\t\t\t\t    Data = Value.NativeQuery(Source, \"SELECT ProductID -- key only#(cr)#(lf)FROM dim_product#(lf)#(tab)WHERE Name = 'a  b'\")\n"
        ));
    }

    #[test]
    fn test_m_string_escapes() {
        assert_eq!(m_string("plain"), "\"plain\"");
        assert_eq!(m_string("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(m_string("a\nb"), "\"a#(lf)b\"");
        assert_eq!(m_string("#(lf) # x"), "\"#(#)(lf) # x\"");
    }

    #[test]
    fn test_serialize_multiline_measure() {
        let measure = Measure::new(
            "Revenue PY",
            "\n        CALCULATE(\n            [Total Revenue],\n            SAMEPERIODLASTYEAR(Sales[OrderDate])\n        )",
        )
        .with_format_string("$#,##0");
        let mut out = String::new();
        serialize_measure(&mut out, 1, &measure);

        assert_eq!(
            out,
            "\tmeasure 'Revenue PY' =\n\t\t\tCALCULATE(\n\t\t\t    [Total Revenue],\n\t\t\t    SAMEPERIODLASTYEAR(Sales[OrderDate])\n\t\t\t)\n\t\tformatString: $#,##0\n"
        );
    }

    #[test]
    fn test_calculated_columns_after_measures() {
        let mut table = Table::new("Customer", TableMode::Cached);
        table
            .add_column(Column::new("CustomerID", DataType::Integer))
            .add_calculated_column(CalculatedColumn::new("Customer Key", "[CustomerID] & \"-\""))
            .add_measure(Measure::new("Customers", "COUNTROWS(Customer)"));
        let out = serialize_table(&table, &CompileOptions::default());

        let measure_at = out.find("measure Customers").unwrap();
        let calc_at = out.find("calculatedColumn 'Customer Key' = [CustomerID] & \"-\"").unwrap();
        assert!(measure_at < calc_at);
    }

    #[test]
    fn test_serialize_relationship() {
        let files = write_definition(&sales_model(), &CompileOptions::default());
        let rels = file(&files, "definition/relationships.tmdl");
        assert_eq!(
            rels,
            "relationship 'Sales.SalesID -> Customer.CustomerID'\n\
             \tfromColumn: Sales.SalesID\n\
             \ttoColumn: Customer.CustomerID\n\
             \tfromCardinality: many\n\
             \ttoCardinality: one\n\
             \tcrossFilteringBehavior: bothDirections\n"
        );
    }

    #[test]
    fn test_duplicate_relationship_names_are_numbered() {
        let rel = Relationship::new("A", "x", "B", "y");
        let out = serialize_relationships(&[rel.clone(), rel.inactive()]);
        assert!(out.contains("relationship 'A.x -> B.y'\n"));
        assert!(out.contains("relationship 'A.x -> B.y #2'\n"));
        assert!(out.contains("\tisActive: false\n"));
    }

    #[test]
    fn test_serialize_role() {
        let mut role = Role::new("Regional Sales").with_description("Own region only");
        role.add_table_permission("Sales", "Sales[Region] = USERNAME()")
            .add_member("north.sales@company.com");
        let out = serialize_role(&role);
        assert_eq!(
            out,
            "/// Own region only\n\
             role 'Regional Sales'\n\
             \tmodelPermission: read\n\
             \n\
             \ttablePermission Sales = Sales[Region] = USERNAME()\n\
             \n\
             \tmember 'north.sales@company.com'\n"
        );
    }

    #[test]
    fn test_model_file_lists_refs_and_model_measures() {
        let mut model = sales_model();
        model
            .add_measure(Measure::new("Customer Count", "DISTINCTCOUNT(Sales[CustomerID])"))
            .add_role(Role::new("Executives"));
        let files = write_definition(&model, &CompileOptions::default());
        let out = file(&files, "definition/model.tmdl");

        assert!(out.starts_with("model Model\n\tculture: en-US\n"));
        assert!(out.contains("\nmeasure 'Customer Count' = DISTINCTCOUNT(Sales[CustomerID])\n"));
        assert!(out.contains("ref table Sales\nref table Customer\n"));
        assert!(out.contains("ref role Executives\n"));
    }

    #[test]
    fn test_file_names_are_unique_and_safe() {
        let mut names = FileNames::default();
        assert_eq!(names.claim("Sales/Returns"), "Sales_Returns");
        assert_eq!(names.claim("sales_returns"), "sales_returns_2");
        assert_eq!(names.claim("..."), "_");
        assert_eq!(file_stem("Q1: Plan?"), "Q1_ Plan_");
    }
}
