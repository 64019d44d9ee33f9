//! Reads emitted definition text back into a structural summary.
//!
//! Only the structure the writer produces is understood: object headers,
//! their names and expressions, and the handful of properties that carry
//! enumeration values. Everything else is skipped.

use std::path::{Path, PathBuf};

use super::ident::{split_name, split_qualified};
use super::vocab::Vocabulary;
use crate::error::CompileError;
use crate::model::{Cardinality, CrossFilter, DataType, TableMode};

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Line {line}: unexpected {text:?}")]
    Unexpected { line: usize, text: String },
    #[error("Line {line}: malformed name in {text:?}")]
    BadName { line: usize, text: String },
    #[error("{object} is missing {property}")]
    MissingProperty {
        object: String,
        property: &'static str,
    },
    #[error(transparent)]
    Vocabulary(#[from] CompileError),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub tables: Vec<TableSummary>,
    /// Model-level measures
    pub measures: Vec<MeasureSummary>,
    pub relationships: Vec<RelationshipSummary>,
    pub hierarchies: Vec<HierarchySummary>,
    pub roles: Vec<RoleSummary>,
    table_refs: Vec<String>,
    role_refs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSummary {
    pub name: String,
    pub mode: Option<TableMode>,
    pub columns: Vec<ColumnSummary>,
    pub measures: Vec<MeasureSummary>,
    pub calculated_columns: Vec<MeasureSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: Option<DataType>,
}

/// Any named expression: measure or calculated column.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSummary {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSummary {
    pub name: String,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: Cardinality,
    pub cross_filter: CrossFilter,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchySummary {
    pub name: String,
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleSummary {
    pub name: String,
    pub permissions: Vec<(String, String)>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
struct Line<'a> {
    number: usize,
    depth: usize,
    text: &'a str,
}

impl<'a> Line<'a> {
    fn is_doc(&self) -> bool {
        self.text.starts_with("///")
    }

    fn keyword(&self) -> (&'a str, &'a str) {
        let text = self.text;
        text.split_once(' ').unwrap_or((text, ""))
    }
}

fn tokenize(input: &str) -> Vec<Line<'_>> {
    input
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let raw = raw.trim_end();
            let text = raw.trim_start_matches('\t');
            if text.is_empty() {
                return None;
            }
            Some(Line {
                number: i + 1,
                depth: raw.len() - text.len(),
                text,
            })
        })
        .collect()
}

struct Reader<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lines: tokenize(input),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&Line<'a>> {
        self.lines.get(self.pos)
    }

    fn advance(&mut self) -> Option<Line<'a>> {
        let line = self.lines.get(self.pos).cloned();
        self.pos += 1;
        line
    }

    /// Next line if it sits deeper than `depth`.
    fn child_of(&self, depth: usize) -> Option<&Line<'a>> {
        self.peek().filter(|l| l.depth > depth)
    }

    fn name(line: &Line<'_>, rest: &'a str) -> Result<(String, &'a str), ReadError> {
        split_name(rest).ok_or_else(|| ReadError::BadName {
            line: line.number,
            text: line.text.to_string(),
        })
    }

    /// Expression following a name: inline after ` = `, or a block two
    /// levels below the header.
    fn expression(&mut self, line: &Line<'_>, rest: &str) -> Result<String, ReadError> {
        let Some(inline) = rest.trim_start().strip_prefix('=') else {
            return Err(ReadError::Unexpected {
                line: line.number,
                text: line.text.to_string(),
            });
        };
        let inline = inline.trim();
        if !inline.is_empty() {
            return Ok(inline.to_string());
        }

        let body_depth = line.depth + 2;
        let mut body = Vec::new();
        while let Some(next) = self.peek().filter(|l| l.depth >= body_depth) {
            let mut text = "\t".repeat(next.depth - body_depth);
            text.push_str(next.text);
            body.push(text);
            self.pos += 1;
        }
        Ok(body.join("\n"))
    }

    /// Consume everything below `depth`, returning the direct
    /// `key: value` properties (flags get an empty value).
    fn properties(&mut self, depth: usize) -> Vec<(&'a str, &'a str)> {
        let mut props = Vec::new();
        while let Some(line) = self.child_of(depth).cloned() {
            self.pos += 1;
            if line.depth != depth + 1 || line.is_doc() {
                continue;
            }
            match line.text.split_once(": ") {
                Some((key, value)) => props.push((key, value.trim())),
                None => props.push((line.text, "")),
            }
        }
        props
    }

    fn parse(mut self) -> Result<Document, ReadError> {
        let mut document = Document::default();

        while let Some(line) = self.advance() {
            if line.depth != 0 || line.is_doc() {
                continue;
            }
            let (keyword, rest) = line.keyword();
            match keyword {
                "table" => {
                    let (name, _) = Self::name(&line, rest)?;
                    let table = self.parse_table(name)?;
                    document.tables.push(table);
                }
                "measure" => {
                    let (name, rest) = Self::name(&line, rest)?;
                    let expression = self.expression(&line, rest)?;
                    self.properties(0);
                    document.measures.push(MeasureSummary { name, expression });
                }
                "relationship" => {
                    let (name, _) = Self::name(&line, rest)?;
                    let relationship = self.parse_relationship(name)?;
                    document.relationships.push(relationship);
                }
                "hierarchy" => {
                    let (name, _) = Self::name(&line, rest)?;
                    let hierarchy = self.parse_hierarchy(name)?;
                    document.hierarchies.push(hierarchy);
                }
                "role" => {
                    let (name, _) = Self::name(&line, rest)?;
                    let role = self.parse_role(name)?;
                    document.roles.push(role);
                }
                "ref" => {
                    let (kind, target) = rest.split_once(' ').unwrap_or((rest, ""));
                    let (name, _) = Self::name(&line, target)?;
                    match kind {
                        "table" => document.table_refs.push(name),
                        "role" => document.role_refs.push(name),
                        _ => {}
                    }
                }
                "model" | "database" | "expression" => {
                    self.properties(0);
                }
                _ => {
                    return Err(ReadError::Unexpected {
                        line: line.number,
                        text: line.text.to_string(),
                    });
                }
            }
        }

        Ok(document)
    }

    fn parse_table(&mut self, name: String) -> Result<TableSummary, ReadError> {
        let mut table = TableSummary {
            name,
            ..TableSummary::default()
        };

        while let Some(line) = self.child_of(0).cloned() {
            self.pos += 1;
            if line.depth != 1 || line.is_doc() {
                continue;
            }
            let (keyword, rest) = line.keyword();
            match keyword {
                "partition" => {
                    Self::name(&line, rest)?;
                    for (key, value) in self.properties(1) {
                        if key == "mode" {
                            table.mode = Some(TableMode::from_token(value)?);
                        }
                    }
                }
                "column" => {
                    let (name, _) = Self::name(&line, rest)?;
                    let mut data_type = None;
                    for (key, value) in self.properties(1) {
                        if key == "dataType" {
                            data_type = Some(DataType::from_token(value)?);
                        }
                    }
                    table.columns.push(ColumnSummary { name, data_type });
                }
                "measure" => {
                    let (name, rest) = Self::name(&line, rest)?;
                    let expression = self.expression(&line, rest)?;
                    self.properties(1);
                    table.measures.push(MeasureSummary { name, expression });
                }
                "calculatedColumn" => {
                    let (name, rest) = Self::name(&line, rest)?;
                    let expression = self.expression(&line, rest)?;
                    self.properties(1);
                    table
                        .calculated_columns
                        .push(MeasureSummary { name, expression });
                }
                _ => {
                    return Err(ReadError::Unexpected {
                        line: line.number,
                        text: line.text.to_string(),
                    });
                }
            }
        }

        Ok(table)
    }

    fn parse_relationship(&mut self, name: String) -> Result<RelationshipSummary, ReadError> {
        let props = self.properties(0);
        let get = |property: &'static str| {
            props
                .iter()
                .find(|(key, _)| *key == property)
                .map(|(_, value)| *value)
                .ok_or_else(|| ReadError::MissingProperty {
                    object: format!("relationship {}", name),
                    property,
                })
        };
        let endpoint = |property: &'static str| -> Result<(String, String), ReadError> {
            let value = get(property)?;
            split_qualified(value).ok_or_else(|| ReadError::MissingProperty {
                object: format!("relationship {}", name),
                property,
            })
        };

        let (from_table, from_column) = endpoint("fromColumn")?;
        let (to_table, to_column) = endpoint("toColumn")?;
        let cardinality = Cardinality::from_ends(get("fromCardinality")?, get("toCardinality")?)?;
        let cross_filter = CrossFilter::from_token(get("crossFilteringBehavior")?)?;
        let is_active = get("isActive").map(|v| v != "false").unwrap_or(true);

        Ok(RelationshipSummary {
            name,
            from_table,
            from_column,
            to_table,
            to_column,
            cardinality,
            cross_filter,
            is_active,
        })
    }

    fn parse_hierarchy(&mut self, name: String) -> Result<HierarchySummary, ReadError> {
        let mut levels = Vec::new();
        while let Some(line) = self.child_of(0).cloned() {
            self.pos += 1;
            if line.depth != 1 {
                continue;
            }
            if let ("level", rest) = line.keyword() {
                let (level, _) = Self::name(&line, rest)?;
                levels.push(level);
            }
        }
        Ok(HierarchySummary { name, levels })
    }

    fn parse_role(&mut self, name: String) -> Result<RoleSummary, ReadError> {
        let mut role = RoleSummary {
            name,
            permissions: Vec::new(),
            members: Vec::new(),
        };
        while let Some(line) = self.child_of(0).cloned() {
            self.pos += 1;
            if line.depth != 1 || line.is_doc() {
                continue;
            }
            match line.keyword() {
                ("tablePermission", rest) => {
                    let (table, rest) = Self::name(&line, rest)?;
                    let filter = self.expression(&line, rest)?;
                    role.permissions.push((table, filter));
                }
                ("member", rest) => {
                    let (member, _) = Self::name(&line, rest)?;
                    role.members.push(member);
                }
                _ => {}
            }
        }
        Ok(role)
    }
}

/// Parse definition text (one file or several concatenated).
pub fn read_document(input: &str) -> Result<Document, ReadError> {
    let mut document = Reader::new(input).parse()?;
    sort_by_refs(&mut document.tables, &document.table_refs, |t| &t.name);
    sort_by_refs(&mut document.roles, &document.role_refs, |r| &r.name);
    Ok(document)
}

/// Put items in `ref` order; unreferenced items keep their order at the end.
fn sort_by_refs<T>(items: &mut [T], refs: &[String], name: impl Fn(&T) -> &String) {
    if refs.is_empty() {
        return;
    }
    items.sort_by_key(|item| {
        refs.iter()
            .position(|r| r == name(item))
            .unwrap_or(refs.len())
    });
}

fn read_file(path: &Path) -> Result<String, ReadError> {
    std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn tmdl_files_in(dir: &Path) -> Result<Vec<PathBuf>, ReadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| ReadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "tmdl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read a compiled `.SemanticModel` folder (or its `definition` folder).
pub fn read_folder(path: impl AsRef<Path>) -> Result<Document, ReadError> {
    let path = path.as_ref();
    let definition = if path.join("definition").is_dir() {
        path.join("definition")
    } else {
        path.to_path_buf()
    };

    let mut files = vec![definition.join("model.tmdl")];
    files.extend(tmdl_files_in(&definition.join("tables"))?);
    for name in ["relationships.tmdl", "hierarchies.tmdl"] {
        let file = definition.join(name);
        if file.is_file() {
            files.push(file);
        }
    }
    files.extend(tmdl_files_in(&definition.join("roles"))?);

    let mut text = String::new();
    for file in &files {
        text.push_str(&read_file(file)?);
        text.push('\n');
    }
    read_document(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "/// Sales transactions\n\
table 'Sales Fact'\n\
\n\
\tpartition 'Sales Fact' = m\n\
\t\tmode: import\n\
\t\tsource =\n\
\t\t\t\tlet\n\
\t\t\t\t    Source = Sql.Database(\"localhost\", \"dbo\"),\n\
\t\t\t\tin\n\
\t\t\t\t    Source\n\
\n\
\tcolumn SalesID\n\
\t\tdataType: int64\n\
\t\tsummarizeBy: none\n\
\n\
\t/// Sum of revenue\n\
\tmeasure 'Total Sales' = SUM('Sales Fact'[Revenue])\n\
\t\tformatString: $#,##0\n\
\n\
\tmeasure 'Revenue PY' =\n\
\t\t\tCALCULATE(\n\
\t\t\t    [Total Sales],\n\
\t\t\t\t/// not a doc comment\n\
\t\t\t)\n\
\t\tisHidden\n\
\n\
\tcalculatedColumn Band = IF([SalesID] > 10, \"High\", \"Low\")\n\
\t\tdataType: string\n";

    #[test]
    fn test_read_table() {
        let doc = read_document(TABLE).unwrap();
        assert_eq!(doc.tables.len(), 1);

        let table = &doc.tables[0];
        assert_eq!(table.name, "Sales Fact");
        assert_eq!(table.mode, Some(TableMode::Cached));
        assert_eq!(table.columns[0].name, "SalesID");
        assert_eq!(table.columns[0].data_type, Some(DataType::Integer));
        assert_eq!(table.measures.len(), 2);
        assert_eq!(table.measures[0].expression, "SUM('Sales Fact'[Revenue])");
        assert_eq!(
            table.measures[1].expression,
            "CALCULATE(\n    [Total Sales],\n\t/// not a doc comment\n)"
        );
        assert_eq!(table.calculated_columns[0].name, "Band");
    }

    #[test]
    fn test_read_relationship() {
        let text = "relationship 'A.x -> B.y'\n\
\tfromColumn: 'Sales Fact'.CustomerID\n\
\ttoColumn: Customer.CustomerID\n\
\tfromCardinality: many\n\
\ttoCardinality: one\n\
\tcrossFilteringBehavior: bothDirections\n\
\tisActive: false\n";
        let doc = read_document(text).unwrap();
        let rel = &doc.relationships[0];
        assert_eq!(rel.from_table, "Sales Fact");
        assert_eq!(rel.to_column, "CustomerID");
        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
        assert_eq!(rel.cross_filter, CrossFilter::Both);
        assert!(!rel.is_active);
    }

    #[test]
    fn test_unknown_token_fails() {
        let text = "relationship r\n\
\tfromColumn: A.x\n\
\ttoColumn: B.y\n\
\tfromCardinality: several\n\
\ttoCardinality: one\n\
\tcrossFilteringBehavior: oneDirection\n";
        let err = read_document(text).unwrap_err();
        assert!(matches!(err, ReadError::Vocabulary(CompileError::EnumerationMapping { .. })));
    }

    #[test]
    fn test_missing_property() {
        let err = read_document("relationship r\n\ttoColumn: B.y\n").unwrap_err();
        assert!(matches!(err, ReadError::MissingProperty { property: "fromColumn", .. }));
    }

    #[test]
    fn test_unexpected_top_level() {
        let err = read_document("entity User\n").unwrap_err();
        assert!(matches!(err, ReadError::Unexpected { line: 1, .. }));
    }

    #[test]
    fn test_refs_order_tables() {
        let text = "model Model\n\tculture: en-US\n\nref table B\nref table A\n\ntable A\n\ntable B\n";
        let doc = read_document(text).unwrap();
        let names: Vec<&str> = doc.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_read_role_and_hierarchy() {
        let text = "role 'Regional Sales'\n\
\tmodelPermission: read\n\
\n\
\ttablePermission Sales = Sales[Region] = USERNAME()\n\
\n\
\tmember 'north.sales@company.com'\n\
\n\
hierarchy Geography\n\
\tlevel Country\n\
\tlevel 'Sales Region'\n";
        let doc = read_document(text).unwrap();
        assert_eq!(
            doc.roles[0].permissions,
            vec![("Sales".to_string(), "Sales[Region] = USERNAME()".to_string())]
        );
        assert_eq!(doc.roles[0].members, vec!["north.sales@company.com"]);
        assert_eq!(doc.hierarchies[0].levels, vec!["Country", "Sales Region"]);
    }
}
