//! Live database schema: the reader seam and the canonical in-memory mirror.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{CheckError, Result};
use crate::schema::{DataType, PrimitiveKind, qualified_name};

/// A table as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlTable {
    pub schema_name: String,
    pub table_name: String,
}

impl SqlTable {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema_name, &self.table_name)
    }
}

/// A column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlColumn {
    pub column_name: String,
    pub is_nullable: bool,
    /// `-1` for unbounded text/binary, `0` when not length-bounded.
    #[serde(default)]
    pub maximum_length: i32,
    /// `None` when the database type has no canonical equivalent.
    #[serde(default)]
    pub data_type: Option<DataType>,
    /// Native database type name, used to resolve `data_type` when a snapshot
    /// only records what the database reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
}

impl SqlColumn {
    pub fn new(column_name: impl Into<String>, data_type: Option<DataType>, is_nullable: bool) -> Self {
        Self {
            column_name: column_name.into(),
            is_nullable,
            maximum_length: 0,
            data_type,
            sql_type: None,
        }
    }

    /// Build a column from the native type name reported by a SQL Server style
    /// catalog.
    pub fn from_sql_type(
        column_name: impl Into<String>,
        sql_type: impl Into<String>,
        is_nullable: bool,
        maximum_length: i32,
    ) -> Self {
        let sql_type = sql_type.into();
        let data_type = sql_type_kind(&sql_type).map(|kind| DataType::with_nullability(kind, is_nullable));
        Self {
            column_name: column_name.into(),
            is_nullable,
            maximum_length,
            data_type,
            sql_type: Some(sql_type),
        }
    }

    pub fn with_maximum_length(mut self, maximum_length: i32) -> Self {
        self.maximum_length = maximum_length;
        self
    }

    /// Fill in `data_type` from `sql_type` when only the native name is known.
    fn resolve_sql_type(&mut self) {
        if self.data_type.is_some() {
            return;
        }
        if let Some(kind) = self.sql_type.as_deref().and_then(sql_type_kind) {
            self.data_type = Some(DataType::with_nullability(kind, self.is_nullable));
        }
    }
}

/// Map a native SQL Server type name to its canonical kind.
pub fn sql_type_kind(sql_type: &str) -> Option<PrimitiveKind> {
    let kind = match sql_type.trim().to_ascii_lowercase().as_str() {
        "bit" => PrimitiveKind::Boolean,
        "tinyint" => PrimitiveKind::Byte,
        "smallint" => PrimitiveKind::Int16,
        "int" => PrimitiveKind::Int32,
        "bigint" => PrimitiveKind::Int64,
        "real" => PrimitiveKind::Single,
        "float" => PrimitiveKind::Double,
        "decimal" | "numeric" | "money" | "smallmoney" => PrimitiveKind::Decimal,
        "char" | "nchar" | "varchar" | "nvarchar" | "text" | "ntext" | "xml" => PrimitiveKind::String,
        "binary" | "varbinary" | "image" | "rowversion" | "timestamp" => PrimitiveKind::Binary,
        "date" => PrimitiveKind::Date,
        "datetime" | "datetime2" | "smalldatetime" => PrimitiveKind::DateTime,
        "datetimeoffset" => PrimitiveKind::DateTimeOffset,
        "time" => PrimitiveKind::Time,
        "uniqueidentifier" => PrimitiveKind::Guid,
        _ => return None,
    };
    Some(kind)
}

/// One row of the database's foreign-key catalog. Composite keys span several
/// rows sharing `foreign_key_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlRelationship {
    pub foreign_key_name: String,
    pub primary_key_schema: String,
    pub primary_key_table_name: String,
    pub primary_key_column_name: String,
    pub foreign_key_schema: String,
    pub foreign_key_table_name: String,
    pub foreign_key_column_name: String,
    /// 1-based position within the composite key.
    pub ordinal_position: u32,
}

impl SqlRelationship {
    pub fn primary_key_table(&self) -> String {
        qualified_name(&self.primary_key_schema, &self.primary_key_table_name)
    }

    pub fn foreign_key_table(&self) -> String {
        qualified_name(&self.foreign_key_schema, &self.foreign_key_table_name)
    }
}

/// Source of live database metadata.
///
/// Implementations wrap a connection or catalog query. Failures are returned as
/// [`CheckError::SchemaRead`].
pub trait SchemaReader {
    fn tables(&self) -> Result<Vec<SqlTable>>;

    /// Columns of one table. `schema_filter` qualifies the table name; `None`
    /// leaves the lookup unqualified.
    fn columns(&self, table_name: &str, schema_filter: Option<&str>) -> Result<Vec<SqlColumn>>;

    fn relationships(&self) -> Result<Vec<SqlRelationship>>;
}

/// A table together with its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveTable {
    #[serde(flatten)]
    pub table: SqlTable,
    #[serde(default)]
    pub columns: Vec<SqlColumn>,
}

/// Canonical live schema, read once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tables: Vec<LiveTable>,
    #[serde(default)]
    pub relationships: Vec<SqlRelationship>,
}

impl LiveSchema {
    /// Read every table, its columns and all relationship rows from `reader`.
    ///
    /// Columns are read with each table's own schema so that a table name
    /// shared between schemas is never mixed up.
    pub fn read<R>(reader: &R, schema_filter: Option<&str>) -> Result<Self>
    where
        R: SchemaReader + ?Sized,
    {
        let mut tables = Vec::new();
        for table in reader.tables()? {
            if schema_filter.is_some_and(|filter| filter != table.schema_name) {
                continue;
            }
            let columns = reader.columns(&table.table_name, Some(&table.schema_name))?;
            debug!("read {} column(s) for {}", columns.len(), table.qualified_name());
            tables.push(LiveTable { table, columns });
        }

        let relationships = reader.relationships()?;
        debug!(
            "read {} table(s) and {} relationship row(s) from the database",
            tables.len(),
            relationships.len()
        );

        Ok(Self {
            captured_at: Some(Utc::now()),
            tables,
            relationships,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut schema: LiveSchema = serde_json::from_str(content)?;
        for column in schema.tables.iter_mut().flat_map(|t| t.columns.iter_mut()) {
            column.resolve_sql_type();
        }
        Ok(schema)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::io(path, e))?;
        Self::from_json(&content)
    }

    pub fn table(&self, schema_name: &str, table_name: &str) -> Option<&LiveTable> {
        self.tables
            .iter()
            .find(|t| t.table.schema_name == schema_name && t.table.table_name == table_name)
    }

    /// Columns of a table, empty when the table does not exist.
    pub fn columns_of(&self, schema_name: &str, table_name: &str) -> &[SqlColumn] {
        self.table(schema_name, table_name)
            .map(|t| t.columns.as_slice())
            .unwrap_or_default()
    }
}

/// A live schema already in memory also serves as a reader.
impl SchemaReader for LiveSchema {
    fn tables(&self) -> Result<Vec<SqlTable>> {
        Ok(self.tables.iter().map(|t| t.table.clone()).collect())
    }

    fn columns(&self, table_name: &str, schema_filter: Option<&str>) -> Result<Vec<SqlColumn>> {
        Ok(self
            .tables
            .iter()
            .filter(|t| t.table.table_name == table_name)
            .filter(|t| schema_filter.is_none_or(|filter| filter == t.table.schema_name))
            .flat_map(|t| t.columns.iter().cloned())
            .collect())
    }

    fn relationships(&self) -> Result<Vec<SqlRelationship>> {
        Ok(self.relationships.clone())
    }
}

/// Reads a JSON live-schema snapshot from disk on each call.
#[derive(Debug, Clone)]
pub struct SnapshotSchemaReader {
    path: PathBuf,
}

impl SnapshotSchemaReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> Result<LiveSchema> {
        LiveSchema::load(&self.path).map_err(|e| {
            CheckError::schema_read(format!("could not load snapshot {}", self.path.display()), e)
        })
    }
}

impl SchemaReader for SnapshotSchemaReader {
    fn tables(&self) -> Result<Vec<SqlTable>> {
        self.snapshot()?.tables()
    }

    fn columns(&self, table_name: &str, schema_filter: Option<&str>) -> Result<Vec<SqlColumn>> {
        self.snapshot()?.columns(table_name, schema_filter)
    }

    fn relationships(&self) -> Result<Vec<SqlRelationship>> {
        self.snapshot()?.relationships()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LiveSchema {
        LiveSchema {
            captured_at: None,
            tables: vec![
                LiveTable {
                    table: SqlTable::new("dbo", "Orders"),
                    columns: vec![SqlColumn::new("Id", Some(DataType::new(PrimitiveKind::Int32)), false)],
                },
                LiveTable {
                    table: SqlTable::new("audit", "Orders"),
                    columns: vec![SqlColumn::new("AuditId", Some(DataType::new(PrimitiveKind::Int64)), false)],
                },
            ],
            relationships: Vec::new(),
        }
    }

    #[test]
    fn test_sql_type_mapping() {
        assert_eq!(sql_type_kind("NVARCHAR"), Some(PrimitiveKind::String));
        assert_eq!(sql_type_kind("uniqueidentifier"), Some(PrimitiveKind::Guid));
        assert_eq!(sql_type_kind("geography"), None);

        let column = SqlColumn::from_sql_type("Score", "int", true, 0);
        assert_eq!(column.data_type, Some(DataType::nullable(PrimitiveKind::Int32)));
    }

    #[test]
    fn test_columns_are_qualified_by_schema() {
        let live = sample();
        let dbo = live.columns("Orders", Some("dbo")).unwrap();
        assert_eq!(dbo.len(), 1);
        assert_eq!(dbo[0].column_name, "Id");
        assert_eq!(live.columns("Orders", None).unwrap().len(), 2);
        assert!(live.columns_of("sales", "Orders").is_empty());
    }

    #[test]
    fn test_read_applies_schema_filter() {
        let live = LiveSchema::read(&sample(), Some("audit")).unwrap();
        assert_eq!(live.tables.len(), 1);
        assert_eq!(live.tables[0].table.qualified_name(), "audit.Orders");
        assert_eq!(live.tables[0].columns[0].column_name, "AuditId");
    }

    #[test]
    fn test_snapshot_resolves_native_type_names() {
        let json = r#"{
            "tables": [
                {
                    "schema_name": "dbo",
                    "table_name": "Customers",
                    "columns": [
                        { "column_name": "Name", "is_nullable": true, "maximum_length": 100, "sql_type": "nvarchar" },
                        { "column_name": "Location", "is_nullable": true, "sql_type": "geography" },
                        { "column_name": "Id", "is_nullable": false, "data_type": "i32" }
                    ]
                }
            ]
        }"#;
        let live = LiveSchema::from_json(json).unwrap();
        let columns = live.columns_of("dbo", "Customers");
        assert_eq!(columns[0].data_type, Some(DataType::new(PrimitiveKind::String)));
        assert_eq!(columns[0].maximum_length, 100);
        assert_eq!(columns[1].data_type, None);
        assert_eq!(columns[2].data_type, Some(DataType::new(PrimitiveKind::Int32)));
    }

    #[test]
    fn test_missing_snapshot_is_a_schema_read_error() {
        let reader = SnapshotSchemaReader::new("/nonexistent/live.json");
        let err = reader.tables().unwrap_err();
        assert!(matches!(err, CheckError::SchemaRead { .. }));
    }
}
