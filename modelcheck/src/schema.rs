//! Canonical model schema types.
//!
//! These are the framework-independent shapes every [`crate::mapping::MappingProvider`]
//! produces. They are built once per run and never mutated after extraction.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{CheckError, Result};

/// Schema assumed when a mapping description does not name one.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Join a schema and table name into the `schema.table` form used in reports.
pub fn qualified_name(schema_name: &str, table_name: &str) -> String {
    format!("{schema_name}.{table_name}")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Data types
// ═══════════════════════════════════════════════════════════════════════════════

/// Primitive kinds a property or column can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Binary,
    Date,
    DateTime,
    DateTimeOffset,
    Time,
    Guid,
}

impl PrimitiveKind {
    /// Canonical lowercase name used in reports and snapshots.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "bool",
            PrimitiveKind::Byte => "u8",
            PrimitiveKind::SByte => "i8",
            PrimitiveKind::Int16 => "i16",
            PrimitiveKind::Int32 => "i32",
            PrimitiveKind::Int64 => "i64",
            PrimitiveKind::Single => "f32",
            PrimitiveKind::Double => "f64",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::String => "string",
            PrimitiveKind::Binary => "bytes",
            PrimitiveKind::Date => "date",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::DateTimeOffset => "datetime_offset",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Guid => "uuid",
        }
    }

    /// Reference kinds carry their nullability on the property, never in the type.
    pub const fn is_reference(self) -> bool {
        matches!(self, PrimitiveKind::String | PrimitiveKind::Binary)
    }

    /// Only text and binary values have a meaningful maximum length.
    pub const fn is_length_bounded(self) -> bool {
        matches!(self, PrimitiveKind::String | PrimitiveKind::Binary)
    }

    /// Resolve a kind from its canonical name or a framework-style name
    /// (`Int32`, `Edm.Int32`, `System.String`, `Byte[]`).
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name
            .trim()
            .strip_prefix("Edm.")
            .or_else(|| name.trim().strip_prefix("System."))
            .unwrap_or(name.trim());

        let kind = match bare.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => PrimitiveKind::Boolean,
            "u8" | "byte" => PrimitiveKind::Byte,
            "i8" | "sbyte" => PrimitiveKind::SByte,
            "i16" | "int16" => PrimitiveKind::Int16,
            "i32" | "int32" => PrimitiveKind::Int32,
            "i64" | "int64" => PrimitiveKind::Int64,
            "f32" | "single" => PrimitiveKind::Single,
            "f64" | "double" => PrimitiveKind::Double,
            "decimal" => PrimitiveKind::Decimal,
            "string" => PrimitiveKind::String,
            "bytes" | "binary" | "byte[]" => PrimitiveKind::Binary,
            "date" => PrimitiveKind::Date,
            "datetime" => PrimitiveKind::DateTime,
            "datetime_offset" | "datetimeoffset" => PrimitiveKind::DateTimeOffset,
            "time" | "timespan" => PrimitiveKind::Time,
            "uuid" | "guid" => PrimitiveKind::Guid,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved property or column type: a primitive kind plus an optional
/// nullable wrapper.
///
/// The wrapper only exists for value kinds. `DataType::nullable(PrimitiveKind::String)`
/// is identical to `DataType::new(PrimitiveKind::String)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    kind: PrimitiveKind,
    nullable: bool,
}

impl DataType {
    pub const fn new(kind: PrimitiveKind) -> Self {
        Self { kind, nullable: false }
    }

    pub const fn nullable(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            nullable: !kind.is_reference(),
        }
    }

    pub const fn with_nullability(kind: PrimitiveKind, nullable: bool) -> Self {
        if nullable { Self::nullable(kind) } else { Self::new(kind) }
    }

    pub const fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    /// True when the type carries a nullable wrapper (`Option<i32>`).
    pub const fn is_wrapped(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Option<{}>", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl FromStr for DataType {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (inner, nullable) = if let Some(rest) = trimmed.strip_prefix("Option<").and_then(|r| r.strip_suffix('>')) {
            (rest, true)
        } else if let Some(rest) = trimmed.strip_prefix("Nullable<").and_then(|r| r.strip_suffix('>')) {
            (rest, true)
        } else if let Some(rest) = trimmed.strip_suffix('?') {
            (rest, true)
        } else {
            (trimmed, false)
        };

        let kind = PrimitiveKind::from_name(inner)
            .ok_or_else(|| CheckError::mapping(format!("unknown data type `{s}`")))?;
        Ok(DataType::with_nullability(kind, nullable))
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Model schema
// ═══════════════════════════════════════════════════════════════════════════════

/// A table the model knows about, including join tables visible only in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelTable {
    pub schema_name: String,
    pub table_name: String,
}

impl ModelTable {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema_name, &self.table_name)
    }

    pub fn is(&self, schema_name: &str, table_name: &str) -> bool {
        self.schema_name == schema_name && self.table_name == table_name
    }
}

impl fmt::Display for ModelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.table_name)
    }
}

/// One application-level entity type and the table(s) it is stored in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEntity {
    pub name: String,
    #[serde(default)]
    pub table_mappings: Vec<TableMapping>,
}

impl ModelEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_mappings: Vec::new(),
        }
    }

    /// Get the mapping for a table, creating it on first use so that fragments
    /// targeting the same table merge into a single mapping.
    pub fn table_mapping_mut(&mut self, schema_name: &str, table_name: &str) -> &mut TableMapping {
        let index = match self
            .table_mappings
            .iter()
            .position(|m| m.schema_name == schema_name && m.table_name == table_name)
        {
            Some(index) => index,
            None => {
                self.table_mappings.push(TableMapping::new(schema_name, table_name));
                self.table_mappings.len() - 1
            }
        };
        &mut self.table_mappings[index]
    }

    /// True when the entity is spread over more than one table.
    pub fn is_split(&self) -> bool {
        self.table_mappings.len() > 1
    }
}

/// Property-to-column mapping for one physical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMapping {
    pub schema_name: String,
    pub table_name: String,
    #[serde(default)]
    pub property_mappings: Vec<PropertyMapping>,
}

impl TableMapping {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            property_mappings: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema_name, &self.table_name)
    }

    /// Add a property mapping. Returns `false` and leaves the mapping untouched
    /// if the column is already mapped.
    pub fn add_property(&mut self, property: PropertyMapping) -> bool {
        if self.property(&property.column_name).is_some() {
            return false;
        }
        self.property_mappings.push(property);
        true
    }

    pub fn property(&self, column_name: &str) -> Option<&PropertyMapping> {
        self.property_mappings.iter().find(|p| p.column_name == column_name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.property_mappings.iter().map(|p| p.column_name.as_str())
    }
}

/// Mapping of one scalar property to a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    pub column_name: String,
    pub property_data_type: DataType,
    pub is_nullable: bool,
    /// `0` when not length-bounded, [`PropertyMapping::UNBOUNDED`] for "max".
    #[serde(default)]
    pub maximum_length: i32,
}

impl PropertyMapping {
    /// Sentinel for unbounded text/binary, matching what databases report.
    pub const UNBOUNDED: i32 = -1;
    /// Length of values that are not length-bounded.
    pub const NOT_BOUNDED: i32 = 0;

    pub fn new(column_name: impl Into<String>, property_data_type: DataType, is_nullable: bool) -> Self {
        Self {
            column_name: column_name.into(),
            property_data_type,
            is_nullable,
            maximum_length: Self::NOT_BOUNDED,
        }
    }

    pub fn with_maximum_length(mut self, maximum_length: i32) -> Self {
        self.maximum_length = maximum_length;
        self
    }
}

/// A foreign-key relationship assumed by the model.
///
/// `from_*` is the principal (referenced key) side, `to_*` the dependent
/// (foreign key) side. The column lists are positionally aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMapping {
    pub from_table: ModelTable,
    pub from_properties: Vec<String>,
    pub to_table: ModelTable,
    pub to_properties: Vec<String>,
}

impl RelationshipMapping {
    pub fn new(
        from_table: ModelTable,
        from_properties: Vec<String>,
        to_table: ModelTable,
        to_properties: Vec<String>,
    ) -> Result<Self> {
        if from_properties.len() != to_properties.len() {
            return Err(CheckError::mapping(format!(
                "relationship between {from_table} and {to_table} pairs {} key column(s) with {}",
                from_properties.len(),
                to_properties.len()
            )));
        }
        Ok(Self {
            from_table,
            from_properties,
            to_table,
            to_properties,
        })
    }
}

/// Canonical model extracted from the ORM mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    #[serde(default)]
    pub entities: Vec<ModelEntity>,
    #[serde(default)]
    pub tables: Vec<ModelTable>,
    #[serde(default)]
    pub relationships: Vec<RelationshipMapping>,
}

impl ModelSchema {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.tables.is_empty() && self.relationships.is_empty()
    }

    /// Every table mapping of every entity, in extraction order.
    pub fn table_mappings(&self) -> impl Iterator<Item = &TableMapping> {
        self.entities.iter().flat_map(|e| e.table_mappings.iter())
    }

    /// Add a table unless it is already known.
    pub fn add_table(&mut self, table: ModelTable) {
        if !self.tables.contains(&table) {
            self.tables.push(table);
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a model snapshot previously written with [`ModelSchema::to_json_pretty`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::io(path, e))?;
        Self::from_json(&content)
    }
}
