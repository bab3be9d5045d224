//! Types for the findings of a reconciliation run.

use std::fmt;

use serde::Serialize;

use crate::schema::DataType;

/// Which part of the schema a finding concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Table,
    Column,
    Relationship,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Table => write!(f, "table"),
            Category::Column => write!(f, "column"),
            Category::Relationship => write!(f, "relationship"),
        }
    }
}

/// Which check produced a finding. Column attribute mismatches belong to the
/// model side: they are only looked for when model columns are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    InDatabaseButNotInModel,
    InModelButNotInDatabase,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::InDatabaseButNotInModel => write!(f, "database only"),
            Direction::InModelButNotInDatabase => write!(f, "model only"),
        }
    }
}

/// One disagreement between the model and the database.
///
/// Table names are qualified (`schema.table`). The `Display` form is the
/// report message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    TableNotInModel {
        table: String,
    },
    TableNotInDatabase {
        table: String,
    },
    ColumnNotInModel {
        table: String,
        column: String,
    },
    ColumnNotInDatabase {
        table: String,
        column: String,
    },
    UnknownDataType {
        table: String,
        column: String,
        model_type: DataType,
    },
    DataTypeMismatch {
        table: String,
        column: String,
        model_type: DataType,
        database_type: DataType,
    },
    /// The column accepts NULL but the property does not.
    DatabaseNullable {
        table: String,
        column: String,
        model_type: DataType,
    },
    /// The property accepts NULL but the column does not.
    DatabaseNotNullable {
        table: String,
        column: String,
        model_type: DataType,
    },
    MaximumLengthMismatch {
        table: String,
        column: String,
        model_type: DataType,
        model_length: i32,
        database_length: i32,
    },
    RelationshipNotInModel {
        from_table: String,
        to_table: String,
        from_columns: Vec<String>,
        to_columns: Vec<String>,
    },
    RelationshipNotInDatabase {
        from_table: String,
        to_table: String,
        from_columns: Vec<String>,
        to_columns: Vec<String>,
    },
}

impl Discrepancy {
    pub fn category(&self) -> Category {
        match self {
            Discrepancy::TableNotInModel { .. } | Discrepancy::TableNotInDatabase { .. } => Category::Table,
            Discrepancy::RelationshipNotInModel { .. } | Discrepancy::RelationshipNotInDatabase { .. } => {
                Category::Relationship
            }
            _ => Category::Column,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Discrepancy::TableNotInModel { .. }
            | Discrepancy::ColumnNotInModel { .. }
            | Discrepancy::RelationshipNotInModel { .. } => Direction::InDatabaseButNotInModel,
            _ => Direction::InModelButNotInDatabase,
        }
    }

    /// The qualified table the finding is about. For relationships this is
    /// the dependent (foreign key) table.
    pub fn table(&self) -> &str {
        match self {
            Discrepancy::TableNotInModel { table }
            | Discrepancy::TableNotInDatabase { table }
            | Discrepancy::ColumnNotInModel { table, .. }
            | Discrepancy::ColumnNotInDatabase { table, .. }
            | Discrepancy::UnknownDataType { table, .. }
            | Discrepancy::DataTypeMismatch { table, .. }
            | Discrepancy::DatabaseNullable { table, .. }
            | Discrepancy::DatabaseNotNullable { table, .. }
            | Discrepancy::MaximumLengthMismatch { table, .. } => table,
            Discrepancy::RelationshipNotInModel { to_table, .. }
            | Discrepancy::RelationshipNotInDatabase { to_table, .. } => to_table,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::TableNotInModel { table } => {
                write!(f, "The table {table} is in the database but not in the entity model.")
            }
            Discrepancy::TableNotInDatabase { table } => {
                write!(f, "The table {table} is in the model but not in the database.")
            }
            Discrepancy::ColumnNotInModel { table, column } => {
                write!(f, "The column {column} in table {table} is not in the entity model.")
            }
            Discrepancy::ColumnNotInDatabase { table, column } => {
                write!(f, "The column {column} doesn't exist in the table {table}.")
            }
            Discrepancy::UnknownDataType {
                table,
                column,
                model_type,
            } => write!(
                f,
                "The column {column} in table {table} has an unknown data type of {model_type}."
            ),
            Discrepancy::DataTypeMismatch {
                table,
                column,
                model_type,
                database_type,
            } => write!(
                f,
                "The column {column} in table {table} has a data type of {model_type} which does not match with the database ({database_type})."
            ),
            Discrepancy::DatabaseNullable {
                table,
                column,
                model_type,
            } => write!(
                f,
                "The column {column} in table {table} is nullable, but the {model_type} property is not nullable."
            ),
            Discrepancy::DatabaseNotNullable {
                table,
                column,
                model_type,
            } => write!(
                f,
                "The column {column} in table {table} is not nullable, but the {model_type} property is nullable."
            ),
            Discrepancy::MaximumLengthMismatch {
                table,
                column,
                model_type,
                model_length,
                database_length,
            } => write!(
                f,
                "The column {column} in table {table} has a maximum length of {database_length} which does not agree with the {model_type} property ({model_length})."
            ),
            Discrepancy::RelationshipNotInModel {
                from_table,
                to_table,
                from_columns,
                to_columns,
            } => write!(
                f,
                "The relationship between {from_table} and {to_table} from keys {} to {} is in the database but not in the entity model.",
                from_columns.join(","),
                to_columns.join(",")
            ),
            Discrepancy::RelationshipNotInDatabase {
                from_table,
                to_table,
                from_columns,
                to_columns,
            } => write!(
                f,
                "The relationship between {from_table} and {to_table} from keys {} to {} is not in the database.",
                from_columns.join(","),
                to_columns.join(",")
            ),
        }
    }
}

/// Ordered findings of one run: tables, then columns, then relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub discrepancies: Vec<Discrepancy>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.discrepancies.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter()
    }

    /// The report as plain messages, in order.
    pub fn messages(&self) -> Vec<String> {
        self.discrepancies.iter().map(ToString::to_string).collect()
    }

    pub fn count(&self, category: Category) -> usize {
        self.discrepancies.iter().filter(|d| d.category() == category).count()
    }
}

impl IntoIterator for Report {
    type Item = Discrepancy;
    type IntoIter = std::vec::IntoIter<Discrepancy>;

    fn into_iter(self) -> Self::IntoIter {
        self.discrepancies.into_iter()
    }
}
