//! Reconciliation of the canonical model against the live schema.
//!
//! Everything here is a pure function of its inputs: no I/O, and identical
//! inputs always give the same findings in the same order.

mod discrepancy;

use std::collections::HashSet;

use log::{debug, info};

pub use discrepancy::{Category, Direction, Discrepancy, Report};

use crate::live::{LiveSchema, SqlColumn, SqlRelationship};
use crate::options::CheckOptions;
use crate::schema::{ModelSchema, ModelTable, PropertyMapping, TableMapping, qualified_name};

/// Compare `model` against `live` and report every enabled kind of drift.
pub fn reconcile(model: &ModelSchema, live: &LiveSchema, options: &CheckOptions) -> Report {
    let mut discrepancies = Vec::new();
    check_tables(model, live, options, &mut discrepancies);
    check_columns(model, live, options, &mut discrepancies);
    check_relationships(model, live, options, &mut discrepancies);

    let report = Report { discrepancies };
    info!(
        "reconciliation found {} discrepanc(ies): {} table, {} column, {} relationship",
        report.len(),
        report.count(Category::Table),
        report.count(Category::Column),
        report.count(Category::Relationship)
    );
    report
}

/// Keep the first occurrence of each item, preserving order.
fn distinct(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

fn check_tables(model: &ModelSchema, live: &LiveSchema, options: &CheckOptions, out: &mut Vec<Discrepancy>) {
    let live_tables = distinct(
        live.tables
            .iter()
            .filter(|t| options.includes_schema(&t.table.schema_name))
            .map(|t| t.table.qualified_name()),
    );
    let model_tables = distinct(
        model
            .tables
            .iter()
            .filter(|t| options.includes_schema(&t.schema_name))
            .map(ModelTable::qualified_name),
    );

    if options.tables_in_database_but_not_in_model {
        let known: HashSet<&str> = model_tables.iter().map(String::as_str).collect();
        out.extend(
            live_tables
                .iter()
                .filter(|t| !known.contains(t.as_str()))
                .map(|t| Discrepancy::TableNotInModel { table: t.clone() }),
        );
    }

    if options.tables_in_model_but_not_in_database {
        let existing: HashSet<&str> = live_tables.iter().map(String::as_str).collect();
        out.extend(
            model_tables
                .iter()
                .filter(|t| !existing.contains(t.as_str()))
                .map(|t| Discrepancy::TableNotInDatabase { table: t.clone() }),
        );
    }
}

/// Table mappings grouped by physical table, in first-occurrence order.
/// Several entities map to one table under table splitting.
fn mappings_by_table<'a>(
    model: &'a ModelSchema,
    options: &CheckOptions,
) -> Vec<(&'a str, &'a str, Vec<&'a TableMapping>)> {
    let mut groups: Vec<(&str, &str, Vec<&TableMapping>)> = Vec::new();
    for mapping in model.table_mappings() {
        if !options.includes_schema(&mapping.schema_name) {
            continue;
        }
        match groups
            .iter_mut()
            .find(|(schema, table, _)| *schema == mapping.schema_name && *table == mapping.table_name)
        {
            Some((_, _, mappings)) => mappings.push(mapping),
            None => groups.push((mapping.schema_name.as_str(), mapping.table_name.as_str(), vec![mapping])),
        }
    }
    groups
}

fn check_columns(model: &ModelSchema, live: &LiveSchema, options: &CheckOptions, out: &mut Vec<Discrepancy>) {
    if options.columns_in_database_but_not_in_model {
        for (schema_name, table_name, mappings) in mappings_by_table(model, options) {
            let mapped: HashSet<&str> = mappings.iter().copied().flat_map(TableMapping::column_names).collect();
            let table = qualified_name(schema_name, table_name);
            for column in live.columns_of(schema_name, table_name) {
                if !mapped.contains(column.column_name.as_str()) {
                    out.push(Discrepancy::ColumnNotInModel {
                        table: table.clone(),
                        column: column.column_name.clone(),
                    });
                }
            }
        }
    }

    if options.columns_in_model_but_not_in_database {
        let mappings = model
            .table_mappings()
            .filter(|m| options.includes_schema(&m.schema_name));
        for mapping in mappings {
            let columns = live.columns_of(&mapping.schema_name, &mapping.table_name);
            let table = mapping.qualified_name();
            debug!(
                "checking {} mapped column(s) of {table} against {} live column(s)",
                mapping.property_mappings.len(),
                columns.len()
            );
            for property in &mapping.property_mappings {
                check_property(&table, property, columns, out);
            }
        }
    }
}

fn check_property(table: &str, property: &PropertyMapping, columns: &[SqlColumn], out: &mut Vec<Discrepancy>) {
    let column_name = &property.column_name;
    let model_type = property.property_data_type;

    let Some(column) = columns.iter().find(|c| &c.column_name == column_name) else {
        out.push(Discrepancy::ColumnNotInDatabase {
            table: table.to_string(),
            column: column_name.clone(),
        });
        return;
    };

    match column.data_type {
        None => out.push(Discrepancy::UnknownDataType {
            table: table.to_string(),
            column: column_name.clone(),
            model_type,
        }),
        // The nullable wrapper is reported by the nullability checks below.
        Some(database_type) if database_type.kind() != model_type.kind() => {
            out.push(Discrepancy::DataTypeMismatch {
                table: table.to_string(),
                column: column_name.clone(),
                model_type,
                database_type,
            })
        }
        Some(_) => {}
    }

    if column.is_nullable && !property.is_nullable {
        out.push(Discrepancy::DatabaseNullable {
            table: table.to_string(),
            column: column_name.clone(),
            model_type,
        });
    }
    if !column.is_nullable && property.is_nullable {
        out.push(Discrepancy::DatabaseNotNullable {
            table: table.to_string(),
            column: column_name.clone(),
            model_type,
        });
    }

    if column.maximum_length != property.maximum_length {
        out.push(Discrepancy::MaximumLengthMismatch {
            table: table.to_string(),
            column: column_name.clone(),
            model_type,
            model_length: property.maximum_length,
            database_length: column.maximum_length,
        });
    }
}

/// A foreign key reassembled from its catalog rows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ForeignKey {
    from_table: ModelTable,
    to_table: ModelTable,
    from_columns: Vec<String>,
    to_columns: Vec<String>,
}

/// Group relationship rows by foreign-key name in first-occurrence order and
/// order each group's columns by ordinal position.
fn foreign_keys(live: &LiveSchema) -> Vec<ForeignKey> {
    let mut groups: Vec<(&str, Vec<&SqlRelationship>)> = Vec::new();
    for row in &live.relationships {
        match groups.iter_mut().find(|(name, _)| *name == row.foreign_key_name) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((row.foreign_key_name.as_str(), vec![row])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(_, mut rows)| {
            rows.sort_by_key(|r| r.ordinal_position);
            let first = rows.first()?;
            Some(ForeignKey {
                from_table: ModelTable::new(&first.primary_key_schema, &first.primary_key_table_name),
                to_table: ModelTable::new(&first.foreign_key_schema, &first.foreign_key_table_name),
                from_columns: rows.iter().map(|r| r.primary_key_column_name.clone()).collect(),
                to_columns: rows.iter().map(|r| r.foreign_key_column_name.clone()).collect(),
            })
        })
        .collect()
}

fn check_relationships(model: &ModelSchema, live: &LiveSchema, options: &CheckOptions, out: &mut Vec<Discrepancy>) {
    let in_scope = |from: &ModelTable, to: &ModelTable| {
        options.includes_schema(&from.schema_name) && options.includes_schema(&to.schema_name)
    };

    let keys: Vec<ForeignKey> = foreign_keys(live)
        .into_iter()
        .filter(|k| in_scope(&k.from_table, &k.to_table))
        .collect();
    let relationships: Vec<_> = model
        .relationships
        .iter()
        .filter(|r| in_scope(&r.from_table, &r.to_table))
        .collect();

    if options.relationships_in_database_but_not_in_model {
        for key in &keys {
            let modelled = relationships.iter().any(|r| {
                r.from_table == key.from_table
                    && r.to_table == key.to_table
                    && r.from_properties == key.from_columns
                    && r.to_properties == key.to_columns
            });
            if !modelled {
                out.push(Discrepancy::RelationshipNotInModel {
                    from_table: key.from_table.qualified_name(),
                    to_table: key.to_table.qualified_name(),
                    from_columns: key.from_columns.clone(),
                    to_columns: key.to_columns.clone(),
                });
            }
        }
    }

    if options.relationships_in_model_but_not_in_database {
        for relationship in &relationships {
            let exists = keys.iter().any(|k| {
                k.from_table == relationship.from_table
                    && k.to_table == relationship.to_table
                    && k.from_columns == relationship.from_properties
                    && k.to_columns == relationship.to_properties
            });
            if !exists {
                out.push(Discrepancy::RelationshipNotInDatabase {
                    from_table: relationship.from_table.qualified_name(),
                    to_table: relationship.to_table.qualified_name(),
                    from_columns: relationship.from_properties.clone(),
                    to_columns: relationship.to_properties.clone(),
                });
            }
        }
    }
}
