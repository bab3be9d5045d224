//! modelcheck core library.
//!
//! Detects drift between an ORM mapping and a live database schema: tables,
//! columns and foreign keys the model assumes but the database lacks, and the
//! reverse.

extern crate self as modelcheck;

pub mod errors;
pub mod live;
pub mod mapping;
pub mod options;
pub mod reconcile;
pub mod registry;
pub mod schema;
pub mod types;

use log::debug;

pub use errors::*;
pub use live::{LiveSchema, LiveTable, SchemaReader, SnapshotSchemaReader, SqlColumn, SqlRelationship, SqlTable};
pub use mapping::{EdmxMappingProvider, MappingProvider, SnapshotMappingProvider};
pub use modelcheck_macros::MappedEntity;
pub use options::{CheckOptions, ExclusionPredicate};
pub use reconcile::{Category, Direction, Discrepancy, Report, reconcile};
pub use registry::{EntityRegistration, RegistryMappingProvider, registered_entities};
pub use schema::{
    DataType, ModelEntity, ModelSchema, ModelTable, PrimitiveKind, PropertyMapping, RelationshipMapping,
    TableMapping,
};
pub use types::{EntityDescriptor, EntityMetadata, FieldDescriptor, RelationDescriptor};

// Re-export inventory for auto-registration in the entity derive macro
pub use inventory;

/// Extract the model, read the live schema and reconcile them.
///
/// Live-schema failures are wrapped as [`CheckError::SchemaRead`] and returned;
/// disagreements are never errors.
pub fn check<P, R>(provider: &P, reader: &R, options: &CheckOptions) -> Result<Report>
where
    P: MappingProvider + ?Sized,
    R: SchemaReader + ?Sized,
{
    let model = provider.model_schema()?;
    debug!(
        "model has {} entit(ies), {} table(s), {} relationship(s)",
        model.entities.len(),
        model.tables.len(),
        model.relationships.len()
    );
    let live = LiveSchema::read(reader, options.schema_filter()).map_err(|e| match e {
        CheckError::SchemaRead { .. } => e,
        other => CheckError::schema_read("could not read the live schema", other),
    })?;
    Ok(reconcile(&model, &live, options))
}

/// Run the default checks restricted to `schema_name` (empty for all schemas)
/// and return the discrepancy messages. An empty list means no drift.
pub fn run<P, R>(provider: &P, reader: &R, schema_name: &str) -> Result<Vec<String>>
where
    P: MappingProvider + ?Sized,
    R: SchemaReader + ?Sized,
{
    run_with_options(provider, reader, &CheckOptions::for_schema(schema_name))
}

pub fn run_with_options<P, R>(provider: &P, reader: &R, options: &CheckOptions) -> Result<Vec<String>>
where
    P: MappingProvider + ?Sized,
    R: SchemaReader + ?Sized,
{
    Ok(check(provider, reader, options)?.messages())
}
