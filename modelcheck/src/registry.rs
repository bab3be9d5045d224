//! Entity auto-registration and the descriptor-backed mapping provider.
//!
//! `#[derive(MappedEntity)]` submits an [`EntityRegistration`] for every mapped
//! struct, so a binary only has to link its entity types for
//! [`RegistryMappingProvider::from_inventory`] to see them.

use log::debug;

use crate::errors::Result;
use crate::mapping::MappingProvider;
use crate::options::ExclusionPredicate;
use crate::schema::{ModelSchema, ModelTable, RelationshipMapping};
use crate::types::{EntityDescriptor, EntityMetadata};

/// Submitted to the inventory by the `MappedEntity` derive macro.
pub struct EntityRegistration {
    /// The name of the entity type (e.g., "Order")
    pub type_name: &'static str,
    pub schema_name: &'static str,
    pub table_name: &'static str,
    pub descriptor_fn: fn() -> EntityDescriptor,
}

inventory::collect!(EntityRegistration);

/// All registered entities, in link order.
pub fn registered_entities() -> impl Iterator<Item = &'static EntityRegistration> {
    inventory::iter::<EntityRegistration>()
}

pub fn get_entity_by_name(type_name: &str) -> Option<&'static EntityRegistration> {
    registered_entities().find(|e| e.type_name == type_name)
}

/// Builds the canonical model from derive-generated descriptors.
#[derive(Debug, Clone, Default)]
pub struct RegistryMappingProvider {
    descriptors: Vec<EntityDescriptor>,
    join_tables: Vec<ModelTable>,
    relationships: Vec<RelationshipMapping>,
    exclusions: ExclusionPredicate,
}

impl RegistryMappingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entity registered through the derive macro, ordered by type name
    /// so the model does not depend on link order.
    pub fn from_inventory() -> Self {
        let mut registrations: Vec<_> = registered_entities().collect();
        registrations.sort_by_key(|r| r.type_name);
        let descriptors = registrations.into_iter().map(|r| (r.descriptor_fn)()).collect();
        Self {
            descriptors,
            ..Self::default()
        }
    }

    pub fn with_entity<T: EntityMetadata>(self) -> Self {
        self.with_descriptor(T::entity_descriptor())
    }

    pub fn with_descriptor(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// A table with no entity of its own, such as the join table of a
    /// many-to-many association.
    pub fn with_join_table(mut self, schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        self.join_tables.push(ModelTable::new(schema_name, table_name));
        self
    }

    /// A relationship not expressed on any entity, typically one of a join table's keys.
    pub fn with_relationship(mut self, relationship: RelationshipMapping) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionPredicate) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn descriptors(&self) -> &[EntityDescriptor] {
        &self.descriptors
    }

    fn is_excluded(&self, descriptor: &EntityDescriptor) -> bool {
        self.exclusions.is_excluded(&descriptor.name) || self.exclusions.is_excluded(&descriptor.table)
    }
}

impl MappingProvider for RegistryMappingProvider {
    fn model_schema(&self) -> Result<ModelSchema> {
        let mut model = ModelSchema::default();

        for descriptor in &self.descriptors {
            if self.is_excluded(descriptor) {
                debug!("skipping excluded entity {}", descriptor.name);
                continue;
            }
            model.entities.push(descriptor.to_model_entity());
            for table in descriptor.tables() {
                model.add_table(table);
            }
            model.relationships.extend(descriptor.relationships()?);
        }

        for table in &self.join_tables {
            if !self.exclusions.is_excluded(&table.table_name) {
                model.add_table(table.clone());
            }
        }
        model.relationships.extend(self.relationships.iter().cloned());

        debug!(
            "registry model has {} entit(ies), {} table(s), {} relationship(s)",
            model.entities.len(),
            model.tables.len(),
            model.relationships.len()
        );
        Ok(model)
    }
}
