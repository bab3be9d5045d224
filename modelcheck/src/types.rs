use crate::errors::Result;
use crate::schema::{DataType, ModelEntity, ModelTable, PropertyMapping, RelationshipMapping};

/// Mapping metadata emitted by `#[derive(MappedEntity)]`.
#[derive(Debug, Default, Clone)]
pub struct EntityDescriptor {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub fields: Vec<FieldDescriptor>,
    pub relations: Vec<RelationDescriptor>,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub column: String,
    pub data_type: DataType,
    pub optional: bool,
    /// `0` when not length-bounded, `-1` for unbounded.
    pub max_length: i32,
    /// Target table when the entity is split over several tables.
    /// `None` keeps the field in the entity's own table.
    pub schema: Option<String>,
    pub table: Option<String>,
}

/// A foreign key declared with `#[mapping(belongs_to(...))]`. Fields naming the
/// same principal table are grouped into one composite key, in field order.
#[derive(Debug, Clone)]
pub struct RelationDescriptor {
    pub principal_schema: String,
    pub principal_table: String,
    pub principal_columns: Vec<String>,
    pub dependent_columns: Vec<String>,
    /// Table holding the dependent columns when it differs from the entity's own.
    pub dependent_schema: Option<String>,
    pub dependent_table: Option<String>,
}

impl FieldDescriptor {
    pub fn target_table<'a>(&'a self, entity: &'a EntityDescriptor) -> (&'a str, &'a str) {
        (
            self.schema.as_deref().unwrap_or(&entity.schema),
            self.table.as_deref().unwrap_or(&entity.table),
        )
    }
}

impl EntityDescriptor {
    pub fn main_table(&self) -> ModelTable {
        ModelTable::new(&self.schema, &self.table)
    }

    /// Every table the entity is stored in, its own table first.
    pub fn tables(&self) -> Vec<ModelTable> {
        let mut tables = vec![self.main_table()];
        for field in &self.fields {
            let (schema, table) = field.target_table(self);
            if !tables.iter().any(|t| t.is(schema, table)) {
                tables.push(ModelTable::new(schema, table));
            }
        }
        tables
    }

    /// Canonical entity with one table mapping per target table.
    pub fn to_model_entity(&self) -> ModelEntity {
        let mut entity = ModelEntity::new(&self.name);
        entity.table_mapping_mut(&self.schema, &self.table);
        for field in &self.fields {
            let (schema, table) = field.target_table(self);
            let property = PropertyMapping::new(&field.column, field.data_type, field.optional)
                .with_maximum_length(field.max_length);
            if !entity.table_mapping_mut(schema, table).add_property(property) {
                log::debug!("{}.{} maps column {} twice; keeping the first", self.name, field.name, field.column);
            }
        }
        entity
    }

    pub fn relationships(&self) -> Result<Vec<RelationshipMapping>> {
        self.relations
            .iter()
            .map(|relation| {
                let dependent = ModelTable::new(
                    relation.dependent_schema.as_deref().unwrap_or(&self.schema),
                    relation.dependent_table.as_deref().unwrap_or(&self.table),
                );
                RelationshipMapping::new(
                    ModelTable::new(&relation.principal_schema, &relation.principal_table),
                    relation.principal_columns.clone(),
                    dependent,
                    relation.dependent_columns.clone(),
                )
            })
            .collect()
    }
}

/// Implemented by `#[derive(MappedEntity)]`.
pub trait EntityMetadata {
    fn entity_descriptor() -> EntityDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PrimitiveKind;

    fn field(name: &str, kind: PrimitiveKind, optional: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            column: name.to_string(),
            data_type: DataType::with_nullability(kind, optional),
            optional,
            max_length: if kind.is_length_bounded() { -1 } else { 0 },
            schema: None,
            table: None,
        }
    }

    #[test]
    fn test_split_entity_produces_two_mappings() {
        let mut photo = field("Photo", PrimitiveKind::Binary, true);
        photo.table = Some("CustomerPhotos".to_string());
        let descriptor = EntityDescriptor {
            name: "Customer".to_string(),
            schema: "dbo".to_string(),
            table: "Customers".to_string(),
            fields: vec![field("Id", PrimitiveKind::Int32, false), photo],
            relations: Vec::new(),
        };

        let entity = descriptor.to_model_entity();
        assert_eq!(entity.table_mappings.len(), 2);
        assert_eq!(entity.table_mappings[0].table_name, "Customers");
        assert_eq!(entity.table_mappings[1].table_name, "CustomerPhotos");
        assert_eq!(entity.table_mappings[1].property_mappings[0].maximum_length, -1);
        assert_eq!(descriptor.tables().len(), 2);
    }

    #[test]
    fn test_relationship_defaults_to_own_table() {
        let descriptor = EntityDescriptor {
            name: "Order".to_string(),
            schema: "sales".to_string(),
            table: "Orders".to_string(),
            fields: vec![field("CustomerId", PrimitiveKind::Int32, false)],
            relations: vec![RelationDescriptor {
                principal_schema: "sales".to_string(),
                principal_table: "Customers".to_string(),
                principal_columns: vec!["Id".to_string()],
                dependent_columns: vec!["CustomerId".to_string()],
                dependent_schema: None,
                dependent_table: None,
            }],
        };

        let relationships = descriptor.relationships().unwrap();
        assert_eq!(relationships[0].from_table, ModelTable::new("sales", "Customers"));
        assert_eq!(relationships[0].to_table, ModelTable::new("sales", "Orders"));
    }
}
