//! Extraction from a serialized EDMX mapping description.
//!
//! The document carries three layers: `ConceptualModels` (entity types as the
//! application sees them), `StorageModels` (tables and foreign keys) and
//! `Mappings` (which property lands in which column). Elements are matched by
//! tag and attribute name only; the document is not validated against the
//! EDMX schemas.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};

use super::MappingProvider;
use super::document::Element;
use crate::errors::{CheckError, Result};
use crate::options::ExclusionPredicate;
use crate::schema::{
    DEFAULT_SCHEMA, DataType, ModelEntity, ModelSchema, ModelTable, PrimitiveKind, PropertyMapping,
    RelationshipMapping,
};

/// Builds the canonical model from an EDMX document.
#[derive(Debug, Clone)]
pub struct EdmxMappingProvider {
    root: Element,
    exclusions: ExclusionPredicate,
}

impl EdmxMappingProvider {
    pub fn from_xml(xml: &str) -> Result<Self> {
        Ok(Self {
            root: Element::parse(xml)?,
            exclusions: ExclusionPredicate::default(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path).map_err(|e| CheckError::io(path, e))?;
        Self::from_xml(&xml)
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionPredicate) -> Self {
        self.exclusions = exclusions;
        self
    }
}

impl MappingProvider for EdmxMappingProvider {
    fn model_schema(&self) -> Result<ModelSchema> {
        extract(&self.root, &self.exclusions)
    }
}

/// Last dotted segment of a possibly namespace-qualified name (`Shop.Order` -> `Order`).
fn bare_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Type names listed by an `EntityTypeMapping`, e.g. `IsTypeOf(Shop.Order);Shop.Invoice`.
fn mapped_type_names(type_name: &str) -> impl Iterator<Item = &str> {
    type_name.split(';').map(|name| {
        let name = name.trim();
        let name = name
            .strip_prefix("IsTypeOf(")
            .and_then(|n| n.strip_suffix(')'))
            .unwrap_or(name);
        bare_name(name.trim())
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Schemas of one model layer, merged.
struct Layer<'a> {
    schemas: Vec<&'a Element>,
}

impl<'a> Layer<'a> {
    fn find(root: &'a Element, section: &str) -> Option<Self> {
        let section = *root.descendants_named(section).first()?;
        Some(Self {
            schemas: section.children_named("Schema").collect(),
        })
    }

    fn items(&self, name: &str) -> impl Iterator<Item = &'a Element> {
        self.schemas.iter().flat_map(move |s| s.children_named(name))
    }

    fn container(&self, section: &str) -> Option<&'a Element> {
        let containers: Vec<_> = self.items("EntityContainer").collect();
        if containers.len() > 1 {
            warn!(
                "{section} declares {} entity containers; using {}",
                containers.len(),
                containers[0].attribute("Name").unwrap_or("the first")
            );
        }
        containers.first().copied()
    }

    fn by_name(&self, item: &str) -> HashMap<&'a str, &'a Element> {
        self.items(item)
            .filter_map(|e| e.attribute("Name").map(|name| (name, e)))
            .collect()
    }
}

/// Physical table behind a storage entity set.
struct StoreSet {
    table: ModelTable,
}

fn store_sets(container: &Element) -> Result<HashMap<&str, StoreSet>> {
    let mut sets = HashMap::new();
    for set in container.children_named("EntitySet") {
        let name = set.required_attribute("Name")?;
        let schema_name = set.attribute("Schema").unwrap_or(DEFAULT_SCHEMA);
        let table_name = set.attribute("Table").unwrap_or(name);
        sets.insert(
            name,
            StoreSet {
                table: ModelTable::new(schema_name, table_name),
            },
        );
    }
    Ok(sets)
}

/// Declared conceptual properties of an entity type, including inherited ones.
struct EntityTypeInfo<'a> {
    properties: HashMap<&'a str, &'a Element>,
}

impl<'a> EntityTypeInfo<'a> {
    fn resolve(name: &str, entity_types: &HashMap<&'a str, &'a Element>) -> Option<Self> {
        let mut properties = HashMap::new();
        let mut current = entity_types.get(bare_name(name)).copied()?;
        let mut depth = 0;
        loop {
            for property in current.children_named("Property") {
                if let Some(property_name) = property.attribute("Name") {
                    properties.entry(property_name).or_insert(property);
                }
            }
            depth += 1;
            let Some(base) = current.attribute("BaseType") else { break };
            match entity_types.get(bare_name(base)) {
                Some(base) if depth < entity_types.len() => current = *base,
                _ => {
                    warn!("entity type {name} derives from unresolvable base type {base}");
                    break;
                }
            }
        }
        Some(Self { properties })
    }
}

/// Resolve the canonical data type, nullability and maximum length of a
/// conceptual property. `None` when the declared type is neither primitive nor
/// a declared enumeration.
fn resolve_property(
    property: &Element,
    enum_types: &HashMap<&str, PrimitiveKind>,
) -> Result<Option<(DataType, bool, i32)>> {
    let declared = property.required_attribute("Type")?;
    let kind = match PrimitiveKind::from_name(declared) {
        Some(kind) => kind,
        None => match enum_types.get(bare_name(declared)) {
            Some(underlying) => *underlying,
            None => return Ok(None),
        },
    };

    let is_nullable = match property.attribute("Nullable") {
        Some(value) => parse_bool(value).ok_or_else(|| {
            CheckError::mapping(format!("invalid Nullable facet `{value}` on property {declared}"))
        })?,
        None => true,
    };

    let maximum_length = match property.attribute("MaxLength") {
        Some(value) if kind.is_length_bounded() => {
            if value.trim().eq_ignore_ascii_case("max") {
                PropertyMapping::UNBOUNDED
            } else {
                value
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| CheckError::mapping(format!("invalid MaxLength facet `{value}`")))?
            }
        }
        _ => PropertyMapping::NOT_BOUNDED,
    };

    Ok(Some((
        DataType::with_nullability(kind, is_nullable),
        is_nullable,
        maximum_length,
    )))
}

fn enum_underlying_types<'a>(conceptual: &Layer<'a>) -> Result<HashMap<&'a str, PrimitiveKind>> {
    let mut enums = HashMap::new();
    for enum_type in conceptual.items("EnumType") {
        let name = enum_type.required_attribute("Name")?;
        let underlying = enum_type.attribute("UnderlyingType").unwrap_or("Int32");
        let kind = PrimitiveKind::from_name(underlying).ok_or_else(|| {
            CheckError::mapping(format!("enumeration {name} has unknown underlying type {underlying}"))
        })?;
        enums.insert(name, kind);
    }
    Ok(enums)
}

/// Run the extraction over a parsed EDMX document.
pub fn extract(root: &Element, exclusions: &ExclusionPredicate) -> Result<ModelSchema> {
    let mut model = ModelSchema::default();

    let Some(conceptual) = Layer::find(root, "ConceptualModels") else {
        warn!("mapping description has no conceptual model; nothing to check");
        return Ok(model);
    };
    let Some(conceptual_container) = conceptual.container("ConceptualModels") else {
        warn!("conceptual model has no entity container; nothing to check");
        return Ok(model);
    };
    let Some(storage) = Layer::find(root, "StorageModels") else {
        warn!("mapping description has no storage model; nothing to check");
        return Ok(model);
    };
    let Some(storage_container) = storage.container("StorageModels") else {
        warn!("storage model has no entity container; nothing to check");
        return Ok(model);
    };

    let entity_types = conceptual.by_name("EntityType");
    let enum_types = enum_underlying_types(&conceptual)?;
    let store_sets = store_sets(storage_container)?;
    let type_mappings = root.descendants_named("EntityTypeMapping");

    for set in conceptual_container.children_named("EntitySet") {
        let set_name = set.required_attribute("Name")?;
        if exclusions.is_excluded(set_name) {
            debug!("skipping excluded entity set {set_name}");
            continue;
        }

        let type_name = set.required_attribute("EntityType")?;
        let Some(info) = EntityTypeInfo::resolve(type_name, &entity_types) else {
            warn!("entity set {set_name} refers to unknown entity type {type_name}");
            continue;
        };

        let entity_name = bare_name(type_name);
        let mut entity = ModelEntity::new(entity_name);

        let fragments = type_mappings
            .iter()
            .filter(|m| {
                m.attribute("TypeName")
                    .is_some_and(|names| mapped_type_names(names).any(|n| n == entity_name))
            })
            .flat_map(|m| m.descendants_named("MappingFragment"));

        for fragment in fragments {
            let store_set_name = fragment.required_attribute("StoreEntitySet")?;
            let store_set = store_sets.get(store_set_name).ok_or_else(|| {
                CheckError::mapping(format!(
                    "mapping fragment of {entity_name} targets unknown storage entity set {store_set_name}"
                ))
            })?;
            let table = &store_set.table;
            let table_mapping = entity.table_mapping_mut(&table.schema_name, &table.table_name);

            for scalar in fragment.descendants_named("ScalarProperty") {
                let property_name = scalar.required_attribute("Name")?;
                let column_name = scalar.required_attribute("ColumnName")?;

                let Some(property) = info.properties.get(property_name) else {
                    debug!("{entity_name}.{property_name} is mapped but not declared; skipping");
                    continue;
                };
                let Some((data_type, is_nullable, maximum_length)) = resolve_property(property, &enum_types)? else {
                    debug!("{entity_name}.{property_name} has no primitive type; skipping");
                    continue;
                };

                let mapping =
                    PropertyMapping::new(column_name, data_type, is_nullable).with_maximum_length(maximum_length);
                if !table_mapping.add_property(mapping) {
                    debug!("column {column_name} of {table} is mapped twice by {entity_name}; keeping the first");
                }
            }
        }

        model.entities.push(entity);
    }

    for set in storage_container.children_named("EntitySet") {
        let set_name = set.required_attribute("Name")?;
        if exclusions.is_excluded(set_name) {
            continue;
        }
        if let Some(store_set) = store_sets.get(set_name) {
            model.add_table(store_set.table.clone());
        }
    }

    let associations = storage.by_name("Association");
    for association_set in storage_container.children_named("AssociationSet") {
        let association_name = association_set.required_attribute("Association")?;
        let Some(association) = associations.get(bare_name(association_name)) else {
            warn!("association set refers to unknown association {association_name}");
            continue;
        };

        let role_sets: HashMap<&str, &str> = association_set
            .children_named("End")
            .filter_map(|end| Some((end.attribute("Role")?, end.attribute("EntitySet")?)))
            .collect();
        let role_table = |role: &str| -> Result<ModelTable> {
            let set_name = role_sets.get(role).copied().unwrap_or(role);
            store_sets
                .get(set_name)
                .map(|s| s.table.clone())
                .ok_or_else(|| {
                    CheckError::mapping(format!(
                        "role {role} of association {association_name} has no storage entity set"
                    ))
                })
        };

        for constraint in association.children_named("ReferentialConstraint") {
            let (Some(principal), Some(dependent)) = (constraint.child("Principal"), constraint.child("Dependent"))
            else {
                return Err(CheckError::mapping(format!(
                    "referential constraint of {association_name} needs a Principal and a Dependent"
                )));
            };
            let key_names = |end: &Element| -> Result<Vec<String>> {
                end.children_named("PropertyRef")
                    .map(|r| r.required_attribute("Name").map(str::to_string))
                    .collect()
            };

            let relationship = RelationshipMapping::new(
                role_table(principal.required_attribute("Role")?)?,
                key_names(principal)?,
                role_table(dependent.required_attribute("Role")?)?,
                key_names(dependent)?,
            )?;
            model.relationships.push(relationship);
        }
    }

    debug!(
        "extracted {} entit(ies), {} table(s), {} relationship(s)",
        model.entities.len(),
        model.tables.len(),
        model.relationships.len()
    );
    Ok(model)
}
