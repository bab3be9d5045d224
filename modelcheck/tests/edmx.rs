use modelcheck::{
    CheckError, DataType, EdmxMappingProvider, ExclusionPredicate, MappingProvider, ModelTable, PrimitiveKind,
    PropertyMapping,
};

const SHOP: &str = include_str!("fixtures/shop.edmx");

fn shop_model() -> modelcheck::ModelSchema {
    EdmxMappingProvider::from_xml(SHOP).unwrap().model_schema().unwrap()
}

#[test]
fn entities_follow_the_conceptual_entity_sets() {
    let model = shop_model();
    let names: Vec<_> = model.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Customer", "Order", "OrderLine", "Tag"]);
}

#[test]
fn storage_sets_become_tables() {
    let model = shop_model();
    assert_eq!(
        model.tables,
        vec![
            ModelTable::new("dbo", "Customers"),
            ModelTable::new("dbo", "CustomerProfiles"),
            ModelTable::new("sales", "Order"),
            ModelTable::new("sales", "OrderLines"),
            ModelTable::new("dbo", "Tags"),
            ModelTable::new("dbo", "CustomerTags"),
        ]
    );
}

#[test]
fn split_entity_has_a_mapping_per_table() {
    let model = shop_model();
    let customer = &model.entities[0];
    assert!(customer.is_split());

    let main = &customer.table_mappings[0];
    assert_eq!(main.qualified_name(), "dbo.Customers");
    // Complex and spatial properties have no primitive type and are left out.
    assert_eq!(main.column_names().collect::<Vec<_>>(), vec!["Id", "Name"]);
    assert_eq!(
        main.property("Id"),
        Some(&PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int32), false))
    );
    assert_eq!(
        main.property("Name"),
        Some(&PropertyMapping::new("Name", DataType::new(PrimitiveKind::String), false).with_maximum_length(100))
    );

    let profile = &customer.table_mappings[1];
    assert_eq!(profile.qualified_name(), "dbo.CustomerProfiles");
    assert_eq!(profile.column_names().collect::<Vec<_>>(), vec!["CustomerId", "Notes", "Photo"]);
    assert_eq!(profile.property("Notes").map(|p| p.maximum_length), Some(-1));
    assert_eq!(profile.property("Photo").map(|p| p.maximum_length), Some(0));
}

#[test]
fn enums_use_their_underlying_type() {
    let model = shop_model();
    let order = &model.entities[1].table_mappings[0];
    assert_eq!(order.qualified_name(), "sales.Order");

    let status = order.property("Status").unwrap();
    assert_eq!(status.property_data_type, DataType::new(PrimitiveKind::Byte));
    assert!(!status.is_nullable);

    let priority = order.property("Priority").unwrap();
    assert_eq!(priority.property_data_type, DataType::nullable(PrimitiveKind::Int32));
    assert_eq!(priority.property_data_type.to_string(), "Option<i32>");
    assert!(priority.is_nullable);

    let placed_at = order.property("PlacedAt").unwrap();
    assert_eq!(placed_at.property_data_type, DataType::new(PrimitiveKind::DateTimeOffset));
}

#[test]
fn foreign_keys_keep_principal_and_dependent_order() {
    let model = shop_model();
    assert_eq!(model.relationships.len(), 4);

    let customer_orders = &model.relationships[0];
    assert_eq!(customer_orders.from_table, ModelTable::new("dbo", "Customers"));
    assert_eq!(customer_orders.to_table, ModelTable::new("sales", "Order"));
    assert_eq!(customer_orders.to_properties, vec!["CustomerId"]);

    let order_lines = &model.relationships[1];
    assert_eq!(order_lines.from_properties, vec!["Id", "Region"]);
    assert_eq!(order_lines.to_properties, vec!["OrderId", "OrderRegion"]);

    let join_ends: Vec<_> = model.relationships[2..]
        .iter()
        .map(|r| (r.from_table.qualified_name(), r.to_table.qualified_name()))
        .collect();
    assert_eq!(
        join_ends,
        vec![
            ("dbo.Customers".to_string(), "dbo.CustomerTags".to_string()),
            ("dbo.Tags".to_string(), "dbo.CustomerTags".to_string()),
        ]
    );
}

#[test]
fn bookkeeping_sets_are_excluded_by_default_only() {
    let model = shop_model();
    assert!(model.entities.iter().all(|e| e.name != "EdmMetadata"));
    assert!(!model.tables.contains(&ModelTable::new("dbo", "EdmMetadatas")));

    let everything = EdmxMappingProvider::from_xml(SHOP)
        .unwrap()
        .with_exclusions(ExclusionPredicate::none())
        .model_schema()
        .unwrap();
    assert!(everything.entities.iter().any(|e| e.name == "EdmMetadata"));
    assert!(everything.tables.contains(&ModelTable::new("dbo", "EdmMetadatas")));
}

#[test]
fn missing_layers_give_an_empty_model() {
    let conceptual_only = r#"<Edmx><Runtime><ConceptualModels><Schema Namespace="Shop">
        <EntityContainer Name="ShopContext" /></Schema></ConceptualModels></Runtime></Edmx>"#;
    let model = EdmxMappingProvider::from_xml(conceptual_only).unwrap().model_schema().unwrap();
    assert!(model.is_empty());

    let no_container = r#"<Edmx><Runtime><ConceptualModels><Schema Namespace="Shop" /></ConceptualModels></Runtime></Edmx>"#;
    let model = EdmxMappingProvider::from_xml(no_container).unwrap().model_schema().unwrap();
    assert!(model.is_empty());
}

#[test]
fn malformed_descriptions_are_errors() {
    assert!(matches!(
        EdmxMappingProvider::from_xml("<Edmx><Runtime></Edmx>"),
        Err(CheckError::Xml(_)) | Err(CheckError::Mapping { .. })
    ));

    let bad_length = SHOP.replace(r#"MaxLength="100""#, r#"MaxLength="lots""#);
    let provider = EdmxMappingProvider::from_xml(&bad_length).unwrap();
    assert!(matches!(provider.model_schema(), Err(CheckError::Mapping { .. })));

    let unknown_store_set = SHOP.replace(
        r#"<MappingFragment StoreEntitySet="CustomerProfiles">"#,
        r#"<MappingFragment StoreEntitySet="Profiles">"#,
    );
    let provider = EdmxMappingProvider::from_xml(&unknown_store_set).unwrap();
    assert!(provider.model_schema().is_err());
}

#[test]
fn reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.edmx");
    std::fs::write(&path, SHOP).unwrap();

    let model = EdmxMappingProvider::from_path(&path).unwrap().model_schema().unwrap();
    assert_eq!(model, shop_model());

    let missing = EdmxMappingProvider::from_path(&dir.path().join("missing.edmx"));
    assert!(matches!(missing, Err(CheckError::Io { .. })));
}
