use modelcheck::{
    CheckOptions, DataType, Discrepancy, LiveSchema, LiveTable, ModelEntity, ModelSchema, ModelTable,
    PrimitiveKind, PropertyMapping, RelationshipMapping, SqlColumn, SqlRelationship, SqlTable, reconcile,
};

fn int_column(name: &str, nullable: bool) -> SqlColumn {
    SqlColumn::new(name, Some(DataType::with_nullability(PrimitiveKind::Int32, nullable)), nullable)
}

fn text_column(name: &str, nullable: bool, length: i32) -> SqlColumn {
    SqlColumn::new(name, Some(DataType::new(PrimitiveKind::String)), nullable).with_maximum_length(length)
}

fn live_table(schema: &str, table: &str, columns: Vec<SqlColumn>) -> LiveTable {
    LiveTable {
        table: SqlTable::new(schema, table),
        columns,
    }
}

fn fk_row(name: &str, principal: &str, pk: &str, dependent: &str, fk: &str, ordinal: u32) -> SqlRelationship {
    SqlRelationship {
        foreign_key_name: name.to_string(),
        primary_key_schema: "dbo".to_string(),
        primary_key_table_name: principal.to_string(),
        primary_key_column_name: pk.to_string(),
        foreign_key_schema: "dbo".to_string(),
        foreign_key_table_name: dependent.to_string(),
        foreign_key_column_name: fk.to_string(),
        ordinal_position: ordinal,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// `Order` on `dbo.Orders` with a non-nullable `Id` and a nullable unbounded `Total`.
fn order_model() -> ModelSchema {
    let mut order = ModelEntity::new("Order");
    let mapping = order.table_mapping_mut("dbo", "Orders");
    mapping.add_property(PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int32), false));
    mapping.add_property(
        PropertyMapping::new("Total", DataType::new(PrimitiveKind::String), true)
            .with_maximum_length(PropertyMapping::UNBOUNDED),
    );

    ModelSchema {
        entities: vec![order],
        tables: vec![ModelTable::new("dbo", "Orders")],
        relationships: Vec::new(),
    }
}

#[test]
fn order_scenario_reports_nullability_and_missing_column() {
    let live = LiveSchema {
        tables: vec![live_table("dbo", "Orders", vec![int_column("Id", true)])],
        ..Default::default()
    };

    let messages = reconcile(&order_model(), &live, &CheckOptions::default()).messages();
    assert_eq!(
        messages,
        vec![
            "The column Id in table dbo.Orders is nullable, but the i32 property is not nullable.".to_string(),
            "The column Total doesn't exist in the table dbo.Orders.".to_string(),
        ]
    );
}

#[test]
fn identical_inputs_give_identical_output() {
    let live = LiveSchema {
        tables: vec![
            live_table("dbo", "Orders", vec![int_column("Id", true), int_column("Legacy", false)]),
            live_table("dbo", "Audit", Vec::new()),
        ],
        relationships: vec![fk_row("FK_Audit_Orders", "Orders", "Id", "Audit", "OrderId", 1)],
        ..Default::default()
    };
    let options = CheckOptions::strict();

    let first = reconcile(&order_model(), &live, &options).messages();
    let second = reconcile(&order_model(), &live, &options).messages();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn toggling_one_category_leaves_the_others_alone() {
    let live = LiveSchema {
        tables: vec![
            live_table("dbo", "Orders", vec![int_column("Id", false), int_column("Legacy", false)]),
            live_table("dbo", "Audit", Vec::new()),
        ],
        relationships: vec![fk_row("FK_Audit_Orders", "Orders", "Id", "Audit", "OrderId", 1)],
        ..Default::default()
    };
    let model = order_model();

    let all = reconcile(&model, &live, &CheckOptions::strict());
    let without_tables = reconcile(&model, &live, &CheckOptions::strict().with_tables(false, false));
    let without_columns = reconcile(&model, &live, &CheckOptions::strict().with_columns(false, false));

    let non_table: Vec<_> = all
        .iter()
        .filter(|d| d.category() != modelcheck::Category::Table)
        .cloned()
        .collect();
    assert_eq!(without_tables.discrepancies, non_table);

    let non_column: Vec<_> = all
        .iter()
        .filter(|d| d.category() != modelcheck::Category::Column)
        .cloned()
        .collect();
    assert_eq!(without_columns.discrepancies, non_column);
}

#[test]
fn unbounded_lengths_agree() {
    let mut customer = ModelEntity::new("Customer");
    let mapping = customer.table_mapping_mut("dbo", "Customers");
    mapping.add_property(
        PropertyMapping::new("Notes", DataType::new(PrimitiveKind::String), true)
            .with_maximum_length(PropertyMapping::UNBOUNDED),
    );
    mapping.add_property(
        PropertyMapping::new("Name", DataType::new(PrimitiveKind::String), true).with_maximum_length(50),
    );
    let model = ModelSchema {
        entities: vec![customer],
        tables: vec![ModelTable::new("dbo", "Customers")],
        relationships: Vec::new(),
    };

    let live = LiveSchema {
        tables: vec![live_table(
            "dbo",
            "Customers",
            vec![text_column("Notes", true, -1), text_column("Name", true, -1)],
        )],
        ..Default::default()
    };

    let report = reconcile(&model, &live, &CheckOptions::default());
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.messages()[0],
        "The column Name in table dbo.Customers has a maximum length of -1 which does not agree with the string property (50)."
    );
}

fn order_line_model(principal_columns: &[&str]) -> ModelSchema {
    let relationship = RelationshipMapping::new(
        ModelTable::new("dbo", "Orders"),
        strings(principal_columns),
        ModelTable::new("dbo", "OrderLines"),
        strings(&["OrderId", "OrderRegion", "OrderYear"]),
    )
    .unwrap();

    ModelSchema {
        entities: Vec::new(),
        tables: vec![ModelTable::new("dbo", "Orders"), ModelTable::new("dbo", "OrderLines")],
        relationships: vec![relationship],
    }
}

fn composite_live() -> LiveSchema {
    LiveSchema {
        tables: vec![live_table("dbo", "Orders", Vec::new()), live_table("dbo", "OrderLines", Vec::new())],
        relationships: vec![
            fk_row("FK_X", "Orders", "Year", "OrderLines", "OrderYear", 3),
            fk_row("FK_X", "Orders", "Id", "OrderLines", "OrderId", 1),
            fk_row("FK_X", "Orders", "Region", "OrderLines", "OrderRegion", 2),
        ],
        ..Default::default()
    }
}

#[test]
fn composite_keys_match_by_ordinal() {
    let options = CheckOptions::strict();
    let report = reconcile(&order_line_model(&["Id", "Region", "Year"]), &composite_live(), &options);
    assert!(report.is_empty(), "unexpected: {:?}", report.messages());
}

#[test]
fn reordered_composite_key_is_reported() {
    let report = reconcile(
        &order_line_model(&["Region", "Id", "Year"]),
        &composite_live(),
        &CheckOptions::default(),
    );
    assert_eq!(
        report.messages(),
        vec![
            "The relationship between dbo.Orders and dbo.OrderLines from keys Region,Id,Year to OrderId,OrderRegion,OrderYear is not in the database."
                .to_string()
        ]
    );
}

#[test]
fn schema_filter_hides_other_schemas() {
    let mut model = order_model();
    model.tables.push(ModelTable::new("audit", "Events"));
    let mut audit = ModelEntity::new("AuditEvent");
    audit
        .table_mapping_mut("audit", "Events")
        .add_property(PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int64), false));
    model.entities.push(audit);

    let live = LiveSchema {
        tables: vec![
            live_table("dbo", "Orders", vec![int_column("Id", false)]),
            live_table("audit", "Changes", vec![int_column("Id", false)]),
        ],
        relationships: vec![SqlRelationship {
            foreign_key_schema: "audit".to_string(),
            ..fk_row("FK_Changes_Orders", "Orders", "Id", "Changes", "OrderId", 1)
        }],
        ..Default::default()
    };

    let messages = reconcile(&model, &live, &CheckOptions::strict().with_schema("dbo")).messages();
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|m| !m.contains("audit.")), "{messages:?}");

    let unfiltered = reconcile(&model, &live, &CheckOptions::strict()).messages();
    assert!(unfiltered.iter().any(|m| m.contains("audit.")));
}

#[test]
fn split_entity_reports_the_table_missing_the_column() {
    let mut customer = ModelEntity::new("Customer");
    customer
        .table_mapping_mut("dbo", "T1")
        .add_property(PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int32), false));
    let t2 = customer.table_mapping_mut("dbo", "T2");
    t2.add_property(PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int32), false));
    t2.add_property(PropertyMapping::new("Photo", DataType::new(PrimitiveKind::Binary), true));
    assert!(customer.is_split());

    let model = ModelSchema {
        entities: vec![customer],
        tables: vec![ModelTable::new("dbo", "T1"), ModelTable::new("dbo", "T2")],
        relationships: Vec::new(),
    };
    let live = LiveSchema {
        tables: vec![
            live_table("dbo", "T1", vec![int_column("Id", false)]),
            live_table("dbo", "T2", vec![int_column("Id", false)]),
        ],
        ..Default::default()
    };

    let report = reconcile(&model, &live, &CheckOptions::default());
    assert_eq!(
        report.discrepancies,
        vec![Discrepancy::ColumnNotInDatabase {
            table: "dbo.T2".to_string(),
            column: "Photo".to_string(),
        }]
    );
}

#[test]
fn shared_table_columns_are_not_false_positives() {
    let mut order = ModelEntity::new("Order");
    order
        .table_mapping_mut("dbo", "Orders")
        .add_property(PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int32), false));
    let mut shipping = ModelEntity::new("OrderShipping");
    let mapping = shipping.table_mapping_mut("dbo", "Orders");
    mapping.add_property(PropertyMapping::new("Id", DataType::new(PrimitiveKind::Int32), false));
    mapping.add_property(PropertyMapping::new("Carrier", DataType::new(PrimitiveKind::Int32), false));

    let model = ModelSchema {
        entities: vec![order, shipping],
        tables: vec![ModelTable::new("dbo", "Orders")],
        relationships: Vec::new(),
    };
    let live = LiveSchema {
        tables: vec![live_table(
            "dbo",
            "Orders",
            vec![int_column("Id", false), int_column("Carrier", false), int_column("Stale", false)],
        )],
        ..Default::default()
    };

    let report = reconcile(&model, &live, &CheckOptions::strict());
    assert_eq!(
        report.messages(),
        vec!["The column Stale in table dbo.Orders is not in the entity model.".to_string()]
    );
}

#[test]
fn unknown_database_type_replaces_the_type_mismatch() {
    let live = LiveSchema {
        tables: vec![live_table(
            "dbo",
            "Orders",
            vec![
                int_column("Id", false),
                SqlColumn::from_sql_type("Total", "geography", true, -1),
            ],
        )],
        ..Default::default()
    };

    let messages = reconcile(&order_model(), &live, &CheckOptions::default()).messages();
    assert_eq!(
        messages,
        vec!["The column Total in table dbo.Orders has an unknown data type of string.".to_string()]
    );
}

#[test]
fn type_mismatch_names_both_types() {
    let live = LiveSchema {
        tables: vec![live_table(
            "dbo",
            "Orders",
            vec![
                SqlColumn::from_sql_type("Id", "bigint", false, 0),
                text_column("Total", true, -1),
            ],
        )],
        ..Default::default()
    };

    let messages = reconcile(&order_model(), &live, &CheckOptions::default()).messages();
    assert_eq!(
        messages,
        vec!["The column Id in table dbo.Orders has a data type of i32 which does not match with the database (i64)."
            .to_string()]
    );
}
