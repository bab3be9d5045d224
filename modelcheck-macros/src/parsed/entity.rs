#[allow(unused_imports)]
use super::*;

pub(crate) struct ParsedEntity {
    name: Ident,
    schema: String,
    table: String,
    fields: Vec<ParsedField>,
    relations: Vec<ParsedRelation>,
}

/// One foreign key, possibly spanning several fields.
struct ParsedRelation {
    principal_schema: String,
    principal_table: String,
    name: Option<String>,
    principal_columns: Vec<String>,
    dependent_columns: Vec<String>,
    dependent_schema: Option<String>,
    dependent_table: Option<String>,
}

impl ParsedRelation {
    fn accepts(&self, field: &ParsedField, belongs_to: &BelongsTo, default_schema: &str) -> bool {
        self.principal_schema == belongs_to.schema.as_deref().unwrap_or(default_schema)
            && self.principal_table == belongs_to.table
            && self.name == belongs_to.name
            && self.dependent_schema == field.schema
            && self.dependent_table == field.table
    }

    fn to_tokens(&self) -> TokenStream2 {
        let principal_schema = string_lit(&self.principal_schema);
        let principal_table = string_lit(&self.principal_table);
        let principal_columns = self.principal_columns.iter().map(|c| string_lit(c));
        let dependent_columns = self.dependent_columns.iter().map(|c| string_lit(c));
        let dependent_schema = optional_string_tokens(&self.dependent_schema);
        let dependent_table = optional_string_tokens(&self.dependent_table);

        quote! {
            ::modelcheck::types::RelationDescriptor {
                principal_schema: #principal_schema.to_string(),
                principal_table: #principal_table.to_string(),
                principal_columns: vec![#(#principal_columns.to_string()),*],
                dependent_columns: vec![#(#dependent_columns.to_string()),*],
                dependent_schema: #dependent_schema,
                dependent_table: #dependent_table,
            }
        }
    }
}

impl ParsedEntity {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(Error::new(
                input.generics.span(),
                "MappedEntity cannot be derived for generic structs",
            ));
        }

        let mut schema = "dbo".to_string();
        let mut table = input.ident.to_string();
        let mut rename = RenameRule::None;

        for attr in &input.attrs {
            if attr.path().is_ident("mapping") {
                Self::parse_container_attr(attr, &mut schema, &mut table, &mut rename)?;
            }
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => {
                    let mut parsed = Vec::new();
                    for field in &named.named {
                        if let Some(field) = ParsedField::from_field(field, rename)? {
                            parsed.push(field);
                        }
                    }
                    parsed
                }
                _ => return Err(Error::new(input.ident.span(), "MappedEntity requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "MappedEntity can only be derived for structs")),
        };

        let relations = Self::collect_relations(&fields, &schema);

        Ok(Self {
            name: input.ident.clone(),
            schema,
            table,
            fields,
            relations,
        })
    }

    fn parse_container_attr(
        attr: &Attribute,
        schema: &mut String,
        table: &mut String,
        rename: &mut RenameRule,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                *table = value.value();
            } else if meta.path.is_ident("schema") {
                let value: LitStr = meta.value()?.parse()?;
                *schema = value.value();
            } else if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                *rename = RenameRule::parse(&value)?;
            } else {
                return Err(meta.error("unknown mapping attribute, expected table, schema or rename_all"));
            }
            Ok(())
        })
    }

    /// Group `belongs_to` fields into foreign keys, keeping field order.
    fn collect_relations(fields: &[ParsedField], default_schema: &str) -> Vec<ParsedRelation> {
        let mut relations: Vec<ParsedRelation> = Vec::new();
        for field in fields {
            let Some(belongs_to) = &field.belongs_to else { continue };
            match relations
                .iter_mut()
                .find(|r| r.accepts(field, belongs_to, default_schema))
            {
                Some(relation) => {
                    relation.principal_columns.push(belongs_to.references.clone());
                    relation.dependent_columns.push(field.column.clone());
                }
                None => relations.push(ParsedRelation {
                    principal_schema: belongs_to.schema.clone().unwrap_or_else(|| default_schema.to_string()),
                    principal_table: belongs_to.table.clone(),
                    name: belongs_to.name.clone(),
                    principal_columns: vec![belongs_to.references.clone()],
                    dependent_columns: vec![field.column.clone()],
                    dependent_schema: field.schema.clone(),
                    dependent_table: field.table.clone(),
                }),
            }
        }
        relations
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let name_lit = string_lit(&self.name.to_string());
        let schema = string_lit(&self.schema);
        let table = string_lit(&self.table);
        let field_inits = self.fields.iter().map(|field| field.to_descriptor_tokens());
        let relation_inits = self.relations.iter().map(|relation| relation.to_tokens());

        quote! {
            impl ::modelcheck::types::EntityMetadata for #name {
                fn entity_descriptor() -> ::modelcheck::types::EntityDescriptor {
                    ::modelcheck::types::EntityDescriptor {
                        name: #name_lit.to_string(),
                        schema: #schema.to_string(),
                        table: #table.to_string(),
                        fields: vec![#(#field_inits),*],
                        relations: vec![#(#relation_inits),*],
                    }
                }
            }

            ::modelcheck::inventory::submit! {
                ::modelcheck::registry::EntityRegistration {
                    type_name: #name_lit,
                    schema_name: #schema,
                    table_name: #table,
                    descriptor_fn: <#name as ::modelcheck::types::EntityMetadata>::entity_descriptor,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_foreign_keys_are_grouped() {
        let input: DeriveInput = syn::parse_quote! {
            #[mapping(table = "OrderLines", rename_all = "PascalCase")]
            struct OrderLine {
                #[mapping(belongs_to(table = "Orders", references = "Id"))]
                order_id: i32,
                #[mapping(belongs_to(table = "Orders", references = "Region"))]
                order_region: String,
                #[mapping(belongs_to(table = "Products"))]
                product_id: i32,
            }
        };
        let parsed = ParsedEntity::from_input(&input).unwrap();
        assert_eq!(parsed.table, "OrderLines");
        assert_eq!(parsed.schema, "dbo");
        assert_eq!(parsed.relations.len(), 2);
        assert_eq!(parsed.relations[0].principal_columns, vec!["Id", "Region"]);
        assert_eq!(parsed.relations[0].dependent_columns, vec!["OrderId", "OrderRegion"]);
        assert_eq!(parsed.relations[1].principal_table, "Products");
    }

    #[test]
    fn named_keys_to_the_same_table_stay_apart() {
        let input: DeriveInput = syn::parse_quote! {
            struct Shipment {
                #[mapping(belongs_to(table = "Addresses", name = "FK_Shipments_From"))]
                from_address: i32,
                #[mapping(belongs_to(table = "Addresses", name = "FK_Shipments_To"))]
                to_address: i32,
            }
        };
        let parsed = ParsedEntity::from_input(&input).unwrap();
        assert_eq!(parsed.table, "Shipment");
        assert_eq!(parsed.relations.len(), 2);
    }

    #[test]
    fn rejects_tuple_structs_and_generics() {
        let tuple: DeriveInput = syn::parse_quote! { struct Pair(i32, i32); };
        assert!(ParsedEntity::from_input(&tuple).is_err());

        let generic: DeriveInput = syn::parse_quote! { struct Wrapper<T> { value: T } };
        assert!(ParsedEntity::from_input(&generic).is_err());
    }
}
