#[allow(unused_imports)]
use super::*;
use syn::ext::IdentExt;

pub(crate) struct ParsedField {
    pub(crate) name: String,
    pub(crate) column: String,
    pub(crate) kind: &'static str,
    pub(crate) optional: bool,
    pub(crate) max_length: i32,
    pub(crate) schema: Option<String>,
    pub(crate) table: Option<String>,
    pub(crate) belongs_to: Option<BelongsTo>,
}

/// `#[mapping(belongs_to(...))]` on a foreign key column.
pub(crate) struct BelongsTo {
    pub(crate) schema: Option<String>,
    pub(crate) table: String,
    pub(crate) references: String,
    pub(crate) name: Option<String>,
}

/// Attribute values collected before the column type is settled.
#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    column: Option<String>,
    max_length: Option<(i32, Span)>,
    repr: Option<(String, Span)>,
    schema: Option<String>,
    table: Option<String>,
    belongs_to: Option<BelongsTo>,
}

/// Unbounded length sentinel, matching what databases report for `max` columns.
const UNBOUNDED: i32 = -1;

impl ParsedField {
    /// `Ok(None)` for `#[mapping(skip)]` fields.
    pub(crate) fn from_field(field: &Field, rename: RenameRule) -> Result<Option<Self>> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "MappedEntity requires named fields"))?;
        let name = ident.unraw().to_string();

        let mut attrs = FieldAttrs::default();
        for attr in &field.attrs {
            if attr.path().is_ident("mapping") {
                Self::parse_field_attr(attr, &mut attrs)?;
            }
        }
        if attrs.skip {
            return Ok(None);
        }

        let (optional, inferred) = classify_type(&field.ty);
        let kind = match &attrs.repr {
            Some((repr, span)) => kind_from_name(repr)
                .ok_or_else(|| Error::new(*span, format!("unknown repr `{repr}`, expected a primitive such as `i32`")))?,
            None => inferred.ok_or_else(|| {
                Error::new(
                    field.ty.span(),
                    format!("cannot infer the column type of `{name}`; add #[mapping(repr = \"i32\")] or similar"),
                )
            })?,
        };

        let bounded = matches!(kind, "String" | "Binary");
        let max_length = match attrs.max_length {
            Some((_, span)) if !bounded => {
                return Err(Error::new(span, "max_length only applies to String and Vec<u8> fields"));
            }
            Some((length, _)) => length,
            None if bounded => UNBOUNDED,
            None => 0,
        };

        let column = attrs.column.unwrap_or_else(|| rename.apply(&name));

        Ok(Some(Self {
            name,
            column,
            kind,
            optional,
            max_length,
            schema: attrs.schema,
            table: attrs.table,
            belongs_to: attrs.belongs_to,
        }))
    }

    fn parse_field_attr(attr: &Attribute, attrs: &mut FieldAttrs) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.column = Some(value.value());
            } else if meta.path.is_ident("max_length") {
                attrs.max_length = Some(parse_max_length(&meta)?);
            } else if meta.path.is_ident("repr") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.repr = Some((value.value(), value.span()));
            } else if meta.path.is_ident("schema") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.schema = Some(value.value());
            } else if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.table = Some(value.value());
            } else if meta.path.is_ident("belongs_to") {
                if attrs.belongs_to.is_some() {
                    return Err(meta.error("field already has a belongs_to mapping"));
                }
                attrs.belongs_to = Some(Self::parse_belongs_to(&meta)?);
            } else {
                return Err(meta.error("unknown mapping attribute"));
            }
            Ok(())
        })
    }

    fn parse_belongs_to(meta: &ParseNestedMeta) -> Result<BelongsTo> {
        let mut schema = None;
        let mut table = None;
        let mut references = None;
        let mut name = None;
        meta.parse_nested_meta(|item| {
            let value: LitStr = item.value()?.parse()?;
            if item.path.is_ident("table") {
                table = Some(value.value());
            } else if item.path.is_ident("schema") {
                schema = Some(value.value());
            } else if item.path.is_ident("references") {
                references = Some(value.value());
            } else if item.path.is_ident("name") {
                name = Some(value.value());
            } else {
                return Err(item.error("unknown belongs_to option, expected table, schema, references or name"));
            }
            Ok(())
        })?;

        let table = table.ok_or_else(|| meta.error("belongs_to requires table = \"...\""))?;
        Ok(BelongsTo {
            schema,
            table,
            references: references.unwrap_or_else(|| "Id".to_string()),
            name,
        })
    }

    pub(crate) fn to_descriptor_tokens(&self) -> TokenStream2 {
        let name = string_lit(&self.name);
        let column = string_lit(&self.column);
        let kind = Ident::new(self.kind, Span::call_site());
        let optional = self.optional;
        let max_length = self.max_length;
        let schema = optional_string_tokens(&self.schema);
        let table = optional_string_tokens(&self.table);

        quote! {
            ::modelcheck::types::FieldDescriptor {
                name: #name.to_string(),
                column: #column.to_string(),
                data_type: ::modelcheck::schema::DataType::with_nullability(
                    ::modelcheck::schema::PrimitiveKind::#kind,
                    #optional,
                ),
                optional: #optional,
                max_length: #max_length,
                schema: #schema,
                table: #table,
            }
        }
    }
}

fn parse_max_length(meta: &ParseNestedMeta) -> Result<(i32, Span)> {
    let lit: Lit = meta.value()?.parse()?;
    match &lit {
        Lit::Int(value) => {
            let length: i32 = value.base10_parse()?;
            if length <= 0 {
                return Err(Error::new(value.span(), "max_length must be positive, or \"max\""));
            }
            Ok((length, value.span()))
        }
        Lit::Str(value) if value.value().eq_ignore_ascii_case("max") => Ok((UNBOUNDED, value.span())),
        _ => Err(Error::new(lit.span(), "max_length expects an integer or \"max\"")),
    }
}

/// Returns `(optional, inferred PrimitiveKind variant)`.
fn classify_type(ty: &Type) -> (bool, Option<&'static str>) {
    if let Some(inner) = unwrap_generic(ty, "Option") {
        let (_, kind) = classify_type(inner);
        return (true, kind);
    }

    if let Some(inner) = unwrap_generic(ty, "Vec") {
        let is_bytes = matches!(inner, Type::Path(path) if last_ident_str(path).as_deref() == Some("u8"));
        return (false, is_bytes.then_some("Binary"));
    }

    let kind = match ty {
        Type::Path(path) => last_ident_str(path).and_then(|name| kind_from_name(&name)),
        Type::Reference(reference) => match &*reference.elem {
            Type::Path(path) if last_ident_str(path).as_deref() == Some("str") => Some("String"),
            _ => None,
        },
        _ => None,
    };
    (false, kind)
}

/// Map a Rust or canonical type name to a `PrimitiveKind` variant.
fn kind_from_name(name: &str) -> Option<&'static str> {
    let kind = match name {
        "bool" => "Boolean",
        "u8" => "Byte",
        "i8" => "SByte",
        "i16" => "Int16",
        "i32" => "Int32",
        "i64" => "Int64",
        "f32" => "Single",
        "f64" => "Double",
        "Decimal" | "decimal" => "Decimal",
        "String" | "str" | "string" => "String",
        "bytes" => "Binary",
        "NaiveDate" | "date" => "Date",
        "NaiveDateTime" | "datetime" => "DateTime",
        "DateTime" | "datetime_offset" => "DateTimeOffset",
        "NaiveTime" | "time" => "Time",
        "Uuid" | "uuid" => "Guid",
        _ => return None,
    };
    Some(kind)
}

fn unwrap_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    match ty {
        Type::Path(path) if last_ident_str(path).as_deref() == Some(wrapper) => {
            match &path.path.segments.last()?.arguments {
                syn::PathArguments::AngleBracketed(args) => args.args.first().and_then(|arg| match arg {
                    syn::GenericArgument::Type(inner) => Some(inner),
                    _ => None,
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

fn last_ident_str(path: &syn::TypePath) -> Option<String> {
    path.path.segments.last().map(|seg| seg.ident.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rust_types() {
        let ty: Type = syn::parse_quote!(Option<i32>);
        assert_eq!(classify_type(&ty), (true, Some("Int32")));

        let ty: Type = syn::parse_quote!(Vec<u8>);
        assert_eq!(classify_type(&ty), (false, Some("Binary")));

        let ty: Type = syn::parse_quote!(chrono::DateTime<chrono::Utc>);
        assert_eq!(classify_type(&ty), (false, Some("DateTimeOffset")));

        let ty: Type = syn::parse_quote!(Option<uuid::Uuid>);
        assert_eq!(classify_type(&ty), (true, Some("Guid")));

        let ty: Type = syn::parse_quote!(OrderStatus);
        assert_eq!(classify_type(&ty), (false, None));

        let ty: Type = syn::parse_quote!(Vec<String>);
        assert_eq!(classify_type(&ty), (false, None));
    }

    #[test]
    fn skip_field() {
        let field: Field = syn::parse_quote! {
            #[mapping(skip)]
            cached: Vec<String>
        };
        assert!(ParsedField::from_field(&field, RenameRule::None).unwrap().is_none());
    }

    #[test]
    fn column_and_length_overrides() {
        let field: Field = syn::parse_quote! {
            #[mapping(column = "CustomerName", max_length = 100)]
            name: Option<String>
        };
        let parsed = ParsedField::from_field(&field, RenameRule::PascalCase).unwrap().unwrap();
        assert_eq!(parsed.column, "CustomerName");
        assert_eq!(parsed.kind, "String");
        assert!(parsed.optional);
        assert_eq!(parsed.max_length, 100);

        let field: Field = syn::parse_quote! {
            notes: String
        };
        let parsed = ParsedField::from_field(&field, RenameRule::PascalCase).unwrap().unwrap();
        assert_eq!(parsed.column, "Notes");
        assert_eq!(parsed.max_length, -1);
    }

    #[test]
    fn enums_need_a_repr() {
        let field: Field = syn::parse_quote! {
            status: OrderStatus
        };
        assert!(ParsedField::from_field(&field, RenameRule::None).is_err());

        let field: Field = syn::parse_quote! {
            #[mapping(repr = "u8")]
            status: Option<OrderStatus>
        };
        let parsed = ParsedField::from_field(&field, RenameRule::None).unwrap().unwrap();
        assert_eq!(parsed.kind, "Byte");
        assert!(parsed.optional);
        assert_eq!(parsed.max_length, 0);
    }

    #[test]
    fn max_length_rejected_on_numbers() {
        let field: Field = syn::parse_quote! {
            #[mapping(max_length = 10)]
            quantity: i32
        };
        assert!(ParsedField::from_field(&field, RenameRule::None).is_err());
    }
}
