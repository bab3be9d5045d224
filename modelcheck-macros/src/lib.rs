use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, Ident, Lit, LitStr, Result, Type, parse_macro_input,
    spanned::Spanned,
};

mod parsed;

use parsed::ParsedEntity;

/// Derive table/column mapping metadata for a struct.
///
/// Container attributes: `#[mapping(table = "Orders", schema = "sales", rename_all = "PascalCase")]`.
/// The schema defaults to `dbo` and the table to the struct name.
///
/// Field attributes:
/// - `column = "OrderId"`: column name (defaults to the field name after `rename_all`)
/// - `max_length = 50` or `max_length = "max"`: length of `String`/`Vec<u8>` columns,
///   unbounded when omitted
/// - `repr = "u8"`: primitive stored for enums and newtypes
/// - `table = "OrderNotes"` (and optionally `schema = ".."`): entity splitting
/// - `belongs_to(table = "Customers", references = "Id", schema = "dbo", name = "FK_..")`:
///   foreign key; fields with the same target and name form one composite key
/// - `skip`: not mapped
#[proc_macro_derive(MappedEntity, attributes(mapping))]
pub fn derive_mapped_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedEntity::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
