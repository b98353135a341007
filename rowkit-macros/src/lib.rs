mod decode_field;
mod decode_row;

use decode_field::{FieldMetadata, decode_field};
use decode_row::decode_row;
use proc_macro::TokenStream;
use quote::quote;
use rowkit_core::Value;
use syn::{ItemStruct, parse_macro_input};

/// Derive `RowContract` for a struct whose fields are all `Option<T>`.
///
/// The field `id` (or the one renamed to `id`) is the identity column.
/// Struct attributes: `#[rowkit(table = "..", alias = "..")]`.
/// Field attributes: `#[rowkit(column = "..")]`, `#[rowkit(auto_increment)]`.
#[proc_macro_derive(Row, attributes(rowkit))]
pub fn derive_row(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let name = &item.ident;
    if !item.generics.params.is_empty() {
        panic!("Row `{}` cannot be generic", name);
    }
    let row = decode_row(&item);
    let fields: Vec<FieldMetadata> = item.fields.iter().map(decode_field).collect();
    let mut identities = fields.iter().filter(|f| f.is_identity());
    let identity = identities.next();
    if identities.next().is_some() {
        panic!("Row `{}` declares more than one identity column", name);
    }
    let identity = match identity {
        None => quote!(None),
        Some(field) => match &field.value {
            Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => {
                if field.auto_increment {
                    quote!(AutoInteger)
                } else {
                    quote!(Integer)
                }
            }
            Value::Varchar(..) => quote!(String),
            Value::Uuid(..) => quote!(Uuid),
            _ => panic!(
                "Identity `{}` of `{}` must be an integer, a `String` or a `Uuid`",
                field.ident, name
            ),
        },
    };
    let name_str = name.to_string();
    let column_defs = fields.iter().map(|f| {
        let property = &f.property;
        let column = &f.column;
        let value = &f.value;
        let is_identity = f.is_identity();
        quote! {
            ::rowkit::ColumnDef {
                property: #property,
                column: #column,
                value: #value,
                identity: #is_identity,
            }
        }
    });
    let with_table = row.table.map(|v| quote!(.with_table(#v)));
    let with_alias = row.alias.map(|v| quote!(.with_alias(#v)));
    let read_arms = fields.iter().map(|f| {
        let property = &f.property;
        let field = &f.ident;
        quote!(#property => ::rowkit::AsValue::as_value(self.#field.clone()),)
    });
    let write_arms = fields.iter().map(|f| {
        let property = &f.property;
        let field = &f.ident;
        quote!(#property => self.#field = ::rowkit::AsValue::try_from_value(value)?,)
    });
    quote! {
        impl ::rowkit::RowContract for #name {
            fn schema() -> &'static ::rowkit::RowSchema {
                static SCHEMA: ::std::sync::LazyLock<::rowkit::RowSchema> =
                    ::std::sync::LazyLock::new(|| {
                        ::rowkit::RowSchema::new(
                            #name_str,
                            ::rowkit::IdentityKind::#identity,
                            [#(#column_defs),*],
                        )
                        #with_table
                        #with_alias
                    });
                &SCHEMA
            }

            fn read(&self, property: &str) -> ::rowkit::Value {
                match property {
                    #(#read_arms)*
                    _ => ::rowkit::Value::Null,
                }
            }

            fn write(&mut self, property: &str, value: ::rowkit::Value) -> ::rowkit::Result<()> {
                match property {
                    #(#write_arms)*
                    _ => {
                        return Err(::rowkit::Error::msg(format!(
                            "Property `{}` is not declared by {}",
                            property, #name_str
                        )));
                    }
                }
                Ok(())
            }
        }
    }
    .into()
}
