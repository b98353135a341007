use convert_case::{Case, Casing};
use proc_macro2::Ident;
use quote::ToTokens;
use rowkit_core::{RowSchema, Value, decode_type};
use syn::{Field, LitStr, ext::IdentExt, parse::ParseBuffer};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) property: String,
    pub(crate) column: String,
    pub(crate) value: Value,
    pub(crate) auto_increment: bool,
}

impl FieldMetadata {
    pub(crate) fn is_identity(&self) -> bool {
        self.column == RowSchema::IDENTITY
    }
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let name = ident.unraw().to_string();
    let name = name.trim_start_matches('_');
    let (value, nullable) = decode_type(&field.ty);
    if matches!(value, Value::Null) {
        panic!(
            "Field `{}` has a type that cannot be stored in a column",
            ident
        );
    }
    if !nullable {
        panic!(
            "Field `{}` must be an `Option`, unset columns are `None`",
            ident
        );
    }
    let mut metadata = FieldMetadata {
        property: name.to_case(Case::Camel),
        column: name.to_string(),
        ident,
        value,
        auto_increment: false,
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("rowkit") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `rowkit`, use it like: `#[rowkit(attribute = value, ...)]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("column") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `column`, use it like: `#[rowkit(column = \"my_column\")]`");
                };
                metadata.column = v.value();
            } else if arg.path.is_ident("auto_increment") {
                let Err(..) = arg.value() else {
                    // value() is Err for Meta::Path
                    panic!("Error while parsing `auto_increment`, use it like: `#[rowkit(auto_increment)]`");
                };
                metadata.auto_increment = true;
            } else {
                panic!(
                    "Unknown attribute `{}` inside rowkit macro",
                    arg.path.to_token_stream()
                );
            }
            Ok(())
        });
    }
    if metadata.auto_increment && !metadata.is_identity() {
        panic!(
            "Field `{}` is not the identity column, only `{}` can be `auto_increment`",
            metadata.ident,
            RowSchema::IDENTITY
        );
    }
    metadata
}
