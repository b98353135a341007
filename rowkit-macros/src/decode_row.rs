use syn::{ItemStruct, LitStr, parse::ParseBuffer};

#[derive(Default)]
pub(crate) struct RowMetadata {
    pub(crate) table: Option<String>,
    pub(crate) alias: Option<String>,
}

pub(crate) fn decode_row(item: &ItemStruct) -> RowMetadata {
    let mut metadata = RowMetadata::default();
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("rowkit") {
            continue;
        }
        let Ok(list) = meta.require_list() else {
            panic!("Error while parsing `rowkit`, use it like: `#[rowkit(table = \"my_table\")]`");
        };
        let _ = list.parse_nested_meta(|arg| {
            if arg.path.is_ident("table") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `table`, use it like: `#[rowkit(table = \"my_table\")]`");
                };
                metadata.table = Some(v.value());
            } else if arg.path.is_ident("alias") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `alias`, use it like: `#[rowkit(alias = \"t\")]`");
                };
                metadata.alias = Some(v.value());
            } else {
                panic!(
                    "Unknown attribute `{}` on a row struct, expected `table` or `alias`",
                    quote::ToTokens::to_token_stream(&arg.path)
                );
            }
            Ok(())
        });
    }
    metadata
}
