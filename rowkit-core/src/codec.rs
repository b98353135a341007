use crate::{RowSchema, util::quote_identifier};
use convert_case::{Case, Casing};

/// Translates between contract properties and quoted column names.
///
/// Declared properties are looked up in the schema, anything else falls back to
/// the case conversion lowerCamel ↔ snake_case.
#[derive(Debug, Clone, Copy)]
pub struct ColumnCodec<'a> {
    pub schema: &'a RowSchema,
    pub quote: &'a str,
}

impl<'a> ColumnCodec<'a> {
    pub fn new(schema: &'a RowSchema, quote: &'a str) -> Self {
        Self { schema, quote }
    }

    pub fn to_column_name(&self, property: &str) -> String {
        match self.schema.property(property) {
            Some(def) => quote_identifier(self.quote, def.column),
            None => quote_identifier(self.quote, &property.to_case(Case::Snake)),
        }
    }

    pub fn to_property_name(&self, column: &str) -> String {
        let column = self.unquote(column);
        match self.schema.column(column) {
            Some(def) => def.property.to_string(),
            None => column.to_case(Case::Camel),
        }
    }

    /// Column name without the surrounding identifier quotes.
    pub fn unquote<'c>(&self, column: &'c str) -> &'c str {
        if self.quote.is_empty() {
            return column;
        }
        column
            .strip_prefix(self.quote)
            .and_then(|v| v.strip_suffix(self.quote))
            .unwrap_or(column)
    }

    pub fn quoted(&self, column: &str) -> String {
        quote_identifier(self.quote, column)
    }
}
