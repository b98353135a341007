use crate::{Error, IdentityKind, RowSchema, RowkitError, separated_by, util::quote_identifier};
use std::fmt::Write;

/// How a column is written in a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMode {
    /// `alias.column AS alias_column` (all quoted), disambiguated for joined reads.
    Aliased = 0,
    /// `alias_column`, used to read back from a derived table.
    AliasOnly = 1,
    /// `column`, single entity statements.
    Bare = 2,
}

impl TryFrom<i64> for ColumnMode {
    type Error = Error;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ColumnMode::Aliased,
            1 => ColumnMode::AliasOnly,
            2 => ColumnMode::Bare,
            _ => return Err(RowkitError::UnsupportedMode(value).into()),
        })
    }
}

fn write_column_entry(out: &mut String, quote: &str, alias: &str, column: &str, mode: ColumnMode) {
    let _ = match mode {
        ColumnMode::Aliased => write!(
            out,
            "{quote}{alias}{quote}.{quote}{column}{quote} AS {quote}{alias}_{column}{quote}"
        ),
        ColumnMode::AliasOnly => write!(out, "{quote}{alias}_{column}{quote}"),
        ColumnMode::Bare => write!(out, "{quote}{column}{quote}"),
    };
}

/// Write the projection of `schemas`, in order. Each entity lists its data columns
/// followed by the identity column, or by a `null` placeholder when it has none.
pub fn write_columns(out: &mut String, schemas: &[&RowSchema], quote: &str, mode: ColumnMode) {
    separated_by(
        out,
        schemas,
        |out, schema| {
            let alias = schema.alias.as_str();
            for column in schema.data_columns() {
                write_column_entry(out, quote, alias, column.column, mode);
                out.push_str(",\n");
            }
            if schema.has_identity() {
                write_column_entry(out, quote, alias, RowSchema::IDENTITY, mode);
            } else if mode == ColumnMode::Bare {
                out.push_str("null AS id");
            } else {
                let _ = write!(out, "null AS {alias}_id");
            }
        },
        ",\n",
    );
}

pub fn columns(schemas: &[&RowSchema], quote: &str, mode: ColumnMode) -> String {
    let mut out = String::with_capacity(128);
    write_columns(&mut out, schemas, quote, mode);
    out
}

pub fn select(schemas: &[&RowSchema], quote: &str, mode: ColumnMode) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("select\n");
    write_columns(&mut out, schemas, quote, mode);
    out.push('\n');
    out
}

fn is_alias_char(c: char, quote: &str) -> bool {
    c.is_alphanumeric() || c == '_' || (!quote.is_empty() && quote.contains(c))
}

/// Replace the splat marker of `tableish` with the projection of `schemas`.
///
/// The region spanning from the alias of the first `alias.[*]` to the end of the
/// last one is replaced as a whole, otherwise the first bare `[*]`. Text without
/// markers is returned unchanged.
pub fn expand_column_splat(
    schemas: &[&RowSchema],
    quote: &str,
    tableish: &str,
    mode: ColumnMode,
) -> String {
    const ALIAS_SPLAT: &str = ".[*]";
    const SPLAT: &str = "[*]";
    let mut region: Option<(usize, usize)> = None;
    let mut from = 0;
    while let Some(position) = tableish[from..].find(ALIAS_SPLAT).map(|v| v + from) {
        let end = position + ALIAS_SPLAT.len();
        region = Some(match region {
            Some((start, _)) => (start, end),
            None => {
                let start = tableish[..position]
                    .char_indices()
                    .rev()
                    .find(|(_, c)| !is_alias_char(*c, quote))
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(0);
                (start, end)
            }
        });
        from = end;
    }
    let region = region.or_else(|| tableish.find(SPLAT).map(|v| (v, v + SPLAT.len())));
    let Some((start, end)) = region else {
        return tableish.to_string();
    };
    let mut out = String::with_capacity(tableish.len() + 128);
    out.push_str(&tableish[..start]);
    write_columns(&mut out, schemas, quote, mode);
    out.push_str(&tableish[end..]);
    out
}

/// Case insensitive check for `keyword` followed by a space or a newline.
pub fn starts_with_keyword(tableish: &str, keyword: &str) -> bool {
    tableish
        .get(..keyword.len())
        .is_some_and(|v| v.eq_ignore_ascii_case(keyword))
        && tableish[keyword.len()..].starts_with([' ', '\n'])
}

/// Joined select over `schemas`: `call` statements are sent verbatim, a `select`
/// becomes a derived table, anything else is a table expression with splats.
pub fn iterator_select(schemas: &[&RowSchema], quote: &str, tableish: &str) -> String {
    let tableish = tableish.trim();
    if starts_with_keyword(tableish, "call") {
        return tableish.to_string();
    }
    let tableish = if starts_with_keyword(tableish, "select") {
        format!("({tableish}) tableish")
    } else {
        tableish.to_string()
    };
    let mut out = select(schemas, quote, ColumnMode::AliasOnly);
    out.push_str("from ");
    out.push_str(&expand_column_splat(
        schemas,
        quote,
        &tableish,
        ColumnMode::Aliased,
    ));
    out
}

/// Select of a single entity constrained by equality on `filters` (quoted columns).
pub fn find_select(
    schema: &RowSchema,
    quote: &str,
    table: &str,
    filters: &[String],
    order_by: Option<&str>,
) -> String {
    let mut out = select(&[schema], quote, ColumnMode::Bare);
    let _ = write!(out, "from {table}");
    if !filters.is_empty() {
        out.push_str("\nwhere ");
        separated_by(
            &mut out,
            filters,
            |out, column| {
                let _ = write!(out, "{column} = ?");
            },
            " and ",
        );
    }
    if let Some(order_by) = order_by {
        let _ = write!(out, "\norder by {order_by}");
    }
    out
}

/// Insert of one row: identity first when declared, then the data columns. An upsert
/// rebinds every data column in the `on duplicate key update` clause.
pub fn insert(schema: &RowSchema, quote: &str, table: &str, upsert: bool) -> String {
    let identity = quote_identifier(quote, RowSchema::IDENTITY);
    let mut columns: Vec<String> = Vec::with_capacity(schema.columns.len());
    if schema.has_identity() {
        columns.push(identity.clone());
    }
    columns.extend(schema.data_columns().map(|c| quote_identifier(quote, c.column)));
    let mut out = String::with_capacity(128);
    let _ = write!(out, "insert into {table} (\n");
    separated_by(&mut out, &columns, |out, c| out.push_str(c), ",\n");
    out.push_str("\n) values (\n");
    separated_by(&mut out, &columns, |out, _| out.push('?'), ",\n");
    out.push_str("\n)");
    if upsert {
        out.push_str("\non duplicate key update\n");
        let mut assignments = Vec::with_capacity(columns.len());
        if schema.identity == IdentityKind::AutoInteger {
            assignments.push(format!("{identity} = last_insert_id({identity})"));
        }
        assignments.extend(
            schema
                .data_columns()
                .map(|c| format!("{} = ?", quote_identifier(quote, c.column))),
        );
        if assignments.is_empty() {
            assignments.push(format!("{identity} = {identity}"));
        }
        separated_by(&mut out, &assignments, |out, v| out.push_str(v), ",\n");
    }
    out
}

/// Update of the `assignments` (quoted columns) of the row located by `identity`.
pub fn update(table: &str, assignments: &[String], identity: &str) -> String {
    let mut out = String::with_capacity(128);
    let _ = write!(out, "update {table}\nset\n");
    separated_by(
        &mut out,
        assignments,
        |out, column| {
            let _ = write!(out, "{column} = ?");
        },
        ",\n",
    );
    let _ = write!(out, "\nwhere {identity} = ?");
    out
}

pub fn delete(table: &str, identity: &str) -> String {
    format!("delete from {table}\nwhere {identity} = ?")
}
