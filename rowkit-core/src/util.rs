use convert_case::{Case, Casing};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Snake case table name of a contract, the conventional `Row` suffix is dropped.
pub fn default_table_name(name: &str) -> String {
    let name = match name.strip_suffix("Row") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    };
    let mut name = name.to_case(Case::Snake);
    if name.starts_with('_') {
        name.remove(0);
    }
    name
}

pub fn quote_identifier(quote: &str, name: &str) -> String {
    format!("{quote}{name}{quote}")
}

/// Longest prefix of `value` within `len` bytes ending on a char boundary.
pub fn prefix_within(value: &str, len: usize) -> &str {
    if value.len() <= len {
        return value;
    }
    let mut end = len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::prefix_within(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
