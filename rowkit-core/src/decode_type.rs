use crate::Value;
use syn::{GenericArgument, PathArguments, Type};

/// Column template for a Rust field type, and whether the type is nullable (wrapped in `Option`).
///
/// Unsupported types decode to `Value::Null`.
pub fn decode_type(ty: &Type) -> (Value, bool) {
    let Type::Path(type_path) = ty else {
        return (Value::Null, false);
    };
    let path = &type_path.path;
    macro_rules! matches_path {
        ($vec:ident, $array:expr) => {
            $vec.iter().eq($array.iter().rev().take($vec.len()))
        };
    }
    let segments = path
        .segments
        .iter()
        .rev()
        .map(|v| v.ident.to_string())
        .collect::<Vec<_>>();
    let data_type = if let Some(ident) = path.get_ident() {
        match ident.to_string().as_str() {
            "bool" => Value::Boolean(None),
            "i8" => Value::Int8(None),
            "i16" => Value::Int16(None),
            "i32" => Value::Int32(None),
            "i64" => Value::Int64(None),
            "u8" => Value::UInt8(None),
            "u16" => Value::UInt16(None),
            "u32" => Value::UInt32(None),
            "u64" => Value::UInt64(None),
            "f32" => Value::Float32(None),
            "f64" => Value::Float64(None),
            "String" => Value::Varchar(None),
            "Decimal" => Value::Decimal(None),
            "Date" => Value::Date(None),
            "Time" => Value::Time(None),
            "PrimitiveDateTime" => Value::Timestamp(None),
            "OffsetDateTime" => Value::TimestampWithTimezone(None),
            "Uuid" => Value::Uuid(None),
            _ => Value::Null,
        }
    } else if matches_path!(segments, ["std", "string", "String"]) {
        Value::Varchar(None)
    } else if matches_path!(segments, ["rust_decimal", "Decimal"]) {
        Value::Decimal(None)
    } else if matches_path!(segments, ["time", "Date"]) {
        Value::Date(None)
    } else if matches_path!(segments, ["time", "Time"]) {
        Value::Time(None)
    } else if matches_path!(segments, ["time", "PrimitiveDateTime"]) {
        Value::Timestamp(None)
    } else if matches_path!(segments, ["time", "OffsetDateTime"]) {
        Value::TimestampWithTimezone(None)
    } else if matches_path!(segments, ["uuid", "Uuid"]) {
        Value::Uuid(None)
    } else {
        Value::Null
    };
    if !matches!(data_type, Value::Null) {
        return (data_type, false);
    }
    let is_option = matches_path!(segments, ["std", "option", "Option"]);
    let is_list = matches_path!(segments, ["std", "vec", "Vec"]);
    let is_box = matches_path!(segments, ["std", "boxed", "Box"]);
    let Some(last) = path.segments.last() else {
        return (Value::Null, false);
    };
    if is_option || is_list || is_box {
        if let PathArguments::AngleBracketed(bracketed) = &last.arguments {
            let nested = bracketed.args.first().and_then(|v| match v {
                GenericArgument::Type(nested) => Some(nested),
                _ => None,
            });
            match nested {
                Some(nested) if is_option => return (decode_type(nested).0, true),
                Some(Type::Path(nested)) if is_list => {
                    if nested.path.is_ident("u8") {
                        return (Value::Blob(None), false);
                    }
                }
                Some(Type::Slice(slice)) if is_box => {
                    if let Type::Path(elem) = &*slice.elem {
                        if elem.path.is_ident("u8") {
                            return (Value::Blob(None), false);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    (Value::Null, false)
}
